//! Connection hub: the single owner of room membership.
//!
//! All mutations and broadcasts are serialized through one command channel
//! handled by a dedicated task, so room state never needs a lock. Callers
//! interact through the cloneable [`Hub`] handle.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};

use super::connection::ConnectionId;
use super::sink::FrameSink;

/// Chat id used as the room key.
pub type RoomId = i64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HubError {
    #[error("{conn} is already joined to room {current}, cannot join room {requested}")]
    RoomMismatch {
        conn: ConnectionId,
        current: RoomId,
        requested: RoomId,
    },
    #[error("connection hub is not running")]
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    /// The connection was already in this room; the new sink was discarded.
    AlreadyJoined,
}

/// Result of one broadcast pass over a room.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    /// Connections removed because their write failed.
    pub pruned: usize,
}

enum HubCommand {
    Join {
        conn: ConnectionId,
        room: RoomId,
        sink: Box<dyn FrameSink>,
        reply: oneshot::Sender<Result<JoinOutcome, HubError>>,
    },
    Leave {
        conn: ConnectionId,
        reply: oneshot::Sender<bool>,
    },
    Broadcast {
        room: RoomId,
        payload: String,
        reply: oneshot::Sender<BroadcastReport>,
    },
    RoomSize {
        room: RoomId,
        reply: oneshot::Sender<usize>,
    },
    ConnectionCount {
        reply: oneshot::Sender<usize>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to the hub task. Cheap to clone.
#[derive(Clone)]
pub struct Hub {
    commands: mpsc::Sender<HubCommand>,
}

impl Hub {
    /// Start the hub task on the current runtime.
    ///
    /// `capacity` bounds the command queue; callers wait when it is full.
    /// The task exits once every handle has been dropped.
    pub fn spawn(capacity: usize) -> Self {
        let (commands, rx) = mpsc::channel(capacity.max(1));
        tokio::spawn(HubLoop::default().run(rx));
        Self { commands }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> HubCommand,
    ) -> Result<T, HubError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| HubError::Unavailable)?;
        rx.await.map_err(|_| HubError::Unavailable)
    }

    /// Register `conn` in `room`, handing its write half to the hub.
    pub async fn join(
        &self,
        conn: ConnectionId,
        room: RoomId,
        sink: Box<dyn FrameSink>,
    ) -> Result<JoinOutcome, HubError> {
        self.request(|reply| HubCommand::Join {
            conn,
            room,
            sink,
            reply,
        })
        .await?
    }

    /// Remove `conn` from its room and close its sink.
    ///
    /// Returns `false` when the connection was not registered.
    pub async fn leave(&self, conn: ConnectionId) -> Result<bool, HubError> {
        self.request(|reply| HubCommand::Leave { conn, reply }).await
    }

    /// Deliver `payload` to every connection in `room`.
    pub async fn broadcast(
        &self,
        room: RoomId,
        payload: impl Into<String>,
    ) -> Result<BroadcastReport, HubError> {
        let payload = payload.into();
        self.request(|reply| HubCommand::Broadcast {
            room,
            payload,
            reply,
        })
        .await
    }

    pub async fn room_size(&self, room: RoomId) -> Result<usize, HubError> {
        self.request(|reply| HubCommand::RoomSize { room, reply })
            .await
    }

    pub async fn connection_count(&self) -> Result<usize, HubError> {
        self.request(|reply| HubCommand::ConnectionCount { reply })
            .await
    }

    /// Close every connection and stop the hub task.
    ///
    /// Resolves once all sinks are closed. Every later call on any handle
    /// fails with [`HubError::Unavailable`].
    pub async fn shutdown(&self) -> Result<(), HubError> {
        self.request(|reply| HubCommand::Shutdown { reply }).await
    }
}

#[derive(Default)]
struct HubLoop {
    rooms: HashMap<RoomId, HashMap<ConnectionId, Box<dyn FrameSink>>>,
    index: HashMap<ConnectionId, RoomId>,
}

impl HubLoop {
    async fn run(mut self, mut commands: mpsc::Receiver<HubCommand>) {
        tracing::debug!("connection hub started");

        let mut stopped_by = None;
        while let Some(command) = commands.recv().await {
            match command {
                HubCommand::Join {
                    conn,
                    room,
                    sink,
                    reply,
                } => {
                    let _ = reply.send(self.join(conn, room, sink));
                }
                HubCommand::Leave { conn, reply } => {
                    let _ = reply.send(self.leave(conn).await);
                }
                HubCommand::Broadcast {
                    room,
                    payload,
                    reply,
                } => {
                    let _ = reply.send(self.broadcast(room, &payload).await);
                }
                HubCommand::RoomSize { room, reply } => {
                    let _ = reply.send(self.rooms.get(&room).map_or(0, HashMap::len));
                }
                HubCommand::ConnectionCount { reply } => {
                    let _ = reply.send(self.index.len());
                }
                HubCommand::Shutdown { reply } => {
                    stopped_by = Some(reply);
                    break;
                }
            }
        }
        drop(commands);

        let remaining: Vec<ConnectionId> = self.index.keys().copied().collect();
        for conn in remaining {
            self.leave(conn).await;
        }
        tracing::debug!("connection hub stopped");

        if let Some(reply) = stopped_by {
            let _ = reply.send(());
        }
    }

    fn join(
        &mut self,
        conn: ConnectionId,
        room: RoomId,
        sink: Box<dyn FrameSink>,
    ) -> Result<JoinOutcome, HubError> {
        match self.index.get(&conn) {
            Some(&current) if current == room => Ok(JoinOutcome::AlreadyJoined),
            Some(&current) => Err(HubError::RoomMismatch {
                conn,
                current,
                requested: room,
            }),
            None => {
                self.index.insert(conn, room);
                self.rooms.entry(room).or_default().insert(conn, sink);
                tracing::info!(%conn, room, "connection joined room");
                Ok(JoinOutcome::Joined)
            }
        }
    }

    async fn leave(&mut self, conn: ConnectionId) -> bool {
        let Some(room) = self.index.remove(&conn) else {
            return false;
        };

        if let Some(members) = self.rooms.get_mut(&room) {
            if let Some(mut sink) = members.remove(&conn) {
                sink.close().await;
            }
            if members.is_empty() {
                self.rooms.remove(&room);
            }
        }

        tracing::info!(%conn, room, "connection left room");
        true
    }

    async fn broadcast(&mut self, room: RoomId, payload: &str) -> BroadcastReport {
        let Some(members) = self.rooms.get_mut(&room) else {
            return BroadcastReport::default();
        };

        let mut delivered = 0;
        let mut failed = Vec::new();
        for (conn, sink) in members.iter_mut() {
            match sink.send(payload).await {
                Ok(()) => delivered += 1,
                Err(err) => {
                    tracing::warn!(%conn, room, %err, "dropping connection after failed write");
                    failed.push(*conn);
                }
            }
        }

        for conn in &failed {
            self.leave(*conn).await;
        }

        BroadcastReport {
            delivered,
            pruned: failed.len(),
        }
    }
}
