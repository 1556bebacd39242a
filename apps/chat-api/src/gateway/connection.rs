//! Per-connection identity and lifecycle.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use super::hub::RoomId;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique handle for one WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Lifecycle of a realtime connection.
///
/// `Connecting -> Joined(room) -> Closing -> Closed`, with `Connecting -> Closed`
/// when the handshake is rejected before a room is joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Joined(RoomId),
    Closing,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal connection transition from {from:?} to {to}")]
pub struct TransitionError {
    pub from: ConnectionState,
    pub to: &'static str,
}

/// One authenticated client socket. Owned by the connection's reader task.
#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    pub user_id: i64,
    pub username: String,
    state: ConnectionState,
}

impl Connection {
    pub fn new(user_id: i64, username: impl Into<String>) -> Self {
        Self {
            id: ConnectionId::next(),
            user_id,
            username: username.into(),
            state: ConnectionState::Connecting,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The room this connection is joined to. Fixed once set.
    pub fn room(&self) -> Option<RoomId> {
        match self.state {
            ConnectionState::Joined(room) => Some(room),
            _ => None,
        }
    }

    pub fn joined(&mut self, room: RoomId) -> Result<(), TransitionError> {
        match self.state {
            ConnectionState::Connecting => {
                self.state = ConnectionState::Joined(room);
                Ok(())
            }
            from => Err(TransitionError { from, to: "Joined" }),
        }
    }

    pub fn closing(&mut self) -> Result<(), TransitionError> {
        match self.state {
            ConnectionState::Joined(_) => {
                self.state = ConnectionState::Closing;
                Ok(())
            }
            from => Err(TransitionError { from, to: "Closing" }),
        }
    }

    pub fn closed(&mut self) -> Result<(), TransitionError> {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Closing => {
                self.state = ConnectionState::Closed;
                Ok(())
            }
            from => Err(TransitionError { from, to: "Closed" }),
        }
    }
}
