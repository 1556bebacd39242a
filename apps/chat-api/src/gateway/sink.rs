//! Outbound half of a connection, as seen by the hub.

use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;

/// A write to a connection failed; the connection is considered dead.
#[derive(Debug, thiserror::Error)]
#[error("frame write failed: {0}")]
pub struct SinkError(pub String);

/// Something the hub can push text frames into.
#[async_trait]
pub trait FrameSink: Send {
    async fn send(&mut self, frame: &str) -> Result<(), SinkError>;

    /// Best-effort close. Errors are ignored; the peer may already be gone.
    async fn close(&mut self);
}

/// Write half of an axum WebSocket.
pub struct WsSink {
    inner: SplitSink<WebSocket, Message>,
}

impl WsSink {
    pub fn new(inner: SplitSink<WebSocket, Message>) -> Self {
        Self { inner }
    }

    /// Close with an application close code before the connection joins a room.
    pub async fn close_with(&mut self, code: u16, reason: &str) {
        let frame = Message::Close(Some(CloseFrame {
            code,
            reason: reason.to_string().into(),
        }));
        if let Err(err) = self.inner.send(frame).await {
            tracing::debug!(?err, code, "failed to send close frame");
        }
        let _ = self.inner.close().await;
    }
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, frame: &str) -> Result<(), SinkError> {
        self.inner
            .send(Message::Text(frame.to_string().into()))
            .await
            .map_err(|err| SinkError(err.to_string()))
    }

    async fn close(&mut self) {
        let _ = self.inner.send(Message::Close(None)).await;
        let _ = self.inner.close().await;
    }
}
