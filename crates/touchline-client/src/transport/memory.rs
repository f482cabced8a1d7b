//! In-process duplex transport for tests and scripted demos.
//!
//! [`pair`] returns a connector for the client side and an accept queue for
//! the harness standing in for the match server. Each dial yields a
//! [`ServerEnd`] that can push server messages, read what the client sent,
//! and simulate channel loss by being dropped.

use async_trait::async_trait;
use tokio::sync::mpsc;

use touchline_core::errors::ConnectionError;
use touchline_wire::{ClientMessage, ServerMessage, decode_client, encode_server};

use super::{Connector, FrameSink, FrameStream};

/// Build a connected (client connector, server accept queue) pair.
#[must_use]
pub fn pair() -> (MemoryConnector, mpsc::UnboundedReceiver<ServerEnd>) {
    let (accept_tx, accept_rx) = mpsc::unbounded_channel();
    (MemoryConnector { accept_tx }, accept_rx)
}

/// Connector whose dials are accepted by the harness behind [`pair`].
#[derive(Clone)]
pub struct MemoryConnector {
    accept_tx: mpsc::UnboundedSender<ServerEnd>,
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn dial(
        &self,
        _url: &str,
    ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameStream>), ConnectionError> {
        let (to_server, from_client) = mpsc::unbounded_channel();
        let (to_client, from_server) = mpsc::unbounded_channel();
        let end = ServerEnd { to_client, from_client };
        self.accept_tx
            .send(end)
            .map_err(|_| ConnectionError::Transport("dial refused: no listener".into()))?;
        Ok((
            Box::new(MemorySink { tx: to_server }),
            Box::new(MemoryFrames { rx: from_server }),
        ))
    }
}

/// The server half of one dialed channel.
///
/// Dropping it closes both directions, which the client observes as an
/// unexpected channel loss.
pub struct ServerEnd {
    to_client: mpsc::UnboundedSender<String>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl ServerEnd {
    /// Push a server message to the client. Returns `false` if the client
    /// side is gone.
    pub fn push(&self, message: &ServerMessage) -> bool {
        match encode_server(message) {
            Ok(text) => self.to_client.send(text).is_ok(),
            Err(_) => false,
        }
    }

    /// Push a raw text frame (for malformed-input tests).
    pub fn push_raw(&self, text: impl Into<String>) -> bool {
        self.to_client.send(text.into()).is_ok()
    }

    /// Next decoded client message; `None` once the client hung up.
    /// Frames that fail to decode are skipped.
    pub async fn next_client(&mut self) -> Option<ClientMessage> {
        loop {
            let text = self.from_client.recv().await?;
            if let Ok(message) = decode_client(&text) {
                return Some(message);
            }
        }
    }
}

struct MemorySink {
    tx: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send(&mut self, text: String) -> Result<(), ConnectionError> {
        self.tx
            .send(text)
            .map_err(|_| ConnectionError::Transport("memory channel closed".into()))
    }

    async fn close(&mut self) {}
}

struct MemoryFrames {
    rx: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl FrameStream for MemoryFrames {
    async fn next(&mut self) -> Option<Result<String, ConnectionError>> {
        // An orderly close and a lost peer are indistinguishable here; report
        // loss so reconnect paths are exercised the way a real drop would be.
        match self.rx.recv().await {
            Some(text) => Some(Ok(text)),
            None => Some(Err(ConnectionError::Transport("memory channel dropped".into()))),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
