//! The transport seam between the connection manager and the network.
//!
//! The manager speaks text frames through a pair of object-safe traits; the
//! [`ws`] module provides the production WebSocket implementation and
//! [`memory`] an in-process duplex used by the test suites (and handy for
//! demos that embed a scripted server).

use async_trait::async_trait;

use touchline_core::errors::ConnectionError;

pub mod memory;
pub mod ws;

/// Dials the match server and hands back the two halves of a channel.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish a new channel to `url`.
    async fn dial(
        &self,
        url: &str,
    ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameStream>), ConnectionError>;
}

/// The outbound half of a channel.
#[async_trait]
pub trait FrameSink: Send {
    /// Send one text frame.
    async fn send(&mut self, text: String) -> Result<(), ConnectionError>;

    /// Best-effort orderly close.
    async fn close(&mut self);
}

/// The inbound half of a channel.
#[async_trait]
pub trait FrameStream: Send {
    /// Next text frame. `None` means the channel closed in an orderly way;
    /// `Some(Err(_))` means it was lost.
    async fn next(&mut self) -> Option<Result<String, ConnectionError>>;
}
