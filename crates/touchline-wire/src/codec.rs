//! Encoding and decoding of wire messages.
//!
//! A decode failure means the peer sent something this build does not
//! understand: a missing field, an unknown type string, an out-of-range
//! priority tier. The client logs and drops such frames; a single corrupt
//! message must never take down a viewing session.

use thiserror::Error;

use crate::messages::{ClientMessage, ServerMessage};

/// A frame that could not be encoded or decoded.
#[derive(Debug, Error)]
pub enum WireError {
    /// The JSON payload did not match any known message shape.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Decode a server-pushed text frame.
pub fn decode_server(text: &str) -> Result<ServerMessage, WireError> {
    Ok(serde_json::from_str(text)?)
}

/// Encode a client message as a text frame.
pub fn encode_client(message: &ClientMessage) -> Result<String, WireError> {
    Ok(serde_json::to_string(message)?)
}

/// Decode a client-sent text frame. Used by test harnesses standing in for
/// the server.
pub fn decode_client(text: &str) -> Result<ClientMessage, WireError> {
    Ok(serde_json::from_str(text)?)
}

/// Encode a server message as a text frame. Used by test harnesses standing
/// in for the server.
pub fn encode_server(message: &ServerMessage) -> Result<String, WireError> {
    Ok(serde_json::to_string(message)?)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
