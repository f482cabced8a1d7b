//! # touchline-wire
//!
//! The wire protocol spoken over the WebSocket channel between the match
//! server and the viewing client.
//!
//! Messages are JSON objects discriminated by a `"type"` field with
//! snake_case type strings and camelCase payload fields. The server pushes
//! [`ServerMessage`]s (snapshots, events, acks, rejections); the client
//! sends [`ClientMessage`]s (authenticate, subscribe, unsubscribe).

#![deny(unsafe_code)]

pub mod codec;
pub mod messages;

pub use codec::{WireError, decode_client, decode_server, encode_client, encode_server};
pub use messages::{ClientMessage, ServerMessage, StateSnapshot};
