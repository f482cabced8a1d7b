//! # touchline-client
//!
//! The client-side engine that keeps a viewer's picture of an in-progress
//! remote match consistent with the authoritative match server, and paces
//! playback from the importance of incoming events.
//!
//! Four pieces, wired in a fixed order by the session driver:
//!
//! - [`connection`]: channel lifecycle (dial, authenticate, subscribe,
//!   reconnect with capped backoff and automatic re-subscribe)
//! - [`reconcile`]: merges snapshots and events into one monotonically
//!   advancing canonical view, dropping stale and duplicate data
//! - [`playback`]: maps each accepted event's priority tier to the current
//!   speed/detail setting ("latest event wins")
//! - [`session`]: the facade the rest of the application talks to
//!
//! Renderers, stats panels and navigation code use [`MatchSession`] only;
//! the inner components are exported for tests and diagnostics tooling.

#![deny(unsafe_code)]

pub mod config;
pub mod connection;
pub mod errors;
pub mod observer;
pub mod playback;
pub mod reconcile;
pub mod session;
pub mod transport;

pub use config::{JoinConfig, ViewerConfig};
pub use connection::{ConnectionState, ConnectionStatus};
pub use errors::SessionError;
pub use observer::SessionObserver;
pub use playback::{PlaybackController, setting_for};
pub use reconcile::{Reconciler, SyncStats};
pub use session::MatchSession;
pub use transport::{Connector, FrameSink, FrameStream};
