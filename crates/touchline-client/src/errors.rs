//! The error type surfaced through the observer's `on_error` callback.
//!
//! Only failures the viewer may need to act on arrive here: a fatal
//! authentication rejection, or a subscription that was refused. Transport
//! hiccups are connection-status transitions, and stale/duplicate/malformed
//! messages are dropped without ever reaching the observer.

use thiserror::Error;

use touchline_core::errors::{ConnectionError, SubscriptionError};

/// A failure surfaced to the session observer.
#[derive(Clone, Debug, Error)]
pub enum SessionError {
    /// Channel establishment or authentication failed.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Joining a match's update stream failed.
    #[error(transparent)]
    Subscription(#[from] SubscriptionError),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
