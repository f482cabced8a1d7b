//! Error types for the connection and subscription lifecycle.
//!
//! Two small enums cover the failure modes the rest of the application can
//! observe. Transport-level hiccups while already joined are not errors;
//! they surface as connection-status transitions and the client recovers by
//! itself. Stale snapshots and duplicate events are not errors either; they
//! are dropped silently as expected steady-state behavior.

use std::time::Duration;

use thiserror::Error;

use crate::ids::MatchId;

/// Failure to establish or authenticate the channel.
#[derive(Clone, Debug, Error)]
pub enum ConnectionError {
    /// The underlying transport could not be established.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server rejected the viewer's identity. Fatal for the session;
    /// never retried automatically.
    #[error("authentication rejected: {0}")]
    AuthRejected(String),

    /// No `connection_ack` arrived within the handshake window.
    #[error("no connection ack within {0:?}")]
    AckTimeout(Duration),

    /// The session driver task is gone (the session was dropped).
    #[error("session is closed")]
    SessionClosed,
}

/// Failure to join a match's update stream.
#[derive(Clone, Debug, Error)]
pub enum SubscriptionError {
    /// `join_match` was called without a prior successful `connect`.
    #[error("not connected")]
    NotConnected,

    /// The server rejected the subscription (e.g. unknown match). Not
    /// retried: the condition will not self-resolve.
    #[error("subscription to match {match_id} rejected: {reason}")]
    Rejected {
        /// The match that was requested.
        match_id: MatchId,
        /// Server-supplied reason.
        reason: String,
    },

    /// No `subscription_ack` arrived after the bounded retry budget.
    #[error("no subscription ack after {attempts} attempts")]
    AckTimeout {
        /// How many subscribe attempts were made.
        attempts: u32,
    },

    /// The session driver task is gone (the session was dropped).
    #[error("session is closed")]
    SessionClosed,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_display() {
        let err = ConnectionError::Transport("connection refused".into());
        assert_eq!(err.to_string(), "transport error: connection refused");
    }

    #[test]
    fn auth_rejected_display() {
        let err = ConnectionError::AuthRejected("unknown viewer".into());
        assert_eq!(err.to_string(), "authentication rejected: unknown viewer");
    }

    #[test]
    fn connection_ack_timeout_display() {
        let err = ConnectionError::AckTimeout(Duration::from_secs(5));
        assert!(err.to_string().contains("5s"));
    }

    #[test]
    fn subscription_rejected_display() {
        let err = SubscriptionError::Rejected {
            match_id: MatchId::from("m404"),
            reason: "match not found".into(),
        };
        assert_eq!(
            err.to_string(),
            "subscription to match m404 rejected: match not found"
        );
    }

    #[test]
    fn subscription_ack_timeout_display() {
        let err = SubscriptionError::AckTimeout { attempts: 3 };
        assert_eq!(err.to_string(), "no subscription ack after 3 attempts");
    }

    #[test]
    fn not_connected_display() {
        assert_eq!(SubscriptionError::NotConnected.to_string(), "not connected");
    }
}
