//! Client configuration.
//!
//! Passed in by the embedding application when constructing a
//! [`crate::session::MatchSession`]; every field has a compiled default so
//! `ViewerConfig::default()` is a working configuration for local use.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use touchline_core::retry::BackoffConfig;

/// Default server endpoint.
pub const DEFAULT_URL: &str = "ws://127.0.0.1:9090/live";
/// Default handshake window in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;
/// Default per-attempt subscription ack window in milliseconds.
pub const DEFAULT_JOIN_ACK_TIMEOUT_MS: u64 = 5000;
/// Default number of subscribe attempts before giving up.
pub const DEFAULT_JOIN_MAX_ATTEMPTS: u32 = 3;
/// Default inbound frame buffer size.
pub const DEFAULT_INBOUND_BUFFER: usize = 256;

/// Subscription handshake limits.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinConfig {
    /// How long to wait for a `subscription_ack` per attempt, in ms.
    #[serde(default = "default_join_ack_timeout_ms")]
    pub ack_timeout_ms: u64,
    /// How many subscribe attempts before `join_match` fails.
    #[serde(default = "default_join_max_attempts")]
    pub max_attempts: u32,
}

fn default_join_ack_timeout_ms() -> u64 {
    DEFAULT_JOIN_ACK_TIMEOUT_MS
}
fn default_join_max_attempts() -> u32 {
    DEFAULT_JOIN_MAX_ATTEMPTS
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            ack_timeout_ms: DEFAULT_JOIN_ACK_TIMEOUT_MS,
            max_attempts: DEFAULT_JOIN_MAX_ATTEMPTS,
        }
    }
}

impl JoinConfig {
    /// Per-attempt ack window as a [`Duration`].
    #[must_use]
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}

/// Full client configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerConfig {
    /// WebSocket endpoint of the match server.
    #[serde(default = "default_url")]
    pub url: String,
    /// Window for dial + authentication, in ms.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Reconnection delay curve.
    #[serde(default)]
    pub backoff: BackoffConfig,
    /// Subscription handshake limits.
    #[serde(default)]
    pub join: JoinConfig,
    /// Capacity of the inbound frame buffer.
    #[serde(default = "default_inbound_buffer")]
    pub inbound_buffer: usize,
}

fn default_url() -> String {
    DEFAULT_URL.to_owned()
}
fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}
fn default_inbound_buffer() -> usize {
    DEFAULT_INBOUND_BUFFER
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            backoff: BackoffConfig::default(),
            join: JoinConfig::default(),
            inbound_buffer: DEFAULT_INBOUND_BUFFER,
        }
    }
}

impl ViewerConfig {
    /// Handshake window as a [`Duration`].
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ViewerConfig::default();
        assert_eq!(config.url, DEFAULT_URL);
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
        assert_eq!(config.join.max_attempts, 3);
        assert_eq!(config.inbound_buffer, 256);
    }

    #[test]
    fn serde_fills_missing_fields() {
        let config: ViewerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.url, DEFAULT_URL);
        assert_eq!(config.join.ack_timeout_ms, DEFAULT_JOIN_ACK_TIMEOUT_MS);
        assert_eq!(config.backoff.base_delay_ms, 1000);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config: ViewerConfig =
            serde_json::from_str(r#"{"url":"ws://example.test/live","join":{"maxAttempts":1}}"#)
                .unwrap();
        assert_eq!(config.url, "ws://example.test/live");
        assert_eq!(config.join.max_attempts, 1);
        assert_eq!(config.join.ack_timeout_ms, DEFAULT_JOIN_ACK_TIMEOUT_MS);
    }
}
