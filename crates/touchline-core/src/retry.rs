//! Reconnection backoff configuration and delay math.
//!
//! Portable, sync-only building blocks: the client crate owns the actual
//! timers and randomness. Reconnect attempts are unlimited by policy (the
//! viewer stays interested until they leave), so unlike a request retry
//! budget there is no `max_retries` here, only the delay curve.

use serde::{Deserialize, Serialize};

/// Default base delay in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;
/// Default maximum delay in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;
/// Default jitter factor (0.0–1.0).
pub const DEFAULT_JITTER_FACTOR: f64 = 0.2;

/// Delay curve for reconnection attempts.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackoffConfig {
    /// Base delay for exponential backoff in ms (default: 1000).
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Cap on the delay between attempts in ms (default: 30000).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Jitter range 0.0–1.0 applied symmetrically (default: 0.2).
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY_MS
}
fn default_max_delay_ms() -> u64 {
    DEFAULT_MAX_DELAY_MS
}
fn default_jitter_factor() -> f64 {
    DEFAULT_JITTER_FACTOR
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            jitter_factor: DEFAULT_JITTER_FACTOR,
        }
    }
}

impl BackoffConfig {
    /// Delay before the given zero-based attempt, with explicit randomness.
    ///
    /// Formula: `min(max_delay, base_delay * 2^attempt) * (1 + (random*2-1) * jitter)`
    ///
    /// `random` must be in `[0.0, 1.0)`; a factor of 0.2 varies the delay by
    /// ±20% around the capped exponential value.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn delay_ms(&self, attempt: u32, random: f64) -> u64 {
        let exponential = self.base_delay_ms.saturating_mul(1u64 << attempt.min(31));
        let capped = exponential.min(self.max_delay_ms);

        // Maps random [0,1) to [-jitter, +jitter]
        let jitter = 1.0 + (random * 2.0 - 1.0) * self.jitter_factor;
        let with_jitter = (capped as f64) * jitter;

        with_jitter.round().max(0.0) as u64
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = BackoffConfig::default();
        assert_eq!(config.base_delay_ms, 1000);
        assert_eq!(config.max_delay_ms, 30_000);
        assert!((config.jitter_factor - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn serde_fills_missing_fields() {
        let config: BackoffConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.base_delay_ms, 1000);
        assert_eq!(config.max_delay_ms, 30_000);
    }

    #[test]
    fn exponential_growth_without_jitter() {
        let config = BackoffConfig {
            jitter_factor: 0.0,
            ..BackoffConfig::default()
        };
        assert_eq!(config.delay_ms(0, 0.5), 1000);
        assert_eq!(config.delay_ms(1, 0.5), 2000);
        assert_eq!(config.delay_ms(2, 0.5), 4000);
        assert_eq!(config.delay_ms(3, 0.5), 8000);
    }

    #[test]
    fn caps_at_max_delay() {
        let config = BackoffConfig {
            jitter_factor: 0.0,
            ..BackoffConfig::default()
        };
        assert_eq!(config.delay_ms(10, 0.5), 30_000);
    }

    #[test]
    fn jitter_bounds() {
        let config = BackoffConfig::default();
        // random = 0.0 → 1 - 0.2 = 0.8x
        assert_eq!(config.delay_ms(0, 0.0), 800);
        // random = 0.5 → 1.0x
        assert_eq!(config.delay_ms(0, 0.5), 1000);
        // random = 1.0 → 1.2x
        assert_eq!(config.delay_ms(0, 1.0), 1200);
    }

    #[test]
    fn high_attempt_does_not_overflow() {
        let config = BackoffConfig::default();
        let delay = config.delay_ms(100, 0.9);
        assert!(delay > 0);
        assert!(delay <= 36_000); // 30_000 * 1.2
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn delay_never_exceeds_jittered_cap(attempt in 0u32..64, random in 0.0f64..1.0) {
                let config = BackoffConfig::default();
                let cap = (config.max_delay_ms as f64) * (1.0 + config.jitter_factor);
                prop_assert!(config.delay_ms(attempt, random) as f64 <= cap.ceil());
            }

            #[test]
            fn delay_is_monotonic_in_attempt_without_jitter(attempt in 0u32..30) {
                let config = BackoffConfig { jitter_factor: 0.0, ..BackoffConfig::default() };
                prop_assert!(config.delay_ms(attempt, 0.5) <= config.delay_ms(attempt + 1, 0.5));
            }
        }
    }
}
