//! The playback setting: how fast and how richly the match is rendered.
//!
//! Derived state, never persisted: the client recomputes it from the
//! priority tier of each accepted event ("latest event wins"). Renderers
//! must honor both fields.

use serde::{Deserialize, Serialize};

/// Speed multiplier plus visual-detail flag.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSetting {
    /// Rendering cadence relative to real time (1.0 = real time).
    pub speed_multiplier: f64,
    /// Whether full visual detail is shown (false = fast-forward rendering).
    pub detail_enabled: bool,
}

impl Default for PlaybackSetting {
    /// Full speed and detail, the setting before any event has arrived.
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
            detail_enabled: true,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
