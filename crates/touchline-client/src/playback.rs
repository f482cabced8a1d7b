//! Priority-driven playback control.
//!
//! A pure mapping from priority tier to playback setting plus one memory
//! cell holding the last result. The latest accepted event always wins:
//! there is no smoothing, queueing or hysteresis, so a burst of alternating
//! routine/critical events produces visible speed flicker. That is the
//! current product behavior; do not debounce here without a product
//! decision.

use touchline_core::event::EventPriority;
use touchline_core::playback::PlaybackSetting;

/// The playback setting mandated by a priority tier.
///
/// Total over all tiers:
/// - critical → 1x, full detail
/// - important → 2x, full detail
/// - routine → 4x, fast-forward (no detail)
#[must_use]
pub fn setting_for(priority: EventPriority) -> PlaybackSetting {
    match priority {
        EventPriority::Critical => PlaybackSetting { speed_multiplier: 1.0, detail_enabled: true },
        EventPriority::Important => PlaybackSetting { speed_multiplier: 2.0, detail_enabled: true },
        EventPriority::Routine => PlaybackSetting { speed_multiplier: 4.0, detail_enabled: false },
    }
}

/// Holds the setting derived from the most recently accepted event.
#[derive(Debug, Default)]
pub struct PlaybackController {
    current: PlaybackSetting,
}

impl PlaybackController {
    /// Recompute from an accepted event's priority.
    ///
    /// Returns the new setting when it differs from the previous one.
    pub fn on_event_accepted(&mut self, priority: EventPriority) -> Option<PlaybackSetting> {
        let next = setting_for(priority);
        if next == self.current {
            None
        } else {
            self.current = next;
            Some(next)
        }
    }

    /// The last computed setting; `{1.0, true}` before any event arrived.
    #[must_use]
    pub fn current(&self) -> PlaybackSetting {
        self.current
    }

    /// Back to the default, for a fresh subscription.
    pub fn reset(&mut self) {
        self.current = PlaybackSetting::default();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
