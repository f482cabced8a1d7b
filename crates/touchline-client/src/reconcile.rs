//! State reconciliation: merging snapshots and events into the canonical
//! view.
//!
//! The reconciler is the only writer of the [`CanonicalView`]. Snapshots are
//! accepted only when their logical clock advances the view (equal clocks
//! are allowed exactly once after a re-subscribe, for the server's forced
//! refresh); events are deduplicated by id and appended in arrival order.
//! Rejections are silent (an out-of-order snapshot must never roll visible
//! state backward) but counted, and the counters are
//! exposed for diagnostics panels.

use std::collections::HashSet;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use touchline_core::event::{EventCategory, MatchEvent};
use touchline_core::ids::{EventId, MatchId};
use touchline_core::view::{CanonicalView, MatchStatus};
use touchline_wire::StateSnapshot;

/// Counters for dropped inbound data. Steady-state drops under network
/// jitter are expected; these exist for diagnostics, not alerting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    /// Snapshots rejected by the monotonic clock check.
    pub stale_snapshots: u64,
    /// Events dropped because their id was already recorded.
    pub duplicate_events: u64,
    /// Frames that failed to decode.
    pub malformed_messages: u64,
    /// Snapshots or events dropped after the terminal freeze.
    pub dropped_after_freeze: u64,
}

/// Merges inbound snapshots and events into one canonical view.
pub struct Reconciler {
    view: CanonicalView,
    seen_events: HashSet<EventId>,
    frozen: bool,
    refresh_armed: bool,
    stats: SyncStats,
}

impl Reconciler {
    /// A reconciler with an empty, unbound view.
    #[must_use]
    pub fn new() -> Self {
        Self {
            view: CanonicalView::default(),
            seen_events: HashSet::new(),
            frozen: false,
            refresh_armed: false,
            stats: SyncStats::default(),
        }
    }

    /// Discard everything and bind a fresh view to `match_id`.
    ///
    /// Called when a new subscription begins; the old match's state must
    /// not bleed into the new one.
    pub fn reset(&mut self, match_id: MatchId) {
        self.view = CanonicalView::for_match(match_id);
        self.seen_events.clear();
        self.frozen = false;
        self.refresh_armed = false;
        self.stats = SyncStats::default();
    }

    /// Allow the next snapshot to be accepted at an *equal* logical clock.
    ///
    /// Armed after a re-subscribe: the server re-sends the current state as
    /// a forced refresh, whose clock may not have advanced while we were
    /// away. Consumed by the first accepted snapshot.
    pub fn arm_refresh(&mut self) {
        self.refresh_armed = true;
    }

    /// Apply a full-state snapshot. Returns `true` if it was accepted.
    pub fn apply_snapshot(&mut self, snapshot: &StateSnapshot) -> bool {
        if self.frozen {
            self.stats.dropped_after_freeze += 1;
            return false;
        }
        let accepted = snapshot.logical_clock > self.view.logical_clock
            || (self.refresh_armed && snapshot.logical_clock == self.view.logical_clock);
        if !accepted {
            // Expected under jitter; never roll visible state backward.
            debug!(
                snapshot_clock = snapshot.logical_clock,
                view_clock = self.view.logical_clock,
                "dropping stale snapshot"
            );
            self.stats.stale_snapshots += 1;
            return false;
        }
        self.refresh_armed = false;
        self.copy_snapshot_fields(snapshot);
        true
    }

    /// Apply a discrete event. Returns the accepted event, or `None` when
    /// it was a duplicate or arrived after the freeze.
    pub fn apply_event(&mut self, event: MatchEvent) -> Option<MatchEvent> {
        if self.frozen {
            self.stats.dropped_after_freeze += 1;
            return None;
        }
        if !self.seen_events.insert(event.id.clone()) {
            debug!(event_id = %event.id, "dropping duplicate event");
            self.stats.duplicate_events += 1;
            return None;
        }
        if event.category == EventCategory::MatchFinished {
            // Status side effect even without an accompanying snapshot.
            self.view.status = MatchStatus::Finished;
        }
        self.view.events.push(event.clone());
        self.view.last_updated_at = Some(Utc::now());
        Some(event)
    }

    /// Terminal handling: apply the final snapshot and freeze the view.
    ///
    /// After this, no snapshot or event is accepted regardless of clock
    /// value. The final snapshot itself still honors monotonicity: a stale
    /// final snapshot freezes the view without rolling fields back.
    pub fn finish(&mut self, final_snapshot: &StateSnapshot) {
        if !self.frozen && final_snapshot.logical_clock >= self.view.logical_clock {
            self.copy_snapshot_fields(final_snapshot);
        }
        self.view.status = MatchStatus::Finished;
        self.view.last_updated_at = Some(Utc::now());
        self.frozen = true;
        info!(match_id = ?self.view.match_id, "match finished; view frozen");
    }

    /// Count a frame that failed to decode.
    pub fn note_malformed(&mut self) {
        self.stats.malformed_messages += 1;
    }

    /// The canonical view (read-only).
    #[must_use]
    pub fn view(&self) -> &CanonicalView {
        &self.view
    }

    /// Whether the terminal freeze is in effect.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Drop counters.
    #[must_use]
    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    fn copy_snapshot_fields(&mut self, snapshot: &StateSnapshot) {
        self.view.home_team_id = Some(snapshot.home_team_id.clone());
        self.view.away_team_id = Some(snapshot.away_team_id.clone());
        self.view.home_score = snapshot.home_score;
        self.view.away_score = snapshot.away_score;
        self.view.game_time = snapshot.game_time;
        self.view.current_half = snapshot.current_half;
        self.view.status = snapshot.status;
        self.view.possessing_team_id = snapshot.possessing_team_id.clone();
        self.view.logical_clock = snapshot.logical_clock;
        self.view.last_updated_at = Some(Utc::now());
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use touchline_core::event::EventPriority;
    use touchline_core::ids::TeamId;

    fn snapshot(clock: u64, home_score: u32) -> StateSnapshot {
        StateSnapshot {
            logical_clock: clock,
            home_team_id: TeamId::from("t_home"),
            away_team_id: TeamId::from("t_away"),
            home_score,
            away_score: 0,
            game_time: clock * 10,
            current_half: 1,
            status: MatchStatus::Live,
            possessing_team_id: None,
        }
    }

    fn event(id: &str, priority: EventPriority) -> MatchEvent {
        MatchEvent {
            id: EventId::from(id),
            timestamp: 60,
            description: "event".into(),
            category: EventCategory::RoutinePlay,
            priority,
        }
    }

    fn joined() -> Reconciler {
        let mut reconciler = Reconciler::new();
        reconciler.reset(MatchId::from("m_1"));
        reconciler
    }

    #[test]
    fn snapshot_advances_clock_and_fields() {
        let mut reconciler = joined();
        assert!(reconciler.apply_snapshot(&snapshot(5, 1)));
        assert_eq!(reconciler.view().logical_clock, 5);
        assert_eq!(reconciler.view().home_score, 1);
        assert_eq!(reconciler.view().status, MatchStatus::Live);
        assert!(reconciler.view().last_updated_at.is_some());
    }

    #[test]
    fn stale_snapshot_is_dropped_silently() {
        // Clocks [5, 3, 7]: the 3 never appears on screen.
        let mut reconciler = joined();
        assert!(reconciler.apply_snapshot(&snapshot(5, 1)));
        assert!(!reconciler.apply_snapshot(&snapshot(3, 9)));
        assert_eq!(reconciler.view().home_score, 1);
        assert!(reconciler.apply_snapshot(&snapshot(7, 2)));
        assert_eq!(reconciler.view().logical_clock, 7);
        assert_eq!(reconciler.view().home_score, 2);
        assert_eq!(reconciler.stats().stale_snapshots, 1);
    }

    #[test]
    fn equal_clock_rejected_in_steady_state() {
        let mut reconciler = joined();
        assert!(reconciler.apply_snapshot(&snapshot(5, 1)));
        assert!(!reconciler.apply_snapshot(&snapshot(5, 9)));
        assert_eq!(reconciler.view().home_score, 1);
    }

    #[test]
    fn armed_refresh_accepts_equal_clock_once() {
        let mut reconciler = joined();
        assert!(reconciler.apply_snapshot(&snapshot(5, 1)));
        reconciler.arm_refresh();
        assert!(reconciler.apply_snapshot(&snapshot(5, 2)));
        assert_eq!(reconciler.view().home_score, 2);
        // Consumed: a second equal-clock snapshot is stale again.
        assert!(!reconciler.apply_snapshot(&snapshot(5, 3)));
    }

    #[test]
    fn armed_refresh_never_accepts_lower_clock() {
        let mut reconciler = joined();
        assert!(reconciler.apply_snapshot(&snapshot(5, 1)));
        reconciler.arm_refresh();
        assert!(!reconciler.apply_snapshot(&snapshot(4, 9)));
        // Still armed for the equal-or-newer refresh.
        assert!(reconciler.apply_snapshot(&snapshot(5, 2)));
    }

    #[test]
    fn duplicate_event_is_idempotent() {
        // Same id twice: one log entry, second drop counted.
        let mut reconciler = joined();
        assert!(reconciler.apply_event(event("e1", EventPriority::Routine)).is_some());
        assert!(reconciler.apply_event(event("e1", EventPriority::Critical)).is_none());
        assert_eq!(reconciler.view().events.len(), 1);
        assert_eq!(reconciler.view().events[0].priority, EventPriority::Routine);
        assert_eq!(reconciler.stats().duplicate_events, 1);
    }

    #[test]
    fn events_keep_arrival_order() {
        let mut reconciler = joined();
        let _ = reconciler.apply_event(event("e2", EventPriority::Routine));
        let _ = reconciler.apply_event(event("e1", EventPriority::Routine));
        let ids: Vec<&str> = reconciler.view().events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e2", "e1"]);
    }

    #[test]
    fn finished_category_flips_status() {
        let mut reconciler = joined();
        let mut evt = event("e_end", EventPriority::Important);
        evt.category = EventCategory::MatchFinished;
        assert!(reconciler.apply_event(evt).is_some());
        assert_eq!(reconciler.view().status, MatchStatus::Finished);
        // Not frozen by the event alone.
        assert!(!reconciler.is_frozen());
    }

    #[test]
    fn finish_freezes_against_everything() {
        let mut reconciler = joined();
        assert!(reconciler.apply_snapshot(&snapshot(5, 1)));
        reconciler.finish(&snapshot(6, 2));

        assert!(reconciler.is_frozen());
        assert_eq!(reconciler.view().status, MatchStatus::Finished);
        assert_eq!(reconciler.view().home_score, 2);

        // Higher clock, new event id: both still rejected.
        assert!(!reconciler.apply_snapshot(&snapshot(100, 9)));
        assert!(reconciler.apply_event(event("late", EventPriority::Critical)).is_none());
        assert_eq!(reconciler.view().home_score, 2);
        assert_eq!(reconciler.view().events.len(), 0);
        assert_eq!(reconciler.stats().dropped_after_freeze, 2);
    }

    #[test]
    fn stale_final_snapshot_freezes_without_rollback() {
        let mut reconciler = joined();
        assert!(reconciler.apply_snapshot(&snapshot(10, 3)));
        reconciler.finish(&snapshot(4, 0));
        assert!(reconciler.is_frozen());
        assert_eq!(reconciler.view().home_score, 3);
        assert_eq!(reconciler.view().status, MatchStatus::Finished);
    }

    #[test]
    fn reset_clears_state_and_dedup_memory() {
        let mut reconciler = joined();
        let _ = reconciler.apply_snapshot(&snapshot(5, 1));
        let _ = reconciler.apply_event(event("e1", EventPriority::Routine));
        reconciler.finish(&snapshot(6, 1));

        reconciler.reset(MatchId::from("m_2"));
        assert_eq!(reconciler.view().match_id.as_deref(), Some("m_2"));
        assert_eq!(reconciler.view().logical_clock, 0);
        assert!(reconciler.view().events.is_empty());
        assert!(!reconciler.is_frozen());
        // "e1" is acceptable again in the new subscription.
        assert!(reconciler.apply_event(event("e1", EventPriority::Routine)).is_some());
    }

    #[test]
    fn malformed_counter() {
        let mut reconciler = joined();
        reconciler.note_malformed();
        reconciler.note_malformed();
        assert_eq!(reconciler.stats().malformed_messages, 2);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// After any clock sequence, the view's clock equals the running
            /// max and the visible fields come from an accepted snapshot.
            #[test]
            fn clock_is_running_max(clocks in proptest::collection::vec(0u64..50, 1..40)) {
                let mut reconciler = joined();
                let mut max_seen = 0u64;
                for (i, &clock) in clocks.iter().enumerate() {
                    #[allow(clippy::cast_possible_truncation)]
                    let accepted = reconciler.apply_snapshot(&snapshot(clock, i as u32));
                    prop_assert_eq!(accepted, clock > max_seen);
                    max_seen = max_seen.max(clock);
                    prop_assert_eq!(reconciler.view().logical_clock, max_seen);
                }
            }

            /// Scores never decrease when the server's scores are
            /// non-decreasing in its own clock order, whatever the arrival
            /// order.
            #[test]
            fn visible_score_never_regresses(clocks in proptest::collection::vec(1u64..30, 1..30)) {
                let mut reconciler = joined();
                let mut last_score = 0;
                for &clock in &clocks {
                    // Server invariant: score grows with the logical clock.
                    #[allow(clippy::cast_possible_truncation)]
                    let _ = reconciler.apply_snapshot(&snapshot(clock, clock as u32));
                    let score = reconciler.view().home_score;
                    prop_assert!(score >= last_score);
                    last_score = score;
                }
            }
        }
    }
}
