//! The canonical view: the single reconciled representation of match state.
//!
//! All renderers read from a [`CanonicalView`]; only the client crate's
//! reconciler mutates one. The monotonicity invariant (no snapshot with an
//! equal-or-lower logical clock is ever applied after a newer one) is
//! enforced by the reconciler, not here; this module is plain data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::MatchEvent;
use crate::ids::{MatchId, TeamId};

/// Lifecycle status of a match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Not yet kicked off.
    #[default]
    Scheduled,
    /// In progress.
    Live,
    /// Over; the view is final.
    Finished,
}

/// What the viewer currently sees.
///
/// Team identifiers and possession are `None` until the first snapshot for
/// the subscribed match arrives. The event log holds accepted events in
/// arrival order, which is not necessarily chronological match order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalView {
    /// The subscribed match, set when a subscription begins.
    pub match_id: Option<MatchId>,
    /// Home side identifier.
    pub home_team_id: Option<TeamId>,
    /// Away side identifier.
    pub away_team_id: Option<TeamId>,
    /// Home goals.
    pub home_score: u32,
    /// Away goals.
    pub away_score: u32,
    /// Elapsed game time in seconds.
    pub game_time: u64,
    /// Current half (1-based).
    pub current_half: u8,
    /// Which side currently has the ball, if known.
    pub possessing_team_id: Option<TeamId>,
    /// Match lifecycle status.
    pub status: MatchStatus,
    /// Logical clock of the most recently applied snapshot.
    pub logical_clock: u64,
    /// Wall-clock instant the view last changed.
    pub last_updated_at: Option<DateTime<Utc>>,
    /// Accepted events in arrival order.
    pub events: Vec<MatchEvent>,
}

impl CanonicalView {
    /// An empty view bound to a match, as created when a subscription begins.
    #[must_use]
    pub fn for_match(match_id: MatchId) -> Self {
        Self {
            match_id: Some(match_id),
            current_half: 1,
            ..Self::default()
        }
    }

    /// The most recently accepted event, if any.
    #[must_use]
    pub fn latest_event(&self) -> Option<&MatchEvent> {
        self.events.last()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
