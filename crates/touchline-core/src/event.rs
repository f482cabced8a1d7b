//! Match events and their priority tiers.
//!
//! A [`MatchEvent`] is an immutable record produced by the match server and
//! appended to the canonical view's event log in arrival order. The
//! [`EventPriority`] tier is what drives playback pacing; the
//! [`EventCategory`] is what renderers use to pick an icon and what lets a
//! discrete event carry a status side effect (`match_finished`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::EventId;

// ─────────────────────────────────────────────────────────────────────────────
// Category
// ─────────────────────────────────────────────────────────────────────────────

/// Category tag attached to every match event.
///
/// Serializes to a snake_case string matching the wire format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// A scoring play.
    Score,
    /// A booking (yellow or red card).
    Card,
    /// A player substitution.
    Substitution,
    /// Kick-off, half-time, full-time and similar structural boundaries.
    PeriodBoundary,
    /// Ordinary play with no lasting consequence.
    RoutinePlay,
    /// The match has ended; flips the canonical view's status.
    MatchFinished,
}

/// All category variants, for exhaustive testing.
pub const ALL_CATEGORIES: &[EventCategory] = &[
    EventCategory::Score,
    EventCategory::Card,
    EventCategory::Substitution,
    EventCategory::PeriodBoundary,
    EventCategory::RoutinePlay,
    EventCategory::MatchFinished,
];

// ─────────────────────────────────────────────────────────────────────────────
// Priority
// ─────────────────────────────────────────────────────────────────────────────

/// Ordered importance tier of a match event.
///
/// Encoded on the wire as the integer tier (1 = most important). An unknown
/// tier fails deserialization, which the client treats as a malformed
/// message: dropped, never a crash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EventPriority {
    /// Tier 1, e.g. a scoring play. Rendered at full speed and detail.
    Critical,
    /// Tier 2, e.g. a period boundary. Rendered at double speed.
    Important,
    /// Tier 3, routine play. Fast-forwarded without detail.
    Routine,
}

/// All priority tiers, for exhaustive testing.
pub const ALL_PRIORITIES: &[EventPriority] = &[
    EventPriority::Critical,
    EventPriority::Important,
    EventPriority::Routine,
];

/// A priority integer outside the known tiers.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("unknown priority tier: {0}")]
pub struct UnknownPriority(pub u8);

impl EventPriority {
    /// The wire integer for this tier.
    #[must_use]
    pub fn tier(self) -> u8 {
        match self {
            Self::Critical => 1,
            Self::Important => 2,
            Self::Routine => 3,
        }
    }
}

impl TryFrom<u8> for EventPriority {
    type Error = UnknownPriority;

    fn try_from(tier: u8) -> Result<Self, Self::Error> {
        match tier {
            1 => Ok(Self::Critical),
            2 => Ok(Self::Important),
            3 => Ok(Self::Routine),
            other => Err(UnknownPriority(other)),
        }
    }
}

impl From<EventPriority> for u8 {
    fn from(priority: EventPriority) -> Self {
        priority.tier()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Event
// ─────────────────────────────────────────────────────────────────────────────

/// An immutable match event.
///
/// Wire format (camelCase, inside a `match_event` message):
/// ```json
/// { "id": "e_17", "timestamp": 1834, "description": "Goal! ...",
///   "category": "score", "priority": 1 }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEvent {
    /// Server-assigned event identifier; the dedup key.
    pub id: EventId,
    /// Logical timestamp within the match, in seconds of game time.
    pub timestamp: u64,
    /// Human-readable description for the event feed.
    pub description: String,
    /// Category tag.
    pub category: EventCategory,
    /// Importance tier driving playback pacing.
    pub priority: EventPriority,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, priority: EventPriority) -> MatchEvent {
        MatchEvent {
            id: EventId::from(id),
            timestamp: 90,
            description: "test event".into(),
            category: EventCategory::RoutinePlay,
            priority,
        }
    }

    #[test]
    fn priority_wire_integers() {
        assert_eq!(EventPriority::Critical.tier(), 1);
        assert_eq!(EventPriority::Important.tier(), 2);
        assert_eq!(EventPriority::Routine.tier(), 3);
    }

    #[test]
    fn priority_roundtrip_all_tiers() {
        for &priority in ALL_PRIORITIES {
            let back = EventPriority::try_from(priority.tier()).unwrap();
            assert_eq!(back, priority);
        }
    }

    #[test]
    fn priority_serializes_as_integer() {
        let json = serde_json::to_string(&EventPriority::Important).unwrap();
        assert_eq!(json, "2");
    }

    #[test]
    fn unknown_tier_is_rejected() {
        assert_eq!(EventPriority::try_from(0), Err(UnknownPriority(0)));
        assert_eq!(EventPriority::try_from(4), Err(UnknownPriority(4)));
        assert!(serde_json::from_str::<EventPriority>("9").is_err());
    }

    #[test]
    fn priority_ordering_follows_tiers() {
        assert!(EventPriority::Critical < EventPriority::Important);
        assert!(EventPriority::Important < EventPriority::Routine);
    }

    #[test]
    fn category_snake_case_strings() {
        let json = serde_json::to_string(&EventCategory::PeriodBoundary).unwrap();
        assert_eq!(json, "\"period_boundary\"");
        let json = serde_json::to_string(&EventCategory::MatchFinished).unwrap();
        assert_eq!(json, "\"match_finished\"");
    }

    #[test]
    fn all_categories_roundtrip() {
        for &category in ALL_CATEGORIES {
            let json = serde_json::to_string(&category).unwrap();
            let back: EventCategory = serde_json::from_str(&json).unwrap();
            assert_eq!(back, category);
        }
    }

    #[test]
    fn event_serde_roundtrip() {
        let evt = event("e_1", EventPriority::Critical);
        let json = serde_json::to_string(&evt).unwrap();
        let back: MatchEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, evt);
    }

    #[test]
    fn event_wire_field_names_are_camel_case() {
        let evt = event("e_2", EventPriority::Routine);
        let value = serde_json::to_value(&evt).unwrap();
        assert_eq!(value["id"], "e_2");
        assert_eq!(value["timestamp"], 90);
        assert_eq!(value["category"], "routine_play");
        assert_eq!(value["priority"], 3);
    }
}
