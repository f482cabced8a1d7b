//! Message types pushed over the match channel.
//!
//! The JSON shape is fixed: a `"type"` discriminator with snake_case type
//! strings, camelCase fields inside. Renderer-facing clients in other
//! languages depend on these exact strings.

use serde::{Deserialize, Serialize};

use touchline_core::event::MatchEvent;
use touchline_core::ids::{MatchId, TeamId, ViewerId};
use touchline_core::view::MatchStatus;

// ─────────────────────────────────────────────────────────────────────────────
// Snapshot payload
// ─────────────────────────────────────────────────────────────────────────────

/// A full-state snapshot of one match.
///
/// Wire format:
/// ```json
/// { "type": "state_snapshot", "logicalClock": 41, "homeTeamId": "t_h",
///   "awayTeamId": "t_a", "homeScore": 1, "awayScore": 0, "gameTime": 1834,
///   "currentHalf": 2, "status": "live", "possessingTeamId": "t_h" }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    /// Server-assigned ordering clock; the staleness criterion.
    pub logical_clock: u64,
    /// Home side identifier.
    pub home_team_id: TeamId,
    /// Away side identifier.
    pub away_team_id: TeamId,
    /// Home goals.
    pub home_score: u32,
    /// Away goals.
    pub away_score: u32,
    /// Elapsed game time in seconds.
    pub game_time: u64,
    /// Current half (1-based).
    pub current_half: u8,
    /// Match lifecycle status.
    pub status: MatchStatus,
    /// Which side currently has the ball, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub possessing_team_id: Option<TeamId>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Server → client
// ─────────────────────────────────────────────────────────────────────────────

/// Messages the server pushes to a connected viewer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full-state snapshot for the subscribed match.
    StateSnapshot(StateSnapshot),

    /// A discrete match event.
    MatchEvent(MatchEvent),

    /// Terminal message: the match is over. Carries the final snapshot.
    #[serde(rename_all = "camelCase")]
    MatchFinished {
        /// The authoritative final state.
        final_snapshot: StateSnapshot,
    },

    /// The viewer's identity was accepted; the channel is usable.
    #[serde(rename_all = "camelCase")]
    ConnectionAck {
        /// Echo of the authenticated viewer.
        viewer_id: ViewerId,
    },

    /// The subscribe request was accepted.
    #[serde(rename_all = "camelCase")]
    SubscriptionAck {
        /// The match now being streamed.
        match_id: MatchId,
    },

    /// The viewer's identity was rejected. Fatal for the session.
    AuthRejected {
        /// Server-supplied reason.
        reason: String,
    },

    /// The subscribe request was rejected (e.g. unknown match).
    #[serde(rename_all = "camelCase")]
    SubscriptionRejected {
        /// The match that was requested.
        match_id: MatchId,
        /// Server-supplied reason.
        reason: String,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Client → server
// ─────────────────────────────────────────────────────────────────────────────

/// Messages the client sends to the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Present the viewer's identity; must precede any subscribe.
    #[serde(rename_all = "camelCase")]
    Authenticate {
        /// The viewer opening the session.
        viewer_id: ViewerId,
    },

    /// Request the update stream for one match.
    #[serde(rename_all = "camelCase")]
    Subscribe {
        /// The match to stream.
        match_id: MatchId,
    },

    /// Stop streaming the given match.
    #[serde(rename_all = "camelCase")]
    Unsubscribe {
        /// The match to leave.
        match_id: MatchId,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use touchline_core::event::{EventCategory, EventPriority};
    use touchline_core::ids::EventId;

    fn snapshot(clock: u64) -> StateSnapshot {
        StateSnapshot {
            logical_clock: clock,
            home_team_id: TeamId::from("t_home"),
            away_team_id: TeamId::from("t_away"),
            home_score: 1,
            away_score: 0,
            game_time: 1834,
            current_half: 2,
            status: MatchStatus::Live,
            possessing_team_id: Some(TeamId::from("t_home")),
        }
    }

    #[test]
    fn snapshot_type_string() {
        let msg = ServerMessage::StateSnapshot(snapshot(41));
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "state_snapshot");
        assert_eq!(value["logicalClock"], 41);
        assert_eq!(value["possessingTeamId"], "t_home");
    }

    #[test]
    fn match_event_type_string() {
        let msg = ServerMessage::MatchEvent(MatchEvent {
            id: EventId::from("e_1"),
            timestamp: 120,
            description: "Goal!".into(),
            category: EventCategory::Score,
            priority: EventPriority::Critical,
        });
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "match_event");
        assert_eq!(value["priority"], 1);
        assert_eq!(value["category"], "score");
    }

    #[test]
    fn match_finished_carries_final_snapshot() {
        let msg = ServerMessage::MatchFinished {
            final_snapshot: snapshot(99),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "match_finished");
        assert_eq!(value["finalSnapshot"]["logicalClock"], 99);
    }

    #[test]
    fn control_message_type_strings() {
        let ack = ServerMessage::ConnectionAck {
            viewer_id: ViewerId::from("v_1"),
        };
        let value = serde_json::to_value(&ack).unwrap();
        assert_eq!(value["type"], "connection_ack");
        assert_eq!(value["viewerId"], "v_1");

        let ack = ServerMessage::SubscriptionAck {
            match_id: MatchId::from("m_1"),
        };
        let value = serde_json::to_value(&ack).unwrap();
        assert_eq!(value["type"], "subscription_ack");
        assert_eq!(value["matchId"], "m_1");
    }

    #[test]
    fn rejection_type_strings() {
        let msg = ServerMessage::AuthRejected {
            reason: "unknown viewer".into(),
        };
        assert_eq!(serde_json::to_value(&msg).unwrap()["type"], "auth_rejected");

        let msg = ServerMessage::SubscriptionRejected {
            match_id: MatchId::from("m_404"),
            reason: "match not found".into(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "subscription_rejected");
        assert_eq!(value["matchId"], "m_404");
    }

    #[test]
    fn client_message_type_strings() {
        let value =
            serde_json::to_value(ClientMessage::Authenticate { viewer_id: ViewerId::from("v_9") })
                .unwrap();
        assert_eq!(value["type"], "authenticate");
        assert_eq!(value["viewerId"], "v_9");

        let value =
            serde_json::to_value(ClientMessage::Subscribe { match_id: MatchId::from("m_2") })
                .unwrap();
        assert_eq!(value["type"], "subscribe");

        let value =
            serde_json::to_value(ClientMessage::Unsubscribe { match_id: MatchId::from("m_2") })
                .unwrap();
        assert_eq!(value["type"], "unsubscribe");
    }

    #[test]
    fn server_message_roundtrip() {
        let messages = vec![
            ServerMessage::StateSnapshot(snapshot(7)),
            ServerMessage::MatchFinished { final_snapshot: snapshot(8) },
            ServerMessage::SubscriptionAck { match_id: MatchId::from("m") },
        ];
        for msg in messages {
            let json = serde_json::to_string(&msg).unwrap();
            let back: ServerMessage = serde_json::from_str(&json).unwrap();
            assert_eq!(back, msg);
        }
    }

    #[test]
    fn snapshot_without_possession_omits_field() {
        let mut snap = snapshot(1);
        snap.possessing_team_id = None;
        let value = serde_json::to_value(&snap).unwrap();
        assert!(value.get("possessingTeamId").is_none());
        // ...and deserializes back without it.
        let back: StateSnapshot = serde_json::from_value(value).unwrap();
        assert!(back.possessing_team_id.is_none());
    }
}
