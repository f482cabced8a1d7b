//! # touchline-core
//!
//! Foundation types for the Touchline match-viewing engine.
//!
//! This crate provides the shared vocabulary the wire and client crates
//! depend on:
//!
//! - **Branded IDs**: `MatchId`, `TeamId`, `ViewerId`, `EventId` as newtypes
//! - **Match events**: `MatchEvent` with category and priority tier
//! - **Canonical view**: the single reconciled representation of match state
//! - **Playback setting**: the speed/detail pair derived from event priority
//! - **Errors**: `ConnectionError` / `SubscriptionError` via `thiserror`
//! - **Backoff**: capped exponential delay math for reconnection

#![deny(unsafe_code)]

pub mod errors;
pub mod event;
pub mod ids;
pub mod playback;
pub mod retry;
pub mod view;

pub use errors::{ConnectionError, SubscriptionError};
pub use event::{EventCategory, EventPriority, MatchEvent};
pub use ids::{EventId, MatchId, TeamId, ViewerId};
pub use playback::PlaybackSetting;
pub use retry::BackoffConfig;
pub use view::{CanonicalView, MatchStatus};
