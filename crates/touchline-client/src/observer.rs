//! Observer registration: how the rest of the application hears about
//! session activity.
//!
//! Exactly one observer is live at a time: registering a new one replaces
//! the old (single-slot contract). If true fan-out is ever needed, wrap the
//! session in an explicit publish/subscribe list rather than widening this
//! contract.

use std::sync::Arc;

use parking_lot::RwLock;

use touchline_core::event::MatchEvent;
use touchline_core::playback::PlaybackSetting;
use touchline_core::view::CanonicalView;

use crate::connection::ConnectionStatus;
use crate::errors::SessionError;

/// Callbacks invoked by the session driver task.
///
/// All methods have empty default bodies; implement only what you need.
/// Callbacks run on the driver task. Do not block in them, and do not call
/// back into the session's async operations from within one.
pub trait SessionObserver: Send + Sync {
    /// The canonical view changed (snapshot applied, event appended, or
    /// view reset for a new subscription).
    fn on_view_updated(&self, _view: &CanonicalView) {}

    /// An event was accepted and appended to the log.
    fn on_event_appended(&self, _event: &MatchEvent) {}

    /// The connection state changed (connecting, reconnecting, ...).
    fn on_connection_status_changed(&self, _status: &ConnectionStatus) {}

    /// The playback setting changed after an accepted event.
    fn on_playback_setting_changed(&self, _setting: PlaybackSetting) {}

    /// The match finished; the view is frozen and final.
    fn on_session_ended(&self, _final_view: &CanonicalView) {}

    /// A fatal or actionable failure occurred.
    fn on_error(&self, _error: &SessionError) {}
}

/// Single-slot observer registration shared between the facade and the
/// driver task.
#[derive(Clone, Default)]
pub(crate) struct ObserverSlot {
    inner: Arc<RwLock<Option<Arc<dyn SessionObserver>>>>,
}

impl ObserverSlot {
    /// Replace the registered observer (or clear it with `None`).
    pub fn replace(&self, observer: Option<Arc<dyn SessionObserver>>) {
        *self.inner.write() = observer;
    }

    fn get(&self) -> Option<Arc<dyn SessionObserver>> {
        self.inner.read().clone()
    }

    pub fn view_updated(&self, view: &CanonicalView) {
        if let Some(observer) = self.get() {
            observer.on_view_updated(view);
        }
    }

    pub fn event_appended(&self, event: &MatchEvent) {
        if let Some(observer) = self.get() {
            observer.on_event_appended(event);
        }
    }

    pub fn status_changed(&self, status: &ConnectionStatus) {
        if let Some(observer) = self.get() {
            observer.on_connection_status_changed(status);
        }
    }

    pub fn playback_changed(&self, setting: PlaybackSetting) {
        if let Some(observer) = self.get() {
            observer.on_playback_setting_changed(setting);
        }
    }

    pub fn session_ended(&self, final_view: &CanonicalView) {
        if let Some(observer) = self.get() {
            observer.on_session_ended(final_view);
        }
    }

    pub fn error(&self, error: &SessionError) {
        if let Some(observer) = self.get() {
            observer.on_error(error);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
