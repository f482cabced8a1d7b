//! The session facade: the one object the rest of the application talks to.
//!
//! [`MatchSession`] spawns a driver task that owns the connection manager,
//! the reconciler and the playback controller, and wires them in a fixed
//! order for every inbound message: reconcile, recompute playback, publish
//! the read snapshots, then fire observer callbacks. By the time
//! `on_view_updated` runs, the playback setting for the same message is
//! already readable.
//!
//! All mutation is serialized on the driver task; the facade's getters read
//! lock-protected snapshots and never block on the network.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use touchline_core::errors::{ConnectionError, SubscriptionError};
use touchline_core::ids::{MatchId, ViewerId};
use touchline_core::playback::PlaybackSetting;
use touchline_core::view::CanonicalView;
use touchline_wire::{ServerMessage, decode_server};

use crate::config::ViewerConfig;
use crate::connection::{Command, ConnectionManager, ConnectionState, Inbound, RejoinOutcome};
use crate::errors::SessionError;
use crate::observer::{ObserverSlot, SessionObserver};
use crate::playback::PlaybackController;
use crate::reconcile::{Reconciler, SyncStats};
use crate::transport::Connector;

// ─────────────────────────────────────────────────────────────────────────────
// Facade
// ─────────────────────────────────────────────────────────────────────────────

/// One viewing session against one match server.
///
/// Explicitly owned: construct one per viewing context and pass it by
/// reference to whatever collaborator needs it. Dropping the session shuts
/// the driver task down and releases the channel.
pub struct MatchSession {
    cmd_tx: mpsc::Sender<Command>,
    view: Arc<RwLock<CanonicalView>>,
    playback: Arc<RwLock<PlaybackSetting>>,
    stats: Arc<RwLock<SyncStats>>,
    state: Arc<RwLock<ConnectionState>>,
    observers: ObserverSlot,
    _driver: JoinHandle<()>,
}

impl MatchSession {
    /// Build a session and spawn its driver task.
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn new(config: ViewerConfig, connector: impl Connector + 'static) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (msg_tx, msg_rx) = mpsc::channel(config.inbound_buffer.max(1));

        let view = Arc::new(RwLock::new(CanonicalView::default()));
        let playback = Arc::new(RwLock::new(PlaybackSetting::default()));
        let stats = Arc::new(RwLock::new(SyncStats::default()));
        let state = Arc::new(RwLock::new(ConnectionState::Disconnected));
        let observers = ObserverSlot::default();

        let manager = ConnectionManager::new(
            config,
            Box::new(connector),
            msg_tx,
            state.clone(),
            observers.clone(),
        );
        let driver = Driver {
            manager,
            reconciler: Reconciler::new(),
            controller: PlaybackController::default(),
            view: view.clone(),
            playback: playback.clone(),
            stats: stats.clone(),
            observers: observers.clone(),
        };
        let handle = tokio::spawn(driver.run(cmd_rx, msg_rx));

        Self { cmd_tx, view, playback, stats, state, observers, _driver: handle }
    }

    /// Establish the channel and authenticate `viewer_id`.
    ///
    /// Idempotent: calling while already connected is a no-op.
    pub async fn connect(&self, viewer_id: ViewerId) -> Result<(), ConnectionError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Connect { viewer_id, reply })
            .await
            .map_err(|_| ConnectionError::SessionClosed)?;
        rx.await.map_err(|_| ConnectionError::SessionClosed)?
    }

    /// Subscribe to `match_id`, implicitly leaving any previous match and
    /// resetting the canonical view.
    pub async fn join_match(&self, match_id: MatchId) -> Result<(), SubscriptionError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Join { match_id, reply })
            .await
            .map_err(|_| SubscriptionError::SessionClosed)?;
        rx.await.map_err(|_| SubscriptionError::SessionClosed)?
    }

    /// Unsubscribe from the current match. Safe to call when not joined.
    pub async fn leave_match(&self) {
        let (reply, rx) = oneshot::channel();
        if self.cmd_tx.send(Command::Leave { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }

    /// Tear the channel down entirely, canceling any pending reconnect.
    pub async fn disconnect(&self) {
        let (reply, rx) = oneshot::channel();
        if self.cmd_tx.send(Command::Disconnect { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }

    /// Register the observer, replacing any previous registration.
    pub fn register_observer(&self, observer: impl SessionObserver + 'static) {
        self.observers.replace(Some(Arc::new(observer)));
    }

    /// The latest reconciled view.
    #[must_use]
    pub fn current_view(&self) -> CanonicalView {
        self.view.read().clone()
    }

    /// The playback setting derived from the most recently accepted event.
    #[must_use]
    pub fn current_playback_setting(&self) -> PlaybackSetting {
        *self.playback.read()
    }

    /// Current connection lifecycle state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Drop counters for diagnostics panels.
    #[must_use]
    pub fn sync_stats(&self) -> SyncStats {
        *self.stats.read()
    }
}

impl Drop for MatchSession {
    fn drop(&mut self) {
        // Best effort; the driver also exits when the command channel
        // closes.
        let _ = self.cmd_tx.try_send(Command::Shutdown);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Driver
// ─────────────────────────────────────────────────────────────────────────────

enum Step {
    Continue,
    Exit,
}

struct Driver {
    manager: ConnectionManager,
    reconciler: Reconciler,
    controller: PlaybackController,
    view: Arc<RwLock<CanonicalView>>,
    playback: Arc<RwLock<PlaybackSetting>>,
    stats: Arc<RwLock<SyncStats>>,
    observers: ObserverSlot,
}

impl Driver {
    #[instrument(skip_all, name = "session_driver")]
    async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<Command>,
        mut msg_rx: mpsc::Receiver<Inbound>,
    ) {
        debug!("session driver started");
        loop {
            enum Wake {
                Cmd(Option<Command>),
                Msg(Option<Inbound>),
            }
            let wake = tokio::select! {
                cmd = cmd_rx.recv() => Wake::Cmd(cmd),
                msg = msg_rx.recv() => Wake::Msg(msg),
            };
            let step = match wake {
                Wake::Cmd(None) => {
                    self.manager.disconnect().await;
                    Step::Exit
                }
                Wake::Cmd(Some(cmd)) => {
                    self.handle_command(cmd, &mut cmd_rx, &mut msg_rx).await
                }
                Wake::Msg(None) => Step::Exit,
                Wake::Msg(Some(inbound)) => {
                    self.handle_inbound(inbound, &mut cmd_rx, &mut msg_rx).await
                }
            };
            if matches!(step, Step::Exit) {
                debug!("session driver exiting");
                return;
            }
        }
    }

    async fn handle_command(
        &mut self,
        cmd: Command,
        cmd_rx: &mut mpsc::Receiver<Command>,
        msg_rx: &mut mpsc::Receiver<Inbound>,
    ) -> Step {
        match cmd {
            Command::Connect { viewer_id, reply } => {
                let result = self.manager.connect(viewer_id, msg_rx).await;
                if let Err(e) = &result {
                    self.observers.error(&SessionError::Connection(e.clone()));
                }
                let _ = reply.send(result);
            }
            Command::Join { match_id, reply } => {
                if self.manager.state() == ConnectionState::Connected {
                    self.begin_subscription(&match_id);
                    let result = self.manager.join(match_id, msg_rx).await;
                    if let Err(e) = &result {
                        self.observers.error(&SessionError::Subscription(e.clone()));
                    }
                    let _ = reply.send(result);
                } else {
                    let _ = reply.send(Err(SubscriptionError::NotConnected));
                }
            }
            Command::Leave { reply } => {
                self.manager.leave().await;
                let _ = reply.send(());
            }
            Command::Disconnect { reply } => {
                self.manager.disconnect().await;
                let _ = reply.send(());
            }
            Command::Shutdown => {
                self.manager.disconnect().await;
                return Step::Exit;
            }
        }
        self.drain_deferred().await;
        self.maybe_rejoin(cmd_rx, msg_rx).await
    }

    async fn handle_inbound(
        &mut self,
        inbound: Inbound,
        cmd_rx: &mut mpsc::Receiver<Command>,
        msg_rx: &mut mpsc::Receiver<Inbound>,
    ) -> Step {
        match inbound {
            Inbound::Frame { generation, text } if generation == self.manager.generation() => {
                self.process_frame(&text).await;
                Step::Continue
            }
            Inbound::Lost { generation, reason } if generation == self.manager.generation() => {
                self.manager.note_loss(&reason).await;
                self.maybe_rejoin(cmd_rx, msg_rx).await
            }
            _ => {
                debug!("discarding frame from a stale channel generation");
                Step::Continue
            }
        }
    }

    async fn maybe_rejoin(
        &mut self,
        cmd_rx: &mut mpsc::Receiver<Command>,
        msg_rx: &mut mpsc::Receiver<Inbound>,
    ) -> Step {
        if !self.manager.take_needs_rejoin() {
            return Step::Continue;
        }
        match self.manager.rejoin(msg_rx, cmd_rx).await {
            RejoinOutcome::Reconnected { resubscribed, rejection } => {
                if resubscribed {
                    // The server re-sends current state as a forced refresh
                    // whose clock may not have advanced.
                    self.reconciler.arm_refresh();
                }
                if let Some(e) = rejection {
                    self.observers.error(&SessionError::Subscription(e));
                }
                self.drain_deferred().await;
                Step::Continue
            }
            RejoinOutcome::AuthFatal(e) => {
                self.observers.error(&SessionError::Connection(e));
                Step::Continue
            }
            RejoinOutcome::Disconnected => Step::Continue,
            RejoinOutcome::Shutdown => Step::Exit,
        }
    }

    /// Fixed per-message order: reconcile → recompute playback → publish
    /// snapshots → callbacks, with `on_view_updated` last.
    async fn process_frame(&mut self, text: &str) {
        match decode_server(text) {
            Err(e) => {
                warn!(error = %e, "dropping malformed message");
                self.reconciler.note_malformed();
                self.publish_stats();
            }
            Ok(ServerMessage::StateSnapshot(snapshot)) => {
                if self.reconciler.apply_snapshot(&snapshot) {
                    self.publish_view();
                    self.observers.view_updated(self.reconciler.view());
                }
                self.publish_stats();
            }
            Ok(ServerMessage::MatchEvent(event)) => {
                if let Some(accepted) = self.reconciler.apply_event(event) {
                    let changed = self.controller.on_event_accepted(accepted.priority);
                    self.publish_view();
                    *self.playback.write() = self.controller.current();
                    self.observers.event_appended(&accepted);
                    if let Some(setting) = changed {
                        self.observers.playback_changed(setting);
                    }
                    self.observers.view_updated(self.reconciler.view());
                }
                self.publish_stats();
            }
            Ok(ServerMessage::MatchFinished { final_snapshot }) => {
                self.reconciler.finish(&final_snapshot);
                self.manager.clear_active_match();
                self.publish_view();
                self.publish_stats();
                self.observers.view_updated(self.reconciler.view());
                self.observers.session_ended(self.reconciler.view());
            }
            Ok(ServerMessage::ConnectionAck { .. } | ServerMessage::SubscriptionAck { .. }) => {
                debug!("ignoring ack outside a handshake");
            }
            Ok(ServerMessage::AuthRejected { reason }) => {
                let error = ConnectionError::AuthRejected(reason);
                warn!(error = %error, "authentication revoked by server");
                self.manager.disconnect().await;
                self.observers.error(&SessionError::Connection(error));
            }
            Ok(ServerMessage::SubscriptionRejected { match_id, reason }) => {
                self.manager.clear_active_match();
                self.observers.error(&SessionError::Subscription(SubscriptionError::Rejected {
                    match_id,
                    reason,
                }));
            }
        }
    }

    /// Reset both inner components for a fresh subscription.
    fn begin_subscription(&mut self, match_id: &MatchId) {
        self.reconciler.reset(match_id.clone());
        self.controller.reset();
        let previous = {
            let mut playback = self.playback.write();
            let previous = *playback;
            *playback = self.controller.current();
            previous
        };
        self.publish_view();
        self.publish_stats();
        self.observers.view_updated(self.reconciler.view());
        if previous != self.controller.current() {
            self.observers.playback_changed(self.controller.current());
        }
    }

    async fn drain_deferred(&mut self) {
        for text in self.manager.take_deferred() {
            self.process_frame(&text).await;
        }
    }

    fn publish_view(&self) {
        *self.view.write() = self.reconciler.view().clone();
    }

    fn publish_stats(&self) {
        *self.stats.write() = self.reconciler.stats();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
