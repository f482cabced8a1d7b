//! Connection lifecycle: dial, authenticate, subscribe, reconnect.
//!
//! One persistent channel per viewing session. The manager owns the channel
//! halves and the [`ConnectionState`] machine
//! (`Disconnected → Connecting → Connected → Rejoining → Connected`); the
//! re-subscribe action is attached to the `Rejoining → Connected` edge so
//! the coupling between reconnect and re-subscribe is visible in code.
//!
//! The manager never touches the canonical view. Inbound frames are handed
//! to the session driver through the [`Inbound`] channel; frames that
//! arrive while the manager is waiting for a control ack are deferred and
//! drained by the driver afterwards, preserving arrival order.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

use touchline_core::errors::{ConnectionError, SubscriptionError};
use touchline_core::ids::{MatchId, ViewerId};
use touchline_wire::{ClientMessage, ServerMessage, decode_server, encode_client};

use crate::config::ViewerConfig;
use crate::observer::ObserverSlot;
use crate::transport::{Connector, FrameSink, FrameStream};

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

/// Connection lifecycle state. Transitions are the only driver of whether
/// inbound messages are accepted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No channel.
    #[default]
    Disconnected,
    /// Dial + authentication in progress.
    Connecting,
    /// Channel up and authenticated.
    Connected,
    /// Channel lost unexpectedly; reconnecting with backoff.
    Rejoining,
}

/// Status payload delivered to the observer on every transition and on
/// every failed reconnect attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    /// Current lifecycle state.
    pub state: ConnectionState,
    /// 1-based attempt counter while rejoining; 0 otherwise.
    pub reconnect_attempts: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Driver-facing plumbing
// ─────────────────────────────────────────────────────────────────────────────

/// What the reader task forwards to the session driver.
///
/// Frames carry the channel generation they were read from so anything
/// still in flight from a torn-down channel is discarded.
#[derive(Debug)]
pub(crate) enum Inbound {
    /// A text frame from the server.
    Frame {
        /// Channel generation the frame belongs to.
        generation: u64,
        /// Raw frame text.
        text: String,
    },
    /// The channel ended (orderly or not).
    Lost {
        /// Channel generation that was lost.
        generation: u64,
        /// Human-readable cause.
        reason: String,
    },
}

/// Commands from the session facade to the driver task.
pub(crate) enum Command {
    /// Establish and authenticate the channel.
    Connect {
        viewer_id: ViewerId,
        reply: oneshot::Sender<Result<(), ConnectionError>>,
    },
    /// Subscribe to a match's update stream.
    Join {
        match_id: MatchId,
        reply: oneshot::Sender<Result<(), SubscriptionError>>,
    },
    /// Unsubscribe from the current match, if any.
    Leave { reply: oneshot::Sender<()> },
    /// Tear the channel down entirely.
    Disconnect { reply: oneshot::Sender<()> },
    /// The session facade was dropped; exit the driver.
    Shutdown,
}

/// How a reconnect episode ended.
#[derive(Debug)]
pub(crate) enum RejoinOutcome {
    /// Channel re-established (and re-subscribed when a match was active).
    Reconnected {
        /// Whether the previous match subscription was restored.
        resubscribed: bool,
        /// Set when the server refused to restore the subscription.
        rejection: Option<SubscriptionError>,
    },
    /// Authentication was rejected while reconnecting. Fatal.
    AuthFatal(ConnectionError),
    /// A disconnect command interrupted the reconnect.
    Disconnected,
    /// The session is shutting down.
    Shutdown,
}

enum SubAck {
    Acked,
    Rejected(String),
    TimedOut,
    Lost,
}

fn spawn_reader(
    mut stream: Box<dyn FrameStream>,
    generation: u64,
    tx: mpsc::Sender<Inbound>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match stream.next().await {
                Some(Ok(text)) => {
                    if tx.send(Inbound::Frame { generation, text }).await.is_err() {
                        break;
                    }
                }
                Some(Err(e)) => {
                    let _ = tx.send(Inbound::Lost { generation, reason: e.to_string() }).await;
                    break;
                }
                None => {
                    let _ = tx
                        .send(Inbound::Lost { generation, reason: "channel closed".into() })
                        .await;
                    break;
                }
            }
        }
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Manager
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the channel to the match server and its lifecycle.
pub(crate) struct ConnectionManager {
    config: ViewerConfig,
    connector: Box<dyn Connector>,
    msg_tx: mpsc::Sender<Inbound>,
    state: Arc<RwLock<ConnectionState>>,
    observers: ObserverSlot,
    sink: Option<Box<dyn FrameSink>>,
    reader: Option<JoinHandle<()>>,
    generation: u64,
    viewer_id: Option<ViewerId>,
    active_match: Option<MatchId>,
    reconnect_attempts: u32,
    needs_rejoin: bool,
    deferred: VecDeque<String>,
}

impl ConnectionManager {
    pub fn new(
        config: ViewerConfig,
        connector: Box<dyn Connector>,
        msg_tx: mpsc::Sender<Inbound>,
        state: Arc<RwLock<ConnectionState>>,
        observers: ObserverSlot,
    ) -> Self {
        Self {
            config,
            connector,
            msg_tx,
            state,
            observers,
            sink: None,
            reader: None,
            generation: 0,
            viewer_id: None,
            active_match: None,
            reconnect_attempts: 0,
            needs_rejoin: false,
            deferred: VecDeque::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn active_match(&self) -> Option<&MatchId> {
        self.active_match.as_ref()
    }

    /// Forget the active subscription (terminal message, server rejection).
    pub fn clear_active_match(&mut self) {
        self.active_match = None;
    }

    /// Frames that arrived while waiting for a control ack, in arrival
    /// order. The driver must drain these after every manager call.
    pub fn take_deferred(&mut self) -> Vec<String> {
        self.deferred.drain(..).collect()
    }

    /// Whether an unexpected loss requires a reconnect episode. Consumes
    /// the flag.
    pub fn take_needs_rejoin(&mut self) -> bool {
        std::mem::take(&mut self.needs_rejoin)
    }

    /// Establish and authenticate the channel. Idempotent while connected.
    pub async fn connect(
        &mut self,
        viewer_id: ViewerId,
        inbound: &mut mpsc::Receiver<Inbound>,
    ) -> Result<(), ConnectionError> {
        if self.state() == ConnectionState::Connected {
            debug!("connect: already connected");
            return Ok(());
        }
        self.set_state(ConnectionState::Connecting);
        match self.establish(&viewer_id, inbound).await {
            Ok(()) => {
                self.viewer_id = Some(viewer_id);
                self.reconnect_attempts = 0;
                self.set_state(ConnectionState::Connected);
                Ok(())
            }
            Err(e) => {
                self.teardown_channel().await;
                self.set_state(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    /// Subscribe to `match_id`, implicitly leaving any previous match.
    pub async fn join(
        &mut self,
        match_id: MatchId,
        inbound: &mut mpsc::Receiver<Inbound>,
    ) -> Result<(), SubscriptionError> {
        if self.state() != ConnectionState::Connected {
            return Err(SubscriptionError::NotConnected);
        }
        if let Some(previous) = self.active_match.take() {
            if previous != match_id {
                info!(%previous, "leaving previous match");
                let _ = self.send(&ClientMessage::Unsubscribe { match_id: previous }).await;
            }
        }

        let max_attempts = self.config.join.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            if self.send(&ClientMessage::Subscribe { match_id: match_id.clone() }).await.is_err() {
                return Err(SubscriptionError::NotConnected);
            }
            match self.await_subscription_ack(&match_id, inbound).await {
                SubAck::Acked => {
                    info!(%match_id, "subscribed");
                    self.active_match = Some(match_id);
                    return Ok(());
                }
                SubAck::Rejected(reason) => {
                    return Err(SubscriptionError::Rejected { match_id, reason });
                }
                SubAck::TimedOut => {
                    warn!(%match_id, attempt, "no subscription ack; retrying");
                }
                SubAck::Lost => return Err(SubscriptionError::NotConnected),
            }
        }
        Err(SubscriptionError::AckTimeout { attempts: max_attempts })
    }

    /// Unsubscribe from the current match. No-op when not joined.
    pub async fn leave(&mut self) {
        if let Some(match_id) = self.active_match.take() {
            info!(%match_id, "leaving match");
            let _ = self.send(&ClientMessage::Unsubscribe { match_id }).await;
        }
    }

    /// Tear the channel down entirely.
    pub async fn disconnect(&mut self) {
        self.active_match = None;
        self.viewer_id = None;
        self.needs_rejoin = false;
        self.reconnect_attempts = 0;
        self.teardown_channel().await;
        if self.state() != ConnectionState::Disconnected {
            self.set_state(ConnectionState::Disconnected);
        }
    }

    /// React to an unexpected channel loss reported by the reader.
    pub async fn note_loss(&mut self, reason: &str) {
        warn!(reason, "channel lost");
        self.teardown_channel().await;
        if self.state() == ConnectionState::Connected {
            self.needs_rejoin = true;
            self.set_state(ConnectionState::Rejoining);
        }
    }

    /// Reconnect with capped exponential backoff until the channel is back
    /// (or the viewer gives up via disconnect, or authentication fails).
    ///
    /// Attempt failures surface as recoverable status events, never errors.
    /// Commands are checked first during the backoff sleep so teardown
    /// cancels the pending timer deterministically.
    pub async fn rejoin(
        &mut self,
        inbound: &mut mpsc::Receiver<Inbound>,
        commands: &mut mpsc::Receiver<Command>,
    ) -> RejoinOutcome {
        let Some(viewer_id) = self.viewer_id.clone() else {
            self.set_state(ConnectionState::Disconnected);
            return RejoinOutcome::Disconnected;
        };

        let mut attempt: u32 = 0;
        loop {
            self.reconnect_attempts = attempt + 1;
            let delay =
                Duration::from_millis(self.config.backoff.delay_ms(attempt, rand::random::<f64>()));
            debug!(attempt = self.reconnect_attempts, ?delay, "reconnect backoff");

            let interrupted = tokio::select! {
                biased;
                cmd = commands.recv() => Some(cmd),
                () = tokio::time::sleep(delay) => None,
            };
            if let Some(cmd) = interrupted {
                match cmd {
                    None | Some(Command::Shutdown) => {
                        self.disconnect().await;
                        return RejoinOutcome::Shutdown;
                    }
                    Some(Command::Disconnect { reply }) => {
                        self.disconnect().await;
                        let _ = reply.send(());
                        return RejoinOutcome::Disconnected;
                    }
                    Some(Command::Leave { reply }) => {
                        self.active_match = None;
                        let _ = reply.send(());
                    }
                    Some(Command::Connect { reply, .. }) => {
                        let _ = reply
                            .send(Err(ConnectionError::Transport("reconnect in progress".into())));
                    }
                    Some(Command::Join { reply, .. }) => {
                        let _ = reply.send(Err(SubscriptionError::NotConnected));
                    }
                }
                continue;
            }

            match self.establish(&viewer_id, inbound).await {
                Err(e @ ConnectionError::AuthRejected(_)) => {
                    warn!(error = %e, "authentication rejected while reconnecting");
                    self.disconnect().await;
                    return RejoinOutcome::AuthFatal(e);
                }
                Err(e) => {
                    debug!(error = %e, attempt = self.reconnect_attempts, "reconnect attempt failed");
                    self.teardown_channel().await;
                    self.notify_status();
                    attempt += 1;
                }
                Ok(()) => {
                    let Some(match_id) = self.active_match.clone() else {
                        self.reconnect_attempts = 0;
                        self.set_state(ConnectionState::Connected);
                        info!("reconnected");
                        return RejoinOutcome::Reconnected { resubscribed: false, rejection: None };
                    };

                    if self.send(&ClientMessage::Subscribe { match_id: match_id.clone() }).await.is_err()
                    {
                        self.teardown_channel().await;
                        self.notify_status();
                        attempt += 1;
                        continue;
                    }
                    match self.await_subscription_ack(&match_id, inbound).await {
                        SubAck::Acked => {
                            self.reconnect_attempts = 0;
                            self.set_state(ConnectionState::Connected);
                            info!(%match_id, "reconnected and resubscribed");
                            return RejoinOutcome::Reconnected {
                                resubscribed: true,
                                rejection: None,
                            };
                        }
                        SubAck::Rejected(reason) => {
                            // The match disappeared while we were away.
                            self.active_match = None;
                            self.reconnect_attempts = 0;
                            self.set_state(ConnectionState::Connected);
                            return RejoinOutcome::Reconnected {
                                resubscribed: false,
                                rejection: Some(SubscriptionError::Rejected { match_id, reason }),
                            };
                        }
                        SubAck::TimedOut | SubAck::Lost => {
                            self.teardown_channel().await;
                            self.notify_status();
                            attempt += 1;
                        }
                    }
                }
            }
        }
    }

    // ── Internals ───────────────────────────────────────────────────────

    async fn establish(
        &mut self,
        viewer_id: &ViewerId,
        inbound: &mut mpsc::Receiver<Inbound>,
    ) -> Result<(), ConnectionError> {
        let window = self.config.connect_timeout();
        let dialed = tokio::time::timeout(window, self.connector.dial(&self.config.url))
            .await
            .map_err(|_| ConnectionError::Transport(format!("dial timed out after {window:?}")))?;
        let (sink, stream) = dialed?;

        self.generation += 1;
        self.sink = Some(sink);
        self.reader = Some(spawn_reader(stream, self.generation, self.msg_tx.clone()));

        self.send(&ClientMessage::Authenticate { viewer_id: viewer_id.clone() }).await?;
        self.await_connection_ack(inbound).await
    }

    async fn send(&mut self, message: &ClientMessage) -> Result<(), ConnectionError> {
        let text =
            encode_client(message).map_err(|e| ConnectionError::Transport(e.to_string()))?;
        match self.sink.as_mut() {
            Some(sink) => sink.send(text).await,
            None => Err(ConnectionError::Transport("no active channel".into())),
        }
    }

    async fn await_connection_ack(
        &mut self,
        inbound: &mut mpsc::Receiver<Inbound>,
    ) -> Result<(), ConnectionError> {
        let window = self.config.connect_timeout();
        let deadline = Instant::now() + window;
        loop {
            let frame = match timeout_at(deadline, inbound.recv()).await {
                Err(_) => return Err(ConnectionError::AckTimeout(window)),
                Ok(None) => return Err(ConnectionError::SessionClosed),
                Ok(Some(frame)) => frame,
            };
            match frame {
                Inbound::Lost { generation, reason } if generation == self.generation => {
                    return Err(ConnectionError::Transport(format!(
                        "connection lost during handshake: {reason}"
                    )));
                }
                Inbound::Frame { generation, text } if generation == self.generation => {
                    match decode_server(&text) {
                        Ok(ServerMessage::ConnectionAck { .. }) => return Ok(()),
                        Ok(ServerMessage::AuthRejected { reason }) => {
                            return Err(ConnectionError::AuthRejected(reason));
                        }
                        // Anything else (including undecodable frames) is the
                        // driver's business; keep arrival order.
                        _ => self.deferred.push_back(text),
                    }
                }
                _ => {}
            }
        }
    }

    async fn await_subscription_ack(
        &mut self,
        match_id: &MatchId,
        inbound: &mut mpsc::Receiver<Inbound>,
    ) -> SubAck {
        let deadline = Instant::now() + self.config.join.ack_timeout();
        loop {
            let frame = match timeout_at(deadline, inbound.recv()).await {
                Err(_) => return SubAck::TimedOut,
                Ok(None) => return SubAck::Lost,
                Ok(Some(frame)) => frame,
            };
            match frame {
                Inbound::Lost { generation, reason } if generation == self.generation => {
                    self.note_loss(&reason).await;
                    return SubAck::Lost;
                }
                Inbound::Frame { generation, text } if generation == self.generation => {
                    match decode_server(&text) {
                        Ok(ServerMessage::SubscriptionAck { match_id: acked })
                            if acked == *match_id =>
                        {
                            return SubAck::Acked;
                        }
                        Ok(ServerMessage::SubscriptionRejected { match_id: rejected, reason })
                            if rejected == *match_id =>
                        {
                            return SubAck::Rejected(reason);
                        }
                        _ => self.deferred.push_back(text),
                    }
                }
                _ => {}
            }
        }
    }

    async fn teardown_channel(&mut self) {
        // Invalidate the generation so frames still in flight from this
        // channel are discarded.
        self.generation = self.generation.wrapping_add(1);
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        if let Some(mut sink) = self.sink.take() {
            sink.close().await;
        }
    }

    fn set_state(&mut self, next: ConnectionState) {
        debug!(state = ?next, "connection state");
        *self.state.write() = next;
        self.notify_status();
    }

    fn notify_status(&self) {
        let status = ConnectionStatus {
            state: self.state(),
            reconnect_attempts: self.reconnect_attempts,
        };
        self.observers.status_changed(&status);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
