//! Resilient relay channel.
//!
//! Owns at most one live connection and drives it through
//! `Idle → Connecting → Open → Closing → Closed`. A drop while not shut down
//! schedules a fixed-delay reconnect until the attempt bound is reached,
//! after which a single `TerminalFailure` event is emitted.
//!
//! Every connection attempt gets a fresh [`HandleId`]. Anything reported
//! under an older handle (late frames, late closes) is ignored, so a dying
//! connection can never interfere with its replacement.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use matchlink_core::Envelope;

use crate::transport::{Connection, Connector};

/// Identifies one physical connection attempt.
pub type HandleId = u64;

/// Bounded fixed-delay reconnect policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Reconnections attempted after a drop before giving up.
    pub max_attempts: u32,
    /// Delay before each reconnection.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(3),
        }
    }
}

/// Lifecycle state of the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Never connected.
    Idle,
    /// A connection attempt is in flight.
    Connecting,
    /// Connected; sends are delivered.
    Open,
    /// Explicit shutdown in progress.
    Closing,
    /// No connection. A reconnect may be pending.
    Closed,
}

/// Events reported to the owner of the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Opened { handle: HandleId },
    Frame { handle: HandleId, text: String },
    Closed { handle: HandleId },
    /// Reconnect attempts are exhausted. Fatal for the session.
    TerminalFailure { attempts: u32 },
}

struct Inner {
    state: ChannelState,
    endpoint: Option<String>,
    attempts: u32,
    handle: HandleId,
    outbound: Option<mpsc::UnboundedSender<String>>,
    reconnect: Option<JoinHandle<()>>,
    shutdown: bool,
    /// The last run ended in `TerminalFailure`.
    exhausted: bool,
}

struct Shared {
    policy: RetryPolicy,
    connector: Arc<dyn Connector>,
    inner: Mutex<Inner>,
    events: mpsc::UnboundedSender<ChannelEvent>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ChannelEvent) {
        // The receiver may be gone if the owner stopped listening.
        let _ = self.events.send(event);
    }
}

/// Handle to the relay channel. Cheap to clone; all clones share one state machine.
///
/// Must be used from within a tokio runtime: connection attempts and
/// reconnect timers are spawned as tasks.
#[derive(Clone)]
pub struct RelayChannel {
    shared: Arc<Shared>,
}

impl RelayChannel {
    /// Create an idle channel and the receiver for its events.
    pub fn new(policy: RetryPolicy, connector: Arc<dyn Connector>) -> (Self, ChannelEvents) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            policy,
            connector,
            inner: Mutex::new(Inner {
                state: ChannelState::Idle,
                endpoint: None,
                attempts: 0,
                handle: 0,
                outbound: None,
                reconnect: None,
                shutdown: false,
                exhausted: false,
            }),
            events: events_tx,
        });

        let events = ChannelEvents {
            rx: events_rx,
            shared: Arc::downgrade(&shared),
        };
        (Self { shared }, events)
    }

    /// Start a connection attempt to `endpoint`.
    ///
    /// No-op while `Connecting` or `Open`. From any other state a new handle
    /// is created, superseding whatever connection came before it. After a
    /// terminal failure or an explicit close the attempt counter starts over.
    pub fn connect(&self, endpoint: &str) {
        let handle = {
            let mut inner = self.shared.lock();
            if matches!(inner.state, ChannelState::Connecting | ChannelState::Open) {
                debug!(state = ?inner.state, "connect ignored, channel already live");
                return;
            }
            if let Some(pending) = inner.reconnect.take() {
                pending.abort();
            }

            if inner.exhausted || inner.shutdown {
                inner.attempts = 0;
                inner.exhausted = false;
            }
            inner.handle += 1;
            inner.state = ChannelState::Connecting;
            inner.endpoint = Some(endpoint.to_string());
            inner.outbound = None;
            inner.shutdown = false;
            inner.handle
        };

        debug!(handle, endpoint, "relay connection attempt");
        let channel = self.clone();
        let endpoint = endpoint.to_string();
        tokio::spawn(async move {
            channel.run_connection(handle, endpoint).await;
        });
    }

    /// Deliver an envelope if the channel is open. Returns whether it was queued.
    ///
    /// Nothing is buffered: a send while not `Open` is dropped.
    pub fn send(&self, envelope: &Envelope) -> bool {
        let text = match envelope.encode() {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "failed to encode outbound envelope");
                return false;
            }
        };

        let inner = self.shared.lock();
        match (inner.state, &inner.outbound) {
            (ChannelState::Open, Some(tx)) => tx.send(text).is_ok(),
            (state, _) => {
                warn!(?state, "relay channel not open, dropping outbound message");
                false
            }
        }
    }

    /// Shut the channel down. Cancels any pending reconnect and never retries.
    pub fn close(&self) {
        let mut inner = self.shared.lock();
        inner.shutdown = true;
        let cancelled = match inner.reconnect.take() {
            Some(pending) => {
                pending.abort();
                true
            }
            None => false,
        };
        match inner.state {
            ChannelState::Connecting | ChannelState::Open => {
                inner.state = ChannelState::Closing;
                // Dropping the sender ends the connection task's write side.
                inner.outbound = None;
            }
            // No connection task is left to report the close.
            ChannelState::Idle | ChannelState::Closed if cancelled => {
                inner.state = ChannelState::Closed;
                self.shared.emit(ChannelEvent::Closed {
                    handle: inner.handle,
                });
            }
            ChannelState::Idle | ChannelState::Closing | ChannelState::Closed => {}
        }
        info!(handle = inner.handle, "relay channel shutdown requested");
    }

    pub fn state(&self) -> ChannelState {
        self.shared.lock().state
    }

    /// Consecutive failed attempts since the last successful open.
    pub fn attempts(&self) -> u32 {
        self.shared.lock().attempts
    }

    /// Closed with a reconnect scheduled.
    pub fn is_reconnecting(&self) -> bool {
        let inner = self.shared.lock();
        inner.state == ChannelState::Closed && inner.reconnect.is_some()
    }

    /// Whether `close` has been called since the last `connect`.
    pub fn is_shut_down(&self) -> bool {
        self.shared.lock().shutdown
    }

    pub fn current_handle(&self) -> HandleId {
        self.shared.lock().handle
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.shared.policy
    }

    // ── Internal ─────────────────────────────────────────────────────

    async fn run_connection(&self, handle: HandleId, endpoint: String) {
        let Connection {
            mut sink,
            mut stream,
        } = match self.shared.connector.open(&endpoint).await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(handle, error = %e, "relay connection failed");
                self.on_closed(handle);
                return;
            }
        };

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let superseded = {
            let mut inner = self.shared.lock();
            if inner.handle != handle || inner.state != ChannelState::Connecting {
                true
            } else {
                inner.state = ChannelState::Open;
                inner.attempts = 0;
                inner.outbound = Some(tx);
                false
            }
        };
        if superseded {
            debug!(handle, "connection superseded before open, discarding");
            let _ = sink.close().await;
            self.on_closed(handle);
            return;
        }

        info!(handle, endpoint = %endpoint, "relay channel open");
        self.shared.emit(ChannelEvent::Opened { handle });

        loop {
            tokio::select! {
                outgoing = rx.recv() => match outgoing {
                    Some(text) => {
                        if let Err(e) = sink.send_text(text).await {
                            warn!(handle, error = %e, "relay write failed");
                            break;
                        }
                    }
                    None => {
                        // Sender dropped: shutdown or superseded.
                        let _ = sink.close().await;
                        break;
                    }
                },
                incoming = stream.next_frame() => match incoming {
                    Some(Ok(text)) => {
                        if !self.is_current(handle) {
                            trace!(handle, "frame on superseded connection, closing it");
                            let _ = sink.close().await;
                            break;
                        }
                        self.shared.emit(ChannelEvent::Frame { handle, text });
                    }
                    Some(Err(e)) => {
                        warn!(handle, error = %e, "relay read failed");
                        break;
                    }
                    None => {
                        debug!(handle, "relay connection closed by peer");
                        break;
                    }
                },
            }
        }

        self.on_closed(handle);
    }

    fn is_current(&self, handle: HandleId) -> bool {
        self.shared.lock().handle == handle
    }

    /// Transition to `Closed` and decide between retrying and giving up.
    fn on_closed(&self, handle: HandleId) {
        let mut inner = self.shared.lock();
        if inner.handle != handle {
            debug!(handle, current = inner.handle, "ignoring close of superseded connection");
            return;
        }

        inner.state = ChannelState::Closed;
        inner.outbound = None;
        self.shared.emit(ChannelEvent::Closed { handle });

        if inner.shutdown {
            info!(handle, "relay channel closed");
            return;
        }

        let Some(endpoint) = inner.endpoint.clone() else {
            return;
        };

        let max = self.shared.policy.max_attempts;
        if inner.attempts >= max {
            inner.exhausted = true;
            error!(attempts = inner.attempts, "relay reconnect attempts exhausted");
            self.shared.emit(ChannelEvent::TerminalFailure {
                attempts: inner.attempts,
            });
            return;
        }

        inner.attempts += 1;
        let delay = self.shared.policy.delay;
        info!(
            attempt = inner.attempts,
            max,
            delay_ms = delay.as_millis() as u64,
            "scheduling relay reconnect"
        );

        let weak = Arc::downgrade(&self.shared);
        inner.reconnect = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(shared) = weak.upgrade() else {
                return;
            };
            {
                let mut inner = shared.lock();
                // Detach ourselves so `connect` does not abort this task.
                inner.reconnect = None;
                if inner.shutdown {
                    return;
                }
            }
            RelayChannel { shared }.connect(&endpoint);
        }));
    }
}

impl fmt::Debug for RelayChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.lock();
        f.debug_struct("RelayChannel")
            .field("state", &inner.state)
            .field("handle", &inner.handle)
            .field("attempts", &inner.attempts)
            .finish()
    }
}

/// Receiver side of a channel's events.
///
/// Frames and opens whose handle has been superseded by the time they are
/// received are dropped here, so consumers only ever see the live connection.
pub struct ChannelEvents {
    rx: mpsc::UnboundedReceiver<ChannelEvent>,
    shared: Weak<Shared>,
}

impl ChannelEvents {
    /// Next event. `None` once every channel handle has been dropped.
    pub async fn recv(&mut self) -> Option<ChannelEvent> {
        loop {
            let event = self.rx.recv().await?;
            if let ChannelEvent::Frame { handle, .. } | ChannelEvent::Opened { handle } = &event {
                let current = self.shared.upgrade().map(|s| s.lock().handle);
                if current != Some(*handle) {
                    trace!(handle, "dropping event from superseded connection");
                    continue;
                }
            }
            return Some(event);
        }
    }
}
