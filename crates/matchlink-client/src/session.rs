//! Live session driver.
//!
//! Wires bootstrap, relay channel and router together: the channel only
//! connects once bootstrap reports `Ready`, and channel events are pumped
//! into the router until the session ends.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, trace};

use matchlink_core::endpoint::channel_url;
use matchlink_core::{ParticipantId, SessionId, SessionIdentity, SnapshotError, SyncError, SyncResult};

use crate::bootstrap::{Outcome, SessionBootstrapper, WaitReason};
use crate::channel::{ChannelEvent, ChannelEvents, RelayChannel, RetryPolicy};
use crate::engine::EngineBridge;
use crate::router::MessageRouter;
use crate::transport::Connector;

/// Settings for starting a live session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base URL of the relay, e.g. `ws://127.0.0.1:3000/api`.
    pub relay_base: String,
    pub retry: RetryPolicy,
    /// Poll while waiting for the session to become actionable.
    /// `None` returns `Waiting` after a single attempt.
    pub poll_interval: Option<Duration>,
    pub max_polls: Option<u32>,
}

impl SessionConfig {
    pub fn new(relay_base: impl Into<String>) -> Self {
        Self {
            relay_base: relay_base.into(),
            retry: RetryPolicy::default(),
            poll_interval: None,
            max_polls: None,
        }
    }
}

/// Result of [`SyncSession::start`].
pub enum StartOutcome {
    Live(SyncSession),
    Waiting(WaitReason),
    Invalid(SnapshotError),
}

pub struct SyncSession {
    identity: SessionIdentity,
    channel: RelayChannel,
    events: ChannelEvents,
    router: MessageRouter,
}

impl SyncSession {
    /// Bootstrap and, if the session is ready, open the relay channel.
    ///
    /// The engine's outbound hook is registered exactly once here.
    pub async fn start(
        bootstrapper: &SessionBootstrapper,
        engine: Arc<dyn EngineBridge>,
        connector: Arc<dyn Connector>,
        config: &SessionConfig,
        session_id: SessionId,
        local_participant_id: ParticipantId,
    ) -> SyncResult<StartOutcome> {
        let outcome = match config.poll_interval {
            Some(interval) => {
                bootstrapper
                    .bootstrap_until_ready(session_id, local_participant_id, interval, config.max_polls)
                    .await?
            }
            None => bootstrapper.bootstrap(session_id, local_participant_id).await?,
        };

        let identity = match outcome {
            Outcome::Ready { identity, .. } => identity,
            Outcome::Waiting(reason) => return Ok(StartOutcome::Waiting(reason)),
            Outcome::Invalid(e) => return Ok(StartOutcome::Invalid(e)),
        };

        let (channel, events) = RelayChannel::new(config.retry.clone(), connector);
        let router = MessageRouter::new(identity.local_participant_id, engine.clone(), channel.clone());
        engine.register_outbound(router.outbound_hook());

        let url = channel_url(
            &config.relay_base,
            identity.session_id,
            identity.local_participant_id,
        );
        channel.connect(&url);

        Ok(StartOutcome::Live(Self {
            identity,
            channel,
            events,
            router,
        }))
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    /// The session's channel, e.g. to call [`RelayChannel::close`] from elsewhere.
    pub fn channel(&self) -> &RelayChannel {
        &self.channel
    }

    /// Pump channel events into the router.
    ///
    /// Returns `Ok(())` after an explicit shutdown and a transport error
    /// once reconnect attempts are exhausted.
    pub async fn run(&mut self) -> SyncResult<()> {
        while let Some(event) = self.events.recv().await {
            match event {
                ChannelEvent::Opened { handle } => {
                    info!(session_id = self.identity.session_id, handle, "session live");
                }
                ChannelEvent::Frame { text, .. } => {
                    let routed = self.router.on_frame(&text);
                    trace!(?routed, "frame routed");
                }
                ChannelEvent::Closed { handle } => {
                    if self.channel.is_shut_down() {
                        info!(handle, "session closed");
                        return Ok(());
                    }
                    debug!(handle, attempts = self.channel.attempts(), "session connection lost");
                }
                ChannelEvent::TerminalFailure { attempts } => {
                    error!(session_id = self.identity.session_id, attempts, "relay unavailable");
                    return Err(SyncError::Transport(format!(
                        "relay unavailable after {attempts} reconnect attempts"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Request shutdown; `run` returns once the connection has closed.
    pub fn close(&self) {
        self.channel.close();
    }
}
