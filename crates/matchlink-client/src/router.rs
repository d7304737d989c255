//! Inbound frame routing and outbound action wrapping.
//!
//! Inbound: parse → drop self-echo → full snapshot or incremental message.
//! Outbound: engine actions are tagged with the local participant id and
//! handed to the relay channel.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use matchlink_core::{Envelope, ParticipantId, Payload};

use crate::channel::RelayChannel;
use crate::engine::EngineBridge;

/// What the router did with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    /// Not a valid envelope (or an unusable snapshot payload); dropped.
    Malformed,
    /// Originated locally; dropped.
    SelfEcho,
    /// Engine re-initialized from a full snapshot.
    Snapshot,
    /// Forwarded to the engine as an incremental message.
    Message,
}

pub struct MessageRouter {
    local_participant_id: ParticipantId,
    engine: Arc<dyn EngineBridge>,
    channel: RelayChannel,
}

impl MessageRouter {
    pub fn new(
        local_participant_id: ParticipantId,
        engine: Arc<dyn EngineBridge>,
        channel: RelayChannel,
    ) -> Self {
        Self {
            local_participant_id,
            engine,
            channel,
        }
    }

    /// Route one raw inbound frame.
    ///
    /// A malformed frame is logged and dropped; the connection stays up.
    pub fn on_frame(&self, frame: &str) -> Routed {
        let envelope = match Envelope::decode(frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "dropping malformed frame");
                return Routed::Malformed;
            }
        };

        if envelope.origin_id == self.local_participant_id {
            trace!(origin = envelope.origin_id, "dropping self-echo");
            return Routed::SelfEcho;
        }

        if envelope.is_snapshot() {
            return match envelope.payload.into_document() {
                Ok(document) => {
                    debug!(origin = envelope.origin_id, "snapshot pushed, re-initializing engine");
                    self.engine.initialize(&document, self.local_participant_id);
                    Routed::Snapshot
                }
                Err(e) => {
                    warn!(error = %e, "dropping snapshot push with unparseable payload");
                    Routed::Malformed
                }
            };
        }

        self.engine
            .apply_remote_message(&envelope.payload.into_text());
        Routed::Message
    }

    /// Hook for the engine to transmit local actions.
    pub fn outbound_hook(&self) -> OutboundHook {
        OutboundHook {
            origin_id: self.local_participant_id,
            channel: self.channel.clone(),
        }
    }

    pub fn local_participant_id(&self) -> ParticipantId {
        self.local_participant_id
    }
}

/// Sends local engine actions over the relay, tagged with their origin.
#[derive(Clone)]
pub struct OutboundHook {
    origin_id: ParticipantId,
    channel: RelayChannel,
}

impl OutboundHook {
    /// Wrap and send one action. Returns `false` if the channel dropped it.
    pub fn send(&self, action: impl Into<Payload>) -> bool {
        self.channel.send(&Envelope::action(self.origin_id, action))
    }
}

impl fmt::Debug for OutboundHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboundHook")
            .field("origin_id", &self.origin_id)
            .finish()
    }
}
