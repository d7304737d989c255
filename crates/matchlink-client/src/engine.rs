//! Boundary to the local deterministic game engine.
//!
//! The engine owns rules, physics and turn legality. This layer only decides
//! whether and what to deliver to it.

use serde_json::Value;

use matchlink_core::ParticipantId;

use crate::router::OutboundHook;

/// Operations the sync core needs from the game engine.
pub trait EngineBridge: Send + Sync {
    /// Replace all engine state with a full snapshot document.
    fn initialize(&self, snapshot: &Value, local_participant_id: ParticipantId);

    /// Apply one incremental action relayed from the remote participant.
    fn apply_remote_message(&self, payload: &str);

    /// Receive the hook used to transmit local actions. Called once per session.
    fn register_outbound(&self, hook: OutboundHook);
}
