//! Terminal-backed engine.
//!
//! Remote actions and snapshot pushes are printed to stdout; lines typed
//! on stdin are sent to the opponent through the registered outbound hook.

use std::sync::{Mutex, PoisonError};

use matchlink_client::{EngineBridge, OutboundHook};
use matchlink_core::{ParticipantId, Payload};
use serde_json::Value;

#[derive(Default)]
pub struct ConsoleEngine {
    hook: Mutex<Option<OutboundHook>>,
}

impl ConsoleEngine {
    /// Send one typed line. JSON input is sent structured, anything else as text.
    ///
    /// Returns `false` when there is no hook yet or the channel is not open.
    pub fn submit(&self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() {
            return true;
        }
        let hook = self.hook.lock().unwrap_or_else(PoisonError::into_inner).clone();
        match hook {
            Some(hook) => hook.send(parse_action(line)),
            None => false,
        }
    }
}

fn parse_action(line: &str) -> Payload {
    match serde_json::from_str::<Value>(line) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => Payload::Json(value),
        _ => Payload::Text(line.to_string()),
    }
}

impl EngineBridge for ConsoleEngine {
    fn initialize(&self, snapshot: &Value, local_participant_id: ParticipantId) {
        let pieces = snapshot
            .get("pieces")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        let turn = snapshot.get("nextTurnIndicator").cloned().unwrap_or(Value::Null);
        println!("[snapshot] {pieces} pieces, next turn {turn}, playing as {local_participant_id}");
    }

    fn apply_remote_message(&self, payload: &str) {
        println!("[opponent] {payload}");
    }

    fn register_outbound(&self, hook: OutboundHook) {
        *self.hook.lock().unwrap_or_else(PoisonError::into_inner) = Some(hook);
    }
}
