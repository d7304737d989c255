//! Wire envelope exchanged over the relay channel.
//!
//! One JSON text frame carries exactly one envelope:
//! `{"originId": 3, "kind": "snapshot", "payload": ...}`. `kind` is optional
//! and the payload is either a string or an arbitrary JSON value.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{SyncError, SyncResult};
use crate::identity::ParticipantId;

/// Classification tag on an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    /// The payload is a full session snapshot.
    Snapshot,
    /// Any tag this layer does not route on.
    #[serde(other)]
    Other,
}

/// Envelope payload: textual, or a structured JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Text(String),
    Json(Value),
}

impl Payload {
    /// Canonical textual form: text passes through, values are serialized.
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Json(value) => value.to_string(),
        }
    }

    /// Interpret the payload as a JSON document.
    ///
    /// Textual payloads are parsed, so a snapshot relayed as a string is
    /// accepted the same as one relayed as an object.
    pub fn into_document(self) -> SyncResult<Value> {
        match self {
            Self::Json(value) => Ok(value),
            Self::Text(text) => Ok(serde_json::from_str(&text)?),
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub origin_id: ParticipantId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EnvelopeKind>,
    pub payload: Payload,
}

impl Envelope {
    /// Wrap a local action for broadcast.
    pub fn action(origin_id: ParticipantId, payload: impl Into<Payload>) -> Self {
        Self {
            origin_id,
            kind: None,
            payload: payload.into(),
        }
    }

    /// Wrap a full snapshot push.
    pub fn snapshot(origin_id: ParticipantId, document: Value) -> Self {
        Self {
            origin_id,
            kind: Some(EnvelopeKind::Snapshot),
            payload: Payload::Json(document),
        }
    }

    pub fn is_snapshot(&self) -> bool {
        self.kind == Some(EnvelopeKind::Snapshot)
    }

    /// Parse a text frame.
    pub fn decode(frame: &str) -> SyncResult<Self> {
        serde_json::from_str(frame).map_err(|e| SyncError::InvalidFrame(e.to_string()))
    }

    /// Serialize to a text frame.
    pub fn encode(&self) -> SyncResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_text_action() {
        let env = Envelope::decode(r#"{"originId":3,"payload":"X"}"#).unwrap();
        assert_eq!(env.origin_id, 3);
        assert_eq!(env.kind, None);
        assert_eq!(env.payload, Payload::Text("X".into()));
        assert!(!env.is_snapshot());
    }

    #[test]
    fn decode_snapshot_push() {
        let env =
            Envelope::decode(r#"{"originId":9,"kind":"snapshot","payload":{"sessionId":7}}"#)
                .unwrap();
        assert!(env.is_snapshot());
        assert_eq!(env.payload, Payload::Json(json!({ "sessionId": 7 })));
    }

    #[test]
    fn unknown_kind_is_tolerated() {
        let env = Envelope::decode(r#"{"originId":9,"kind":"chat","payload":"hi"}"#).unwrap();
        assert_eq!(env.kind, Some(EnvelopeKind::Other));
    }

    #[test]
    fn garbage_is_invalid_frame() {
        assert!(matches!(
            Envelope::decode("turno_finalizado"),
            Err(SyncError::InvalidFrame(_))
        ));
        assert!(matches!(
            Envelope::decode(r#"{"payload":"X"}"#),
            Err(SyncError::InvalidFrame(_))
        ));
    }

    #[test]
    fn action_omits_kind_on_the_wire() {
        let text = Envelope::action(3, "move").encode().unwrap();
        assert_eq!(text, r#"{"originId":3,"payload":"move"}"#);
    }

    #[test]
    fn payload_normalizes_to_text() {
        assert_eq!(Payload::from("a b").into_text(), "a b");
        assert_eq!(
            Payload::from(json!({ "x": 1 })).into_text(),
            r#"{"x":1}"#
        );
    }

    #[test]
    fn textual_document_is_parsed() {
        let doc = Payload::from(r#"{"pieces":[]}"#).into_document().unwrap();
        assert_eq!(doc, json!({ "pieces": [] }));
        assert!(Payload::from("not json").into_document().is_err());
    }
}
