//! Server-authoritative session snapshot and its structural validator.
//!
//! The validator is a pure function over the raw JSON document. The game
//! payload itself (`pieces`, formation details) stays opaque; only the
//! fields this layer routes on are extracted.

use serde_json::Value;

use crate::error::SnapshotError;
use crate::identity::{ParticipantId, SessionId};

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotStatus {
    Waiting,
    Playing,
    Finished,
    /// Missing or unrecognised status string.
    Unknown,
}

impl SnapshotStatus {
    fn from_value(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("waiting") => Self::Waiting,
            Some("playing") => Self::Playing,
            Some("finished") => Self::Finished,
            _ => Self::Unknown,
        }
    }
}

/// A participant's formation choice. Only the participant id is read.
#[derive(Debug, Clone, PartialEq)]
pub struct Formation {
    pub participant_id: ParticipantId,
    pub raw: Value,
}

impl Formation {
    fn from_value(raw: &Value) -> Self {
        // Missing, null or non-numeric ids all collapse to zero.
        let participant_id = raw
            .get("participantId")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        Self {
            participant_id,
            raw: raw.clone(),
        }
    }
}

/// A validated snapshot document.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub session_id: SessionId,
    pub status: SnapshotStatus,
    pub pieces: Vec<Value>,
    pub formations: Vec<Formation>,
    pub next_turn: Option<Value>,
    document: Value,
}

impl Snapshot {
    /// The document exactly as received, for handing to the engine.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Participant ids of the first two formations.
    pub fn participants(&self) -> Option<(ParticipantId, ParticipantId)> {
        match self.formations.as_slice() {
            [a, b, ..] => Some((a.participant_id, b.participant_id)),
            _ => None,
        }
    }

    /// Play has started, a turn indicator is present and both seats are filled.
    pub fn is_actionable(&self) -> bool {
        self.status == SnapshotStatus::Playing
            && self.next_turn.is_some()
            && matches!(self.participants(), Some((a, b)) if a != 0 && b != 0)
    }
}

/// Validate a raw snapshot document.
///
/// Checks run in a fixed order and the first failure wins:
/// `pieces` sequence, `formations` sequence, numeric `sessionId`,
/// at least two formations, at least one non-empty participant.
///
/// An absent `pieces` key reads as an empty board; only a `pieces` value
/// that is present and not a sequence is rejected.
pub fn validate(raw: &Value) -> Result<Snapshot, SnapshotError> {
    let pieces = match raw.get("pieces") {
        None => Vec::new(),
        Some(pieces) => pieces
            .as_array()
            .cloned()
            .ok_or(SnapshotError::PiecesNotSequence)?,
    };

    let formations = raw
        .get("formations")
        .and_then(Value::as_array)
        .ok_or(SnapshotError::FormationsNotSequence)?;

    let session_id = raw
        .get("sessionId")
        .and_then(Value::as_u64)
        .ok_or(SnapshotError::SessionIdNotNumeric)?;

    if formations.len() < 2 {
        return Err(SnapshotError::NotReady {
            formations: formations.len(),
        });
    }

    let formations: Vec<Formation> = formations.iter().map(Formation::from_value).collect();
    if formations[0].participant_id == 0 && formations[1].participant_id == 0 {
        return Err(SnapshotError::InvalidParticipants);
    }

    let next_turn = raw
        .get("nextTurnIndicator")
        .filter(|v| !v.is_null())
        .cloned();

    Ok(Snapshot {
        session_id,
        status: SnapshotStatus::from_value(raw.get("status")),
        pieces,
        formations,
        next_turn,
        document: raw.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn playing() -> Value {
        json!({
            "sessionId": 7,
            "status": "playing",
            "nextTurnIndicator": 3,
            "pieces": [{ "id": 1, "x": 0.5, "y": -2.0 }],
            "formations": [{ "participantId": 9 }, { "participantId": 3 }],
        })
    }

    #[test]
    fn accepts_actionable_snapshot() {
        let snap = validate(&playing()).unwrap();
        assert_eq!(snap.session_id, 7);
        assert_eq!(snap.status, SnapshotStatus::Playing);
        assert_eq!(snap.participants(), Some((9, 3)));
        assert_eq!(snap.pieces.len(), 1);
        assert!(snap.is_actionable());
        assert_eq!(snap.document(), &playing());
    }

    #[test]
    fn pieces_checked_first() {
        let raw = json!({ "pieces": {}, "formations": "nope", "sessionId": "x" });
        assert_eq!(validate(&raw), Err(SnapshotError::PiecesNotSequence));
    }

    #[test]
    fn formations_must_be_sequence() {
        let raw = json!({ "pieces": [], "formations": null, "sessionId": 1 });
        assert_eq!(validate(&raw), Err(SnapshotError::FormationsNotSequence));
    }

    #[test]
    fn session_id_must_be_numeric() {
        let raw = json!({ "pieces": [], "formations": [], "sessionId": "7" });
        assert_eq!(validate(&raw), Err(SnapshotError::SessionIdNotNumeric));
    }

    #[test]
    fn non_object_document_is_rejected() {
        assert_eq!(validate(&json!([1, 2])), Err(SnapshotError::FormationsNotSequence));
    }

    #[test]
    fn missing_pieces_reads_as_empty() {
        let raw = json!({
            "sessionId": 7,
            "status": "waiting",
            "formations": [{ "participantId": 3 }],
        });
        assert_eq!(validate(&raw), Err(SnapshotError::NotReady { formations: 1 }));

        let mut playing = playing();
        playing.as_object_mut().unwrap().remove("pieces");
        let snap = validate(&playing).unwrap();
        assert!(snap.pieces.is_empty());
        assert!(snap.is_actionable());
    }

    #[test]
    fn null_pieces_is_rejected() {
        let mut raw = playing();
        raw["pieces"] = Value::Null;
        assert_eq!(validate(&raw), Err(SnapshotError::PiecesNotSequence));
    }

    #[test]
    fn single_formation_is_not_ready() {
        let raw = json!({
            "sessionId": 7,
            "status": "waiting",
            "pieces": [],
            "formations": [{ "participantId": 3 }],
        });
        let err = validate(&raw).unwrap_err();
        assert!(err.is_not_ready());
        assert_eq!(err, SnapshotError::NotReady { formations: 1 });
    }

    #[test]
    fn empty_participants_are_invalid() {
        let raw = json!({
            "sessionId": 7,
            "status": "playing",
            "nextTurnIndicator": 1,
            "pieces": [],
            "formations": [{ "participantId": 0 }, { "participantId": null }],
        });
        assert_eq!(validate(&raw), Err(SnapshotError::InvalidParticipants));
    }

    #[test]
    fn one_empty_seat_is_valid_but_not_actionable() {
        let mut raw = playing();
        raw["formations"] = json!([{ "participantId": 9 }, {}]);
        let snap = validate(&raw).unwrap();
        assert!(!snap.is_actionable());
    }

    #[test]
    fn null_turn_indicator_is_not_actionable() {
        let mut raw = playing();
        raw["nextTurnIndicator"] = Value::Null;
        let snap = validate(&raw).unwrap();
        assert_eq!(snap.next_turn, None);
        assert!(!snap.is_actionable());
    }

    #[test]
    fn non_playing_status_is_not_actionable() {
        for status in ["waiting", "finished", "paused"] {
            let mut raw = playing();
            raw["status"] = json!(status);
            assert!(!validate(&raw).unwrap().is_actionable(), "{status}");
        }
    }

    #[test]
    fn unknown_status_maps_to_unknown() {
        let mut raw = playing();
        raw.as_object_mut().unwrap().remove("status");
        assert_eq!(validate(&raw).unwrap().status, SnapshotStatus::Unknown);
    }
}
