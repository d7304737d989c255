//! Session identity derived once per successful bootstrap.
//!
//! Both clients compute the same left/right ordering from the same snapshot,
//! independent of who requested it or who initiated matchmaking.

use serde::{Deserialize, Serialize};

use crate::snapshot::Snapshot;

/// Numeric session (match) identifier.
pub type SessionId = u64;

/// Numeric participant identifier. Zero means "no participant".
pub type ParticipantId = u64;

/// Which side of the board a participant plays on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Identity of the local client within a live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub session_id: SessionId,
    pub local_participant_id: ParticipantId,
    pub left_participant_id: ParticipantId,
    pub right_participant_id: ParticipantId,
}

impl SessionIdentity {
    /// Derive the identity from a snapshot's first two formations.
    ///
    /// Returns `None` when the snapshot carries fewer than two formations.
    pub fn derive(snapshot: &Snapshot, local_participant_id: ParticipantId) -> Option<Self> {
        let (a, b) = snapshot.participants()?;
        Some(Self {
            session_id: snapshot.session_id,
            local_participant_id,
            left_participant_id: a.min(b),
            right_participant_id: a.max(b),
        })
    }

    /// The side a participant plays on, if they belong to this session.
    pub fn side_of(&self, participant: ParticipantId) -> Option<Side> {
        if participant == self.left_participant_id {
            Some(Side::Left)
        } else if participant == self.right_participant_id {
            Some(Side::Right)
        } else {
            None
        }
    }

    /// The local participant's side.
    pub fn local_side(&self) -> Option<Side> {
        self.side_of(self.local_participant_id)
    }

    /// The other participant, when the local one is seated.
    pub fn opponent(&self) -> Option<ParticipantId> {
        match self.local_side()? {
            Side::Left => Some(self.right_participant_id),
            Side::Right => Some(self.left_participant_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::validate;
    use serde_json::json;

    fn snapshot_with(p1: u64, p2: u64) -> Snapshot {
        validate(&json!({
            "sessionId": 7,
            "status": "playing",
            "nextTurnIndicator": p1,
            "pieces": [],
            "formations": [{ "participantId": p1 }, { "participantId": p2 }],
        }))
        .unwrap()
    }

    #[test]
    fn ordering_is_independent_of_formation_order() {
        let forward = SessionIdentity::derive(&snapshot_with(3, 9), 3).unwrap();
        let reverse = SessionIdentity::derive(&snapshot_with(9, 3), 3).unwrap();
        assert_eq!(forward, reverse);
        assert_eq!(forward.left_participant_id, 3);
        assert_eq!(forward.right_participant_id, 9);
    }

    #[test]
    fn both_clients_agree_on_sides() {
        let snap = snapshot_with(42, 17);
        let a = SessionIdentity::derive(&snap, 42).unwrap();
        let b = SessionIdentity::derive(&snap, 17).unwrap();
        assert_eq!(a.left_participant_id, b.left_participant_id);
        assert_eq!(a.right_participant_id, b.right_participant_id);
        assert_eq!(a.local_side(), Some(Side::Right));
        assert_eq!(b.local_side(), Some(Side::Left));
        assert_eq!(a.opponent(), Some(17));
    }

    #[test]
    fn spectator_has_no_side() {
        let id = SessionIdentity::derive(&snapshot_with(3, 9), 5).unwrap();
        assert_eq!(id.local_side(), None);
        assert_eq!(id.opponent(), None);
    }
}
