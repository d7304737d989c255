//! Session bootstrap: fetch, validate, derive identity, initialize engine.
//!
//! Only an actionable snapshot persists an identity and touches the engine.
//! Anything else leaves both exactly as they were.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use matchlink_core::{
    validate, ParticipantId, SessionId, SessionIdentity, Snapshot, SnapshotError, SnapshotStatus,
    SyncError, SyncResult,
};

use crate::engine::EngineBridge;
use crate::source::SnapshotSource;
use crate::store::IdentityStore;

/// Why a session cannot go live yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitReason {
    /// Fewer than two formations have been chosen.
    MatchmakingIncomplete { formations: usize },
    /// Valid snapshot, but play has not started (or has no turn indicator).
    NotStarted { status: SnapshotStatus },
}

impl fmt::Display for WaitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MatchmakingIncomplete { formations } => {
                write!(f, "matchmaking incomplete ({formations} of 2 formations)")
            }
            Self::NotStarted { status } => write!(f, "session not started (status {status:?})"),
        }
    }
}

/// Result of one bootstrap attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Identity persisted and engine initialized; the channel may open.
    Ready {
        identity: SessionIdentity,
        snapshot: Snapshot,
    },
    /// Do not start the engine or the channel.
    Waiting(WaitReason),
    /// Structurally invalid snapshot. Not retried.
    Invalid(SnapshotError),
}

impl Outcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

pub struct SessionBootstrapper {
    source: Arc<dyn SnapshotSource>,
    store: Arc<dyn IdentityStore>,
    engine: Arc<dyn EngineBridge>,
}

impl SessionBootstrapper {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        store: Arc<dyn IdentityStore>,
        engine: Arc<dyn EngineBridge>,
    ) -> Self {
        Self {
            source,
            store,
            engine,
        }
    }

    /// Run one bootstrap attempt for `session_id` as `local_participant_id`.
    ///
    /// Fetch and storage failures are returned as errors; snapshot problems
    /// are reported through [`Outcome`].
    pub async fn bootstrap(
        &self,
        session_id: SessionId,
        local_participant_id: ParticipantId,
    ) -> SyncResult<Outcome> {
        if local_participant_id == 0 {
            return Err(SyncError::MissingIdentity(
                "local participant id is not set".into(),
            ));
        }

        let raw = self.source.fetch(session_id).await?;

        let snapshot = match validate(&raw) {
            Ok(snapshot) => snapshot,
            Err(SnapshotError::NotReady { formations }) => {
                debug!(session_id, formations, "session not ready");
                return Ok(Outcome::Waiting(WaitReason::MatchmakingIncomplete {
                    formations,
                }));
            }
            Err(e) => {
                warn!(session_id, error = %e, "snapshot rejected");
                return Ok(Outcome::Invalid(e));
            }
        };

        if !snapshot.is_actionable() {
            debug!(session_id, status = ?snapshot.status, "snapshot not actionable");
            return Ok(Outcome::Waiting(WaitReason::NotStarted {
                status: snapshot.status,
            }));
        }

        let Some(identity) = SessionIdentity::derive(&snapshot, local_participant_id) else {
            // Actionable implies two formations.
            return Ok(Outcome::Invalid(SnapshotError::NotReady {
                formations: snapshot.formations.len(),
            }));
        };

        self.store.save(&identity)?;
        self.engine.initialize(snapshot.document(), local_participant_id);

        info!(
            session_id = identity.session_id,
            participant_id = local_participant_id,
            left = identity.left_participant_id,
            right = identity.right_participant_id,
            "session bootstrapped"
        );

        Ok(Outcome::Ready { identity, snapshot })
    }

    /// Repeat [`bootstrap`](Self::bootstrap) while the session is waiting.
    ///
    /// Sleeps `interval` between polls. Returns the first non-waiting outcome,
    /// or the last `Waiting` once `max_polls` attempts have been made.
    pub async fn bootstrap_until_ready(
        &self,
        session_id: SessionId,
        local_participant_id: ParticipantId,
        interval: Duration,
        max_polls: Option<u32>,
    ) -> SyncResult<Outcome> {
        let mut polls = 0u32;
        loop {
            let outcome = self.bootstrap(session_id, local_participant_id).await?;
            polls += 1;

            let Outcome::Waiting(reason) = &outcome else {
                return Ok(outcome);
            };
            if max_polls.is_some_and(|max| polls >= max) {
                return Ok(outcome);
            }

            info!(session_id, polls, "{reason}; polling again");
            tokio::time::sleep(interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    use crate::router::tests::RecordingEngine;
    use crate::source::StaticSnapshotSource;
    use crate::store::MemoryIdentityStore;

    struct Fixture {
        bootstrapper: SessionBootstrapper,
        store: Arc<MemoryIdentityStore>,
        engine: Arc<RecordingEngine>,
    }

    fn fixture(documents: Vec<Value>) -> Fixture {
        let store = Arc::new(MemoryIdentityStore::new());
        let engine = Arc::new(RecordingEngine::default());
        let bootstrapper = SessionBootstrapper::new(
            Arc::new(StaticSnapshotSource::new(documents)),
            store.clone(),
            engine.clone(),
        );
        Fixture {
            bootstrapper,
            store,
            engine,
        }
    }

    fn playing(p1: u64, p2: u64) -> Value {
        json!({
            "sessionId": 7,
            "status": "playing",
            "nextTurnIndicator": 3,
            "pieces": [],
            "formations": [{ "participantId": p1 }, { "participantId": p2 }],
        })
    }

    #[tokio::test]
    async fn actionable_snapshot_is_ready() {
        let f = fixture(vec![playing(9, 3)]);
        let outcome = f.bootstrapper.bootstrap(7, 3).await.unwrap();

        let Outcome::Ready { identity, .. } = outcome else {
            panic!("expected Ready, got {outcome:?}");
        };
        assert_eq!(identity.left_participant_id, 3);
        assert_eq!(identity.right_participant_id, 9);
        assert_eq!(identity.local_participant_id, 3);
        assert_eq!(f.store.load().unwrap(), Some(identity));

        let initialized = f.engine.initialized.lock().unwrap();
        assert_eq!(*initialized, vec![(playing(9, 3), 3)]);
    }

    #[tokio::test]
    async fn single_formation_waits() {
        let f = fixture(vec![json!({
            "sessionId": 7,
            "status": "waiting",
            "pieces": [],
            "formations": [{ "participantId": 3 }],
        })]);
        let outcome = f.bootstrapper.bootstrap(7, 3).await.unwrap();
        assert_eq!(
            outcome,
            Outcome::Waiting(WaitReason::MatchmakingIncomplete { formations: 1 })
        );
        assert_eq!(f.engine.calls(), 0);
        assert_eq!(f.store.load().unwrap(), None);
    }

    #[tokio::test]
    async fn waiting_document_without_pieces_waits() {
        let f = fixture(vec![json!({
            "sessionId": 7,
            "status": "waiting",
            "formations": [{ "participantId": 3 }],
        })]);
        let outcome = f.bootstrapper.bootstrap(7, 3).await.unwrap();
        assert_eq!(
            outcome,
            Outcome::Waiting(WaitReason::MatchmakingIncomplete { formations: 1 })
        );
        assert_eq!(f.engine.calls(), 0);
        assert_eq!(f.store.load().unwrap(), None);
    }

    #[tokio::test]
    async fn non_playing_or_turnless_waits() {
        let mut finished = playing(9, 3);
        finished["status"] = json!("finished");
        let mut turnless = playing(9, 3);
        turnless["nextTurnIndicator"] = Value::Null;

        for doc in [finished, turnless] {
            let f = fixture(vec![doc]);
            let outcome = f.bootstrapper.bootstrap(7, 3).await.unwrap();
            assert!(matches!(outcome, Outcome::Waiting(WaitReason::NotStarted { .. })));
            assert_eq!(f.engine.calls(), 0);
            assert_eq!(f.store.load().unwrap(), None);
        }
    }

    #[tokio::test]
    async fn invalid_snapshot_keeps_previous_identity() {
        let f = fixture(vec![playing(9, 3), json!({ "pieces": "broken" })]);
        let first = f.bootstrapper.bootstrap(7, 3).await.unwrap();
        assert!(first.is_ready());
        let stored = f.store.load().unwrap();

        let second = f.bootstrapper.bootstrap(7, 3).await.unwrap();
        assert_eq!(second, Outcome::Invalid(SnapshotError::PiecesNotSequence));
        assert_eq!(f.store.load().unwrap(), stored);
        assert_eq!(f.engine.initialized.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_participants_are_invalid() {
        let f = fixture(vec![playing(0, 0)]);
        let outcome = f.bootstrapper.bootstrap(7, 3).await.unwrap();
        assert_eq!(outcome, Outcome::Invalid(SnapshotError::InvalidParticipants));
    }

    #[tokio::test]
    async fn rebootstrap_overwrites_identity() {
        let mut other = playing(12, 3);
        other["sessionId"] = json!(8);
        let f = fixture(vec![playing(9, 3), other]);

        f.bootstrapper.bootstrap(7, 3).await.unwrap();
        f.bootstrapper.bootstrap(8, 3).await.unwrap();

        let stored = f.store.load().unwrap().unwrap();
        assert_eq!(stored.session_id, 8);
        assert_eq!(stored.right_participant_id, 12);
    }

    #[tokio::test]
    async fn missing_local_id_is_rejected() {
        let f = fixture(vec![playing(9, 3)]);
        assert!(matches!(
            f.bootstrapper.bootstrap(7, 0).await,
            Err(SyncError::MissingIdentity(_))
        ));
    }

    #[tokio::test]
    async fn fetch_failure_is_an_error() {
        let f = fixture(vec![]);
        assert!(matches!(
            f.bootstrapper.bootstrap(7, 3).await,
            Err(SyncError::Fetch(_))
        ));
    }

    #[tokio::test]
    async fn polls_until_ready() {
        let waiting = json!({
            "sessionId": 7,
            "status": "waiting",
            "pieces": [],
            "formations": [{ "participantId": 3 }],
        });
        let f = fixture(vec![waiting.clone(), waiting, playing(9, 3)]);
        let outcome = f
            .bootstrapper
            .bootstrap_until_ready(7, 3, Duration::from_millis(1), None)
            .await
            .unwrap();
        assert!(outcome.is_ready());
        assert_eq!(f.engine.initialized.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn polling_gives_up_after_max_polls() {
        let waiting = json!({
            "sessionId": 7,
            "status": "waiting",
            "pieces": [],
            "formations": [],
        });
        let f = fixture(vec![waiting]);
        let outcome = f
            .bootstrapper
            .bootstrap_until_ready(7, 3, Duration::from_millis(1), Some(3))
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Waiting(_)));
        assert_eq!(f.engine.calls(), 0);
    }
}
