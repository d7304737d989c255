use thiserror::Error;

/// Structural problems found while validating a raw snapshot document.
///
/// `NotReady` is a classification rather than a fault: the session exists
/// but matchmaking has not produced two formations yet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("snapshot `pieces` is not a sequence")]
    PiecesNotSequence,

    #[error("snapshot `formations` is not a sequence")]
    FormationsNotSequence,

    #[error("snapshot `sessionId` is not numeric")]
    SessionIdNotNumeric,

    #[error("session not ready: {formations} of 2 formations chosen")]
    NotReady { formations: usize },

    #[error("both formation participant ids are empty")]
    InvalidParticipants,
}

impl SnapshotError {
    /// Whether this is the "matchmaking incomplete" classification.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady { .. })
    }
}

/// Errors produced by the matchlink sync layer.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid snapshot: {0}")]
    Validation(#[from] SnapshotError),

    #[error("snapshot fetch failed: {0}")]
    Fetch(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("missing session identity: {0}")]
    MissingIdentity(String),

    #[error("identity store error: {0}")]
    Store(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SyncResult<T> = Result<T, SyncError>;
