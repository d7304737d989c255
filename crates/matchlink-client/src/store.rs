//! Persisted session identity.
//!
//! Survives restarts so a reload can find its session and participant id.
//! Saving always replaces the stored identity wholesale.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use matchlink_core::{SessionIdentity, SyncError, SyncResult};

/// Key/value storage for the session identity.
pub trait IdentityStore: Send + Sync {
    fn load(&self) -> SyncResult<Option<SessionIdentity>>;
    fn save(&self, identity: &SessionIdentity) -> SyncResult<()>;
}

/// TOML file store, by default at `~/.matchlink/session.toml`.
#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_location() -> SyncResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| SyncError::Store("cannot determine home directory".into()))?;
        Ok(Self::new(home.join(".matchlink").join("session.toml")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IdentityStore for FileIdentityStore {
    fn load(&self) -> SyncResult<Option<SessionIdentity>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        let identity = toml::from_str(&content).map_err(|e| {
            SyncError::Store(format!("failed to parse {}: {e}", self.path.display()))
        })?;
        Ok(Some(identity))
    }

    fn save(&self, identity: &SessionIdentity) -> SyncResult<()> {
        let content = toml::to_string_pretty(identity)
            .map_err(|e| SyncError::Store(format!("failed to serialize identity: {e}")))?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, content)?;
        debug!(path = %self.path.display(), session_id = identity.session_id, "saved session identity");
        Ok(())
    }
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    slot: Mutex<Option<SessionIdentity>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn load(&self) -> SyncResult<Option<SessionIdentity>> {
        Ok(self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, identity: &SessionIdentity) -> SyncResult<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(identity.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(session_id: u64) -> SessionIdentity {
        SessionIdentity {
            session_id,
            local_participant_id: 3,
            left_participant_id: 3,
            right_participant_id: 9,
        }
    }

    #[test]
    fn file_store_round_trips_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileIdentityStore::new(dir.path().join("nested").join("session.toml"));
        assert_eq!(store.load().unwrap(), None);

        store.save(&identity(7)).unwrap();
        assert_eq!(store.load().unwrap(), Some(identity(7)));

        store.save(&identity(8)).unwrap();
        assert_eq!(store.load().unwrap(), Some(identity(8)));
    }

    #[test]
    fn file_store_uses_plain_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileIdentityStore::new(dir.path().join("session.toml"));
        store.save(&identity(7)).unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("session_id = 7"));
        assert!(content.contains("left_participant_id = 3"));
        assert!(content.contains("right_participant_id = 9"));
    }

    #[test]
    fn corrupt_file_is_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");
        fs::write(&path, "session_id = \"seven\"").unwrap();
        assert!(matches!(
            FileIdentityStore::new(path).load(),
            Err(SyncError::Store(_))
        ));
    }

    #[test]
    fn memory_store_replaces_value() {
        let store = MemoryIdentityStore::new();
        store.save(&identity(7)).unwrap();
        store.save(&identity(8)).unwrap();
        assert_eq!(store.load().unwrap().unwrap().session_id, 8);
    }
}
