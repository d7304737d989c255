//! matchlink-core: Shared protocol library for two-participant session sync.
//!
//! Provides the snapshot model and its validator, the wire envelope that
//! carries player actions over the relay, the session identity derived at
//! bootstrap, and endpoint addressing shared by clients and the relay.

pub mod endpoint;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod snapshot;

// Re-export commonly used items at crate root.
pub use envelope::{Envelope, EnvelopeKind, Payload};
pub use error::{SnapshotError, SyncError, SyncResult};
pub use identity::{ParticipantId, SessionId, SessionIdentity};
pub use snapshot::{validate, Formation, Snapshot, SnapshotStatus};
