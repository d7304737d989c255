//! matchlink-client: real-time synchronization core for a two-participant
//! turn-based game.
//!
//! Bootstraps a session from the server snapshot, keeps one relay channel
//! alive across drops, and routes relayed envelopes into the local engine.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use matchlink_client::{
//!     EngineBridge, FileIdentityStore, HttpSnapshotSource, SessionBootstrapper,
//!     SessionConfig, StartOutcome, SyncSession, WsConnector,
//! };
//!
//! # async fn example(engine: Arc<dyn EngineBridge>) -> matchlink_core::SyncResult<()> {
//! let bootstrapper = SessionBootstrapper::new(
//!     Arc::new(HttpSnapshotSource::new("http://127.0.0.1:3000/api")),
//!     Arc::new(FileIdentityStore::default_location()?),
//!     engine.clone(),
//! );
//! let config = SessionConfig::new("ws://127.0.0.1:3000/api");
//!
//! match SyncSession::start(&bootstrapper, engine, Arc::new(WsConnector::default()), &config, 7, 3).await? {
//!     StartOutcome::Live(mut session) => session.run().await?,
//!     StartOutcome::Waiting(reason) => println!("waiting: {reason}"),
//!     StartOutcome::Invalid(err) => println!("invalid snapshot: {err}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod channel;
pub mod engine;
pub mod router;
pub mod session;
pub mod source;
pub mod store;
pub mod transport;

// Re-export primary public types.
pub use bootstrap::{Outcome, SessionBootstrapper, WaitReason};
pub use channel::{ChannelEvent, ChannelEvents, ChannelState, HandleId, RelayChannel, RetryPolicy};
pub use engine::EngineBridge;
pub use router::{MessageRouter, OutboundHook, Routed};
pub use session::{SessionConfig, StartOutcome, SyncSession};
pub use source::{HttpSnapshotSource, SnapshotSource, StaticSnapshotSource};
pub use store::{FileIdentityStore, IdentityStore, MemoryIdentityStore};
pub use transport::{Connection, Connector, FrameSink, FrameStream, WsConnector};

// Re-export matchlink-core error types for convenience.
pub use matchlink_core::{SyncError, SyncResult};
