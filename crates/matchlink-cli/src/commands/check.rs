//! `matchlink check <session>`: fetch and validate a snapshot.
//!
//! Read-only: nothing is persisted and no channel is opened.

use anyhow::{Context, Result};
use matchlink_client::{HttpSnapshotSource, SnapshotSource};
use matchlink_core::{validate, SnapshotError};

use crate::config::Config;

pub async fn run(cfg: &Config, session_id: u64) -> Result<()> {
    let source = HttpSnapshotSource::new(cfg.server.api_base.clone());
    let raw = source
        .fetch(session_id)
        .await
        .with_context(|| format!("failed to fetch snapshot for session {session_id}"))?;

    println!("{}", describe(&raw));
    Ok(())
}

fn describe(raw: &serde_json::Value) -> String {
    match validate(raw) {
        Ok(snapshot) if snapshot.is_actionable() => {
            let (a, b) = snapshot.participants().unwrap_or_default();
            format!(
                "session {}: actionable ({} pieces, participants {} and {})",
                snapshot.session_id,
                snapshot.pieces.len(),
                a.min(b),
                a.max(b)
            )
        }
        Ok(snapshot) => format!(
            "session {}: valid, not started (status {:?})",
            snapshot.session_id, snapshot.status
        ),
        Err(SnapshotError::NotReady { formations }) => {
            format!("matchmaking incomplete ({formations} of 2 formations)")
        }
        Err(e) => format!("invalid snapshot: {e}"),
    }
}
