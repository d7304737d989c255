//! `matchlink play`: bootstrap a session and relay actions until it ends.
//!
//! Ids not given on the command line come from the stored identity. Once
//! the session is live, stdin lines become outbound actions and remote
//! actions are printed. Ctrl-C closes the channel.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use matchlink_client::{
    FileIdentityStore, HttpSnapshotSource, IdentityStore, SessionBootstrapper, SessionConfig,
    StartOutcome, SyncSession, WsConnector,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::config::Config;
use crate::console::ConsoleEngine;

pub async fn run(
    cfg: &Config,
    session: Option<u64>,
    participant: Option<u64>,
    wait: bool,
    max_polls: Option<u32>,
) -> Result<()> {
    let store = Arc::new(FileIdentityStore::new(cfg.identity_path()?));
    let stored = store.load().context("failed to read stored identity")?;

    let session_id = session
        .or_else(|| stored.as_ref().map(|i| i.session_id))
        .context("no session id: pass --session")?;
    let participant_id = participant
        .or_else(|| stored.as_ref().map(|i| i.local_participant_id))
        .context("no participant id: pass --participant")?;
    info!(session_id, participant_id, "joining session");

    let engine = Arc::new(ConsoleEngine::default());
    let bootstrapper = SessionBootstrapper::new(
        Arc::new(HttpSnapshotSource::new(cfg.server.api_base.clone())),
        store,
        engine.clone(),
    );

    let mut session_config = SessionConfig::new(cfg.server.relay_base.clone());
    session_config.retry = cfg.reconnect.policy();
    if wait {
        session_config.poll_interval = Some(cfg.poll_interval());
        session_config.max_polls = max_polls;
    }

    let outcome = SyncSession::start(
        &bootstrapper,
        engine.clone(),
        Arc::new(WsConnector::default()),
        &session_config,
        session_id,
        participant_id,
    )
    .await
    .with_context(|| format!("failed to bootstrap session {session_id}"))?;

    let mut session = match outcome {
        StartOutcome::Live(session) => session,
        StartOutcome::Waiting(reason) => {
            println!("session {session_id} is not ready: {reason}");
            return Ok(());
        }
        StartOutcome::Invalid(e) => bail!("session {session_id} has an invalid snapshot: {e}"),
    };

    let identity = session.identity().clone();
    println!(
        "joined session {} as {} (left {}, right {})",
        identity.session_id,
        identity.local_participant_id,
        identity.left_participant_id,
        identity.right_participant_id
    );

    let input_engine = engine.clone();
    let input = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if !input_engine.submit(&line) {
                eprintln!("matchlink: not connected, action dropped");
            }
        }
        debug!("stdin closed");
    });

    let channel = session.channel().clone();
    let result = tokio::select! {
        result = session.run() => result.context("session ended"),
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, closing channel");
            channel.close();
            Ok(())
        }
    };

    input.abort();
    result
}
