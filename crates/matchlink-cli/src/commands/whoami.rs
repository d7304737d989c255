//! `matchlink whoami`: print the persisted session identity.

use anyhow::{Context, Result};
use matchlink_client::{FileIdentityStore, IdentityStore};

use crate::config::Config;

pub fn run(cfg: &Config) -> Result<()> {
    let store = FileIdentityStore::new(cfg.identity_path()?);
    let identity = store
        .load()
        .with_context(|| format!("failed to read identity at {}", store.path().display()))?;

    match identity {
        Some(identity) => {
            println!("session:     {}", identity.session_id);
            let side = identity
                .local_side()
                .map_or_else(|| "unassigned".to_string(), |side| format!("{side:?}").to_lowercase());
            println!("participant: {} ({side})", identity.local_participant_id);
            println!("left:        {}", identity.left_participant_id);
            println!("right:       {}", identity.right_participant_id);
        }
        None => println!("no stored identity at {}", store.path().display()),
    }
    Ok(())
}
