//! Client configuration at `~/.matchlink/config.toml`.
//!
//! Provides server endpoints, the reconnect policy and where the session
//! identity is persisted. CLI flags always override config file values.

use anyhow::{Context, Result};
use matchlink_client::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Top-level config file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub reconnect: ReconnectConfig,

    #[serde(default)]
    pub session: SessionSection,
}

/// Snapshot API and relay endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_relay_base")]
    pub relay_base: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            relay_base: default_relay_base(),
        }
    }
}

/// Relay reconnect policy. Fixed delay, bounded attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl ReconnectConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delay: Duration::from_millis(self.delay_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSection {
    /// Identity file (empty = `~/.matchlink/session.toml`).
    #[serde(default)]
    pub identity_path: String,

    /// Snapshot polling interval while waiting for an opponent.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            identity_path: String::new(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_api_base() -> String {
    "http://127.0.0.1:3000/api".to_string()
}

fn default_relay_base() -> String {
    "ws://127.0.0.1:3000/api".to_string()
}

fn default_max_attempts() -> u32 {
    5
}

fn default_delay_ms() -> u64 {
    3000
}

fn default_poll_interval_ms() -> u64 {
    2000
}

impl Config {
    /// Load configuration from a TOML file, returning defaults if the file
    /// does not exist.
    pub fn load(path: &str) -> Result<Self> {
        let path = Path::new(path);
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;

        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Where the session identity lives.
    pub fn identity_path(&self) -> Result<PathBuf> {
        if !self.session.identity_path.is_empty() {
            return Ok(PathBuf::from(&self.session.identity_path));
        }
        let home = dirs::home_dir().context("cannot determine home directory")?;
        Ok(home.join(".matchlink").join("session.toml"))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.session.poll_interval_ms)
    }
}

/// Default config file location.
pub fn default_path() -> String {
    let home = dirs::home_dir().unwrap_or_default();
    home.join(".matchlink")
        .join("config.toml")
        .to_string_lossy()
        .to_string()
}
