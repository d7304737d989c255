//! matchlink: headless session participant.
//!
//! Bootstraps a two-player session from the snapshot API, joins the
//! session's relay channel and exchanges actions with the opponent from
//! the terminal.

mod commands;
mod config;
mod console;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// matchlink: session sync client
#[derive(Parser)]
#[command(name = "matchlink", version = "0.1.0", about = "Join a two-player session and relay actions over WebSocket")]
struct Cli {
    /// Config file path
    #[arg(long = "config", global = true)]
    config: Option<String>,

    /// Snapshot API base URL (overrides config)
    #[arg(long = "api-base", global = true)]
    api_base: Option<String>,

    /// Relay base URL (overrides config)
    #[arg(long = "relay-base", global = true)]
    relay_base: Option<String>,

    /// Log level filter (overrides RUST_LOG)
    #[arg(long = "log-level", global = true)]
    log_level: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Bootstrap a session and relay actions until it ends
    Play {
        /// Session id (defaults to the stored identity)
        #[arg(short, long)]
        session: Option<u64>,

        /// Local participant id (defaults to the stored identity)
        #[arg(short, long)]
        participant: Option<u64>,

        /// Keep polling the snapshot until the session is actionable
        #[arg(short, long)]
        wait: bool,

        /// Give up waiting after this many polls
        #[arg(long = "max-polls", requires = "wait")]
        max_polls: Option<u32>,
    },

    /// Fetch and validate a session snapshot without joining
    Check {
        /// Session id
        session: u64,
    },

    /// Show the stored session identity
    Whoami,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing.
    let filter = match &cli.log_level {
        Some(level) => EnvFilter::new(level),
        None if cli.verbose => {
            EnvFilter::new("matchlink=debug,matchlink_cli=debug,matchlink_client=debug,matchlink_core=debug")
        }
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("matchlink=warn,matchlink_cli=warn,matchlink_client=warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.verbose)
        .init();

    // Load config file; CLI flags override.
    let config_path = cli.config.clone().unwrap_or_else(config::default_path);
    let mut cfg = match config::Config::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("matchlink: {e:#}");
            std::process::exit(1);
        }
    };
    if let Some(api_base) = cli.api_base {
        cfg.server.api_base = api_base;
    }
    if let Some(relay_base) = cli.relay_base {
        cfg.server.relay_base = relay_base;
    }

    let result = match cli.command {
        Command::Play {
            session,
            participant,
            wait,
            max_polls,
        } => commands::play::run(&cfg, session, participant, wait, max_polls).await,
        Command::Check { session } => commands::check::run(&cfg, session).await,
        Command::Whoami => commands::whoami::run(&cfg),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        eprintln!("matchlink: {e:#}");
        std::process::exit(1);
    }
}
