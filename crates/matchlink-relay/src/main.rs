//! matchlink-relay: session relay server.
//!
//! Broadcasts every frame a participant sends to all participants of the
//! same session.

use std::net::SocketAddr;

use clap::Parser;
use matchlink_relay::{RelayConfig, RelayServer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// matchlink-relay: per-session WebSocket relay
#[derive(Parser, Debug)]
#[command(name = "matchlink-relay", version, about = "Per-session WebSocket relay")]
struct Cli {
    /// Listen address
    #[arg(short, long, default_value = "127.0.0.1:3000")]
    bind: SocketAddr,

    /// Path prefix for channel URLs
    #[arg(long, default_value = "/api")]
    prefix: String,

    /// Frames buffered per subscriber
    #[arg(long, default_value_t = 256)]
    capacity: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let config = RelayConfig {
        bind: cli.bind,
        prefix: cli.prefix,
        capacity: cli.capacity,
    };

    let server = match RelayServer::bind(config).await {
        Ok(server) => server,
        Err(e) => {
            error!("failed to start relay: {e}");
            std::process::exit(1);
        }
    };

    tokio::select! {
        result = server.serve() => {
            if let Err(e) = result {
                error!("relay error: {e}");
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
        }
    }
}
