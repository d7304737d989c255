//! WebSocket relay server.
//!
//! Accepts upgrades on `{prefix}/ws/{session}/{participant}` and rejects
//! every other path with 404. Each accepted client gets a forwarding task
//! (session broadcast → socket) while its inbound frames are published to
//! the session.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use matchlink_core::endpoint::parse_channel_path;
use matchlink_core::{ParticipantId, SessionId, SyncError, SyncResult};

use crate::hub::SessionHub;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind: SocketAddr,
    /// Path prefix in front of `/ws/...`, e.g. `/api`.
    pub prefix: String,
    /// Per-subscriber broadcast buffer.
    pub capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            prefix: "/api".to_string(),
            capacity: 256,
        }
    }
}

pub struct RelayServer {
    listener: TcpListener,
    hub: Arc<SessionHub>,
    prefix: Arc<str>,
}

impl RelayServer {
    pub async fn bind(config: RelayConfig) -> SyncResult<Self> {
        let listener = TcpListener::bind(config.bind)
            .await
            .map_err(|e| SyncError::Transport(format!("relay bind failed: {e}")))?;
        Ok(Self {
            listener,
            hub: Arc::new(SessionHub::new(config.capacity)),
            prefix: config.prefix.into(),
        })
    }

    pub fn local_addr(&self) -> SyncResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn hub(&self) -> Arc<SessionHub> {
        self.hub.clone()
    }

    /// Accept clients until the task is dropped.
    pub async fn serve(self) -> SyncResult<()> {
        info!(addr = %self.local_addr()?, prefix = %self.prefix, "relay listening");
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let hub = self.hub.clone();
                    let prefix = self.prefix.clone();
                    tokio::spawn(async move {
                        handle_client(stream, addr, hub, prefix).await;
                    });
                }
                Err(e) => {
                    error!(error = %e, "TCP accept failed");
                }
            }
        }
    }
}

async fn handle_client(stream: TcpStream, addr: SocketAddr, hub: Arc<SessionHub>, prefix: Arc<str>) {
    let mut route: Option<(SessionId, ParticipantId)> = None;
    let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        match parse_channel_path(req.uri().path(), &prefix) {
            Some(ids) => {
                route = Some(ids);
                Ok(resp)
            }
            None => {
                let mut err = ErrorResponse::new(Some(format!("no channel at {}", req.uri().path())));
                *err.status_mut() = StatusCode::NOT_FOUND;
                Err(err)
            }
        }
    };

    let ws = match tokio_tungstenite::accept_hdr_async(stream, callback).await {
        Ok(ws) => ws,
        Err(e) => {
            debug!(remote = %addr, error = %e, "WebSocket handshake rejected");
            return;
        }
    };
    let Some((session_id, participant_id)) = route else {
        return;
    };

    let (tx, mut rx) = hub.join(session_id).await;
    info!(remote = %addr, session_id, participant_id, "participant joined");

    let (mut sink, mut inbound) = ws.split();
    let forward = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(text) => {
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(session_id, participant_id, skipped, "subscriber lagging, frames dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    while let Some(message) = inbound.next().await {
        match message {
            Ok(Message::Text(text)) => {
                // Our own receiver keeps the channel non-empty.
                let _ = tx.send(text);
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(session_id, participant_id, error = %e, "WebSocket read failed");
                break;
            }
        }
    }

    forward.abort();
    let _ = forward.await;
    hub.leave(session_id).await;
    info!(remote = %addr, session_id, participant_id, "participant left");
}
