//! WebSocket connector built on tokio-tungstenite.
//!
//! Each relay frame is one WebSocket text message. Binary frames are ignored;
//! pings are answered by tungstenite while the stream is being read.

use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use matchlink_core::{SyncError, SyncResult};

use super::{Connection, Connector, FrameSink, FrameStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens relay connections over `ws://` or `wss://`.
#[derive(Debug, Clone)]
pub struct WsConnector {
    connect_timeout: Duration,
}

impl WsConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl Connector for WsConnector {
    fn open<'a>(&'a self, endpoint: &'a str) -> BoxFuture<'a, SyncResult<Connection>> {
        Box::pin(async move {
            let (ws, _response) = tokio::time::timeout(self.connect_timeout, connect_async(endpoint))
                .await
                .map_err(|_| SyncError::Transport(format!("WebSocket connect to {endpoint} timed out")))?
                .map_err(|e| SyncError::Transport(format!("WebSocket connect error: {e}")))?;

            tracing::debug!("WebSocket connected to {}", endpoint);

            let (sink, stream) = ws.split();
            Ok(Connection {
                sink: Box::new(WsSink { inner: sink }),
                stream: Box::new(WsReader { inner: stream }),
            })
        })
    }
}

struct WsSink {
    inner: SplitSink<WsStream, Message>,
}

impl FrameSink for WsSink {
    fn send_text(&mut self, text: String) -> BoxFuture<'_, SyncResult<()>> {
        Box::pin(async move {
            self.inner
                .send(Message::Text(text))
                .await
                .map_err(|e| SyncError::Transport(format!("WS write error: {e}")))
        })
    }

    fn close(&mut self) -> BoxFuture<'_, SyncResult<()>> {
        Box::pin(async move {
            let _ = self.inner.send(Message::Close(None)).await;
            Ok(())
        })
    }
}

struct WsReader {
    inner: SplitStream<WsStream>,
}

impl FrameStream for WsReader {
    fn next_frame(&mut self) -> BoxFuture<'_, Option<SyncResult<String>>> {
        Box::pin(async move {
            loop {
                match self.inner.next().await? {
                    Ok(Message::Text(text)) => return Some(Ok(text)),
                    Ok(Message::Close(frame)) => {
                        tracing::debug!("WebSocket close frame received: {:?}", frame);
                        return None;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        return Some(Err(SyncError::Transport(format!("WS read error: {e}"))))
                    }
                }
            }
        })
    }
}
