//! Connection seam under the relay channel.
//!
//! A `Connector` opens one physical connection per call and hands back its
//! two halves. The relay channel never reuses a `Connection`: every
//! reconnect asks the connector for a fresh one.

pub mod websocket;

pub use websocket::WsConnector;

use futures_util::future::BoxFuture;
use matchlink_core::SyncResult;

/// Outbound half of a connection, carrying text frames.
pub trait FrameSink: Send {
    /// Write one text frame.
    fn send_text(&mut self, text: String) -> BoxFuture<'_, SyncResult<()>>;

    /// Close the connection from our side.
    fn close(&mut self) -> BoxFuture<'_, SyncResult<()>>;
}

/// Inbound half of a connection.
pub trait FrameStream: Send {
    /// Next text frame. `None` once the peer has closed the connection.
    ///
    /// Must be cancel-safe: the channel polls it inside `tokio::select!`.
    fn next_frame(&mut self) -> BoxFuture<'_, Option<SyncResult<String>>>;
}

/// One physical connection, split into halves.
pub struct Connection {
    pub sink: Box<dyn FrameSink>,
    pub stream: Box<dyn FrameStream>,
}

/// Opens connections to a channel endpoint.
pub trait Connector: Send + Sync {
    fn open<'a>(&'a self, endpoint: &'a str) -> BoxFuture<'a, SyncResult<Connection>>;
}
