//! Where snapshot documents come from.

use std::collections::VecDeque;
use std::sync::Mutex;

use futures_util::future::BoxFuture;
use serde_json::Value;
use tracing::debug;

use matchlink_core::endpoint::snapshot_url;
use matchlink_core::{SessionId, SyncError, SyncResult};

/// Fetches the raw snapshot document for a session.
pub trait SnapshotSource: Send + Sync {
    fn fetch(&self, session_id: SessionId) -> BoxFuture<'_, SyncResult<Value>>;
}

/// Fetches snapshots from `GET {api_base}/snapshot/{session_id}`.
#[derive(Debug, Clone)]
pub struct HttpSnapshotSource {
    client: reqwest::Client,
    api_base: String,
}

impl HttpSnapshotSource {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_base)
    }

    pub fn with_client(client: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
        }
    }
}

impl SnapshotSource for HttpSnapshotSource {
    fn fetch(&self, session_id: SessionId) -> BoxFuture<'_, SyncResult<Value>> {
        Box::pin(async move {
            let url = snapshot_url(&self.api_base, session_id);
            debug!(%url, "fetching snapshot");

            let response = self
                .client
                .get(&url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| SyncError::Fetch(format!("GET {url}: {e}")))?;

            response
                .json::<Value>()
                .await
                .map_err(|e| SyncError::Fetch(format!("decoding snapshot from {url}: {e}")))
        })
    }
}

/// Serves documents from memory, in order.
///
/// Each fetch takes the next document; the last one keeps being served once
/// the queue is down to it. Useful for demos and for exercising polling.
#[derive(Debug, Default)]
pub struct StaticSnapshotSource {
    documents: Mutex<VecDeque<Value>>,
}

impl StaticSnapshotSource {
    pub fn new(documents: impl IntoIterator<Item = Value>) -> Self {
        Self {
            documents: Mutex::new(documents.into_iter().collect()),
        }
    }

    pub fn single(document: Value) -> Self {
        Self::new([document])
    }
}

impl SnapshotSource for StaticSnapshotSource {
    fn fetch(&self, session_id: SessionId) -> BoxFuture<'_, SyncResult<Value>> {
        let next = {
            let mut docs = self
                .documents
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if docs.len() > 1 {
                docs.pop_front()
            } else {
                docs.front().cloned()
            }
        };
        Box::pin(async move {
            next.ok_or_else(|| SyncError::Fetch(format!("no snapshot for session {session_id}")))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn static_source_repeats_last_document() {
        let source = StaticSnapshotSource::new([json!({ "n": 1 }), json!({ "n": 2 })]);
        assert_eq!(source.fetch(7).await.unwrap(), json!({ "n": 1 }));
        assert_eq!(source.fetch(7).await.unwrap(), json!({ "n": 2 }));
        assert_eq!(source.fetch(7).await.unwrap(), json!({ "n": 2 }));
    }

    #[tokio::test]
    async fn empty_static_source_is_fetch_error() {
        let source = StaticSnapshotSource::default();
        assert!(matches!(source.fetch(7).await, Err(SyncError::Fetch(_))));
    }

    #[tokio::test]
    async fn unreachable_http_source_is_fetch_error() {
        // Port 9 (discard) on loopback is closed on any sane test host.
        let source = HttpSnapshotSource::new("http://127.0.0.1:9/api");
        assert!(matches!(source.fetch(7).await, Err(SyncError::Fetch(_))));
    }
}
