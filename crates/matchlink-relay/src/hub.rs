//! Session registry: one broadcast channel per live session.

use std::collections::HashMap;

use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use matchlink_core::SessionId;

/// Broadcast channels indexed by session id.
///
/// A session's channel exists while at least one client is subscribed.
pub struct SessionHub {
    sessions: RwLock<HashMap<SessionId, broadcast::Sender<String>>>,
    /// Frames buffered per subscriber before a slow reader starts lagging.
    capacity: usize,
}

impl SessionHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to a session, creating its channel on first join.
    pub async fn join(
        &self,
        session_id: SessionId,
    ) -> (broadcast::Sender<String>, broadcast::Receiver<String>) {
        let mut sessions = self.sessions.write().await;
        let tx = sessions
            .entry(session_id)
            .or_insert_with(|| {
                debug!(session_id, "session channel created");
                broadcast::channel(self.capacity).0
            })
            .clone();
        let rx = tx.subscribe();
        (tx, rx)
    }

    /// Forget a session once its last subscriber is gone.
    ///
    /// Call after dropping the leaving client's receiver. Returns `true` if
    /// the session channel was removed.
    pub async fn leave(&self, session_id: SessionId) -> bool {
        let mut sessions = self.sessions.write().await;
        let empty = sessions
            .get(&session_id)
            .is_some_and(|tx| tx.receiver_count() == 0);
        if empty {
            sessions.remove(&session_id);
            debug!(session_id, "session channel removed");
        }
        empty
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn subscriber_count(&self, session_id: SessionId) -> usize {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .map_or(0, broadcast::Sender::receiver_count)
    }
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_reach_every_subscriber_of_a_session() {
        let hub = SessionHub::default();
        let (tx, mut a) = hub.join(7).await;
        let (_, mut b) = hub.join(7).await;

        tx.send("move".to_string()).unwrap();
        assert_eq!(a.recv().await.unwrap(), "move");
        assert_eq!(b.recv().await.unwrap(), "move");
        assert_eq!(hub.subscriber_count(7).await, 2);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let hub = SessionHub::default();
        let (tx7, _rx7) = hub.join(7).await;
        let (_, mut rx8) = hub.join(8).await;

        tx7.send("move".to_string()).unwrap();
        assert!(rx8.try_recv().is_err());
        assert_eq!(hub.session_count().await, 2);
    }

    #[tokio::test]
    async fn last_leave_removes_session() {
        let hub = SessionHub::default();
        let (_, a) = hub.join(7).await;
        let (_, b) = hub.join(7).await;

        drop(a);
        assert!(!hub.leave(7).await);
        assert_eq!(hub.session_count().await, 1);

        drop(b);
        assert!(hub.leave(7).await);
        assert_eq!(hub.session_count().await, 0);
        assert!(!hub.leave(7).await);
    }

    #[tokio::test]
    async fn slow_subscriber_lags() {
        let hub = SessionHub::new(2);
        let (tx, mut rx) = hub.join(7).await;
        for i in 0..4 {
            tx.send(i.to_string()).unwrap();
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(2))
        ));
        assert_eq!(rx.recv().await.unwrap(), "2");
    }
}
