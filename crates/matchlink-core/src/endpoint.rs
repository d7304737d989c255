//! URL layout shared by clients and the relay.
//!
//! - snapshot: `{api_base}/snapshot/{session_id}`
//! - channel:  `{relay_base}/ws/{session_id}/{participant_id}`

use crate::identity::{ParticipantId, SessionId};

/// URL of the snapshot document for a session.
pub fn snapshot_url(api_base: &str, session_id: SessionId) -> String {
    format!("{}/snapshot/{session_id}", api_base.trim_end_matches('/'))
}

/// URL of the relay channel for a participant in a session.
pub fn channel_url(relay_base: &str, session_id: SessionId, participant: ParticipantId) -> String {
    format!(
        "{}/ws/{session_id}/{participant}",
        relay_base.trim_end_matches('/')
    )
}

/// Parse a channel request path under `prefix` back into its ids.
///
/// `parse_channel_path("/api/ws/7/3", "/api") == Some((7, 3))`
pub fn parse_channel_path(path: &str, prefix: &str) -> Option<(SessionId, ParticipantId)> {
    let path = path.split('?').next().unwrap_or(path);
    let rest = path.strip_prefix(prefix.trim_end_matches('/'))?;
    // The prefix must end on a segment boundary.
    if !rest.is_empty() && !rest.starts_with('/') {
        return None;
    }
    let mut parts = rest.trim_start_matches('/').split('/');

    if parts.next()? != "ws" {
        return None;
    }
    let session_id = parts.next()?.parse().ok()?;
    let participant = parts.next()?.parse().ok()?;
    if parts.next().is_some_and(|p| !p.is_empty()) {
        return None;
    }
    Some((session_id, participant))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_urls() {
        assert_eq!(
            snapshot_url("http://localhost:3000/api/", 7),
            "http://localhost:3000/api/snapshot/7"
        );
        assert_eq!(
            channel_url("ws://localhost:3000/api", 7, 3),
            "ws://localhost:3000/api/ws/7/3"
        );
    }

    #[test]
    fn parses_channel_paths() {
        assert_eq!(parse_channel_path("/api/ws/7/3", "/api"), Some((7, 3)));
        assert_eq!(parse_channel_path("/api/ws/7/3/", "/api/"), Some((7, 3)));
        assert_eq!(parse_channel_path("/ws/12/40?t=1", ""), Some((12, 40)));
    }

    #[test]
    fn rejects_other_paths() {
        assert_eq!(parse_channel_path("/api/ws/7", "/api"), None);
        assert_eq!(parse_channel_path("/api/ws/x/3", "/api"), None);
        assert_eq!(parse_channel_path("/api/snapshot/7", "/api"), None);
        assert_eq!(parse_channel_path("/other/ws/7/3", "/api"), None);
        assert_eq!(parse_channel_path("/api/ws/7/3/extra", "/api"), None);
        assert_eq!(parse_channel_path("/apiws/7/3", "/api"), None);
        assert_eq!(parse_channel_path("/apix/ws/7/3", "/api"), None);
    }
}
