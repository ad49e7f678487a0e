//! Host session environment.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

/// What the host knows about its live browsing sessions.
#[async_trait]
pub trait SessionEnvironment: Send + Sync {
    /// URL of the page currently loaded in the session, if known.
    async fn resolve_session_url(&self, session_id: &str) -> Option<String>;

    async fn list_active_session_ids(&self) -> HashSet<String>;
}

/// In-process session table.
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: RwLock<HashMap<String, String>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or navigate) a session to `url`.
    pub async fn open(&self, session_id: impl Into<String>, url: impl Into<String>) {
        self.sessions.write().await.insert(session_id.into(), url.into());
    }

    /// End a session. Returns false if it was not open.
    pub async fn close(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }
}

#[async_trait]
impl SessionEnvironment for SessionTable {
    async fn resolve_session_url(&self, session_id: &str) -> Option<String> {
        self.sessions.read().await.get(session_id).cloned()
    }

    async fn list_active_session_ids(&self) -> HashSet<String> {
        self.sessions.read().await.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_resolve_close() {
        let table = SessionTable::new();
        table.open("s1", "https://app.test/").await;

        assert_eq!(table.resolve_session_url("s1").await.as_deref(), Some("https://app.test/"));
        assert!(table.list_active_session_ids().await.contains("s1"));

        assert!(table.close("s1").await);
        assert!(!table.close("s1").await);
        assert!(table.resolve_session_url("s1").await.is_none());
        assert!(table.list_active_session_ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_open_again_navigates() {
        let table = SessionTable::new();
        table.open("s1", "https://app.test/a.html").await;
        table.open("s1", "https://app.test/b.html").await;
        assert_eq!(table.resolve_session_url("s1").await.as_deref(), Some("https://app.test/b.html"));
    }
}
