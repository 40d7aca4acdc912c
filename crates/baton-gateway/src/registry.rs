//! Process-wide map of live sessions.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use baton_core::error::{BatonError, Result};

use crate::session_task::{SessionHandle, SessionSettings};

/// Creates and looks up sessions by identifier.
///
/// Sessions are never removed: each one, with its ticker, lives until the
/// process exits. Empty sessions cost one idle task.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionHandle>>,
    settings: SessionSettings,
}

impl SessionRegistry {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            settings,
        }
    }

    /// Create an empty session under a fresh identifier and start its task.
    pub async fn create(&self) -> String {
        let mut sessions = self.sessions.write().await;
        let session_id = loop {
            let candidate = Uuid::new_v4().to_string();
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
        };

        let handle = SessionHandle::spawn(session_id.clone(), self.settings.clone());
        sessions.insert(session_id.clone(), handle);
        crate::metrics::record_session_created();
        info!(%session_id, "Created new session");
        session_id
    }

    pub async fn lookup(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Like [`lookup`](Self::lookup), but an unknown identifier is an error.
    pub async fn get(&self, session_id: &str) -> Result<SessionHandle> {
        self.lookup(session_id)
            .await
            .ok_or_else(|| BatonError::SessionNotFound(session_id.to_string()))
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
