//! In-memory session store
//!
//! Sessions are cookie-correlated server state with a single authentication
//! flag. They live in process memory: restarting the server logs everyone
//! out, which is acceptable here because the stored brokerage token, not the
//! session, is the source of truth for capability.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::Session;

/// Store for active sessions, keyed by session id
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl_hours: i64,
}

impl SessionStore {
    /// Create a store whose sessions live for `ttl_hours`
    pub fn new(ttl_hours: i64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl_hours,
        }
    }

    /// Create a fresh, unauthenticated session
    pub async fn create(&self) -> Session {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            is_authenticated: false,
            expires_at: now + Duration::hours(self.ttl_hours),
            created_at: now,
        };

        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id.clone(), session.clone());
        session
    }

    /// Look up a session by id. Expired sessions are dropped on access and
    /// read as absent.
    pub async fn get(&self, id: &str) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        match sessions.get(id) {
            Some(session) if session.is_expired() => {
                sessions.remove(id);
                None
            }
            Some(session) => Some(session.clone()),
            None => None,
        }
    }

    /// Flip the authentication flag. Returns false when the session does not
    /// exist (or has expired).
    pub async fn set_authenticated(&self, id: &str, is_authenticated: bool) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(id) {
            Some(session) if !session.is_expired() => {
                session.is_authenticated = is_authenticated;
                true
            }
            _ => false,
        }
    }

    /// Destroy a session. Destroying an absent session is a no-op.
    pub async fn destroy(&self, id: &str) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(id);
    }

    /// Drop expired sessions (should be called periodically)
    pub async fn cleanup(&self) {
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, session| !session.is_expired());
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
