//! Session model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-side session, correlated to the browser through a cookie.
///
/// The `is_authenticated` flag has a lifecycle independent from the stored
/// token: it is a UX gate only, the token itself is the source of truth for
/// whether brokerage calls can be made.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session ID (cookie value)
    pub id: String,
    /// Whether this session completed a login handshake
    pub is_authenticated: bool,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}
