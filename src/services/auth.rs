//! Auth session binder
//!
//! Reconciles three pieces of state behind the check/login/logout entry
//! points: the external OAuth service, the single-slot token store and the
//! server-side session flag. The session flag is a UX gate; the stored token
//! is the source of truth for whether brokerage calls can be made, and the
//! two may desynchronize (a token can expire while a session stays flagged).
//! `check_auth` surfaces both so the caller can re-trigger `login`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::services::kiwoom::{KiwoomApiError, KiwoomAuthApi};
use crate::services::session::SessionStore;
use crate::services::token_store::{TokenStore, TokenStoreError};

/// Error types for auth binder operations
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    /// The external service refused to issue a token, or was unreachable.
    /// `code` carries the brokerage's own error code verbatim when available.
    #[error("Token issuance failed: {message}")]
    Issuance {
        code: Option<String>,
        message: String,
    },

    /// Local token storage failed; fatal to the login attempt
    #[error("Token storage failed: {0}")]
    Storage(#[from] TokenStoreError),

    /// The session to bind does not exist (or expired mid-flight)
    #[error("Session not found")]
    SessionNotFound,
}

impl From<KiwoomApiError> for AuthServiceError {
    fn from(e: KiwoomApiError) -> Self {
        match e {
            KiwoomApiError::Api { code, message } => Self::Issuance {
                code: Some(code),
                message,
            },
            KiwoomApiError::Transport(message) => Self::Issuance {
                code: None,
                message,
            },
        }
    }
}

/// Combined authentication status for a session
#[derive(Debug, Clone, Serialize)]
pub struct AuthStatus {
    /// Session flag only: whether this session completed a login handshake
    pub is_authenticated: bool,
    /// Whether a valid (unexpired) token is currently stored
    pub has_valid_token: bool,
    /// Expiry of the stored token, when one exists
    pub token_expiry: Option<DateTime<Utc>>,
}

/// Successful login outcome
#[derive(Debug, Clone)]
pub struct LoginSuccess {
    /// True when a stored valid token was reused without a network call
    pub reused: bool,
    /// Expiry of the token now backing the session
    pub token_expiry: Option<DateTime<Utc>>,
}

/// Binds OAuth token state to HTTP sessions
pub struct AuthService {
    store: Arc<TokenStore>,
    api: Arc<dyn KiwoomAuthApi>,
    sessions: Arc<SessionStore>,
}

impl AuthService {
    pub fn new(
        store: Arc<TokenStore>,
        api: Arc<dyn KiwoomAuthApi>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            store,
            api,
            sessions,
        }
    }

    /// Combine the session flag with token store state.
    ///
    /// Read-only apart from the store's own lazy-expiry cleanup.
    pub async fn check_auth(&self, session_id: Option<&str>) -> AuthStatus {
        let is_authenticated = match session_id {
            Some(id) => self
                .sessions
                .get(id)
                .await
                .map(|session| session.is_authenticated)
                .unwrap_or(false),
            None => false,
        };

        let record = self.store.load();
        let token_expiry = record.as_ref().and_then(|r| r.expires_at());

        AuthStatus {
            is_authenticated,
            has_valid_token: record.is_some(),
            token_expiry,
        }
    }

    /// Log the session in, reusing a stored valid token when one exists and
    /// calling the external issuance endpoint otherwise.
    ///
    /// On issuance failure nothing is persisted and the session flag is left
    /// untouched.
    pub async fn login(&self, session_id: &str) -> Result<LoginSuccess, AuthServiceError> {
        if let Some(record) = self.store.load() {
            if !self.sessions.set_authenticated(session_id, true).await {
                return Err(AuthServiceError::SessionNotFound);
            }
            tracing::info!(session_id, "login reused stored access token");
            return Ok(LoginSuccess {
                reused: true,
                token_expiry: record.expires_at(),
            });
        }

        let payload = self.api.issue_token().await.map_err(|e| {
            tracing::warn!(error = %e, "token issuance failed");
            AuthServiceError::from(e)
        })?;

        let record = self.store.save(payload)?;

        if !self.sessions.set_authenticated(session_id, true).await {
            return Err(AuthServiceError::SessionNotFound);
        }

        tracing::info!(session_id, "login issued fresh access token");
        Ok(LoginSuccess {
            reused: false,
            token_expiry: record.expires_at(),
        })
    }

    /// Log the session out.
    ///
    /// The remote revoke is best-effort: a failure there is logged and local
    /// cleanup proceeds regardless, so a session can never be stuck logged in
    /// because the brokerage was unreachable. The token file is deleted and
    /// the session destroyed unconditionally.
    pub async fn logout(&self, session_id: Option<&str>) -> Result<(), AuthServiceError> {
        if let Some(token) = self.store.get_valid_token() {
            if let Err(e) = self.api.revoke_token(&token).await {
                tracing::warn!(error = %e, "token revoke failed, continuing with local cleanup");
            }
        }

        let delete_result = self.store.delete();

        if let Some(id) = session_id {
            self.sessions.destroy(id).await;
        }

        delete_result?;
        tracing::info!("logged out");
        Ok(())
    }
}
