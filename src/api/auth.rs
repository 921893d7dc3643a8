//! Authentication API endpoints
//!
//! Handles HTTP requests for the token-session binding:
//! - GET  /api/v1/auth/check  - Combined session/token status
//! - POST /api/v1/auth/login  - Obtain (or reuse) a brokerage token
//! - POST /api/v1/auth/logout - Revoke and clean up

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::middleware::{extract_session_id, ApiError, AppState};
use crate::services::AuthServiceError;

/// Response for the auth check query
#[derive(Debug, Serialize)]
pub struct CheckAuthResponse {
    pub is_authenticated: bool,
    pub has_valid_token: bool,
    pub token_expiry: Option<DateTime<Utc>>,
}

/// Failure detail carried by login/logout responses
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// External service error code, passed through verbatim when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
}

/// Response for the login mutation
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    /// True when a stored valid token was reused without a network call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reused: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_expiry: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

/// Response for the logout mutation
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

/// Build the auth router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/check", get(check_auth))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

/// GET /api/v1/auth/check - Combined session/token status
///
/// `is_authenticated` reflects the session flag only; a caller wanting a
/// holistic "can I call brokerage APIs" answer must also look at
/// `has_valid_token`.
async fn check_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<CheckAuthResponse> {
    let session_id = extract_session_id(&headers);
    let status = state.auth_service.check_auth(session_id.as_deref()).await;

    Json(CheckAuthResponse {
        is_authenticated: status.is_authenticated,
        has_valid_token: status.has_valid_token,
        token_expiry: status.token_expiry,
    })
}

/// POST /api/v1/auth/login - Obtain or reuse a brokerage token
///
/// Issuance failures (brokerage rejection or unreachable endpoint) come back
/// as `{ success: false, error }` with the external code passed through;
/// local storage failures surface as a 500.
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    // Reuse the caller's session when it still exists, otherwise start one
    let session = match extract_session_id(&headers) {
        Some(id) => match state.sessions.get(&id).await {
            Some(session) => session,
            None => state.sessions.create().await,
        },
        None => state.sessions.create().await,
    };

    let max_age = (session.expires_at - Utc::now()).num_seconds().max(0);
    let cookie = format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        session.id, max_age
    );
    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie)
            .map_err(|e| ApiError::internal_error(format!("Invalid cookie: {e}")))?,
    );

    match state.auth_service.login(&session.id).await {
        Ok(outcome) => Ok((
            response_headers,
            Json(LoginResponse {
                success: true,
                reused: Some(outcome.reused),
                token_expiry: outcome.token_expiry,
                error: None,
            }),
        )),
        Err(AuthServiceError::Issuance { code, message }) => Ok((
            response_headers,
            Json(LoginResponse {
                success: false,
                reused: None,
                token_expiry: None,
                error: Some(ErrorDetail { code, message }),
            }),
        )),
        Err(e) => Err(ApiError::internal_error(e.to_string())),
    }
}

/// POST /api/v1/auth/logout - Revoke the token and destroy the session
///
/// Always clears the cookie and always attempts local cleanup; a failed
/// remote revoke is not an error here.
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let session_id = extract_session_id(&headers);
    let result = state.auth_service.logout(session_id.as_deref()).await;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"),
    );

    let body = match result {
        Ok(()) => LogoutResponse {
            success: true,
            error: None,
        },
        Err(e) => {
            tracing::error!(error = %e, "logout cleanup failed");
            LogoutResponse {
                success: false,
                error: Some(ErrorDetail {
                    code: None,
                    message: e.to_string(),
                }),
            }
        }
    };

    (response_headers, Json(body))
}
