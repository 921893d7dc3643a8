//! Kiwoom OAuth client
//!
//! Talks to the two OAuth endpoints of the Kiwoom REST API: token issuance
//! (client-credentials grant) and token revocation. The brokerage signals
//! application-level failures through `return_code` in the response body,
//! which can be non-zero even on HTTP 200; those codes are passed through
//! verbatim rather than reinterpreted.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::KiwoomConfig;
use crate::models::TokenPayload;

/// Error type for calls to the Kiwoom OAuth endpoints
#[derive(Debug, thiserror::Error)]
pub enum KiwoomApiError {
    /// The brokerage rejected the request at the application level
    #[error("Kiwoom API error {code}: {message}")]
    Api { code: String, message: String },

    /// The request never produced a decodable application response
    #[error("Kiwoom API unreachable: {0}")]
    Transport(String),
}

/// Token issuance request body (grant_type: client_credentials)
#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    appkey: &'a str,
    secretkey: &'a str,
}

/// Token issuance response body
#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
    expires_dt: String,
    token_type: String,
    #[serde(default)]
    return_code: Option<i64>,
    #[serde(default)]
    return_msg: Option<String>,
}

/// Token revocation request body
#[derive(Debug, Serialize)]
struct RevokeRequest<'a> {
    token: &'a str,
    appkey: &'a str,
    secretkey: &'a str,
}

/// Token revocation response body
#[derive(Debug, Deserialize)]
struct RevokeResponse {
    #[serde(default)]
    return_code: Option<i64>,
    #[serde(default)]
    return_msg: Option<String>,
}

/// Seam over the external OAuth endpoints so the auth binder can be tested
/// without the network.
#[async_trait]
pub trait KiwoomAuthApi: Send + Sync {
    /// Issue a fresh access token with the configured application credentials
    async fn issue_token(&self) -> Result<TokenPayload, KiwoomApiError>;

    /// Revoke a previously issued access token
    async fn revoke_token(&self, token: &str) -> Result<(), KiwoomApiError>;
}

/// HTTP client for the Kiwoom OAuth endpoints
pub struct KiwoomClient {
    http: reqwest::Client,
    base_url: String,
    app_key: String,
    secret_key: String,
}

impl KiwoomClient {
    pub fn new(config: &KiwoomConfig) -> Result<Self, KiwoomApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| KiwoomApiError::Transport(format!("HTTP client error: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            app_key: config.app_key.clone(),
            secret_key: config.secret_key.clone(),
        })
    }
}

#[async_trait]
impl KiwoomAuthApi for KiwoomClient {
    async fn issue_token(&self) -> Result<TokenPayload, KiwoomApiError> {
        let url = format!("{}/oauth2/token", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(&TokenRequest {
                grant_type: "client_credentials",
                appkey: &self.app_key,
                secretkey: &self.secret_key,
            })
            .send()
            .await
            .map_err(|e| KiwoomApiError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(KiwoomApiError::Transport(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| KiwoomApiError::Transport(format!("invalid token response: {e}")))?;

        if let Some(code) = body.return_code {
            if code != 0 {
                return Err(KiwoomApiError::Api {
                    code: code.to_string(),
                    message: body
                        .return_msg
                        .unwrap_or_else(|| "token issuance rejected".to_string()),
                });
            }
        }

        tracing::info!(expires_dt = %body.expires_dt, "access token issued");

        Ok(TokenPayload {
            token: body.token,
            expires_dt: body.expires_dt,
            token_type: body.token_type,
            return_code: body.return_code,
            return_msg: body.return_msg,
        })
    }

    async fn revoke_token(&self, token: &str) -> Result<(), KiwoomApiError> {
        let url = format!("{}/oauth2/revoke", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(&RevokeRequest {
                token,
                appkey: &self.app_key,
                secretkey: &self.secret_key,
            })
            .send()
            .await
            .map_err(|e| KiwoomApiError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(KiwoomApiError::Transport(format!(
                "revoke endpoint returned {}",
                response.status()
            )));
        }

        let body: RevokeResponse = response
            .json()
            .await
            .map_err(|e| KiwoomApiError::Transport(format!("invalid revoke response: {e}")))?;

        if let Some(code) = body.return_code {
            if code != 0 {
                return Err(KiwoomApiError::Api {
                    code: code.to_string(),
                    message: body
                        .return_msg
                        .unwrap_or_else(|| "token revoke rejected".to_string()),
                });
            }
        }

        tracing::info!("access token revoked");
        Ok(())
    }
}
