//! Configuration management
//!
//! Configuration is loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults. The Kiwoom
//! application credentials have no defaults and must be supplied through the
//! file or the `KIWOOM_APP_KEY` / `KIWOOM_SECRET_KEY` variables.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Kiwoom OAuth endpoint configuration
    #[serde(default)]
    pub kiwoom: KiwoomConfig,
    /// Session configuration
    #[serde(default)]
    pub session: SessionConfig,
    /// Token storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (for cookie-based auth)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Kiwoom OAuth endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KiwoomConfig {
    /// Base URL of the Kiwoom REST API
    #[serde(default = "default_kiwoom_base_url")]
    pub base_url: String,
    /// Application key issued by Kiwoom (required)
    #[serde(default)]
    pub app_key: String,
    /// Application secret issued by Kiwoom (required)
    #[serde(default)]
    pub secret_key: String,
}

impl Default for KiwoomConfig {
    fn default() -> Self {
        Self {
            base_url: default_kiwoom_base_url(),
            app_key: String::new(),
            secret_key: String::new(),
        }
    }
}

fn default_kiwoom_base_url() -> String {
    "https://api.kiwoom.com".to_string()
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session time-to-live in hours
    #[serde(default = "default_session_ttl_hours")]
    pub ttl_hours: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_session_ttl_hours(),
        }
    }
}

fn default_session_ttl_hours() -> i64 {
    12
}

/// Token storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the single-slot token file
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            token_path: default_token_path(),
        }
    }
}

fn default_token_path() -> PathBuf {
    PathBuf::from("data/token.json")
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file.
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides.
    ///
    /// Environment variables follow the pattern:
    /// - KIWOOM_BRIDGE_SERVER_HOST
    /// - KIWOOM_BRIDGE_SERVER_PORT
    /// - KIWOOM_BRIDGE_SERVER_CORS_ORIGIN
    /// - KIWOOM_BRIDGE_SESSION_TTL_HOURS
    /// - KIWOOM_BRIDGE_TOKEN_PATH
    ///
    /// The Kiwoom section additionally honors the variable names the service
    /// has always used:
    /// - KIWOOM_API_URL
    /// - KIWOOM_APP_KEY
    /// - KIWOOM_SECRET_KEY
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("KIWOOM_BRIDGE_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("KIWOOM_BRIDGE_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("KIWOOM_BRIDGE_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(base_url) = std::env::var("KIWOOM_API_URL") {
            self.kiwoom.base_url = base_url;
        }
        if let Ok(app_key) = std::env::var("KIWOOM_APP_KEY") {
            self.kiwoom.app_key = app_key;
        }
        if let Ok(secret_key) = std::env::var("KIWOOM_SECRET_KEY") {
            self.kiwoom.secret_key = secret_key;
        }

        if let Ok(ttl) = std::env::var("KIWOOM_BRIDGE_SESSION_TTL_HOURS") {
            if let Ok(ttl) = ttl.parse::<i64>() {
                self.session.ttl_hours = ttl;
            }
        }

        if let Ok(token_path) = std::env::var("KIWOOM_BRIDGE_TOKEN_PATH") {
            self.storage.token_path = PathBuf::from(token_path);
        }
    }

    /// Validate values that have no usable default.
    ///
    /// The gateway cannot issue tokens without application credentials, so a
    /// missing key is a startup error rather than a deferred login failure.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kiwoom.app_key.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "kiwoom.app_key is required (set KIWOOM_APP_KEY)".to_string(),
            ));
        }
        if self.kiwoom.secret_key.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "kiwoom.secret_key is required (set KIWOOM_SECRET_KEY)".to_string(),
            ));
        }
        if self.session.ttl_hours <= 0 {
            return Err(ConfigError::ValidationError(
                "session.ttl_hours must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for all config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
