//! Kiwoom Bridge - session-bound OAuth token gateway

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kiwoom_bridge::{
    api::{self, AppState},
    config::Config,
    services::{AuthService, KiwoomClient, SessionStore, TokenStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kiwoom_bridge=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Kiwoom bridge...");

    // Load and validate configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    config.validate()?;
    tracing::info!("Configuration loaded");

    // Wire up services
    let token_store = Arc::new(TokenStore::new(config.storage.token_path.clone()));
    let kiwoom_client = Arc::new(KiwoomClient::new(&config.kiwoom)?);
    let sessions = Arc::new(SessionStore::new(config.session.ttl_hours));
    let auth_service = Arc::new(AuthService::new(
        token_store,
        kiwoom_client,
        sessions.clone(),
    ));
    tracing::info!(base_url = %config.kiwoom.base_url, "Kiwoom client initialized");

    // Start session cleanup task (runs every 5 minutes)
    {
        let sessions = sessions.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(300));
            loop {
                interval.tick().await;
                sessions.cleanup().await;
            }
        });
    }

    // Build application state and router
    let state = AppState {
        auth_service,
        sessions,
    };
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
