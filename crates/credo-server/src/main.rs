//! Credo server binary: configuration, wiring, and the axum listener.

mod auth;
mod config;
mod error;
mod ingest;
mod repository;
mod routes;
mod state;
mod transport;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use credo_core::assessment::AssessmentBuilder;
use credo_core::gateway::ModelGateway;
use credo_gateway::GeminiGateway;

use crate::auth::AuthKeys;
use crate::config::ServerConfig;
use crate::ingest::DocumentStore;
use crate::repository::{InMemoryLoanCaseRepository, InMemoryUnderwriterRepository};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "credo.toml".to_string());
    let config = ServerConfig::load(Path::new(&config_path))
        .with_context(|| format!("failed to load configuration from {config_path}"))?;

    // One gateway per process, passed by reference everywhere.
    let gateway: Arc<dyn ModelGateway> = Arc::new(GeminiGateway::new(config.gemini_config())?);
    let builder = Arc::new(AssessmentBuilder::new(
        gateway.clone(),
        config.scoring.clone(),
    ));
    let auth = Arc::new(AuthKeys::new(
        config.auth.secret.as_deref().unwrap_or_default(),
        config.auth.token_ttl_minutes,
    ));
    let documents = Arc::new(DocumentStore::open(&config.storage.document_dir)?);

    let state = AppState {
        underwriters: Arc::new(InMemoryUnderwriterRepository::new()),
        cases: Arc::new(InMemoryLoanCaseRepository::new()),
        gateway,
        builder,
        auth,
        documents,
    };

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;
    info!("credo listening on {}", listener.local_addr()?);

    axum::serve(listener, routes::router(state)).await?;
    Ok(())
}
