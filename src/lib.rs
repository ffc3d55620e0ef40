//! idstriage -- local-LLM triage for Suricata IDS alerts.
//!
//! This crate provides the alert-to-verdict pipeline (context building,
//! model call, output validation, rule-based fallback), SQLite persistence
//! of alerts and verdicts, and the HTTP intake that ties them together.

pub mod alert;
pub mod api;
pub mod config;
pub mod pipeline;
pub mod replay;
pub mod storage;
pub mod triage;

use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::triage::{OllamaBackend, Resolver};

/// Build a resolver backed by the configured Ollama endpoint.
pub fn resolver_from_config(config: &Config) -> Result<Resolver> {
    let backend = OllamaBackend::from_config(&config.model)?;
    Ok(Resolver::new(Arc::new(backend)))
}

/// Start the idstriage daemon: storage, resolver and API server.
pub async fn serve(config: &Config) -> Result<()> {
    // 1. Initialize Storage
    let db_path = config.storage.db_path.display().to_string();
    tracing::info!(%db_path, "Initializing database");
    let pool = storage::open_pool(&config.storage.db_path)?;

    // 2. Initialize Resolver
    let resolver = resolver_from_config(config)?;
    if !resolver.check_model_health().await {
        tracing::warn!(
            endpoint = %config.model.endpoint,
            "inference endpoint not reachable; alerts will get fallback verdicts until it is (run: ollama serve)"
        );
    }

    // 3. Start API Server
    let addr: std::net::SocketAddr = config.server.bind.parse()?;
    let app = api::router(api::state::AppState { pool, resolver });

    tracing::info!(%addr, "idstriage listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
