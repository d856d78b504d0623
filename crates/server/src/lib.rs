//! HTTP boundary for the Virtual TA.
//!
//! - `POST /api/` answers a question
//! - `GET /api/records/:id` returns a stored record
//! - `POST /api/update` refreshes forum content (when enabled)
//! - `GET /health`

pub mod error;
pub mod routes;
pub mod state;

#[cfg(test)]
mod tests;

pub use error::{ApiError, ApiResult};
pub use state::{AppState, UpdateHandle};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use vta_core::{AppConfig, AppError, AppResult};
use vta_knowledge::{open_store, Answerer, ContentStore};

/// Build the router over `state`.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/", post(routes::ask))
        .route("/api", post(routes::ask))
        .route("/api/records/:id", get(routes::get_record))
        .route("/api/update", post(routes::update))
        .route("/health", get(routes::health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Assemble state from configuration.
pub fn state_from_config(config: &AppConfig) -> AppResult<AppState> {
    let store: Arc<dyn ContentStore> = Arc::new(open_store(config)?);
    let answerer = Answerer::from_config(store.clone(), config)?;
    let state = AppState::new(store, answerer);

    if !config.server.enable_update {
        return Ok(state);
    }

    let ingestor = vta_forum::ingestor_from_config(config)?;
    let range = vta_forum::configured_range(config)?;
    Ok(state.with_update(UpdateHandle::new(ingestor, range)))
}

/// Serve until Ctrl-C.
pub async fn serve(config: &AppConfig) -> AppResult<()> {
    let state = state_from_config(config)?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid listen address: {}", e)))?;

    let records = state.store.count(None)?;
    if records == 0 {
        tracing::warn!("Record store is empty; every question will get the fallback answer");
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        "Serving {} records on http://{} (answers: {}, update endpoint {})",
        records,
        addr,
        if state.answerer.has_llm() { "llm" } else { "extractive" },
        if state.update.is_some() { "enabled" } else { "disabled" }
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
