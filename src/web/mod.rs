//! HTTP API for Querydeck.
//!
//! Thin transport over the service facade. The transport also owns the poll
//! locator format: background placeholders point callers at `/execute/{id}`.

mod handlers;
mod routes;
mod state;

pub use state::AppState;

use crate::error::{QuerydeckError, Result};
use crate::orchestrator::PollLocator;
use crate::service::QueryService;
use std::sync::Arc;
use tracing::info;

/// Poll locator the HTTP transport injects into the registry.
pub fn poll_locator() -> PollLocator {
    Arc::new(|id| format!("/execute/{id}"))
}

/// Serves the HTTP API on the given listen address until the process exits.
pub async fn serve(listen: &str, service: QueryService) -> Result<()> {
    let state = Arc::new(AppState::new(service));
    let app = routes::api_routes().with_state(state);

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| QuerydeckError::internal(format!("Cannot bind {listen}: {e}")))?;

    info!("Listening on {}", listen);

    axum::serve(listener, app)
        .await
        .map_err(|e| QuerydeckError::internal(format!("Server error: {e}")))
}
