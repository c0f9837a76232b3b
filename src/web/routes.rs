//! Route table for the HTTP API.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// Builds the API router.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/queries",
            post(handlers::add_queries)
                .get(handlers::list_queries)
                .delete(handlers::clean_queries),
        )
        .route("/execute", get(handlers::execute_query))
        .route("/execute/:id", get(handlers::poll_execution))
}
