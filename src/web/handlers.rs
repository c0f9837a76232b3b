//! HTTP handlers for the query API.
//!
//! Every execution outcome is a `QueryResult` serialized as-is; only
//! submission failures and malformed requests map to HTTP error codes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::QuerydeckError;
use crate::orchestrator::{QueryEntry, QueryResult};
use crate::web::state::AppState;

/// One assigned id in the submission response.
#[derive(Debug, Serialize)]
pub struct AddedQuery {
    pub id: u64,
}

/// Query-string parameters for `GET /execute`.
#[derive(Debug, Deserialize)]
pub struct ExecuteParams {
    /// Id of the entry to execute.
    pub query: u64,
}

/// `POST /queries` - submits a raw batch of statements.
pub async fn add_queries(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<Json<Vec<AddedQuery>>, (StatusCode, String)> {
    info!("Received POST /queries with body length={} chars", body.len());

    match state.service.add_queries(&body) {
        Ok(ids) => {
            info!("Added {} queries", ids.len());
            Ok(Json(ids.into_iter().map(|id| AddedQuery { id }).collect()))
        }
        Err(QuerydeckError::Validation(message)) => Err((StatusCode::BAD_REQUEST, message)),
        Err(other) => Err((StatusCode::INTERNAL_SERVER_ERROR, other.to_string())),
    }
}

/// `GET /queries` - lists all registered entries.
pub async fn list_queries(State(state): State<Arc<AppState>>) -> Json<Vec<QueryEntry>> {
    debug!("GET /queries called");
    let queries = state.service.queries();
    info!("Returning {} queries from queue", queries.len());
    Json(queries)
}

/// `DELETE /queries` - drops terminal entries from the registry.
pub async fn clean_queries(State(state): State<Arc<AppState>>) -> StatusCode {
    state.service.clean_finished();
    StatusCode::NO_CONTENT
}

/// `GET /execute?query=<id>` - executes an entry by id.
pub async fn execute_query(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExecuteParams>,
) -> Json<QueryResult> {
    info!("Executing query with ID={}", params.query);
    let result = state.service.execute_by_id(params.query).await;

    if result.rows.is_empty() {
        debug!(
            "Query ID={} executed successfully but returned no data",
            params.query
        );
    } else {
        info!(
            "Query ID={} executed, rows={}",
            params.query,
            result.rows.len()
        );
    }

    Json(result)
}

/// `GET /execute/:id` - polls a background execution.
pub async fn poll_execution(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Json<QueryResult> {
    Json(state.service.poll_execution(id))
}
