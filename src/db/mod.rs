//! Database abstraction layer for Querydeck.
//!
//! Provides a trait-based interface for SQL backends, so the orchestrator
//! can run against Postgres in production and an in-memory mock in tests.

mod mock;
mod postgres;
mod types;

pub use mock::MockBackend;
#[allow(unused_imports)]
pub use postgres::PostgresBackend;
pub use types::{BackendRow, Value};

use crate::config::ConnectionConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Failure of a single statement execution, as classified by the backend.
///
/// This is a closed set of kinds with a detail string. Callers that need the
/// legacy message tags (`TABLE_NOT_FOUND`, `SQL_ERROR: ...`) derive them at
/// the result-building boundary; nothing else should match on message text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The statement references a relation the backend does not know.
    #[error("relation not found: {0}")]
    TableNotFound(String),

    /// Syntax or catalog error other than a missing relation.
    #[error("SQL error: {0}")]
    Syntax(String),

    /// The backend was reachable but the access itself failed.
    #[error("data access error: {0}")]
    DataAccess(String),

    /// Anything the backend could not classify.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl BackendError {
    /// Renders the legacy single-cell message used in `["error"]` result rows.
    pub fn legacy_tag(&self) -> String {
        match self {
            Self::TableNotFound(_) => "TABLE_NOT_FOUND".to_string(),
            Self::Syntax(detail) => format!("SQL_ERROR: {detail}"),
            Self::DataAccess(detail) => format!("DATA_ACCESS_ERROR: {detail}"),
            Self::Unexpected(detail) => format!("UNEXPECTED_ERROR: {detail}"),
        }
    }
}

/// Trait defining the interface for SQL backends.
///
/// The orchestrator treats the backend as an opaque collaborator: SQL text
/// in, rows or a classified error out.
#[async_trait]
pub trait SqlBackend: Send + Sync {
    /// Executes a statement and returns all result rows.
    async fn fetch_rows(&self, sql: &str) -> std::result::Result<Vec<BackendRow>, BackendError>;

    /// Closes the backend connection.
    async fn close(&self) -> Result<()>;
}

/// Connects to a Postgres backend with the given configuration.
///
/// This is the central factory function for production connections; tests
/// construct a [`MockBackend`] directly instead.
pub async fn connect(config: &ConnectionConfig) -> Result<Arc<dyn SqlBackend>> {
    let backend = PostgresBackend::connect(config).await?;
    Ok(Arc::new(backend))
}
