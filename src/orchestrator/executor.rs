//! Single-statement execution against the backend.
//!
//! Wraps the backend call with wall-clock timing and converts every failure
//! into an error `QueryResult`. Nothing escapes this boundary as an error.

use crate::db::{BackendRow, SqlBackend, Value};
use crate::orchestrator::model::{QueryResult, ERROR_HEADER};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Runs one statement and produces a tabular result or a typed error result.
pub struct StatementExecutor {
    backend: Arc<dyn SqlBackend>,
}

impl StatementExecutor {
    /// Creates an executor over the given backend.
    pub fn new(backend: Arc<dyn SqlBackend>) -> Self {
        Self { backend }
    }

    /// Executes `sql`, timing the backend call.
    ///
    /// `execution_time_ms` is set on both the success and failure paths.
    /// Headers come from the first row's backend-reported column order; a
    /// zero-row result has empty headers. Every row is projected onto the
    /// headers positionally.
    pub async fn execute(&self, sql: &str) -> QueryResult {
        let start = Instant::now();
        info!("Executing SQL query: {}", sql);

        match self.backend.fetch_rows(sql).await {
            Ok(rows) => {
                let execution_time_ms = start.elapsed().as_millis() as u64;

                let headers: Vec<String> = rows
                    .first()
                    .map(|row| row.columns().to_vec())
                    .unwrap_or_default();

                let data: Vec<Vec<Value>> = rows
                    .iter()
                    .map(|row| project_row(row, &headers))
                    .collect();

                info!(
                    "Query executed successfully in {} ms with {} columns",
                    execution_time_ms,
                    headers.len()
                );

                QueryResult {
                    headers,
                    rows: data,
                    execution_time_ms: Some(execution_time_ms),
                    ..QueryResult::default()
                }
            }
            Err(error) => {
                let execution_time_ms = start.elapsed().as_millis() as u64;
                let message = error.legacy_tag();
                warn!(
                    "Query failed in {} ms: {} ({})",
                    execution_time_ms, message, error
                );

                QueryResult {
                    headers: vec![ERROR_HEADER.to_string()],
                    rows: vec![vec![Value::String(message.clone())]],
                    error_message: Some(message),
                    execution_time_ms: Some(execution_time_ms),
                    ..QueryResult::default()
                }
            }
        }
    }
}

/// Projects exactly the header columns, in header order, for one row.
fn project_row(row: &BackendRow, headers: &[String]) -> Vec<Value> {
    headers
        .iter()
        .map(|header| row.get(header).cloned().unwrap_or(Value::Null))
        .collect()
}
