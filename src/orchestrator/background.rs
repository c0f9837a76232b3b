//! Background execution of classified-async statements.
//!
//! A pure compute step: the runner executes the statement on the tokio
//! worker pool and publishes the outcome through a [`PendingHandle`]. It
//! never touches registry, cache, or classifier state; the orchestrator
//! attaches completion side effects as a callback.

use crate::orchestrator::executor::StatementExecutor;
use crate::orchestrator::model::{QueryEntry, QueryResult};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

/// Handle to an in-flight or completed background execution.
///
/// Cloneable and cheap; the outcome is published exactly once.
#[derive(Clone)]
pub struct PendingHandle {
    rx: watch::Receiver<Option<QueryResult>>,
}

impl PendingHandle {
    /// Returns the outcome if the background job has finished.
    ///
    /// Never blocks; `None` means "still running".
    pub fn outcome(&self) -> Option<QueryResult> {
        self.rx.borrow().clone()
    }

    /// Returns true once the background job has published its outcome.
    pub fn is_finished(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Waits for the outcome without consuming the handle.
    ///
    /// Polling callers should use [`PendingHandle::outcome`] instead; this
    /// exists for embedders that want to block on completion.
    pub async fn wait(&self) -> QueryResult {
        let mut rx = self.rx.clone();
        let outcome = rx
            .wait_for(|value| value.is_some())
            .await
            .map(|value| value.clone());
        match outcome {
            Ok(Some(result)) => result,
            // The sender is dropped only after publishing, so these arms are
            // unreachable in practice.
            Ok(None) | Err(_) => QueryResult::error("Background execution was dropped"),
        }
    }
}

/// Runs statements off the calling path on the tokio worker pool.
pub struct BackgroundRunner {
    executor: Arc<StatementExecutor>,
}

impl BackgroundRunner {
    /// Creates a runner that executes through the given executor.
    pub fn new(executor: Arc<StatementExecutor>) -> Self {
        Self { executor }
    }

    /// Dispatches one entry for background execution.
    ///
    /// Returns immediately with a handle to the eventual result. The result
    /// is stamped with the entry's id. `on_complete` runs on the worker,
    /// before the outcome becomes observable through the handle, so a poller
    /// that sees the outcome also sees the callback's effects.
    pub fn execute_async<F>(&self, entry: QueryEntry, on_complete: F) -> PendingHandle
    where
        F: FnOnce(&QueryResult) + Send + 'static,
    {
        info!(
            "Starting async execution for query ID={} -> {}",
            entry.id, entry.text
        );

        let (tx, rx) = watch::channel(None);
        let executor = Arc::clone(&self.executor);

        tokio::spawn(async move {
            let id = entry.id;
            let run = async {
                let mut result = executor.execute(&entry.text).await;
                result.id = Some(id);
                result
            };

            let result = match AssertUnwindSafe(run).catch_unwind().await {
                Ok(result) => {
                    info!("Async query ID={} completed", id);
                    result
                }
                Err(panic) => {
                    let message = panic_message(panic);
                    error!("Error during async execution for ID={}: {}", id, message);
                    QueryResult::error_for(id, format!("Async query failed: {message}"))
                }
            };

            on_complete(&result);
            let _ = tx.send(Some(result));
        });

        PendingHandle { rx }
    }
}

/// Extracts a printable message from a panic payload.
fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MockBackend, Value};
    use crate::orchestrator::model::QueryStatus;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn runner_over(backend: MockBackend) -> BackgroundRunner {
        BackgroundRunner::new(Arc::new(StatementExecutor::new(Arc::new(backend))))
    }

    #[tokio::test]
    async fn test_async_execution_publishes_result() {
        let runner = runner_over(MockBackend::new());
        let entry = QueryEntry::new(4, "SELECT * FROM users");

        let handle = runner.execute_async(entry, |_| {});
        let result = handle.wait().await;

        assert_eq!(result.id, Some(4));
        assert_eq!(result.rows.len(), 2);
        assert!(handle.is_finished());
        assert_eq!(handle.outcome().unwrap().id, Some(4));
    }

    #[tokio::test]
    async fn test_handle_reports_running_before_completion() {
        let backend = MockBackend::new().with_latency(Duration::from_millis(200));
        let runner = runner_over(backend);
        let entry = QueryEntry::new(1, "SELECT * FROM users");

        let handle = runner.execute_async(entry, |_| {});
        assert!(!handle.is_finished());
        assert!(handle.outcome().is_none());

        let result = handle.wait().await;
        assert_eq!(result.id, Some(1));
    }

    #[tokio::test]
    async fn test_completion_callback_runs_before_outcome_is_visible() {
        let runner = runner_over(MockBackend::new());
        let entry = QueryEntry::new(2, "SELECT * FROM users");

        let flag = Arc::new(AtomicBool::new(false));
        let seen = Arc::clone(&flag);
        let handle = runner.execute_async(entry, move |_| {
            seen.store(true, Ordering::SeqCst);
        });

        handle.wait().await;
        assert!(flag.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_executor_error_is_still_a_result() {
        let runner = runner_over(MockBackend::new());
        let entry = QueryEntry::new(9, "SELECT * FROM missing_table");

        let result = runner.execute_async(entry, |_| {}).wait().await;
        assert_eq!(result.id, Some(9));
        assert_eq!(result.rows, vec![vec![Value::from("TABLE_NOT_FOUND")]]);
    }

    #[test]
    fn test_async_failure_shape() {
        let result = QueryResult::error_for(3, "Async query failed: boom");
        assert_eq!(result.status, Some(QueryStatus::Failed));
        assert_eq!(result.headers, vec!["error".to_string()]);
        assert_eq!(
            result.rows,
            vec![vec![Value::from("Async query failed: boom")]]
        );
    }
}
