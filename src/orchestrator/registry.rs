//! Query registry and execution orchestration.
//!
//! Owns the submitted entries and their lifecycle state, and composes the
//! classifier, cache, executor, and background runner into the
//! submit -> classify -> (cache | sync | async) -> poll pipeline.
//!
//! All state is injected at construction so tests can build isolated
//! instances; nothing here is process-global.

use crate::db::{SqlBackend, Value};
use crate::orchestrator::analyzer::QueryAnalyzer;
use crate::orchestrator::background::{BackgroundRunner, PendingHandle};
use crate::orchestrator::cache::ResultCache;
use crate::orchestrator::executor::StatementExecutor;
use crate::orchestrator::model::{QueryEntry, QueryResult, QueryStatus};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Produces the caller-facing locator embedded in the "running" placeholder.
///
/// The transport layer owns the locator format; the HTTP server supplies a
/// poll URL, embedders supply whatever addresses the id for them.
pub type PollLocator = Arc<dyn Fn(u64) -> String + Send + Sync>;

/// In-memory registry of submitted queries and their executions.
///
/// Purely in-memory; all entries are lost on restart.
pub struct QueryRegistry {
    entries: Arc<DashMap<u64, QueryEntry>>,
    pending: DashMap<u64, PendingHandle>,
    next_id: AtomicU64,
    analyzer: Arc<QueryAnalyzer>,
    executor: Arc<StatementExecutor>,
    cache: Arc<ResultCache>,
    runner: BackgroundRunner,
    poll_locator: PollLocator,
}

impl QueryRegistry {
    /// Creates a registry from explicitly constructed collaborators.
    pub fn new(
        analyzer: Arc<QueryAnalyzer>,
        executor: Arc<StatementExecutor>,
        cache: Arc<ResultCache>,
    ) -> Self {
        let runner = BackgroundRunner::new(Arc::clone(&executor));
        Self {
            entries: Arc::new(DashMap::new()),
            pending: DashMap::new(),
            next_id: AtomicU64::new(0),
            analyzer,
            executor,
            cache,
            runner,
            poll_locator: Arc::new(|id| format!("id={id}")),
        }
    }

    /// Convenience constructor wiring default collaborators over a backend.
    pub fn with_backend(backend: Arc<dyn SqlBackend>, cache_capacity: usize) -> Self {
        Self::new(
            Arc::new(QueryAnalyzer::new()),
            Arc::new(StatementExecutor::new(backend)),
            Arc::new(ResultCache::new(cache_capacity)),
        )
    }

    /// Replaces the placeholder locator with a transport-supplied one.
    pub fn with_poll_locator(mut self, locator: PollLocator) -> Self {
        self.poll_locator = locator;
        self
    }

    /// Registers a batch of statements, assigning fresh increasing ids.
    ///
    /// Returns the assigned ids in submission order.
    pub fn add_queries(&self, texts: Vec<String>) -> Vec<u64> {
        let mut ids = Vec::with_capacity(texts.len());
        for text in texts {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            info!("Added query ID={} to queue: {}", id, text);
            self.entries.insert(id, QueryEntry::new(id, text));
            ids.push(id);
        }
        info!("Total {} queries added to queue", ids.len());
        ids
    }

    /// Snapshot of all registered entries, in insertion (id) order.
    pub fn queries(&self) -> Vec<QueryEntry> {
        let mut entries: Vec<QueryEntry> = self
            .entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        entries.sort_by_key(|entry| entry.id);
        debug!("Retrieved {} queries from queue", entries.len());
        entries
    }

    /// Executes the entry with the given id.
    ///
    /// Cache hits complete immediately. Otherwise the classifier decides:
    /// sync runs inline and returns the real result; async dispatches to the
    /// background pool and returns a `RUNNING` placeholder at once.
    pub async fn execute_by_id(&self, id: u64) -> QueryResult {
        let Some(text) = self.entries.get(&id).map(|entry| entry.text.clone()) else {
            warn!("Query not found for ID={}", id);
            return QueryResult::error(format!("Query not found for id={id}"));
        };

        if let Some(cached) = self.cache.get(&text) {
            // Served verbatim: no timing field, no classifier recording.
            info!("Cache hit for query ID={}", id);
            self.set_status(id, QueryStatus::Completed);
            return cached;
        }

        self.set_status(id, QueryStatus::Running);

        if self.analyzer.should_run_async(&text) {
            return self.dispatch_async(id, text);
        }

        let mut result = self.executor.execute(&text).await;
        result.id = Some(id);
        result.status = Some(QueryStatus::Completed);

        self.cache.put(&text, &result);
        if let Some(duration_ms) = result.execution_time_ms {
            self.analyzer.record_execution(&text, duration_ms);
        }
        self.set_status(id, QueryStatus::Completed);

        result
    }

    /// Reports the current outcome of a background execution.
    ///
    /// Never blocks. The first poll that observes a finished job promotes
    /// `ToBeSeen` to `Completed`; later polls return the completed result
    /// without further side effects.
    pub fn poll_execution(&self, id: u64) -> QueryResult {
        let Some(handle) = self.pending.get(&id).map(|handle| handle.clone()) else {
            warn!("No pending execution for ID={}", id);
            return QueryResult::error_for(id, format!("Async query not found for id={id}"));
        };

        match handle.outcome() {
            None => self.running_placeholder(id),
            Some(mut result) => {
                // Promotion happens at most once, under the entry's shard
                // guard, so a concurrent poll cannot double-apply it.
                if let Some(mut entry) = self.entries.get_mut(&id) {
                    if entry.status == QueryStatus::ToBeSeen {
                        entry.status = QueryStatus::Completed;
                        info!("Query ID={} observed by poller, now COMPLETED", id);
                    }
                    result.status = Some(entry.status);
                }
                result
            }
        }
    }

    /// Waits for a background execution to finish, returning its outcome.
    ///
    /// `None` when no pending execution is registered for the id. Unlike
    /// [`QueryRegistry::poll_execution`] this blocks until completion; the
    /// status promotion still only happens through polling.
    pub async fn wait_for(&self, id: u64) -> Option<QueryResult> {
        let handle = self.pending.get(&id).map(|handle| handle.clone())?;
        Some(handle.wait().await)
    }

    /// Removes all terminal entries and their pending handles.
    ///
    /// Ids of removed entries are no longer resolvable.
    pub fn clean_finished(&self) {
        let before = self.entries.len();
        self.entries.retain(|id, entry| {
            let done = entry.status.is_terminal();
            if done {
                self.pending.remove(id);
            }
            !done
        });
        info!(
            "Cleaned {} finished queries from registry",
            before - self.entries.len()
        );
    }

    /// Dispatches one entry to the background pool and registers its handle.
    fn dispatch_async(&self, id: u64, text: String) -> QueryResult {
        let entries = Arc::clone(&self.entries);
        let entry = QueryEntry::new(id, text);

        let handle = self.runner.execute_async(entry, move |result| {
            if let Some(mut entry) = entries.get_mut(&id) {
                if result.is_error() {
                    entry.status = QueryStatus::Failed;
                    entry.error_message = result.error_message.clone().or_else(|| {
                        result
                            .rows
                            .first()
                            .and_then(|row| row.first())
                            .map(Value::to_display_string)
                    });
                } else {
                    entry.status = QueryStatus::ToBeSeen;
                }
            }
        });

        self.pending.insert(id, handle);
        self.running_placeholder(id)
    }

    /// Builds the immediate "running" placeholder result for an async job.
    fn running_placeholder(&self, id: u64) -> QueryResult {
        let locator = (self.poll_locator)(id);
        QueryResult {
            id: Some(id),
            headers: vec!["status".to_string(), "message".to_string()],
            rows: vec![vec![
                Value::from("RUNNING"),
                Value::from(format!(
                    "Query is running asynchronously. Result will be available at {locator}"
                )),
            ]],
            status: Some(QueryStatus::Running),
            ..QueryResult::default()
        }
    }

    /// Sets an entry's status, ignoring unknown ids.
    fn set_status(&self, id: u64, status: QueryStatus) {
        if let Some(mut entry) = self.entries.get_mut(&id) {
            entry.status = status;
        }
    }
}
