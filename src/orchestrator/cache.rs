//! Bounded cache of prior query results.
//!
//! Keys are a hash of the normalized statement text, so two statements
//! differing only in case or incidental whitespace share an entry. Capacity
//! is an explicit configuration choice; 0 disables the cache entirely, which
//! degrades every lookup to a miss rather than failing.

use crate::orchestrator::model::{QueryResult, QueryStatus};
use lru::LruCache;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Default number of cached results before LRU eviction.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// LRU cache of query results keyed by normalized statement text.
pub struct ResultCache {
    store: Option<Mutex<LruCache<u64, QueryResult>>>,
}

impl ResultCache {
    /// Creates a cache bounded to `capacity` entries; 0 disables caching.
    pub fn new(capacity: usize) -> Self {
        let store = NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap)));
        Self { store }
    }

    /// Looks up a cached result for the given statement text.
    pub fn get(&self, sql: &str) -> Option<QueryResult> {
        let Some(store) = &self.store else {
            debug!("Result cache is disabled, treating lookup as a miss");
            return None;
        };

        let key = cache_key(sql);
        let mut store = store.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match store.get(&key) {
            Some(result) => {
                debug!("Cache hit for SQL: {}", sql);
                Some(result.clone())
            }
            None => {
                debug!("Cache miss for SQL: {}", sql);
                None
            }
        }
    }

    /// Stores a result under the given statement text.
    ///
    /// The stored copy is stamped `Completed` and loses its timing field:
    /// a cache hit is served verbatim and must not look like a fresh
    /// execution.
    pub fn put(&self, sql: &str, result: &QueryResult) {
        let Some(store) = &self.store else {
            warn!("Result cache is disabled, dropping result for SQL: {}", sql);
            return;
        };

        let mut stored = result.clone();
        stored.execution_time_ms = None;
        stored.status = Some(QueryStatus::Completed);

        let key = cache_key(sql);
        let mut store = store.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        store.put(key, stored);
        debug!("Stored result in cache for SQL: {}", sql);
    }

    /// Number of currently cached results.
    pub fn len(&self) -> usize {
        match &self.store {
            Some(store) => store
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .len(),
            None => 0,
        }
    }

    /// Returns true when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

/// Hashes the normalized statement text into a cache key.
fn cache_key(sql: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    normalize(sql).hash(&mut hasher);
    hasher.finish()
}

/// Trims, collapses whitespace, and uppercases the statement text.
fn normalize(sql: &str) -> String {
    sql.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Value;
    use pretty_assertions::assert_eq;

    fn sample_result() -> QueryResult {
        QueryResult {
            id: Some(1),
            headers: vec!["id".to_string()],
            rows: vec![vec![Value::Int(1)]],
            status: Some(QueryStatus::Completed),
            error_message: None,
            execution_time_ms: Some(12),
        }
    }

    #[test]
    fn test_round_trip() {
        let cache = ResultCache::new(8);
        cache.put("SELECT * FROM users", &sample_result());

        let hit = cache.get("SELECT * FROM users").unwrap();
        assert_eq!(hit.headers, vec!["id".to_string()]);
        assert_eq!(hit.rows, vec![vec![Value::Int(1)]]);
    }

    #[test]
    fn test_stored_copy_drops_timing() {
        let cache = ResultCache::new(8);
        cache.put("SELECT * FROM users", &sample_result());

        let hit = cache.get("SELECT * FROM users").unwrap();
        assert_eq!(hit.execution_time_ms, None);
        assert_eq!(hit.status, Some(QueryStatus::Completed));
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        let cache = ResultCache::new(8);
        cache.put("SELECT * FROM users", &sample_result());

        assert!(cache.get("select  *  from   users").is_some());
        assert!(cache.get("  SELECT * FROM USERS  ").is_some());
        assert!(cache.get("SELECT * FROM orders").is_none());
    }

    #[test]
    fn test_disabled_cache_never_hits() {
        let cache = ResultCache::new(0);
        cache.put("SELECT 1", &sample_result());
        assert!(cache.get("SELECT 1").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_lru_eviction() {
        let cache = ResultCache::new(2);
        cache.put("SELECT 1", &sample_result());
        cache.put("SELECT 2", &sample_result());
        cache.put("SELECT 3", &sample_result());

        assert_eq!(cache.len(), 2);
        assert!(cache.get("SELECT 1").is_none(), "oldest entry evicted");
        assert!(cache.get("SELECT 3").is_some());
    }
}
