//! Sync/async classification heuristic.
//!
//! Decides whether a statement should run on the calling path or on the
//! background pool, based on the statement shape (joins, subqueries) and on
//! the last observed duration for the same normalized text.

use dashmap::DashMap;
use regex::Regex;
use tracing::{debug, info, warn};

/// Duration above which a statement's recorded history forces async execution.
const ASYNC_THRESHOLD_MS: u64 = 5000;

/// Classifies statements and remembers their last execution duration.
///
/// The history map is concurrent; classification and recording may happen
/// from multiple execution paths at once.
pub struct QueryAnalyzer {
    history: DashMap<String, u64>,
    string_literal: Regex,
    punctuation: Regex,
    whitespace: Regex,
    select_keyword: Regex,
    join_keyword: Regex,
    cross_join: Regex,
}

impl QueryAnalyzer {
    /// Creates an analyzer with an empty history.
    pub fn new() -> Self {
        Self {
            history: DashMap::new(),
            // Single-quoted literals with '' escapes, across newlines.
            string_literal: Regex::new(r"(?s)'(?:''|[^'])*'").expect("valid literal pattern"),
            punctuation: Regex::new(r"([()\[\];,])").expect("valid punctuation pattern"),
            whitespace: Regex::new(r"\s+").expect("valid whitespace pattern"),
            select_keyword: Regex::new(r"\bSELECT\b").expect("valid SELECT pattern"),
            join_keyword: Regex::new(r"\bJOIN\b").expect("valid JOIN pattern"),
            cross_join: Regex::new(r"\bCROSS\s+JOIN\b").expect("valid CROSS JOIN pattern"),
        }
    }

    /// Decides whether the given statement should run asynchronously.
    ///
    /// Blank input is never classified async. Keywords inside string
    /// literals are invisible to the heuristic.
    pub fn should_run_async(&self, sql: &str) -> bool {
        if sql.trim().is_empty() {
            warn!("Received empty SQL query, cannot analyze, running synchronously");
            return false;
        }

        let normalized = self.normalize(&self.strip_string_literals(sql));
        debug!("Analyzing query for async execution: {}", normalized);

        if let Some(last_ms) = self.history.get(&normalized).map(|entry| *entry) {
            if last_ms > ASYNC_THRESHOLD_MS {
                info!(
                    "Query previously took {} ms (> {} ms), running asynchronously",
                    last_ms, ASYNC_THRESHOLD_MS
                );
                return true;
            }
        }

        let join_count = self.join_keyword.find_iter(&normalized).count();
        if join_count >= 1 {
            info!("Query has {} JOINs, running asynchronously", join_count);
            return true;
        }

        if self.cross_join.is_match(&normalized) {
            info!("Query contains CROSS JOIN, running asynchronously");
            return true;
        }

        let select_count = self.select_keyword.find_iter(&normalized).count();
        if select_count > 1 {
            info!(
                "Query has {} SELECT statements, running asynchronously",
                select_count
            );
            return true;
        }

        debug!("Query is simple enough, will run synchronously");
        false
    }

    /// Records the last observed duration for a statement, overwriting any
    /// prior sample for the same normalized text.
    pub fn record_execution(&self, sql: &str, duration_ms: u64) {
        if sql.trim().is_empty() {
            warn!("Cannot record execution time for empty SQL query");
            return;
        }

        let normalized = self.normalize(&self.strip_string_literals(sql));
        debug!(
            "Recorded execution time for query [{}]: {} ms",
            normalized, duration_ms
        );
        self.history.insert(normalized, duration_ms);
    }

    /// Number of distinct normalized statements with a recorded duration.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Replaces quoted string literals with a space so their contents cannot
    /// influence keyword matching.
    fn strip_string_literals(&self, sql: &str) -> String {
        self.string_literal.replace_all(sql, " ").into_owned()
    }

    /// Pads punctuation, collapses whitespace, trims, and uppercases, so
    /// word-boundary matching is reliable.
    fn normalize(&self, sql: &str) -> String {
        let padded = self.punctuation.replace_all(sql, " $1 ");
        self.whitespace
            .replace_all(&padded, " ")
            .trim()
            .to_uppercase()
    }
}

impl Default for QueryAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
