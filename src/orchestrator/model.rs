//! Entry and result types for the query orchestrator.

use crate::db::Value;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a submitted query.
///
/// `ToBeSeen` is an async-only intermediate: the background task reports
/// completion as `ToBeSeen`, and the first poll that observes it promotes it
/// to `Completed`. This keeps the background callback and the poller from
/// racing on a single transition into `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryStatus {
    Ready,
    Running,
    ToBeSeen,
    Completed,
    Failed,
}

impl QueryStatus {
    /// Returns true for states with no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One submitted statement, owned and mutated exclusively by the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryEntry {
    /// Unique id, assigned at submission time.
    pub id: u64,

    /// Raw SQL text as submitted.
    pub text: String,

    /// Current lifecycle state.
    pub status: QueryStatus,

    /// Set only when execution failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl QueryEntry {
    /// Creates a freshly submitted entry.
    pub fn new(id: u64, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            status: QueryStatus::Ready,
            error_message: None,
        }
    }
}

/// Reserved header used as a sentinel column name for error results.
pub const ERROR_HEADER: &str = "error";

/// Outcome of one execution attempt, real or placeholder.
///
/// Absent fields are omitted during serialization to keep payloads minimal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    /// Id of the entry that produced this result; absent for ad-hoc error
    /// results created before an id is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,

    /// Ordered column names; empty for zero-row results, the `error`
    /// sentinel for failed ones.
    pub headers: Vec<String>,

    /// Rectangular row data, aligned to `headers`.
    pub rows: Vec<Vec<Value>>,

    /// Entry status at the moment this result was produced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<QueryStatus>,

    /// Set only on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Wall-clock duration of the actual backend call. Absent for cache hits
    /// and for error short-circuits that never reached the backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
}

impl QueryResult {
    /// Builds a failed result carrying a human-readable message in the
    /// single-cell `["error"]` sentinel row.
    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            headers: vec![ERROR_HEADER.to_string()],
            rows: vec![vec![Value::String(message.clone())]],
            status: Some(QueryStatus::Failed),
            error_message: Some(message),
            ..Self::default()
        }
    }

    /// Same as [`QueryResult::error`], stamped with an entry id.
    pub fn error_for(id: u64, message: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            ..Self::error(message)
        }
    }

    /// Returns true if this result carries the error sentinel.
    pub fn is_error(&self) -> bool {
        self.error_message.is_some() || self.headers.as_slice() == [ERROR_HEADER]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_status_terminal() {
        assert!(QueryStatus::Completed.is_terminal());
        assert!(QueryStatus::Failed.is_terminal());
        assert!(!QueryStatus::Ready.is_terminal());
        assert!(!QueryStatus::Running.is_terminal());
        assert!(!QueryStatus::ToBeSeen.is_terminal());
    }

    #[test]
    fn test_error_result_shape() {
        let result = QueryResult::error_for(7, "Query not found for id=7");
        assert!(result.is_error());
        assert_eq!(result.id, Some(7));
        assert_eq!(result.headers, vec![ERROR_HEADER.to_string()]);
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].len(), 1);
        assert_eq!(result.status, Some(QueryStatus::Failed));
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let result = QueryResult {
            headers: vec!["id".to_string()],
            rows: vec![vec![Value::Int(1)]],
            ..QueryResult::default()
        };
        let json = serde_json::to_value(&result).unwrap();
        let object = json.as_object().unwrap();
        assert!(!object.contains_key("id"));
        assert!(!object.contains_key("status"));
        assert!(!object.contains_key("error_message"));
        assert!(!object.contains_key("execution_time_ms"));
        assert!(object.contains_key("headers"));
        assert!(object.contains_key("rows"));
    }

    #[test]
    fn test_status_serializes_screaming() {
        let json = serde_json::to_string(&QueryStatus::ToBeSeen).unwrap();
        assert_eq!(json, "\"TO_BE_SEEN\"");
        assert_eq!(
            serde_json::to_string(&QueryStatus::Running).unwrap(),
            "\"RUNNING\""
        );
    }

    #[test]
    fn test_entry_starts_ready() {
        let entry = QueryEntry::new(3, "SELECT 1");
        assert_eq!(entry.status, QueryStatus::Ready);
        assert_eq!(entry.id, 3);
        assert!(entry.error_message.is_none());
    }
}
