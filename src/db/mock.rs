//! Mock SQL backend for testing.
//!
//! Holds a handful of named tables in memory and answers `SELECT ... FROM t`
//! by returning the whole table. Unknown tables produce the same classified
//! error a real backend would, which is what the executor tests need.

use super::{BackendError, BackendRow, SqlBackend, Value};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// A mock backend that serves predefined tables.
pub struct MockBackend {
    tables: HashMap<String, (Vec<String>, Vec<Vec<Value>>)>,
    latency: Duration,
    forced_error: Option<BackendError>,
}

impl MockBackend {
    /// Creates a mock backend with a small default `users` table.
    pub fn new() -> Self {
        let mut backend = Self::empty();
        backend.add_table(
            "users",
            vec!["id", "name"],
            vec![
                vec![Value::Int(1), Value::from("Alice")],
                vec![Value::Int(2), Value::from("Bob")],
            ],
        );
        backend
    }

    /// Creates a mock backend with no tables.
    pub fn empty() -> Self {
        Self {
            tables: HashMap::new(),
            latency: Duration::ZERO,
            forced_error: None,
        }
    }

    /// Registers a table under the given name.
    pub fn add_table(&mut self, name: &str, columns: Vec<&str>, rows: Vec<Vec<Value>>) {
        self.tables.insert(
            name.to_lowercase(),
            (columns.into_iter().map(String::from).collect(), rows),
        );
    }

    /// Adds artificial latency to every fetch, for background-execution tests.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Makes every fetch fail with the given error.
    pub fn with_error(mut self, error: BackendError) -> Self {
        self.forced_error = Some(error);
        self
    }

    /// Extracts the first table name after a `FROM` keyword, if any.
    fn target_table(sql: &str) -> Option<String> {
        let mut words = sql.split_whitespace();
        while let Some(word) = words.next() {
            if word.eq_ignore_ascii_case("from") {
                return words
                    .next()
                    .map(|t| t.trim_end_matches(';').to_lowercase());
            }
        }
        None
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SqlBackend for MockBackend {
    async fn fetch_rows(&self, sql: &str) -> std::result::Result<Vec<BackendRow>, BackendError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if let Some(error) = &self.forced_error {
            return Err(error.clone());
        }

        let trimmed = sql.trim();
        if !trimmed
            .get(..6)
            .is_some_and(|p| p.eq_ignore_ascii_case("select"))
        {
            return Err(BackendError::Syntax(format!(
                "statement is not a SELECT: {trimmed}"
            )));
        }

        match Self::target_table(trimmed) {
            Some(table) => match self.tables.get(&table) {
                Some((columns, rows)) => Ok(rows
                    .iter()
                    .map(|row| BackendRow::new(columns.clone(), row.clone()))
                    .collect()),
                None => Err(BackendError::TableNotFound(format!(
                    "relation \"{table}\" not found"
                ))),
            },
            // SELECT without FROM (e.g. "SELECT 1") yields a single scalar row.
            None => Ok(vec![BackendRow::new(
                vec!["?column?".to_string()],
                vec![Value::from(trimmed.to_string())],
            )]),
        }
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_select_known_table() {
        let backend = MockBackend::new();
        let rows = backend.fetch_rows("SELECT * FROM users").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].columns(), &["id".to_string(), "name".to_string()]);
        assert_eq!(rows[0].get("name"), Some(&Value::from("Alice")));
    }

    #[tokio::test]
    async fn test_mock_unknown_table() {
        let backend = MockBackend::new();
        let err = backend
            .fetch_rows("SELECT * FROM nowhere")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::TableNotFound(_)));
    }

    #[tokio::test]
    async fn test_mock_rejects_non_select() {
        let backend = MockBackend::new();
        let err = backend.fetch_rows("DROP TABLE users").await.unwrap_err();
        assert!(matches!(err, BackendError::Syntax(_)));
    }

    #[tokio::test]
    async fn test_mock_forced_error() {
        let backend =
            MockBackend::new().with_error(BackendError::DataAccess("pool closed".to_string()));
        let err = backend.fetch_rows("SELECT * FROM users").await.unwrap_err();
        assert_eq!(err, BackendError::DataAccess("pool closed".to_string()));
    }

    #[tokio::test]
    async fn test_mock_scalar_select() {
        let backend = MockBackend::new();
        let rows = backend.fetch_rows("SELECT 1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].columns(), &["?column?".to_string()]);
    }
}
