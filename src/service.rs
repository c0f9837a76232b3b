//! Service facade over validation and the query registry.
//!
//! Thin composition layer the transport consumes: raw request bodies go in,
//! validated statements reach the registry, and everything downstream is a
//! `QueryResult`.

use crate::error::{QuerydeckError, Result};
use crate::orchestrator::{QueryEntry, QueryRegistry, QueryResult};
use crate::validator;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Entry point for transports: submission, listing, execution, polling.
#[derive(Clone)]
pub struct QueryService {
    registry: Arc<QueryRegistry>,
}

impl QueryService {
    /// Creates a service over the given registry.
    pub fn new(registry: Arc<QueryRegistry>) -> Self {
        Self { registry }
    }

    /// Validates a raw request body and registers the surviving statements.
    ///
    /// Returns the assigned ids in submission order, or a validation error
    /// when no statement survives.
    pub fn add_queries(&self, body: &str) -> Result<Vec<u64>> {
        info!("Received new query batch request");

        let statements = validator::parse_and_validate(body);
        if statements.is_empty() {
            warn!("No valid queries found in request");
            return Err(QuerydeckError::validation(
                "no valid queries found in request",
            ));
        }

        let ids = self.registry.add_queries(statements);
        info!("Added {} queries to execution queue", ids.len());
        Ok(ids)
    }

    /// Lists all registered entries in insertion order.
    pub fn queries(&self) -> Vec<QueryEntry> {
        debug!("Fetching all queries from registry");
        self.registry.queries()
    }

    /// Executes the entry with the given id.
    pub async fn execute_by_id(&self, id: u64) -> QueryResult {
        info!("Executing query with ID={}", id);
        self.registry.execute_by_id(id).await
    }

    /// Reports the current outcome of a background execution.
    pub fn poll_execution(&self, id: u64) -> QueryResult {
        self.registry.poll_execution(id)
    }

    /// Removes all terminal entries from the registry.
    pub fn clean_finished(&self) {
        self.registry.clean_finished();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MockBackend;
    use crate::orchestrator::QueryStatus;
    use pretty_assertions::assert_eq;

    fn service() -> QueryService {
        let registry = QueryRegistry::with_backend(Arc::new(MockBackend::new()), 16);
        QueryService::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_add_queries_filters_and_assigns_ids() {
        let service = service();
        let ids = service
            .add_queries("SELECT * FROM users; DROP TABLE users; SELECT 1")
            .unwrap();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(service.queries().len(), 2);
    }

    #[tokio::test]
    async fn test_add_queries_rejects_all_invalid() {
        let service = service();
        let err = service.add_queries("DROP TABLE users").unwrap_err();
        assert!(matches!(err, QuerydeckError::Validation(_)));
        assert!(service.queries().is_empty());
    }

    #[tokio::test]
    async fn test_execute_through_facade() {
        let service = service();
        let ids = service.add_queries("SELECT * FROM users").unwrap();
        let result = service.execute_by_id(ids[0]).await;
        assert_eq!(result.status, Some(QueryStatus::Completed));
        assert_eq!(result.rows.len(), 2);
    }
}
