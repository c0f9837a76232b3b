//! Statement-safety filtering for submitted batches.
//!
//! A stateless keyword filter that runs upstream of the registry: the raw
//! request body is split on `;`, and only statements that look like plain
//! SELECTs survive. This is deliberately coarse; the orchestrator itself
//! never re-checks statement safety.

use tracing::{debug, warn};

/// Keywords that disqualify a statement outright.
const DENYLIST: &[&str] = &["DROP", "DELETE", "UPDATE", "INSERT", "--"];

/// Splits a raw request body into validated statements.
///
/// Returns the accepted statements in submission order; rejected statements
/// are logged and dropped.
pub fn parse_and_validate(body: &str) -> Vec<String> {
    if body.trim().is_empty() {
        warn!("Empty query request body");
        return Vec::new();
    }

    let statements: Vec<String> = body
        .split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
        .map(String::from)
        .collect();

    debug!("Parsed {} raw queries from request", statements.len());

    let validated: Vec<String> = statements
        .into_iter()
        .filter(|statement| {
            if is_valid_select(statement) {
                debug!("Accepted query: {}", statement);
                true
            } else {
                warn!("Rejected invalid or unsafe query: {}", statement);
                false
            }
        })
        .collect();

    if validated.is_empty() {
        warn!("No valid queries found after validation");
    }

    validated
}

/// Accepts statements that start with SELECT and contain no denied keyword.
fn is_valid_select(statement: &str) -> bool {
    let normalized = statement.trim().to_uppercase();
    normalized.starts_with("SELECT") && DENYLIST.iter().all(|deny| !normalized.contains(deny))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_accepts_plain_selects() {
        let accepted = parse_and_validate("SELECT * FROM users; select id from orders");
        assert_eq!(
            accepted,
            vec![
                "SELECT * FROM users".to_string(),
                "select id from orders".to_string()
            ]
        );
    }

    #[test]
    fn test_rejects_non_select_statements() {
        assert!(parse_and_validate("DROP TABLE users").is_empty());
        assert!(parse_and_validate("INSERT INTO t VALUES (1)").is_empty());
        assert!(parse_and_validate("EXPLAIN SELECT 1").is_empty());
    }

    #[test]
    fn test_rejects_denied_keywords_anywhere() {
        assert!(parse_and_validate("SELECT * FROM users; DELETE FROM users").len() == 1);
        assert!(parse_and_validate("SELECT * FROM users -- comment").is_empty());
    }

    #[test]
    fn test_empty_body() {
        assert!(parse_and_validate("").is_empty());
        assert!(parse_and_validate("  ;  ;  ").is_empty());
    }

    #[test]
    fn test_mixed_batch_keeps_order() {
        let accepted =
            parse_and_validate("SELECT 1; UPDATE t SET x = 1; SELECT 2; SELECT 3");
        assert_eq!(
            accepted,
            vec![
                "SELECT 1".to_string(),
                "SELECT 2".to_string(),
                "SELECT 3".to_string()
            ]
        );
    }
}
