//! Error types for Querydeck.
//!
//! These cover faults outside the execution path: configuration, connection
//! setup, request validation, and internal bugs. Failures of an individual
//! statement execution are never surfaced here; they are converted to error
//! `QueryResult`s by the statement executor and reported as data.

use thiserror::Error;

/// Main error type for Querydeck operations.
#[derive(Error, Debug)]
pub enum QuerydeckError {
    /// Database connection errors (host unreachable, auth failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Request validation errors (no acceptable statements in a batch, etc.)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl QuerydeckError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a validation error with the given message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Validation(_) => "Validation Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using QuerydeckError.
pub type Result<T> = std::result::Result<T, QuerydeckError>;
