//! Shared state for HTTP handlers.

use crate::service::QueryService;

/// Application state handed to every handler.
pub struct AppState {
    pub service: QueryService,
}

impl AppState {
    /// Creates the shared state over a query service.
    pub fn new(service: QueryService) -> Self {
        Self { service }
    }
}
