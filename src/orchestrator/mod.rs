//! Query execution orchestrator.
//!
//! The core of Querydeck: an in-memory registry of submitted statements, a
//! sync/async classification heuristic, a bounded result cache, a timed
//! statement executor, and a background runner with a polling protocol.

mod analyzer;
mod background;
mod cache;
mod executor;
mod model;
mod registry;

pub use analyzer::QueryAnalyzer;
pub use background::{BackgroundRunner, PendingHandle};
pub use cache::{ResultCache, DEFAULT_CACHE_CAPACITY};
pub use executor::StatementExecutor;
pub use model::{QueryEntry, QueryResult, QueryStatus, ERROR_HEADER};
pub use registry::{PollLocator, QueryRegistry};
