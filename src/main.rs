//! Querydeck - a small service that queues read-only SQL, runs it sync or
//! in the background, and caches results.

mod cli;
mod config;
mod db;
mod error;
mod logging;
mod orchestrator;
mod service;
mod validator;
mod web;

use cli::Cli;
use config::{Config, ConnectionConfig};
use db::{MockBackend, SqlBackend};
use error::{QuerydeckError, Result};
use orchestrator::QueryRegistry;
use service::QueryService;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    logging::init();

    if let Err(e) = run().await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let backend: Arc<dyn SqlBackend> = if cli.mock_db {
        warn!("Using in-memory mock database");
        Arc::new(MockBackend::new())
    } else {
        let connection = resolve_connection(&cli, &config)?.ok_or_else(|| {
            QuerydeckError::config(
                "No database connection configured. Pass a connection string or use --mock-db.",
            )
        })?;
        db::connect(&connection).await?
    };

    let registry = QueryRegistry::with_backend(backend, config.orchestrator.cache_capacity)
        .with_poll_locator(web::poll_locator());
    let service = QueryService::new(Arc::new(registry));

    let listen = cli
        .listen
        .clone()
        .unwrap_or_else(|| config.server.listen.clone());

    web::serve(&listen, service).await
}

/// Resolves the final connection configuration from CLI args, config file,
/// and environment. Precedence: CLI, then named connection, then default
/// connection, then `PG*` environment variables.
fn resolve_connection(cli: &Cli, config: &Config) -> Result<Option<ConnectionConfig>> {
    let mut connection = cli.to_connection_config()?;

    if connection.is_none() {
        if let Some(name) = cli.connection_name() {
            connection = config.get_connection(Some(name)).cloned();
            if connection.is_none() {
                return Err(QuerydeckError::config(format!(
                    "Connection '{}' not found in config file",
                    name
                )));
            }
        }
    }

    if connection.is_none() {
        connection = config.get_connection(None).cloned();
    }

    if let Some(ref mut conn) = connection {
        conn.apply_env_defaults();
    }

    Ok(connection)
}
