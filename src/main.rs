//! Points Ledger server
//!
//! ```text
//! config/{env}.yaml ──▶ store (PostgreSQL | memory) ──▶ engine + query ──▶ axum gateway
//! ```

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use points_ledger::config::AppConfig;
use points_ledger::db::Database;
use points_ledger::gateway::handlers::health::VERSION;
use points_ledger::gateway::{run_server, state::AppState};
use points_ledger::logging::init_logging;
use points_ledger::store::{LedgerStore, MemoryStore, PgStore};

/// Command line arguments
#[derive(Debug, Parser)]
#[command(
    name = "points_ledger",
    about = "Points transfer service with an append-only ledger",
    version
)]
struct Cli {
    /// Config environment; loads `config/{env}.yaml`
    #[arg(long, default_value = "dev")]
    env: String,
    /// Listen port, overriding `gateway.port`
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(&cli.env)?;
    let _log_guard = init_logging(&config);

    info!(env = %cli.env, version = VERSION, "Starting points ledger");

    let store = open_store(&config).await?;
    info!(store = store.name(), "Store ready");

    let state = Arc::new(AppState::new(store));
    let port = cli.port.unwrap_or(config.gateway.port);

    run_server(&config.gateway.host, port, state, shutdown_signal()).await
}

async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn LedgerStore>> {
    let Some(url) = config.database_url() else {
        warn!("No PostgreSQL URL configured; using the in-memory store (data is lost on exit)");
        return Ok(Arc::new(MemoryStore::new()));
    };

    let db = Database::connect(
        url,
        config.database.max_connections,
        config.database.acquire_timeout_secs,
    )
    .await
    .context("Failed to connect to PostgreSQL")?;
    db.migrate().await.context("Failed to run migrations")?;

    Ok(Arc::new(PgStore::new(db.pool().clone())))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            // Without a signal handler, run until killed
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
