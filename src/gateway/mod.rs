//! HTTP gateway
//!
//! ```text
//! /api/v1/health
//! /api/v1/transfers            POST create, GET list by account
//! /api/v1/transfers/{token}    GET lookup, DELETE archive
//! /api/v1/transfers/{token}/ledger
//! /api/v1/accounts             POST open
//! /api/v1/accounts/{id}        GET
//! /api/v1/accounts/{id}/ledger
//! /docs                        Swagger UI
//! ```

pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use state::AppState;

/// Build the complete router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(handlers::health_check))
        // Transfers
        .route(
            "/api/v1/transfers",
            post(handlers::create_transfer).get(handlers::list_transfers),
        )
        .route(
            "/api/v1/transfers/{token}",
            get(handlers::get_transfer).delete(handlers::archive_transfer),
        )
        .route(
            "/api/v1/transfers/{token}/ledger",
            get(handlers::transfer_ledger),
        )
        // Accounts
        .route("/api/v1/accounts", post(handlers::create_account))
        .route("/api/v1/accounts/{id}", get(handlers::get_account))
        .route("/api/v1/accounts/{id}/ledger", get(handlers::account_ledger))
        .with_state(state)
        // Stateless, added after with_state
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
}

/// Start HTTP Gateway server
///
/// Runs until `shutdown` resolves, then drains in-flight requests.
pub async fn run_server<F>(
    host: &str,
    port: u16,
    state: Arc<AppState>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {} (port already in use?)", addr))?;

    tracing::info!(%addr, "Gateway listening");
    tracing::info!("API Docs: http://{}/docs", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")?;

    tracing::info!("Gateway stopped");
    Ok(())
}
