//! Health check handler

use std::sync::Arc;

use axum::{Json, extract::State};
use utoipa::ToSchema;

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, ErrorResponse};

/// Package version plus the git hash baked in by `build.rs`
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("GIT_HASH"));

/// Health check response data
#[derive(serde::Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: &'static str,
    #[schema(example = "0.1.0+abc1234")]
    pub version: &'static str,
}

/// Health check endpoint
///
/// Pings the store. Failure details are logged, not returned.
///
/// - Healthy: 200 OK + {status, version}
/// - Unhealthy: 503 Service Unavailable
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse, content_type = "application/json"),
        (status = 503, description = "Store unreachable", body = ErrorResponse)
    ),
    tag = "System"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> ApiResult<Json<HealthResponse>> {
    if let Err(e) = state.store.health_check().await {
        tracing::error!(store = state.store.name(), error = %e, "[HEALTH] Store ping failed");
        return ApiError::service_unavailable("unavailable").into_err();
    }

    Ok(Json(HealthResponse {
        status: "ok",
        version: VERSION,
    }))
}
