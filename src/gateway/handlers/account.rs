//! Account handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use validator::Validate;

use super::super::state::AppState;
use super::super::types::{
    AccountEnvelope, ApiError, ApiResult, CreateAccountBody, ErrorResponse, LedgerPage, PageQuery,
};
use crate::account::AccountId;

fn account_id(path: Result<Path<AccountId>, PathRejection>) -> ApiResult<AccountId> {
    let Path(id) = path.map_err(|_| ApiError::bad_request("Invalid account id"))?;
    Ok(id)
}

/// Open account endpoint
///
/// POST /api/v1/accounts
#[utoipa::path(
    post,
    path = "/api/v1/accounts",
    request_body = CreateAccountBody,
    responses(
        (status = 201, description = "Account opened", body = AccountEnvelope),
        (status = 400, description = "Invalid name or balance", body = ErrorResponse)
    ),
    tag = "Account"
)]
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateAccountBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AccountEnvelope>)> {
    let Json(body) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    body.validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let account = state.accounts.open(&body.name, body.balance).await?;
    Ok((StatusCode::CREATED, Json(AccountEnvelope { account })))
}

/// Get account endpoint
///
/// GET /api/v1/accounts/{id}
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{id}",
    params(
        ("id" = i64, Path, description = "Account id")
    ),
    responses(
        (status = 200, description = "Account", body = AccountEnvelope),
        (status = 404, description = "Account not found", body = ErrorResponse)
    ),
    tag = "Account"
)]
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    path: Result<Path<AccountId>, PathRejection>,
) -> ApiResult<Json<AccountEnvelope>> {
    let account = state.accounts.get(account_id(path)?).await?;
    Ok(Json(AccountEnvelope { account }))
}

/// Ledger history of an account
///
/// GET /api/v1/accounts/{id}/ledger?page=&pageSize=
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{id}/ledger",
    params(
        ("id" = i64, Path, description = "Account id"),
        PageQuery
    ),
    responses(
        (status = 200, description = "Ledger entries, newest first", body = LedgerPage),
        (status = 404, description = "Account not found", body = ErrorResponse)
    ),
    tag = "Ledger"
)]
pub async fn account_ledger(
    State(state): State<Arc<AppState>>,
    path: Result<Path<AccountId>, PathRejection>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<LedgerPage>> {
    let id = account_id(path)?;
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let page = state
        .query
        .ledger_for_account(id, query.page_request())
        .await?;
    Ok(Json(page.into()))
}
