//! Transfer handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderMap, HeaderValue, StatusCode},
};

use super::super::state::AppState;
use super::super::types::{
    ApiError, ApiResult, CreateTransferBody, ErrorResponse, IDEMPOTENCY_KEY_HEADER, LedgerList,
    ListTransfersQuery, TransferEnvelope, TransferPage,
};
use crate::transfer::{IdempotencyKey, TransferError};

/// Idempotency key from the request header, if any
fn header_key(headers: &HeaderMap) -> ApiResult<Option<String>> {
    match headers.get(IDEMPOTENCY_KEY_HEADER) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|s| Some(s.to_string()))
            .map_err(|_| ApiError::bad_request("Idempotency-Key header must be visible ASCII")),
    }
}

fn key_header_value(key: &IdempotencyKey) -> Option<HeaderValue> {
    HeaderValue::from_str(key.as_str()).ok()
}

/// Create transfer endpoint
///
/// POST /api/v1/transfers
///
/// Returns 201 for a new transfer and 200 when a caller-supplied key replays
/// a completed one. The token is echoed in the `Idempotency-Key` header, also
/// on the 409 carrying a declined transfer.
#[utoipa::path(
    post,
    path = "/api/v1/transfers",
    request_body = CreateTransferBody,
    params(
        ("Idempotency-Key" = Option<String>, Header, description = "Caller-chosen idempotency token")
    ),
    responses(
        (status = 201, description = "Transfer completed", body = TransferEnvelope),
        (status = 200, description = "Replay of an earlier completed transfer", body = TransferEnvelope),
        (status = 400, description = "Malformed or invalid input", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse),
        (status = 409, description = "Insufficient funds; failed transfer in data", body = ErrorResponse),
        (status = 422, description = "Same account or idempotency conflict", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    tag = "Transfer"
)]
pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<CreateTransferBody>, JsonRejection>,
) -> ApiResult<(StatusCode, HeaderMap, Json<TransferEnvelope>)> {
    let Json(body) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let req = body.into_request(header_key(&headers)?);

    let receipt = match state.engine.create(req).await {
        Ok(receipt) => receipt,
        Err(TransferError::InsufficientFunds(transfer)) => {
            let value = key_header_value(&transfer.idempotency_key);
            let err = ApiError::from(TransferError::InsufficientFunds(transfer));
            return Err(match value {
                Some(v) => err.with_header(IDEMPOTENCY_KEY_HEADER, v),
                None => err,
            });
        }
        Err(e) => return Err(e.into()),
    };

    let mut response_headers = HeaderMap::new();
    if let Some(value) = key_header_value(&receipt.transfer.idempotency_key) {
        response_headers.insert(IDEMPOTENCY_KEY_HEADER, value);
    }
    let status = if receipt.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    Ok((
        status,
        response_headers,
        Json(TransferEnvelope {
            transfer: receipt.transfer,
        }),
    ))
}

/// Get transfer by idempotency token
///
/// GET /api/v1/transfers/{token}
#[utoipa::path(
    get,
    path = "/api/v1/transfers/{token}",
    params(
        ("token" = String, Path, description = "Idempotency token returned by create")
    ),
    responses(
        (status = 200, description = "Transfer", body = TransferEnvelope),
        (status = 404, description = "Transfer not found", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    tag = "Transfer"
)]
pub async fn get_transfer(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> ApiResult<Json<TransferEnvelope>> {
    let transfer = state.query.get_by_key(&token).await?;
    Ok(Json(TransferEnvelope { transfer }))
}

/// List transfers of an account
///
/// GET /api/v1/transfers?accountId=&page=&pageSize=
#[utoipa::path(
    get,
    path = "/api/v1/transfers",
    params(ListTransfersQuery),
    responses(
        (status = 200, description = "Transfers, newest first", body = TransferPage),
        (status = 400, description = "Missing or invalid accountId", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    tag = "Transfer"
)]
pub async fn list_transfers(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListTransfersQuery>, QueryRejection>,
) -> ApiResult<Json<TransferPage>> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let account_id = query
        .account_id()
        .ok_or_else(|| ApiError::bad_request("accountId is required and must be a positive integer"))?;

    let page = state
        .query
        .list_by_account(account_id, query.page_request())
        .await?;
    Ok(Json(page.into()))
}

/// Archive (soft-delete) a transfer
///
/// DELETE /api/v1/transfers/{token}
#[utoipa::path(
    delete,
    path = "/api/v1/transfers/{token}",
    params(
        ("token" = String, Path, description = "Idempotency token")
    ),
    responses(
        (status = 204, description = "Transfer archived"),
        (status = 404, description = "Transfer not found", body = ErrorResponse)
    ),
    tag = "Transfer"
)]
pub async fn archive_transfer(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> ApiResult<StatusCode> {
    state.engine.archive(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Ledger entries written by a transfer
///
/// GET /api/v1/transfers/{token}/ledger
#[utoipa::path(
    get,
    path = "/api/v1/transfers/{token}/ledger",
    params(
        ("token" = String, Path, description = "Idempotency token")
    ),
    responses(
        (status = 200, description = "Ledger entries (empty for failed transfers)", body = LedgerList),
        (status = 404, description = "Transfer not found", body = ErrorResponse)
    ),
    tag = "Ledger"
)]
pub async fn transfer_ledger(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> ApiResult<Json<LedgerList>> {
    let data = state.query.ledger_for_transfer(&token).await?;
    Ok(Json(LedgerList { data }))
}
