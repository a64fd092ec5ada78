//! API error envelope and error codes
//!
//! - `ErrorResponse`: body of every non-2xx response
//! - `ApiError`: handler error type, renders as `ErrorResponse`
//! - `error_codes`: numeric error code constants

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::transfer::TransferError;

// ============================================================================
// Error Envelope
// ============================================================================

/// Error body
///
/// - code: non-zero numeric error code (see [`error_codes`])
/// - msg: short message description
/// - data: optional payload, e.g. the failed transfer on insufficient funds
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = 1002)]
    pub code: i32,
    #[schema(example = "Insufficient funds")]
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub data: Option<serde_json::Value>,
}

/// Handler error: HTTP status plus envelope fields
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub msg: String,
    pub data: Option<serde_json::Value>,
    pub headers: HeaderMap,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, code: i32, msg: impl Into<String>) -> Self {
        Self {
            status,
            code,
            msg: msg.into(),
            data: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_codes::INVALID_PARAMETER, msg)
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            error_codes::SERVICE_UNAVAILABLE,
            msg,
        )
    }

    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            error_codes::INTERNAL_ERROR,
            "Internal server error",
        )
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_header(mut self, name: &'static str, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn into_err<T>(self) -> ApiResult<T> {
        Err(self)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            code: self.code,
            msg: self.msg,
            data: self.data,
        };
        (self.status, self.headers, Json(body)).into_response()
    }
}

/// Numeric code for a transfer error
fn error_code(e: &TransferError) -> i32 {
    match e {
        TransferError::InvalidAmount
        | TransferError::NoteTooLong
        | TransferError::InvalidIdempotencyKey
        | TransferError::InvalidAccount(_) => error_codes::INVALID_PARAMETER,
        TransferError::InsufficientFunds(_) => error_codes::INSUFFICIENT_BALANCE,
        TransferError::SameAccount => error_codes::SAME_ACCOUNT,
        TransferError::IdempotencyConflict(_) => error_codes::IDEMPOTENCY_CONFLICT,
        TransferError::Overflow => error_codes::BALANCE_OVERFLOW,
        TransferError::AccountNotFound(_) => error_codes::ACCOUNT_NOT_FOUND,
        TransferError::NotFound => error_codes::TRANSFER_NOT_FOUND,
        TransferError::InvalidStateTransition(_) | TransferError::Storage(_) => {
            error_codes::INTERNAL_ERROR
        }
    }
}

impl From<TransferError> for ApiError {
    fn from(e: TransferError) -> Self {
        // Storage details stay in the log
        if e.is_internal() {
            tracing::error!(error = %e, code = e.code(), "Request failed");
            return ApiError::internal();
        }

        let status =
            StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let err = ApiError::new(status, error_code(&e), e.to_string());

        match e {
            TransferError::InsufficientFunds(transfer) => match serde_json::to_value(&*transfer) {
                Ok(data) => err.with_data(data),
                Err(_) => err,
            },
            _ => err,
        }
    }
}

// ============================================================================
// Error Codes
// ============================================================================

/// Standard API error codes
pub mod error_codes {
    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const INSUFFICIENT_BALANCE: i32 = 1002;
    pub const SAME_ACCOUNT: i32 = 1003;
    pub const IDEMPOTENCY_CONFLICT: i32 = 1004;
    pub const BALANCE_OVERFLOW: i32 = 1005;

    // Resource errors (4xxx)
    pub const ACCOUNT_NOT_FOUND: i32 = 4001;
    pub const TRANSFER_NOT_FOUND: i32 = 4002;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
}
