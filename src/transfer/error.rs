//! Transfer Error Types
//!
//! Business errors carry a stable code and an HTTP status suggestion.
//! Storage failures are wrapped opaquely in [`TransferError::Storage`].

use thiserror::Error;

use super::types::{MAX_IDEMPOTENCY_KEY_LEN, MAX_NOTE_LEN, Transfer};
use crate::account::AccountId;
use crate::store::StoreError;

/// Transfer error types
#[derive(Error, Debug)]
pub enum TransferError {
    // === Validation Errors (no storage access) ===
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Cannot transfer to the same account")]
    SameAccount,

    #[error("Note exceeds {max} characters", max = MAX_NOTE_LEN)]
    NoteTooLong,

    #[error("Idempotency key must be 1 to {max} characters", max = MAX_IDEMPOTENCY_KEY_LEN)]
    InvalidIdempotencyKey,

    #[error("Invalid account: {0}")]
    InvalidAccount(String),

    // === Account Errors ===
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Declined for lack of funds. The failed transfer is already committed.
    #[error("Insufficient funds")]
    InsufficientFunds(Box<Transfer>),

    #[error("Balance would overflow")]
    Overflow,

    // === Lookup / Idempotency Errors ===
    #[error("Transfer not found")]
    NotFound,

    #[error("Idempotency key conflict: {0}")]
    IdempotencyConflict(String),

    // === System Errors ===
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl TransferError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::InvalidAmount => "INVALID_AMOUNT",
            TransferError::SameAccount => "SAME_ACCOUNT",
            TransferError::NoteTooLong => "NOTE_TOO_LONG",
            TransferError::InvalidIdempotencyKey => "INVALID_IDEMPOTENCY_KEY",
            TransferError::InvalidAccount(_) => "INVALID_ACCOUNT",
            TransferError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            TransferError::InsufficientFunds(_) => "INSUFFICIENT_FUNDS",
            TransferError::Overflow => "OVERFLOW",
            TransferError::NotFound => "TRANSFER_NOT_FOUND",
            TransferError::IdempotencyConflict(_) => "IDEMPOTENCY_CONFLICT",
            TransferError::InvalidStateTransition(_) | TransferError::Storage(_) => {
                "INTERNAL_ERROR"
            }
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            TransferError::InvalidAmount
            | TransferError::NoteTooLong
            | TransferError::InvalidIdempotencyKey
            | TransferError::InvalidAccount(_) => 400,
            TransferError::AccountNotFound(_) | TransferError::NotFound => 404,
            TransferError::InsufficientFunds(_) => 409,
            TransferError::SameAccount
            | TransferError::Overflow
            | TransferError::IdempotencyConflict(_) => 422,
            TransferError::InvalidStateTransition(_) | TransferError::Storage(_) => 500,
        }
    }

    /// Internal errors are reported without detail
    pub fn is_internal(&self) -> bool {
        self.http_status() >= 500
    }
}
