//! Transfer Core Types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::TransferError;
use super::state::TransferStatus;
use crate::account::{AccountId, Points};

/// Transfer row identifier (BIGSERIAL in PostgreSQL)
pub type TransferId = i64;

/// Maximum length of a transfer note (characters)
pub const MAX_NOTE_LEN: usize = 512;

/// Maximum length of an idempotency key (characters)
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

/// Default page size for listings
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Largest accepted page size; anything above falls back to the default
pub const MAX_PAGE_SIZE: i64 = 200;

/// Idempotency token identifying one transfer attempt
///
/// Server-generated keys are UUIDv4 strings. Client-supplied keys are opaque
/// but must be non-blank and at most [`MAX_IDEMPOTENCY_KEY_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Mint a fresh, globally unique key
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Validate a caller-supplied key
    pub fn parse(raw: &str) -> Result<Self, TransferError> {
        let key = raw.trim();
        if key.is_empty() || key.chars().count() > MAX_IDEMPOTENCY_KEY_LEN {
            return Err(TransferError::InvalidIdempotencyKey);
        }
        Ok(Self(key.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persisted transfer attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    #[serde(rename = "transferId")]
    #[schema(example = 42)]
    pub id: TransferId,
    #[schema(example = 1)]
    pub from_account_id: AccountId,
    #[schema(example = 2)]
    pub to_account_id: AccountId,
    #[schema(example = 250)]
    pub amount: Points,
    pub status: TransferStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[schema(value_type = String, example = "5f0c2a8e-8d7b-4c8e-9a51-0b3f4f1f2d6a")]
    pub idempotency_key: IdempotencyKey,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_reason: Option<String>,
    /// Tombstone for archived transfers; never exposed on the wire
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Transfer {
    pub fn is_archived(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Whether `req` describes the same movement as this transfer
    pub fn matches_request(&self, req: &TransferRequest) -> bool {
        self.from_account_id == req.from
            && self.to_account_id == req.to
            && self.amount == req.amount
    }

    /// Whether the account is either side of this transfer
    pub fn involves(&self, account_id: AccountId) -> bool {
        self.from_account_id == account_id || self.to_account_id == account_id
    }
}

/// Insert payload for a transfer row
#[derive(Debug, Clone)]
pub struct NewTransfer {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: Points,
    pub status: TransferStatus,
    pub note: Option<String>,
    pub idempotency_key: IdempotencyKey,
    pub fail_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Compare-and-swap status update
///
/// Applied only when the stored status equals `expected`.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub expected: TransferStatus,
    pub status: TransferStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub fail_reason: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Transfer request from the API layer
#[derive(Debug, Clone)]
pub struct TransferRequest {
    /// Source account (debited)
    pub from: AccountId,
    /// Destination account (credited)
    pub to: AccountId,
    /// Amount in points
    pub amount: Points,
    /// Free-text note
    pub note: Option<String>,
    /// Client-provided idempotency key (optional)
    pub idempotency_key: Option<String>,
}

impl TransferRequest {
    /// Create a new transfer request
    pub fn new(from: AccountId, to: AccountId, amount: Points) -> Self {
        Self {
            from,
            to,
            amount,
            note: None,
            idempotency_key: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Result of a successful `create`
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    pub transfer: Transfer,
    /// True when an existing transfer was returned for a reused key
    pub replayed: bool,
}

/// Normalized pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    /// Normalize raw parameters
    ///
    /// `page` below 1 (or absent) becomes 1. `page_size` outside
    /// `[1, MAX_PAGE_SIZE]` (or absent) becomes [`DEFAULT_PAGE_SIZE`].
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
        let page = page.filter(|p| *p >= 1).unwrap_or(1);
        let page_size = page_size
            .filter(|s| (1..=MAX_PAGE_SIZE).contains(s))
            .unwrap_or(DEFAULT_PAGE_SIZE);
        Self { page, page_size }
    }

    /// Rows to skip
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus the total row count
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, request: PageRequest, total: i64) -> Self {
        Self {
            data,
            page: request.page,
            page_size: request.page_size,
            total,
        }
    }
}
