//! Storage port for accounts, transfers and the ledger
//!
//! The transfer engine talks to storage only through these traits:
//!
//! - [`LedgerStore`]: the injected handle. Read paths, account creation,
//!   transfer archival, and [`LedgerStore::begin`] for mutations.
//! - [`StoreTx`]: one ACID transaction. Account rows read through
//!   [`StoreTx::lock_account`] stay locked until commit or rollback.
//!
//! Ledger entries can be appended and read, never updated or deleted:
//! neither trait has such a method.
//!
//! Adapters: [`PgStore`] (PostgreSQL via sqlx) and [`MemoryStore`].

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::account::{Account, AccountId, NewAccount, Points};
use crate::ledger::{LedgerEntry, NewLedgerEntry};
use crate::transfer::types::{
    IdempotencyKey, NewTransfer, PageRequest, StatusUpdate, Transfer, TransferId,
};

/// Storage errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    /// Unique constraint violated (idempotency key already taken)
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// A stored row could not be decoded into a domain type
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::DuplicateKey(db.message().to_string())
            }
            _ => StoreError::Database(e.to_string()),
        }
    }
}

/// Injected storage handle
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Adapter name for logging
    fn name(&self) -> &'static str;

    /// Open a transaction
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError>;

    /// Check that the backing store is reachable
    async fn health_check(&self) -> Result<(), StoreError>;

    // === Accounts ===

    async fn create_account(&self, account: &NewAccount) -> Result<Account, StoreError>;

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    // === Transfers ===

    /// Find a transfer by idempotency key
    ///
    /// With `include_archived` the tombstoned rows are returned too; the
    /// idempotency check needs them because their keys stay reserved.
    async fn find_transfer_by_key(
        &self,
        key: &IdempotencyKey,
        include_archived: bool,
    ) -> Result<Option<Transfer>, StoreError>;

    /// Non-archived transfers where the account is source or destination,
    /// newest first, plus the total count
    async fn list_transfers_for_account(
        &self,
        account_id: AccountId,
        page: PageRequest,
    ) -> Result<(Vec<Transfer>, i64), StoreError>;

    /// Set the tombstone. Returns false when no visible transfer has the key.
    async fn archive_transfer(
        &self,
        key: &IdempotencyKey,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    // === Ledger (read-only) ===

    async fn ledger_for_transfer(
        &self,
        transfer_id: TransferId,
    ) -> Result<Vec<LedgerEntry>, StoreError>;

    /// Entries of one account, newest first, plus the total count
    async fn ledger_for_account(
        &self,
        account_id: AccountId,
        page: PageRequest,
    ) -> Result<(Vec<LedgerEntry>, i64), StoreError>;
}

/// One storage transaction
///
/// Dropping without [`StoreTx::commit`] discards every change.
#[async_trait]
pub trait StoreTx: Send {
    /// Read an account and hold its row lock until the transaction ends
    async fn lock_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Overwrite the balance of a locked account
    async fn set_balance(
        &mut self,
        id: AccountId,
        balance: Points,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Insert a transfer row; a taken key yields [`StoreError::DuplicateKey`]
    async fn insert_transfer(&mut self, transfer: &NewTransfer) -> Result<Transfer, StoreError>;

    /// Compare-and-swap the status
    ///
    /// Returns `None` when the stored status does not match `update.expected`.
    async fn update_transfer_status(
        &mut self,
        id: TransferId,
        update: &StatusUpdate,
    ) -> Result<Option<Transfer>, StoreError>;

    /// Append one ledger entry
    async fn append_ledger_entry(
        &mut self,
        entry: &NewLedgerEntry,
    ) -> Result<LedgerEntry, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
