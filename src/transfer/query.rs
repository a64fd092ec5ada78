//! Transfer queries
//!
//! Read paths only. Nothing here opens a transaction or takes a row lock.

use std::sync::Arc;

use super::error::TransferError;
use super::types::{IdempotencyKey, Page, PageRequest, Transfer};
use crate::account::AccountId;
use crate::ledger::LedgerEntry;
use crate::store::LedgerStore;

pub struct TransferQuery {
    store: Arc<dyn LedgerStore>,
}

impl TransferQuery {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Look up a visible transfer by its idempotency token
    pub async fn get_by_key(&self, token: &str) -> Result<Transfer, TransferError> {
        // A token that could never have been issued cannot match anything
        let key = IdempotencyKey::parse(token).map_err(|_| TransferError::NotFound)?;
        self.store
            .find_transfer_by_key(&key, false)
            .await?
            .ok_or(TransferError::NotFound)
    }

    /// Transfers where the account is source or destination, newest first
    pub async fn list_by_account(
        &self,
        account_id: AccountId,
        page: PageRequest,
    ) -> Result<Page<Transfer>, TransferError> {
        let (rows, total) = self
            .store
            .list_transfers_for_account(account_id, page)
            .await?;
        Ok(Page::new(rows, page, total))
    }

    /// Ledger entries written by one transfer
    ///
    /// Empty for failed transfers.
    pub async fn ledger_for_transfer(&self, token: &str) -> Result<Vec<LedgerEntry>, TransferError> {
        let transfer = self.get_by_key(token).await?;
        Ok(self.store.ledger_for_transfer(transfer.id).await?)
    }

    /// Ledger history of one account, newest first
    pub async fn ledger_for_account(
        &self,
        account_id: AccountId,
        page: PageRequest,
    ) -> Result<Page<LedgerEntry>, TransferError> {
        if self.store.get_account(account_id).await?.is_none() {
            return Err(TransferError::AccountNotFound(account_id));
        }
        let (rows, total) = self.store.ledger_for_account(account_id, page).await?;
        Ok(Page::new(rows, page, total))
    }
}
