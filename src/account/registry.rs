//! Account registry
//!
//! Thin create/read layer over the store. Balances change only through the
//! transfer engine.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::models::{Account, AccountId, NewAccount, Points};
use super::validation::{AccountName, validate_initial_balance};
use crate::store::LedgerStore;
use crate::transfer::TransferError;

pub struct AccountRegistry {
    store: Arc<dyn LedgerStore>,
}

impl AccountRegistry {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Open an account with an initial balance
    pub async fn open(&self, name: &str, initial_balance: Points) -> Result<Account, TransferError> {
        let name = AccountName::new(name).map_err(|e| TransferError::InvalidAccount(e.to_string()))?;
        let balance = validate_initial_balance(initial_balance)
            .map_err(|e| TransferError::InvalidAccount(e.to_string()))?;

        let account = self
            .store
            .create_account(&NewAccount {
                name: name.into_string(),
                balance,
                created_at: Utc::now(),
            })
            .await?;

        info!(account_id = account.id, balance = account.balance, "Account opened");
        Ok(account)
    }

    pub async fn get(&self, id: AccountId) -> Result<Account, TransferError> {
        self.store
            .get_account(id)
            .await?
            .ok_or(TransferError::AccountNotFound(id))
    }
}
