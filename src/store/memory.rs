//! In-memory store
//!
//! Used by tests and when no PostgreSQL URL is configured. A transaction
//! takes an owned lock on the whole state and works on a staged copy, so
//! transactions are serializable and a dropped transaction leaves no trace.

use std::collections::BTreeMap;
use std::sync::Arc;
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{LedgerStore, StoreError, StoreTx};
use crate::account::{Account, AccountId, NewAccount, Points};
use crate::ledger::{LedgerEntry, NewLedgerEntry};
use crate::transfer::types::{
    IdempotencyKey, NewTransfer, PageRequest, StatusUpdate, Transfer, TransferId,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    accounts: BTreeMap<AccountId, Account>,
    transfers: BTreeMap<TransferId, Transfer>,
    ledger: Vec<LedgerEntry>,
    last_account_id: AccountId,
    last_transfer_id: TransferId,
    last_ledger_id: i64,
}

fn next_id(last: &mut i64) -> i64 {
    *last += 1;
    *last
}

fn paginate<T: Clone>(rows: &[T], page: PageRequest) -> Vec<T> {
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit()).unwrap_or(0);
    rows.iter().skip(offset).take(limit).cloned().collect()
}

/// In-memory [`LedgerStore`]
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    #[cfg(test)]
    fail_ledger_append: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent ledger append fail
    #[cfg(test)]
    pub fn set_fail_ledger_append(&self, fail: bool) {
        self.fail_ledger_append.store(fail, Ordering::SeqCst);
    }

    /// Number of ledger rows, archived transfers included
    #[cfg(test)]
    pub async fn ledger_len(&self) -> usize {
        self.state.lock().await.ledger.len()
    }

    /// Number of transfer rows, archived ones included
    #[cfg(test)]
    pub async fn transfer_count(&self) -> usize {
        self.state.lock().await.transfers.len()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            staged,
            #[cfg(test)]
            fail_ledger_append: self.fail_ledger_append.load(Ordering::SeqCst),
        }))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_account(&self, account: &NewAccount) -> Result<Account, StoreError> {
        let mut state = self.state.lock().await;
        let id = next_id(&mut state.last_account_id);
        let row = Account {
            id,
            name: account.name.clone(),
            balance: account.balance,
            created_at: account.created_at,
            updated_at: account.created_at,
        };
        state.accounts.insert(id, row.clone());
        Ok(row)
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.state.lock().await.accounts.get(&id).cloned())
    }

    async fn find_transfer_by_key(
        &self,
        key: &IdempotencyKey,
        include_archived: bool,
    ) -> Result<Option<Transfer>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .transfers
            .values()
            .find(|t| &t.idempotency_key == key && (include_archived || !t.is_archived()))
            .cloned())
    }

    async fn list_transfers_for_account(
        &self,
        account_id: AccountId,
        page: PageRequest,
    ) -> Result<(Vec<Transfer>, i64), StoreError> {
        let state = self.state.lock().await;
        let mut rows: Vec<Transfer> = state
            .transfers
            .values()
            .filter(|t| !t.is_archived() && t.involves(account_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = rows.len() as i64;
        Ok((paginate(&rows, page), total))
    }

    async fn archive_transfer(
        &self,
        key: &IdempotencyKey,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let Some(transfer) = state
            .transfers
            .values_mut()
            .find(|t| &t.idempotency_key == key && !t.is_archived())
        else {
            return Ok(false);
        };
        transfer.deleted_at = Some(at);
        transfer.updated_at = at;
        Ok(true)
    }

    async fn ledger_for_transfer(
        &self,
        transfer_id: TransferId,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .ledger
            .iter()
            .filter(|e| e.transfer_id == Some(transfer_id))
            .cloned()
            .collect())
    }

    async fn ledger_for_account(
        &self,
        account_id: AccountId,
        page: PageRequest,
    ) -> Result<(Vec<LedgerEntry>, i64), StoreError> {
        let state = self.state.lock().await;
        let mut rows: Vec<LedgerEntry> = state
            .ledger
            .iter()
            .filter(|e| e.account_id == account_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = rows.len() as i64;
        Ok((paginate(&rows, page), total))
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    #[cfg(test)]
    fail_ledger_append: bool,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn lock_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.staged.accounts.get(&id).cloned())
    }

    async fn set_balance(
        &mut self,
        id: AccountId,
        balance: Points,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if balance < 0 {
            return Err(StoreError::Database(format!(
                "balance check violated for account {}",
                id
            )));
        }
        let account = self
            .staged
            .accounts
            .get_mut(&id)
            .ok_or_else(|| StoreError::Database(format!("account {} vanished", id)))?;
        account.balance = balance;
        account.updated_at = at;
        Ok(())
    }

    async fn insert_transfer(&mut self, transfer: &NewTransfer) -> Result<Transfer, StoreError> {
        if self
            .staged
            .transfers
            .values()
            .any(|t| t.idempotency_key == transfer.idempotency_key)
        {
            return Err(StoreError::DuplicateKey(transfer.idempotency_key.to_string()));
        }
        let id = next_id(&mut self.staged.last_transfer_id);
        let row = Transfer {
            id,
            from_account_id: transfer.from_account_id,
            to_account_id: transfer.to_account_id,
            amount: transfer.amount,
            status: transfer.status,
            note: transfer.note.clone(),
            idempotency_key: transfer.idempotency_key.clone(),
            created_at: transfer.created_at,
            updated_at: transfer.created_at,
            completed_at: None,
            fail_reason: transfer.fail_reason.clone(),
            deleted_at: None,
        };
        self.staged.transfers.insert(id, row.clone());
        Ok(row)
    }

    async fn update_transfer_status(
        &mut self,
        id: TransferId,
        update: &StatusUpdate,
    ) -> Result<Option<Transfer>, StoreError> {
        let Some(transfer) = self.staged.transfers.get_mut(&id) else {
            return Ok(None);
        };
        if transfer.status != update.expected {
            return Ok(None);
        }
        transfer.status = update.status;
        transfer.completed_at = update.completed_at;
        transfer.fail_reason = update.fail_reason.clone();
        transfer.updated_at = update.updated_at;
        Ok(Some(transfer.clone()))
    }

    async fn append_ledger_entry(
        &mut self,
        entry: &NewLedgerEntry,
    ) -> Result<LedgerEntry, StoreError> {
        #[cfg(test)]
        if self.fail_ledger_append {
            return Err(StoreError::Database("injected ledger failure".to_string()));
        }
        let id = next_id(&mut self.staged.last_ledger_id);
        let row = LedgerEntry {
            id,
            account_id: entry.account_id,
            change: entry.change,
            balance_after: entry.balance_after,
            event_type: entry.event_type,
            transfer_id: entry.transfer_id,
            reference: entry.reference.clone(),
            metadata: entry.metadata.clone(),
            created_at: entry.created_at,
        };
        self.staged.ledger.push(row.clone());
        Ok(row)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTx {
            mut guard, staged, ..
        } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
