//! PostgreSQL store
//!
//! Account rows are locked with `SELECT ... FOR UPDATE` inside the
//! transaction, so concurrent transfers touching the same account serialize
//! on that row. Status changes are CAS updates on the stored status.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

use super::{LedgerStore, StoreError, StoreTx};
use crate::account::{Account, AccountId, NewAccount, Points};
use crate::ledger::{LedgerEntry, NewLedgerEntry};
use crate::transfer::state::TransferStatus;
use crate::transfer::types::{
    IdempotencyKey, NewTransfer, PageRequest, StatusUpdate, Transfer, TransferId,
};

const ACCOUNT_COLUMNS: &str = "id, name, balance, created_at, updated_at";

const TRANSFER_COLUMNS: &str = "id, from_account_id, to_account_id, amount, status, note, \
     idempotency_key, created_at, updated_at, completed_at, fail_reason, deleted_at";

const LEDGER_COLUMNS: &str = "id, account_id, change, balance_after, event_type, transfer_id, \
     reference, metadata, created_at";

/// PostgreSQL-backed [`LedgerStore`]
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_account(row: &PgRow) -> Result<Account, StoreError> {
    Ok(Account {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        balance: row.try_get("balance")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_transfer(row: &PgRow) -> Result<Transfer, StoreError> {
    let status_text: String = row.try_get("status")?;
    let status: TransferStatus = status_text.parse().map_err(StoreError::Corrupt)?;

    let key_text: String = row.try_get("idempotency_key")?;
    let idempotency_key = IdempotencyKey::parse(&key_text)
        .map_err(|_| StoreError::Corrupt(format!("invalid idempotency key: {:?}", key_text)))?;

    Ok(Transfer {
        id: row.try_get("id")?,
        from_account_id: row.try_get("from_account_id")?,
        to_account_id: row.try_get("to_account_id")?,
        amount: row.try_get("amount")?,
        status,
        note: row.try_get("note")?,
        idempotency_key,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        completed_at: row.try_get("completed_at")?,
        fail_reason: row.try_get("fail_reason")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

fn row_to_ledger_entry(row: &PgRow) -> Result<LedgerEntry, StoreError> {
    let event_text: String = row.try_get("event_type")?;
    Ok(LedgerEntry {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        change: row.try_get("change")?,
        balance_after: row.try_get("balance_after")?,
        event_type: event_text.parse().map_err(StoreError::Corrupt)?,
        transfer_id: row.try_get("transfer_id")?,
        reference: row.try_get("reference")?,
        metadata: row.try_get("metadata")?,
        created_at: row.try_get("created_at")?,
    })
}

fn collect<T>(
    rows: &[PgRow],
    map: fn(&PgRow) -> Result<T, StoreError>,
) -> Result<Vec<T>, StoreError> {
    rows.iter().map(map).collect()
}

#[async_trait]
impl LedgerStore for PgStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_account(&self, account: &NewAccount) -> Result<Account, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO accounts (name, balance, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(&account.name)
        .bind(account.balance)
        .bind(account.created_at)
        .fetch_one(&self.pool)
        .await?;

        row_to_account(&row)
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_account).transpose()
    }

    async fn find_transfer_by_key(
        &self,
        key: &IdempotencyKey,
        include_archived: bool,
    ) -> Result<Option<Transfer>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {TRANSFER_COLUMNS}
            FROM transfers
            WHERE idempotency_key = $1 AND ($2 OR deleted_at IS NULL)
            "#
        ))
        .bind(key.as_str())
        .bind(include_archived)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_transfer).transpose()
    }

    async fn list_transfers_for_account(
        &self,
        account_id: AccountId,
        page: PageRequest,
    ) -> Result<(Vec<Transfer>, i64), StoreError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM transfers
            WHERE (from_account_id = $1 OR to_account_id = $1) AND deleted_at IS NULL
            "#,
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {TRANSFER_COLUMNS}
            FROM transfers
            WHERE (from_account_id = $1 OR to_account_id = $1) AND deleted_at IS NULL
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(account_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((collect(&rows, row_to_transfer)?, total))
    }

    async fn archive_transfer(
        &self,
        key: &IdempotencyKey,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE transfers
            SET deleted_at = $2, updated_at = $2
            WHERE idempotency_key = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(key.as_str())
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ledger_for_transfer(
        &self,
        transfer_id: TransferId,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {LEDGER_COLUMNS} FROM ledger_entries WHERE transfer_id = $1 ORDER BY id"
        ))
        .bind(transfer_id)
        .fetch_all(&self.pool)
        .await?;

        collect(&rows, row_to_ledger_entry)
    }

    async fn ledger_for_account(
        &self,
        account_id: AccountId,
        page: PageRequest,
    ) -> Result<(Vec<LedgerEntry>, i64), StoreError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM ledger_entries WHERE account_id = $1")
                .bind(account_id)
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {LEDGER_COLUMNS}
            FROM ledger_entries
            WHERE account_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(account_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((collect(&rows, row_to_ledger_entry)?, total))
    }
}

struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn lock_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_account).transpose()
    }

    async fn set_balance(
        &mut self,
        id: AccountId,
        balance: Points,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE accounts SET balance = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(balance)
            .bind(at)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() != 1 {
            return Err(StoreError::Database(format!(
                "balance update touched {} rows for account {}",
                result.rows_affected(),
                id
            )));
        }
        Ok(())
    }

    async fn insert_transfer(&mut self, transfer: &NewTransfer) -> Result<Transfer, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO transfers
                (from_account_id, to_account_id, amount, status, note,
                 idempotency_key, fail_reason, created_at, updated_at)
            VALUES
                ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING {TRANSFER_COLUMNS}
            "#
        ))
        .bind(transfer.from_account_id)
        .bind(transfer.to_account_id)
        .bind(transfer.amount)
        .bind(transfer.status.as_str())
        .bind(transfer.note.as_deref())
        .bind(transfer.idempotency_key.as_str())
        .bind(transfer.fail_reason.as_deref())
        .bind(transfer.created_at)
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_transfer(&row)
    }

    async fn update_transfer_status(
        &mut self,
        id: TransferId,
        update: &StatusUpdate,
    ) -> Result<Option<Transfer>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE transfers
            SET status = $1, completed_at = $2, fail_reason = $3, updated_at = $4
            WHERE id = $5 AND status = $6
            RETURNING {TRANSFER_COLUMNS}
            "#
        ))
        .bind(update.status.as_str())
        .bind(update.completed_at)
        .bind(update.fail_reason.as_deref())
        .bind(update.updated_at)
        .bind(id)
        .bind(update.expected.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_transfer).transpose()
    }

    async fn append_ledger_entry(
        &mut self,
        entry: &NewLedgerEntry,
    ) -> Result<LedgerEntry, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO ledger_entries
                (account_id, change, balance_after, event_type, transfer_id,
                 reference, metadata, created_at)
            VALUES
                ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {LEDGER_COLUMNS}
            "#
        ))
        .bind(entry.account_id)
        .bind(entry.change)
        .bind(entry.balance_after)
        .bind(entry.event_type.as_str())
        .bind(entry.transfer_id)
        .bind(&entry.reference)
        .bind(&entry.metadata)
        .bind(entry.created_at)
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_ledger_entry(&row)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
