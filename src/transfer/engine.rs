//! Transfer Engine
//!
//! Moves points between two accounts inside one storage transaction:
//! lock both accounts, check funds, mutate balances, append the two ledger
//! entries, and settle the transfer status before commit. A transfer is
//! never left durably in `pending` or `processing`.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::error::TransferError;
use super::state::TransferStatus;
use super::types::{
    IdempotencyKey, MAX_NOTE_LEN, NewTransfer, StatusUpdate, Transfer, TransferReceipt,
    TransferRequest,
};
use crate::ledger::NewLedgerEntry;
use crate::store::{LedgerStore, StoreError, StoreTx};

/// Fail reason recorded on declined transfers
pub const INSUFFICIENT_FUNDS_REASON: &str = "Insufficient points";

/// What the transaction body decided before commit
enum Outcome {
    Completed(Transfer),
    /// Insufficient funds: the failed record is committed, no ledger rows
    Declined(Transfer),
}

/// Transfer Engine
///
/// Stateless apart from the injected store handle; safe to share across
/// request tasks behind an `Arc`.
pub struct TransferEngine {
    store: Arc<dyn LedgerStore>,
}

impl TransferEngine {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Create and settle a transfer
    ///
    /// Returns the completed transfer, or the existing one when a caller key
    /// is replayed. Insufficient funds is reported as
    /// [`TransferError::InsufficientFunds`] carrying the committed failed
    /// transfer.
    pub async fn create(&self, req: TransferRequest) -> Result<TransferReceipt, TransferError> {
        // === Validation (no storage access) ===
        if req.amount <= 0 {
            return Err(TransferError::InvalidAmount);
        }

        if req.from == req.to {
            return Err(TransferError::SameAccount);
        }

        if let Some(note) = &req.note
            && note.chars().count() > MAX_NOTE_LEN
        {
            return Err(TransferError::NoteTooLong);
        }

        let caller_key = req
            .idempotency_key
            .as_deref()
            .map(IdempotencyKey::parse)
            .transpose()?;

        // Replayed caller key
        if let Some(ref key) = caller_key
            && let Some(existing) = self.store.find_transfer_by_key(key, true).await?
        {
            debug!(
                idempotency_key = %key,
                transfer_id = existing.id,
                "Idempotency key already used"
            );
            return resolve_existing(existing, &req);
        }

        let key = caller_key.clone().unwrap_or_else(IdempotencyKey::generate);

        match self.execute(&req, key.clone()).await {
            // Lost an insert race on the same caller key
            Err(TransferError::Storage(StoreError::DuplicateKey(_))) if caller_key.is_some() => {
                let existing = self
                    .store
                    .find_transfer_by_key(&key, true)
                    .await?
                    .ok_or_else(|| {
                        TransferError::Storage(StoreError::Database(format!(
                            "idempotency key {} reported taken but not found",
                            key
                        )))
                    })?;
                resolve_existing(existing, &req)
            }
            other => other,
        }
    }

    /// Soft-delete a transfer by token
    ///
    /// The ledger rows stay untouched and the token stays reserved.
    pub async fn archive(&self, token: &str) -> Result<(), TransferError> {
        let key = IdempotencyKey::parse(token).map_err(|_| TransferError::NotFound)?;
        if !self.store.archive_transfer(&key, Utc::now()).await? {
            return Err(TransferError::NotFound);
        }
        info!(idempotency_key = %key, "Transfer archived");
        Ok(())
    }

    /// Run one transaction and commit or roll it back
    async fn execute(
        &self,
        req: &TransferRequest,
        key: IdempotencyKey,
    ) -> Result<TransferReceipt, TransferError> {
        let mut tx = self.store.begin().await?;

        match apply(tx.as_mut(), req, key.clone()).await {
            Ok(Outcome::Completed(transfer)) => {
                tx.commit().await?;
                info!(
                    transfer_id = transfer.id,
                    idempotency_key = %transfer.idempotency_key,
                    from = req.from,
                    to = req.to,
                    amount = req.amount,
                    "Transfer completed"
                );
                Ok(TransferReceipt {
                    transfer,
                    replayed: false,
                })
            }
            Ok(Outcome::Declined(transfer)) => {
                tx.commit().await?;
                warn!(
                    transfer_id = transfer.id,
                    idempotency_key = %transfer.idempotency_key,
                    from = req.from,
                    amount = req.amount,
                    "Transfer declined: insufficient funds"
                );
                Err(TransferError::InsufficientFunds(Box::new(transfer)))
            }
            Err(e) => {
                if let Err(rb) = tx.rollback().await {
                    error!(idempotency_key = %key, error = %rb, "Rollback failed");
                }
                if e.is_internal() {
                    error!(idempotency_key = %key, error = %e, "Transfer aborted");
                } else {
                    debug!(idempotency_key = %key, error = %e, "Transfer rejected");
                }
                Err(e)
            }
        }
    }
}

/// Transaction body
async fn apply(
    tx: &mut dyn StoreTx,
    req: &TransferRequest,
    key: IdempotencyKey,
) -> Result<Outcome, TransferError> {
    let now = Utc::now();

    // Lock in ascending id order so opposing transfers cannot deadlock
    let (source, dest) = if req.from < req.to {
        let source = tx.lock_account(req.from).await?;
        let dest = tx.lock_account(req.to).await?;
        (source, dest)
    } else {
        let dest = tx.lock_account(req.to).await?;
        let source = tx.lock_account(req.from).await?;
        (source, dest)
    };
    let source = source.ok_or(TransferError::AccountNotFound(req.from))?;
    let dest = dest.ok_or(TransferError::AccountNotFound(req.to))?;

    let new_transfer = |status: TransferStatus, fail_reason: Option<String>| NewTransfer {
        from_account_id: source.id,
        to_account_id: dest.id,
        amount: req.amount,
        status,
        note: req.note.clone(),
        idempotency_key: key.clone(),
        fail_reason,
        created_at: now,
    };

    if source.balance < req.amount {
        let failed = tx
            .insert_transfer(&new_transfer(
                TransferStatus::Failed,
                Some(INSUFFICIENT_FUNDS_REASON.to_string()),
            ))
            .await?;
        return Ok(Outcome::Declined(failed));
    }

    let source_after = source
        .balance
        .checked_sub(req.amount)
        .ok_or(TransferError::Overflow)?;
    let dest_after = dest
        .balance
        .checked_add(req.amount)
        .ok_or(TransferError::Overflow)?;

    let transfer = tx
        .insert_transfer(&new_transfer(TransferStatus::Processing, None))
        .await?;

    tx.set_balance(source.id, source_after, now).await?;
    tx.set_balance(dest.id, dest_after, now).await?;

    tx.append_ledger_entry(&NewLedgerEntry::transfer_out(
        source.id,
        dest.id,
        req.amount,
        source_after,
        transfer.id,
        now,
    ))
    .await?;
    tx.append_ledger_entry(&NewLedgerEntry::transfer_in(
        dest.id,
        source.id,
        req.amount,
        dest_after,
        transfer.id,
        now,
    ))
    .await?;

    let completed = settle(tx, &transfer, TransferStatus::Completed).await?;
    Ok(Outcome::Completed(completed))
}

/// CAS the transfer from its current status to `next`
async fn settle(
    tx: &mut dyn StoreTx,
    transfer: &Transfer,
    next: TransferStatus,
) -> Result<Transfer, TransferError> {
    if !transfer.status.can_transition_to(next) {
        return Err(TransferError::InvalidStateTransition(format!(
            "{} -> {}",
            transfer.status, next
        )));
    }

    let at = Utc::now();
    let update = StatusUpdate {
        expected: transfer.status,
        status: next,
        completed_at: (next == TransferStatus::Completed).then_some(at),
        fail_reason: None,
        updated_at: at,
    };

    tx.update_transfer_status(transfer.id, &update)
        .await?
        .ok_or_else(|| {
            TransferError::InvalidStateTransition(format!(
                "transfer {} is no longer {}",
                transfer.id, transfer.status
            ))
        })
}

/// Apply the replay rules to a transfer that already owns the caller key
fn resolve_existing(
    existing: Transfer,
    req: &TransferRequest,
) -> Result<TransferReceipt, TransferError> {
    if existing.is_archived() {
        return Err(TransferError::IdempotencyConflict(
            "key belongs to an archived transfer".to_string(),
        ));
    }

    if !existing.matches_request(req) {
        return Err(TransferError::IdempotencyConflict(
            "key already used with a different request".to_string(),
        ));
    }

    if !existing.status.is_terminal() {
        return Err(TransferError::IdempotencyConflict(format!(
            "transfer is still {}",
            existing.status
        )));
    }

    match existing.status {
        TransferStatus::Completed => Ok(TransferReceipt {
            transfer: existing,
            replayed: true,
        }),
        TransferStatus::Failed => Err(TransferError::InsufficientFunds(Box::new(existing))),
        other => Err(TransferError::IdempotencyConflict(format!(
            "transfer is {}",
            other
        ))),
    }
}
