//! Ledger entry models
//!
//! Ledger entries are immutable. There is an insert type ([`NewLedgerEntry`])
//! and a read type ([`LedgerEntry`]), and nothing that updates or deletes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::account::{AccountId, Points};
use crate::transfer::types::TransferId;

/// Ledger entry identifier
pub type LedgerEntryId = i64;

/// Kind of balance change recorded by a ledger entry
///
/// Only `TransferOut` and `TransferIn` are produced by the transfer engine.
/// The remaining variants are reserved for non-transfer balance mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEventType {
    TransferOut,
    TransferIn,
    Adjust,
    Earn,
    Redeem,
}

impl LedgerEventType {
    /// Text form used in storage
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerEventType::TransferOut => "transfer_out",
            LedgerEventType::TransferIn => "transfer_in",
            LedgerEventType::Adjust => "adjust",
            LedgerEventType::Earn => "earn",
            LedgerEventType::Redeem => "redeem",
        }
    }

    /// Whether the change must be a debit (negative) for this event type
    pub fn is_debit(&self) -> bool {
        matches!(self, LedgerEventType::TransferOut | LedgerEventType::Redeem)
    }
}

impl fmt::Display for LedgerEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedgerEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transfer_out" => Ok(LedgerEventType::TransferOut),
            "transfer_in" => Ok(LedgerEventType::TransferIn),
            "adjust" => Ok(LedgerEventType::Adjust),
            "earn" => Ok(LedgerEventType::Earn),
            "redeem" => Ok(LedgerEventType::Redeem),
            other => Err(format!("unknown ledger event type: {}", other)),
        }
    }
}

/// Persisted ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub account_id: AccountId,
    /// Signed change: negative for debits, positive for credits
    #[schema(example = -250)]
    pub change: Points,
    /// Account balance right after this change was applied
    #[schema(example = 750)]
    pub balance_after: Points,
    pub event_type: LedgerEventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_id: Option<TransferId>,
    #[schema(example = "Transfer to account 2")]
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a ledger entry
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub account_id: AccountId,
    pub change: Points,
    pub balance_after: Points,
    pub event_type: LedgerEventType,
    pub transfer_id: Option<TransferId>,
    pub reference: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl NewLedgerEntry {
    /// Debit side of a transfer
    pub fn transfer_out(
        account_id: AccountId,
        to: AccountId,
        amount: Points,
        balance_after: Points,
        transfer_id: TransferId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            reference: format!("Transfer to account {}", to),
            metadata: Some(serde_json::json!({ "counterparty": to })),
            ..Self::signed(
                account_id,
                LedgerEventType::TransferOut,
                amount,
                balance_after,
                transfer_id,
                created_at,
            )
        }
    }

    /// Credit side of a transfer
    pub fn transfer_in(
        account_id: AccountId,
        from: AccountId,
        amount: Points,
        balance_after: Points,
        transfer_id: TransferId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            reference: format!("Transfer from account {}", from),
            metadata: Some(serde_json::json!({ "counterparty": from })),
            ..Self::signed(
                account_id,
                LedgerEventType::TransferIn,
                amount,
                balance_after,
                transfer_id,
                created_at,
            )
        }
    }

    /// Entry whose `change` carries the sign implied by `event_type`
    ///
    /// `amount` is a magnitude and must be positive.
    fn signed(
        account_id: AccountId,
        event_type: LedgerEventType,
        amount: Points,
        balance_after: Points,
        transfer_id: TransferId,
        created_at: DateTime<Utc>,
    ) -> Self {
        debug_assert!(amount > 0, "ledger amount must be positive");
        let change = if event_type.is_debit() { -amount } else { amount };
        Self {
            account_id,
            change,
            balance_after,
            event_type,
            transfer_id: Some(transfer_id),
            reference: String::new(),
            metadata: None,
            created_at,
        }
    }
}
