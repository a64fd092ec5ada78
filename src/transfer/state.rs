//! Transfer Status Definitions
//!
//! Statuses are stored as TEXT in PostgreSQL and serialized in lowercase on
//! the wire. Everything in between works with the enum.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Transfer lifecycle status
///
/// ```text
/// PENDING → PROCESSING → COMPLETED
///    ↓           ↓
///  FAILED      FAILED
/// ```
///
/// Terminal: COMPLETED, FAILED. CANCELLED and REVERSED are reserved
/// terminal states that the engine never produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    /// Recorded, funds not yet checked
    Pending,

    /// Funds checked, balances being moved inside the open transaction
    Processing,

    /// Terminal: both balances and both ledger entries committed
    Completed,

    /// Terminal: declined, no balance moved and no ledger entry written
    Failed,

    /// Terminal (reserved)
    Cancelled,

    /// Terminal (reserved)
    Reversed,
}

impl TransferStatus {
    /// Check if this is a terminal status (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferStatus::Completed
                | TransferStatus::Failed
                | TransferStatus::Cancelled
                | TransferStatus::Reversed
        )
    }

    /// Whether `self → next` is a legal transition
    pub fn can_transition_to(&self, next: TransferStatus) -> bool {
        matches!(
            (self, next),
            (TransferStatus::Pending, TransferStatus::Processing)
                | (TransferStatus::Pending, TransferStatus::Failed)
                | (TransferStatus::Processing, TransferStatus::Completed)
                | (TransferStatus::Processing, TransferStatus::Failed)
        )
    }

    /// Get the storage text for this status
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Processing => "processing",
            TransferStatus::Completed => "completed",
            TransferStatus::Failed => "failed",
            TransferStatus::Cancelled => "cancelled",
            TransferStatus::Reversed => "reversed",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransferStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransferStatus::Pending),
            "processing" => Ok(TransferStatus::Processing),
            "completed" => Ok(TransferStatus::Completed),
            "failed" => Ok(TransferStatus::Failed),
            "cancelled" => Ok(TransferStatus::Cancelled),
            "reversed" => Ok(TransferStatus::Reversed),
            other => Err(format!("unknown transfer status: {}", other)),
        }
    }
}
