//! Points transfers
//!
//! # Architecture
//!
//! - [`TransferEngine`]: validates a request and runs the debit, credit and
//!   ledger append inside one storage transaction
//! - [`TransferQuery`]: read-only lookups by token and by account
//!
//! Both receive the storage handle at construction; there is no global
//! store.
//!
//! # Status
//!
//! ```text
//! PENDING → PROCESSING → COMPLETED
//!              ↓
//!           FAILED
//! ```
//!
//! Declined transfers are inserted directly as FAILED. The status is always
//! terminal once the transaction commits.
//!
//! # Safety Invariants
//!
//! 1. Balances never go negative
//! 2. A completed transfer has exactly one `transfer_out` and one
//!    `transfer_in` ledger entry
//! 3. A failed transfer has no ledger entries
//! 4. Idempotency tokens are unique across all transfers

pub mod engine;
pub mod error;
pub mod query;
pub mod state;
pub mod types;

mod integration_tests;

// Re-exports for convenience
pub use engine::TransferEngine;
pub use error::TransferError;
pub use query::TransferQuery;
pub use state::TransferStatus;
pub use types::{
    IdempotencyKey, Page, PageRequest, Transfer, TransferId, TransferReceipt, TransferRequest,
};
