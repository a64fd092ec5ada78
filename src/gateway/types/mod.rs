//! Gateway types module
//!
//! ## Input Types
//! - [`CreateTransferBody`], [`ListTransfersQuery`], [`PageQuery`]
//! - [`CreateAccountBody`]: validated with `validator`
//!
//! ## Output Types
//! - Envelopes and pages: [`TransferEnvelope`], [`TransferPage`],
//!   [`LedgerList`], [`LedgerPage`], [`AccountEnvelope`]
//! - [`ErrorResponse`] / [`ApiError`]: unified error body
//!
//! ## Submodules
//! - [`account`]: account DTOs
//! - [`transfer`]: transfer and ledger DTOs
//! - [`response`]: error envelope and error codes

pub mod account;
pub mod response;
pub mod transfer;

// Re-export commonly used types at module root
pub use account::{AccountEnvelope, CreateAccountBody};
pub use response::{ApiError, ApiResult, ErrorResponse, error_codes};
pub use transfer::{
    CreateTransferBody, IDEMPOTENCY_KEY_HEADER, LedgerList, LedgerPage, ListTransfersQuery,
    PageQuery, TransferEnvelope, TransferPage,
};
