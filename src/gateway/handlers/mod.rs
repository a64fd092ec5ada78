//! HTTP handlers

pub mod account;
pub mod health;
pub mod transfer;

pub use account::{account_ledger, create_account, get_account};
pub use health::{HealthResponse, health_check};
pub use transfer::{
    archive_transfer, create_transfer, get_transfer, list_transfers, transfer_ledger,
};

