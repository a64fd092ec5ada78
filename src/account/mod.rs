//! Accounts holding points balances

pub mod models;
pub mod registry;
pub mod validation;

pub use models::{Account, AccountId, MAX_ACCOUNT_NAME_LEN, NewAccount, Points};
pub use registry::AccountRegistry;
pub use validation::{AccountName, ValidationError};
