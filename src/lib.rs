//! Points Ledger
//!
//! Moves points between accounts atomically, records every balance change in
//! an append-only ledger, and lets clients retry transfers safely.
//!
//! # Modules
//!
//! - [`account`] - Accounts and the account registry
//! - [`ledger`] - Immutable ledger entry types
//! - [`transfer`] - Transfer engine, query facade, status machine, errors
//! - [`store`] - Storage port with PostgreSQL and in-memory adapters
//! - [`db`] - PostgreSQL pool and migrations
//! - [`gateway`] - axum HTTP API and OpenAPI docs
//! - [`config`] - YAML application config
//! - [`logging`] - tracing subscriber setup

pub mod account;
pub mod config;
pub mod db;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod store;
pub mod transfer;

// Convenient re-exports at crate root
pub use account::{Account, AccountId, AccountRegistry, Points};
pub use ledger::{LedgerEntry, LedgerEventType};
pub use store::{LedgerStore, MemoryStore, PgStore, StoreError};
pub use transfer::{
    IdempotencyKey, Page, PageRequest, Transfer, TransferEngine, TransferError, TransferQuery,
    TransferReceipt, TransferRequest, TransferStatus,
};
