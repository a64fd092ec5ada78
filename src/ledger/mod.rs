//! Append-only points ledger
//!
//! Every balance change is recorded as one immutable [`LedgerEntry`].
//! A completed transfer produces exactly one `transfer_out` and one
//! `transfer_in` entry, both pointing back at the transfer.

pub mod models;

pub use models::{LedgerEntry, LedgerEntryId, LedgerEventType, NewLedgerEntry};
