//! Account data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Account identifier (BIGSERIAL in PostgreSQL)
pub type AccountId = i64;

/// Balance and amount unit: whole points, never fractional
pub type Points = i64;

/// Maximum length of an account display name
pub const MAX_ACCOUNT_NAME_LEN: usize = 128;

/// Account holding a points balance
///
/// The balance is only mutated by the transfer engine inside a storage
/// transaction and is never negative once that transaction commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[schema(example = 1)]
    pub id: AccountId,
    #[schema(example = "Alice")]
    pub name: String,
    #[schema(example = 1000)]
    pub balance: Points,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a new account
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub balance: Points,
    pub created_at: DateTime<Utc>,
}
