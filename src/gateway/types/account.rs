//! Account DTOs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::account::{Account, MAX_ACCOUNT_NAME_LEN, Points};

/// validator length bounds are u64
const MAX_NAME_LEN: u64 = MAX_ACCOUNT_NAME_LEN as u64;

/// Open account request body
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountBody {
    #[validate(length(min = 1, max = MAX_NAME_LEN))]
    #[schema(example = "Alice")]
    pub name: String,
    /// Opening balance in points
    #[serde(default)]
    #[validate(range(min = 0))]
    #[schema(example = 1000)]
    pub balance: Points,
}

/// Single account response
#[derive(Debug, Serialize, ToSchema)]
pub struct AccountEnvelope {
    pub account: Account,
}
