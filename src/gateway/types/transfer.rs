//! Transfer and ledger DTOs

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::account::{AccountId, Points};
use crate::ledger::LedgerEntry;
use crate::transfer::{Page, PageRequest, Transfer, TransferRequest};

/// Header carrying the idempotency token on requests and responses
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Create transfer request body
///
/// Field rules are enforced by the engine so that the rejection order is
/// the same for every caller.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransferBody {
    #[schema(example = 1)]
    pub from_account_id: AccountId,
    #[schema(example = 2)]
    pub to_account_id: AccountId,
    #[schema(example = 250)]
    pub amount: Points,
    #[serde(default)]
    #[schema(example = "Lunch")]
    pub note: Option<String>,
    /// Caller-chosen token; the `Idempotency-Key` header wins when both are set
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl CreateTransferBody {
    pub fn into_request(self, header_key: Option<String>) -> TransferRequest {
        TransferRequest {
            from: self.from_account_id,
            to: self.to_account_id,
            amount: self.amount,
            note: self.note,
            idempotency_key: header_key.or(self.idempotency_key),
        }
    }
}

/// Query string for listing transfers
///
/// Values are taken as text so that a malformed `page` or `pageSize` falls
/// back to the default instead of failing the request.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListTransfersQuery {
    /// Account appearing as source or destination (required)
    #[param(value_type = i64, example = 1)]
    pub account_id: Option<String>,
    #[param(value_type = Option<i64>, example = 1)]
    pub page: Option<String>,
    #[param(value_type = Option<i64>, example = 20)]
    pub page_size: Option<String>,
}

impl ListTransfersQuery {
    /// Required positive account id
    pub fn account_id(&self) -> Option<AccountId> {
        self.account_id
            .as_deref()
            .and_then(|s| s.trim().parse::<AccountId>().ok())
            .filter(|id| *id > 0)
    }

    pub fn page_request(&self) -> PageRequest {
        page_request(self.page.as_deref(), self.page_size.as_deref())
    }
}

/// Pagination-only query string
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    #[param(value_type = Option<i64>, example = 1)]
    pub page: Option<String>,
    #[param(value_type = Option<i64>, example = 20)]
    pub page_size: Option<String>,
}

impl PageQuery {
    pub fn page_request(&self) -> PageRequest {
        page_request(self.page.as_deref(), self.page_size.as_deref())
    }
}

fn page_request(page: Option<&str>, page_size: Option<&str>) -> PageRequest {
    let parse = |v: Option<&str>| v.and_then(|s| s.trim().parse::<i64>().ok());
    PageRequest::new(parse(page), parse(page_size))
}

/// Single transfer response
#[derive(Debug, Serialize, ToSchema)]
pub struct TransferEnvelope {
    pub transfer: Transfer,
}

/// Paginated transfer listing
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferPage {
    pub data: Vec<Transfer>,
    #[schema(example = 1)]
    pub page: i64,
    #[schema(example = 20)]
    pub page_size: i64,
    #[schema(example = 2)]
    pub total: i64,
}

impl From<Page<Transfer>> for TransferPage {
    fn from(p: Page<Transfer>) -> Self {
        Self {
            data: p.data,
            page: p.page,
            page_size: p.page_size,
            total: p.total,
        }
    }
}

/// Ledger entries of one transfer
#[derive(Debug, Serialize, ToSchema)]
pub struct LedgerList {
    pub data: Vec<LedgerEntry>,
}

/// Paginated ledger history of one account
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerPage {
    pub data: Vec<LedgerEntry>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
}

impl From<Page<LedgerEntry>> for LedgerPage {
    fn from(p: Page<LedgerEntry>) -> Self {
        Self {
            data: p.data,
            page: p.page,
            page_size: p.page_size,
            total: p.total,
        }
    }
}
