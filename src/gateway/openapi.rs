//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::OpenApi;

use crate::account::Account;
use crate::gateway::handlers::HealthResponse;
use crate::gateway::types::{
    AccountEnvelope, CreateAccountBody, CreateTransferBody, ErrorResponse, LedgerList, LedgerPage,
    TransferEnvelope, TransferPage,
};
use crate::ledger::{LedgerEntry, LedgerEventType};
use crate::transfer::{Transfer, TransferStatus};

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Points Ledger API",
        description = "Atomic points transfers between accounts with an append-only ledger and idempotent retries.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        crate::gateway::handlers::transfer::create_transfer,
        crate::gateway::handlers::transfer::get_transfer,
        crate::gateway::handlers::transfer::list_transfers,
        crate::gateway::handlers::transfer::archive_transfer,
        crate::gateway::handlers::transfer::transfer_ledger,
        crate::gateway::handlers::account::create_account,
        crate::gateway::handlers::account::get_account,
        crate::gateway::handlers::account::account_ledger,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorResponse,
            Transfer,
            TransferStatus,
            TransferEnvelope,
            TransferPage,
            CreateTransferBody,
            LedgerEntry,
            LedgerEventType,
            LedgerList,
            LedgerPage,
            Account,
            AccountEnvelope,
            CreateAccountBody,
        )
    ),
    tags(
        (name = "Transfer", description = "Create, look up, list and archive transfers"),
        (name = "Ledger", description = "Append-only balance change history"),
        (name = "Account", description = "Open and read accounts"),
        (name = "System", description = "Health checks and system info")
    )
)]
pub struct ApiDoc;
