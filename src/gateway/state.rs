use std::sync::Arc;

use crate::account::AccountRegistry;
use crate::store::LedgerStore;
use crate::transfer::{TransferEngine, TransferQuery};

/// Shared gateway state
///
/// Every component holds the same injected store handle.
pub struct AppState {
    pub engine: TransferEngine,
    pub query: TransferQuery,
    pub accounts: AccountRegistry,
    pub store: Arc<dyn LedgerStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            engine: TransferEngine::new(store.clone()),
            query: TransferQuery::new(store.clone()),
            accounts: AccountRegistry::new(store.clone()),
            store,
        }
    }
}
