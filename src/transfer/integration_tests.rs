//! Integration Tests for the Transfer Engine
//!
//! These tests drive the engine and the query facade end to end against the
//! in-memory store, so no database is needed.

#[cfg(test)]
mod integration_tests {
    use std::sync::Arc;

    use crate::account::{AccountId, AccountRegistry, Points};
    use crate::ledger::LedgerEventType;
    use crate::store::{LedgerStore, MemoryStore};
    use crate::transfer::engine::TransferEngine;
    use crate::transfer::error::TransferError;
    use crate::transfer::query::TransferQuery;
    use crate::transfer::state::TransferStatus;
    use crate::transfer::types::{PageRequest, TransferRequest};

    /// Engine, query facade and registry sharing one store
    struct TestHarness {
        store: MemoryStore,
        engine: Arc<TransferEngine>,
        query: TransferQuery,
        accounts: AccountRegistry,
    }

    impl TestHarness {
        fn new() -> Self {
            let store = MemoryStore::new();
            let handle: Arc<dyn LedgerStore> = Arc::new(store.clone());
            Self {
                store,
                engine: Arc::new(TransferEngine::new(handle.clone())),
                query: TransferQuery::new(handle.clone()),
                accounts: AccountRegistry::new(handle),
            }
        }

        async fn open(&self, name: &str, balance: Points) -> AccountId {
            self.accounts.open(name, balance).await.unwrap().id
        }

        async fn balance(&self, id: AccountId) -> Points {
            self.accounts.get(id).await.unwrap().balance
        }
    }

    // ========================================================================
    // Happy Path Tests
    // ========================================================================

    /// Alice(1000) -> Bob(500), 250
    #[tokio::test]
    async fn test_transfer_happy_path() {
        let h = TestHarness::new();
        let alice = h.open("Alice", 1000).await;
        let bob = h.open("Bob", 500).await;

        let receipt = h
            .engine
            .create(TransferRequest::new(alice, bob, 250).with_note("lunch"))
            .await
            .unwrap();
        let transfer = receipt.transfer;

        assert!(!receipt.replayed);
        assert_eq!(transfer.status, TransferStatus::Completed);
        assert!(transfer.completed_at.is_some());
        assert!(transfer.fail_reason.is_none());
        assert_eq!(transfer.note.as_deref(), Some("lunch"));
        assert_eq!(h.balance(alice).await, 750);
        assert_eq!(h.balance(bob).await, 750);

        let entries = h
            .query
            .ledger_for_transfer(transfer.idempotency_key.as_str())
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);

        let out = &entries[0];
        assert_eq!(out.event_type, LedgerEventType::TransferOut);
        assert_eq!(out.account_id, alice);
        assert_eq!(out.change, -250);
        assert_eq!(out.balance_after, 750);
        assert_eq!(out.transfer_id, Some(transfer.id));
        assert_eq!(out.reference, format!("Transfer to account {}", bob));

        let inc = &entries[1];
        assert_eq!(inc.event_type, LedgerEventType::TransferIn);
        assert_eq!(inc.account_id, bob);
        assert_eq!(inc.change, 250);
        assert_eq!(inc.balance_after, 750);
        assert_eq!(inc.transfer_id, Some(transfer.id));
    }

    /// Moving the whole balance leaves exactly zero
    #[tokio::test]
    async fn test_transfer_entire_balance() {
        let h = TestHarness::new();
        let alice = h.open("Alice", 300).await;
        let bob = h.open("Bob", 0).await;

        h.engine
            .create(TransferRequest::new(alice, bob, 300))
            .await
            .unwrap();

        assert_eq!(h.balance(alice).await, 0);
        assert_eq!(h.balance(bob).await, 300);
    }

    /// Transfer from the higher id to the lower id (reverse lock order)
    #[tokio::test]
    async fn test_transfer_descending_ids() {
        let h = TestHarness::new();
        let alice = h.open("Alice", 100).await;
        let bob = h.open("Bob", 100).await;

        let receipt = h
            .engine
            .create(TransferRequest::new(bob, alice, 40))
            .await
            .unwrap();

        assert_eq!(receipt.transfer.from_account_id, bob);
        assert_eq!(h.balance(alice).await, 140);
        assert_eq!(h.balance(bob).await, 60);
    }

    // ========================================================================
    // Declined / Rejected Tests
    // ========================================================================

    /// Alice(100) -> Bob(500), 250: failed record, no ledger rows
    #[tokio::test]
    async fn test_insufficient_funds_records_failed_transfer() {
        let h = TestHarness::new();
        let alice = h.open("Alice", 100).await;
        let bob = h.open("Bob", 500).await;

        let err = h
            .engine
            .create(TransferRequest::new(alice, bob, 250))
            .await
            .unwrap_err();

        let failed = match err {
            TransferError::InsufficientFunds(transfer) => *transfer,
            other => panic!("expected InsufficientFunds, got {:?}", other),
        };
        assert_eq!(failed.status, TransferStatus::Failed);
        assert!(failed.fail_reason.is_some());
        assert!(failed.completed_at.is_none());

        assert_eq!(h.balance(alice).await, 100);
        assert_eq!(h.balance(bob).await, 500);
        assert!(h.store.ledger_for_transfer(failed.id).await.unwrap().is_empty());

        // The failed attempt is durable and queryable
        let found = h
            .query
            .get_by_key(failed.idempotency_key.as_str())
            .await
            .unwrap();
        assert_eq!(found.id, failed.id);
        assert_eq!(found.status, TransferStatus::Failed);
    }

    #[tokio::test]
    async fn test_same_account_rejected_without_storage() {
        let h = TestHarness::new();
        let alice = h.open("Alice", 100).await;

        for amount in [1, 50, 1000] {
            let err = h
                .engine
                .create(TransferRequest::new(alice, alice, amount))
                .await
                .unwrap_err();
            assert!(matches!(err, TransferError::SameAccount));
        }
        assert_eq!(h.store.transfer_count().await, 0);
        assert_eq!(h.balance(alice).await, 100);
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected() {
        let h = TestHarness::new();
        let alice = h.open("Alice", 100).await;
        let bob = h.open("Bob", 100).await;

        for amount in [0, -1, Points::MIN] {
            let err = h
                .engine
                .create(TransferRequest::new(alice, bob, amount))
                .await
                .unwrap_err();
            assert!(matches!(err, TransferError::InvalidAmount));
        }
        assert_eq!(h.store.transfer_count().await, 0);
    }

    #[tokio::test]
    async fn test_missing_destination() {
        let h = TestHarness::new();
        let alice = h.open("Alice", 100).await;

        let err = h
            .engine
            .create(TransferRequest::new(alice, 999, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::AccountNotFound(999)));
        assert_eq!(h.balance(alice).await, 100);
        assert_eq!(h.store.transfer_count().await, 0);
    }

    #[tokio::test]
    async fn test_credit_overflow_rolls_back() {
        let h = TestHarness::new();
        let alice = h.open("Alice", 10).await;
        let rich = h.open("Rich", Points::MAX).await;

        let err = h
            .engine
            .create(TransferRequest::new(alice, rich, 5))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Overflow));
        assert_eq!(h.balance(alice).await, 10);
        assert_eq!(h.store.transfer_count().await, 0);
    }

    /// A storage failure mid-transaction leaves no trace
    #[tokio::test]
    async fn test_storage_failure_aborts_everything() {
        let h = TestHarness::new();
        let alice = h.open("Alice", 1000).await;
        let bob = h.open("Bob", 500).await;

        h.store.set_fail_ledger_append(true);
        let err = h
            .engine
            .create(TransferRequest::new(alice, bob, 250))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Storage(_)));
        assert!(err.is_internal());

        assert_eq!(h.balance(alice).await, 1000);
        assert_eq!(h.balance(bob).await, 500);
        assert_eq!(h.store.transfer_count().await, 0);
        assert_eq!(h.store.ledger_len().await, 0);

        // The store is usable again afterwards
        h.store.set_fail_ledger_append(false);
        h.engine
            .create(TransferRequest::new(alice, bob, 250))
            .await
            .unwrap();
        assert_eq!(h.balance(alice).await, 750);
    }

    // ========================================================================
    // Concurrency Tests
    // ========================================================================

    /// Two concurrent 80-point transfers from a 100-point account
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_drain_only_one_succeeds() {
        let h = TestHarness::new();
        let alice = h.open("Alice", 100).await;
        let bob = h.open("Bob", 0).await;
        let carol = h.open("Carol", 0).await;

        let e1 = h.engine.clone();
        let e2 = h.engine.clone();
        let t1 = tokio::spawn(async move { e1.create(TransferRequest::new(alice, bob, 80)).await });
        let t2 =
            tokio::spawn(async move { e2.create(TransferRequest::new(alice, carol, 80)).await });

        let results = [t1.await.unwrap(), t2.await.unwrap()];
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        let declined = results
            .iter()
            .filter(|r| matches!(r, Err(TransferError::InsufficientFunds(_))))
            .count();

        assert_eq!(succeeded, 1);
        assert_eq!(declined, 1);
        assert_eq!(h.balance(alice).await, 20);
        assert_eq!(h.balance(bob).await + h.balance(carol).await, 80);
        assert_eq!(h.store.ledger_len().await, 2);
    }

    /// Points are conserved under many concurrent transfers in both directions
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_transfers_conserve_points() {
        let h = TestHarness::new();
        let alice = h.open("Alice", 500).await;
        let bob = h.open("Bob", 500).await;

        let mut handles = Vec::new();
        for i in 0..40 {
            let engine = h.engine.clone();
            let (from, to) = if i % 2 == 0 { (alice, bob) } else { (bob, alice) };
            handles.push(tokio::spawn(async move {
                engine.create(TransferRequest::new(from, to, 7)).await
            }));
        }
        for result in futures::future::join_all(handles).await {
            result.unwrap().unwrap();
        }

        assert_eq!(h.balance(alice).await + h.balance(bob).await, 1000);
        assert_eq!(h.store.ledger_len().await, 80);
    }

    // ========================================================================
    // Idempotency Tests
    // ========================================================================

    #[tokio::test]
    async fn test_tokens_are_unique() {
        let h = TestHarness::new();
        let alice = h.open("Alice", 10).await;
        let bob = h.open("Bob", 0).await;

        let ok = h
            .engine
            .create(TransferRequest::new(alice, bob, 5))
            .await
            .unwrap();
        let failed = match h.engine.create(TransferRequest::new(alice, bob, 50)).await {
            Err(TransferError::InsufficientFunds(t)) => *t,
            other => panic!("expected InsufficientFunds, got {:?}", other),
        };
        let again = h
            .engine
            .create(TransferRequest::new(alice, bob, 5))
            .await
            .unwrap();

        assert_ne!(ok.transfer.idempotency_key, failed.idempotency_key);
        assert_ne!(ok.transfer.idempotency_key, again.transfer.idempotency_key);
        assert_ne!(failed.idempotency_key, again.transfer.idempotency_key);
    }

    #[tokio::test]
    async fn test_caller_key_replay_moves_no_points() {
        let h = TestHarness::new();
        let alice = h.open("Alice", 1000).await;
        let bob = h.open("Bob", 0).await;
        let req = TransferRequest::new(alice, bob, 100).with_idempotency_key("order-77");

        let first = h.engine.create(req.clone()).await.unwrap();
        let second = h.engine.create(req).await.unwrap();

        assert!(!first.replayed);
        assert!(second.replayed);
        assert_eq!(first.transfer.id, second.transfer.id);
        assert_eq!(first.transfer.idempotency_key.as_str(), "order-77");
        assert_eq!(h.balance(alice).await, 900);
        assert_eq!(h.store.transfer_count().await, 1);
        assert_eq!(h.store.ledger_len().await, 2);
    }

    #[tokio::test]
    async fn test_caller_key_with_different_payload_conflicts() {
        let h = TestHarness::new();
        let alice = h.open("Alice", 1000).await;
        let bob = h.open("Bob", 0).await;

        h.engine
            .create(TransferRequest::new(alice, bob, 100).with_idempotency_key("k-1"))
            .await
            .unwrap();
        let err = h
            .engine
            .create(TransferRequest::new(alice, bob, 200).with_idempotency_key("k-1"))
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::IdempotencyConflict(_)));
        assert_eq!(h.balance(alice).await, 900);
    }

    #[tokio::test]
    async fn test_caller_key_replay_of_failed_transfer() {
        let h = TestHarness::new();
        let alice = h.open("Alice", 10).await;
        let bob = h.open("Bob", 0).await;
        let req = TransferRequest::new(alice, bob, 50).with_idempotency_key("k-2");

        let first = h.engine.create(req.clone()).await.unwrap_err();
        let second = h.engine.create(req).await.unwrap_err();

        match (first, second) {
            (TransferError::InsufficientFunds(a), TransferError::InsufficientFunds(b)) => {
                assert_eq!(a.id, b.id)
            }
            other => panic!("expected two InsufficientFunds, got {:?}", other),
        }
        assert_eq!(h.store.transfer_count().await, 1);
    }

    /// Concurrent requests sharing a caller key produce one transfer
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_same_key_single_transfer() {
        let h = TestHarness::new();
        let alice = h.open("Alice", 1000).await;
        let bob = h.open("Bob", 0).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let engine = h.engine.clone();
            handles.push(tokio::spawn(async move {
                engine
                    .create(TransferRequest::new(alice, bob, 100).with_idempotency_key("same"))
                    .await
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().transfer.id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(h.balance(alice).await, 900);
        assert_eq!(h.store.transfer_count().await, 1);
    }

    // ========================================================================
    // Query Tests
    // ========================================================================

    #[tokio::test]
    async fn test_lookup_by_fresh_token() {
        let h = TestHarness::new();
        let alice = h.open("Alice", 100).await;
        let bob = h.open("Bob", 0).await;

        let receipt = h
            .engine
            .create(TransferRequest::new(alice, bob, 10))
            .await
            .unwrap();
        let found = h
            .query
            .get_by_key(receipt.transfer.idempotency_key.as_str())
            .await
            .unwrap();
        assert_eq!(found.id, receipt.transfer.id);

        assert!(matches!(
            h.query.get_by_key("unknown").await,
            Err(TransferError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_list_by_account_both_directions_newest_first() {
        let h = TestHarness::new();
        let alice = h.open("Alice", 1000).await;
        let bob = h.open("Bob", 1000).await;
        let carol = h.open("Carol", 1000).await;

        let first = h
            .engine
            .create(TransferRequest::new(alice, bob, 10))
            .await
            .unwrap();
        let second = h
            .engine
            .create(TransferRequest::new(bob, alice, 20))
            .await
            .unwrap();
        h.engine
            .create(TransferRequest::new(bob, carol, 30))
            .await
            .unwrap();

        let page = h
            .query
            .list_by_account(alice, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 20);
        let ids: Vec<_> = page.data.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![second.transfer.id, first.transfer.id]);
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let h = TestHarness::new();
        let alice = h.open("Alice", 1000).await;
        let bob = h.open("Bob", 0).await;
        for _ in 0..5 {
            h.engine
                .create(TransferRequest::new(alice, bob, 1))
                .await
                .unwrap();
        }

        let page = h
            .query
            .list_by_account(bob, PageRequest::new(Some(2), Some(2)))
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.data.len(), 2);

        let last = h
            .query
            .list_by_account(bob, PageRequest::new(Some(3), Some(2)))
            .await
            .unwrap();
        assert_eq!(last.data.len(), 1);

        // Out-of-range parameters fall back to defaults
        let clamped = h
            .query
            .list_by_account(bob, PageRequest::new(Some(0), Some(500)))
            .await
            .unwrap();
        assert_eq!(clamped.page, 1);
        assert_eq!(clamped.page_size, 20);
        assert_eq!(clamped.data.len(), 5);
    }

    #[tokio::test]
    async fn test_ledger_for_account_history() {
        let h = TestHarness::new();
        let alice = h.open("Alice", 1000).await;
        let bob = h.open("Bob", 0).await;
        h.engine
            .create(TransferRequest::new(alice, bob, 100))
            .await
            .unwrap();
        h.engine
            .create(TransferRequest::new(alice, bob, 200))
            .await
            .unwrap();

        let page = h
            .query
            .ledger_for_account(alice, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        let balances: Vec<_> = page.data.iter().map(|e| e.balance_after).collect();
        assert_eq!(balances, vec![700, 900]);

        assert!(matches!(
            h.query.ledger_for_account(999, PageRequest::default()).await,
            Err(TransferError::AccountNotFound(999))
        ));
    }

    // ========================================================================
    // Archive Tests
    // ========================================================================

    #[tokio::test]
    async fn test_archive_hides_transfer_keeps_ledger() {
        let h = TestHarness::new();
        let alice = h.open("Alice", 1000).await;
        let bob = h.open("Bob", 0).await;
        let receipt = h
            .engine
            .create(TransferRequest::new(alice, bob, 100).with_idempotency_key("arch"))
            .await
            .unwrap();

        h.engine.archive("arch").await.unwrap();

        assert!(matches!(
            h.query.get_by_key("arch").await,
            Err(TransferError::NotFound)
        ));
        let page = h
            .query
            .list_by_account(alice, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 0);
        assert_eq!(
            h.store
                .ledger_for_transfer(receipt.transfer.id)
                .await
                .unwrap()
                .len(),
            2
        );
        assert_eq!(h.balance(bob).await, 100);

        // Archiving twice reports not found; the key stays reserved
        assert!(matches!(
            h.engine.archive("arch").await,
            Err(TransferError::NotFound)
        ));
        let err = h
            .engine
            .create(TransferRequest::new(alice, bob, 100).with_idempotency_key("arch"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::IdempotencyConflict(_)));
    }
}
