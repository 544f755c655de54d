//! Contention on one wallet from many tasks.

mod common;

use futures::future::join_all;

use common::{amount, Fixture};
use wallet_core::{
    IdempotencyKey, OrderId, Tier, TransactionKind, TransactionStatus, WalletError,
};
use wallet_engine::{CreditRequest, PlaceOrder};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_reserves_never_oversell() {
    let fx = Fixture::new();
    let wallet = fx.funded_wallet(Tier::Pro, 400_000).await;

    let tasks = (0..20).map(|_| {
        let orders = fx.engine.orders().clone();
        let wallet_id = wallet.id;
        tokio::spawn(async move {
            orders
                .place_order(PlaceOrder::new(wallet_id, amount(50_000)))
                .await
        })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let placed = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(placed, 8);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|err| matches!(err, WalletError::InsufficientFunds { .. })));

    let after = fx.engine.ledger().wallet(&wallet.id).unwrap();
    assert_eq!(after.balance_minor, 400_000);
    assert_eq!(after.held_minor, 400_000);
    assert_eq!(after.available_minor(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_retries_credit_once() {
    let fx = Fixture::new();
    let wallet = fx.wallet(Tier::Starter).await;
    let key = IdempotencyKey::new("evt-parallel").unwrap();

    let tasks = (0..16).map(|_| {
        let ledger = fx.engine.ledger().clone();
        let request = CreditRequest::new(wallet.id, amount(12_345)).idempotency_key(key.clone());
        tokio::spawn(async move { ledger.credit(request).await })
    });
    let receipts: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked").expect("credit"))
        .collect();

    assert_eq!(receipts.iter().filter(|r| !r.replayed).count(), 1);
    let ids: std::collections::HashSet<_> =
        receipts.iter().map(|r| r.transaction.id).collect();
    assert_eq!(ids.len(), 1);

    let ledger = fx.engine.ledger();
    assert_eq!(ledger.wallet(&wallet.id).unwrap().balance_minor, 12_345);
    assert_eq!(ledger.transactions(&wallet.id, 100, 0).unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_resolutions_settle_once() {
    let fx = Fixture::new();
    let wallet = fx.funded_wallet(Tier::Starter, 100_000).await;
    let hold = fx
        .engine
        .ledger()
        .reserve(&wallet.id, amount(60_000), OrderId::generate())
        .await
        .unwrap();
    let reservation = hold.transaction.id;

    let tasks = (0..10).map(|i| {
        let ledger = fx.engine.ledger().clone();
        tokio::spawn(async move {
            if i % 2 == 0 {
                ledger.capture(&reservation).await
            } else {
                ledger.release(&reservation).await
            }
        })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|err| matches!(err, WalletError::AlreadyResolved { .. })));

    let log = fx.engine.ledger().transactions(&wallet.id, 100, 0).unwrap();
    let settlements = log
        .iter()
        .filter(|tx| matches!(tx.kind, TransactionKind::Capture | TransactionKind::Release))
        .count();
    assert_eq!(settlements, 1);
    assert_eq!(fx.engine.ledger().wallet(&wallet.id).unwrap().held_minor, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_wallets_do_not_block_each_other() {
    let fx = Fixture::new();
    let mut wallets = Vec::new();
    for _ in 0..8 {
        wallets.push(fx.wallet(Tier::Starter).await);
    }

    let tasks = wallets.iter().flat_map(|wallet| {
        let wallet_id = wallet.id;
        (0..5).map({
            let ledger = fx.engine.ledger().clone();
            move |_| {
                let ledger = ledger.clone();
                tokio::spawn(async move {
                    ledger
                        .credit(CreditRequest::new(wallet_id, amount(1_000)))
                        .await
                })
            }
        })
    });
    for joined in join_all(tasks).await {
        joined.expect("task panicked").expect("credit");
    }

    for wallet in &wallets {
        let log = fx.engine.ledger().transactions(&wallet.id, 100, 0).unwrap();
        assert_eq!(log.len(), 5);
        assert!(log.iter().all(|tx| tx.status == TransactionStatus::Success));
        // Each entry records the balance right after it, newest first.
        let balances: Vec<_> = log.iter().map(|tx| tx.balance_after_minor).collect();
        assert_eq!(balances, vec![5_000, 4_000, 3_000, 2_000, 1_000]);
    }
}
