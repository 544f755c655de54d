//! The engine over the RocksDB backend.

#![cfg(feature = "rocksdb-backend")]

mod common;

use std::sync::Arc;

use tempfile::TempDir;

use common::{amount, epoch};
use wallet_core::{OrderState, OwnerId, Tier};
use wallet_engine::{CreditRequest, Engine, EngineConfig, ManualClock, PlaceOrder};
use wallet_store::RocksStore;

fn engine_at(dir: &TempDir) -> Engine {
    let store = RocksStore::open(dir.path()).expect("open store");
    Engine::new(
        Arc::new(store),
        Arc::new(ManualClock::new(epoch())),
        EngineConfig::default(),
    )
}

#[tokio::test]
async fn test_state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let owner = OwnerId::generate();

    let (wallet_id, order_id) = {
        let engine = engine_at(&dir);
        let wallet = engine.ledger().open_wallet(owner, Tier::Starter).await.unwrap();
        engine
            .ledger()
            .credit(CreditRequest::new(wallet.id, amount(200_000)))
            .await
            .unwrap();
        let order = engine
            .orders()
            .place_order(PlaceOrder::new(wallet.id, amount(150_000)))
            .await
            .unwrap();
        (wallet.id, order.id)
    };

    let engine = engine_at(&dir);
    let wallet = engine.ledger().wallet_for_owner(&owner).unwrap();
    assert_eq!(wallet.id, wallet_id);
    assert_eq!(wallet.balance_minor, 200_000);
    assert_eq!(wallet.held_minor, 150_000);

    let order = engine.orders().order(&order_id).unwrap();
    assert_eq!(order.state, OrderState::Held);
    engine.orders().assign(&order_id, "partner").await.unwrap();
    engine
        .orders()
        .confirm_delivery(&order_id, order.delivery_code)
        .await
        .unwrap();

    let report = engine.ledger().reconcile(&wallet_id).await.unwrap();
    assert!(!report.drifted);
    assert_eq!(report.after.balance_minor, 50_000);
    assert_eq!(report.after.held_minor, 0);
}
