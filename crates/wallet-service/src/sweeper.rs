//! Background task failing `Held` orders that no partner picked up.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use wallet_engine::Engine;

/// Spawn the sweeper. Each tick examines one batch of the oldest held orders.
pub fn spawn(engine: Engine, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            sweep_once(&engine).await;
        }
    })
}

/// Run a single sweep, logging the outcome. Returns how many orders were expired.
pub async fn sweep_once(engine: &Engine) -> usize {
    match engine.orders().expire_stale().await {
        Ok(expired) if expired.is_empty() => 0,
        Ok(expired) => {
            tracing::info!(count = expired.len(), "Expired unassigned orders");
            expired.len()
        }
        Err(e) => {
            tracing::error!(error = %e, "Held order sweep failed");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::TimeZone;
    use wallet_core::{Amount, OrderState, OwnerId, Tier};
    use wallet_engine::{EngineConfig, ManualClock, PlaceOrder};
    use wallet_store::MemoryStore;

    #[tokio::test]
    async fn test_sweep_once_expires_old_orders() {
        let clock = Arc::new(ManualClock::new(
            chrono::Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        ));
        let engine = Engine::new(
            Arc::new(MemoryStore::new()),
            clock.clone(),
            EngineConfig::default(),
        );
        let wallet = engine
            .ledger()
            .open_wallet(OwnerId::generate(), Tier::Starter)
            .await
            .unwrap();
        engine
            .ledger()
            .credit(wallet_engine::CreditRequest::new(
                wallet.id,
                Amount::new(10_000).unwrap(),
            ))
            .await
            .unwrap();
        let order = engine
            .orders()
            .place_order(PlaceOrder::new(wallet.id, Amount::new(4_000).unwrap()))
            .await
            .unwrap();

        assert_eq!(sweep_once(&engine).await, 0);

        clock.advance(engine.config().held_order_sla + chrono::Duration::seconds(1));
        assert_eq!(sweep_once(&engine).await, 1);
        assert_eq!(
            engine.orders().order(&order.id).unwrap().state,
            OrderState::Failed
        );
        assert_eq!(engine.ledger().balance(&wallet.id).unwrap().held_minor, 0);
    }
}
