//! Shared fixtures for engine tests.

#![allow(dead_code)] // Each test file uses a different subset

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use wallet_core::{Amount, OwnerId, Tier, Wallet};
use wallet_engine::{CreditRequest, Engine, EngineConfig, ManualClock};
use wallet_store::MemoryStore;

/// A fixed instant so window and deadline arithmetic is reproducible.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

/// Shorthand for a valid amount.
pub fn amount(minor: i64) -> Amount {
    Amount::new(minor).expect("positive amount")
}

/// An engine over a memory store and a manual clock.
pub struct Fixture {
    pub engine: Engine,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(epoch()));
        let engine = Engine::new(store.clone(), clock.clone(), config);
        Self {
            engine,
            store,
            clock,
        }
    }

    /// Open a wallet for a fresh owner.
    pub async fn wallet(&self, tier: Tier) -> Wallet {
        self.engine
            .ledger()
            .open_wallet(OwnerId::generate(), tier)
            .await
            .expect("open wallet")
    }

    /// Open a wallet and top it up.
    pub async fn funded_wallet(&self, tier: Tier, minor: i64) -> Wallet {
        let wallet = self.wallet(tier).await;
        self.engine
            .ledger()
            .credit(CreditRequest::new(wallet.id, amount(minor)))
            .await
            .expect("fund wallet");
        self.engine.ledger().wallet(&wallet.id).expect("reload")
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}
