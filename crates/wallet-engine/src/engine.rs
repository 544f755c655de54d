//! The engine facade.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use wallet_core::{Amount, IdempotencyKey, Result, WalletId};
use wallet_store::{MemoryStore, Store};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::credentials::CredentialGate;
use crate::ledger::{DebitRequest, Ledger, LedgerReceipt};
use crate::orders::OrderLifecycle;

/// A withdrawal authorized by the owner's MPIN.
#[derive(Clone)]
pub struct WithdrawRequest {
    /// Wallet to withdraw from.
    pub wallet_id: WalletId,
    /// Amount to withdraw.
    pub amount: Amount,
    /// Retry key.
    pub idempotency_key: Option<IdempotencyKey>,
    /// The owner's MPIN as entered.
    pub mpin: String,
}

impl std::fmt::Debug for WithdrawRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WithdrawRequest")
            .field("wallet_id", &self.wallet_id)
            .field("amount", &self.amount)
            .field("idempotency_key", &self.idempotency_key)
            .field("mpin", &"****")
            .finish()
    }
}

/// Ledger, credential gate and order lifecycle sharing one store, clock and config.
///
/// Cheap to clone; clones share the per-wallet critical sections.
#[derive(Clone)]
pub struct Engine {
    ledger: Ledger,
    credentials: CredentialGate,
    orders: OrderLifecycle,
    config: Arc<EngineConfig>,
}

impl Engine {
    /// Wire an engine over `store`.
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        let config = Arc::new(config);
        let ledger = Ledger::new(Arc::clone(&store), Arc::clone(&clock), Arc::clone(&config));
        let credentials = CredentialGate::new(store, clock, Arc::clone(&config));
        let orders = OrderLifecycle::new(ledger.clone());
        Self {
            ledger,
            credentials,
            orders,
            config,
        }
    }

    /// An engine over a fresh in-memory store and the system clock.
    #[must_use]
    pub fn in_memory(config: EngineConfig) -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock), config)
    }

    /// The ledger.
    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// The credential gate.
    #[must_use]
    pub const fn credentials(&self) -> &CredentialGate {
        &self.credentials
    }

    /// The order lifecycle.
    #[must_use]
    pub const fn orders(&self) -> &OrderLifecycle {
        &self.orders
    }

    /// The engine's current time.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.ledger.now()
    }

    /// The configuration in effect.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Verify the owner's MPIN, then debit.
    ///
    /// An inactive wallet is rejected before the MPIN is checked, so it costs no attempt.
    ///
    /// # Errors
    ///
    /// Any error of [`crate::CredentialGate::verify_secret`] or [`Ledger::debit`].
    pub async fn withdraw(&self, request: WithdrawRequest) -> Result<LedgerReceipt> {
        let wallet = self.ledger.wallet(&request.wallet_id)?;
        wallet.ensure_active()?;

        self.credentials
            .verify_secret(wallet.owner_id, &request.mpin)
            .await?;
        debug!(wallet_id = %wallet.id, "withdrawal authorized");

        let mut debit = DebitRequest::new(wallet.id, request.amount);
        if let Some(key) = request.idempotency_key {
            debit = debit.idempotency_key(key);
        }
        self.ledger.debit(debit).await
    }
}
