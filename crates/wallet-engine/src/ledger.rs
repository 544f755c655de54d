//! The ledger: wallet summaries and the append-only transaction log.
//!
//! Every balance-affecting call runs inside the wallet's critical section, reads the
//! summary, checks it, and commits the new summary together with its log entries in one
//! write set. A rejected call writes nothing.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use wallet_core::{
    rewards, Amount, Hold, HoldResolution, IdempotencyKey, OrderId, OwnerId,
    PaymentMethod, Result, RewardsSummary, Tier, TierDefinition, TopupQuote, Transaction,
    TransactionId, TransactionKind, TransactionStatus, Wallet, WalletError, WalletId,
    WalletStatus,
};
use wallet_store::{Store, WriteSet};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::locks::KeyedLocks;

// ============================================================================
// Requests and results
// ============================================================================

/// A top-up.
#[derive(Debug, Clone)]
pub struct CreditRequest {
    /// Wallet to credit.
    pub wallet_id: WalletId,
    /// Amount to add.
    pub amount: Amount,
    /// Retry key; defaults to the new transaction's id.
    pub idempotency_key: Option<IdempotencyKey>,
    /// How the payer paid, recorded with its fee.
    pub payment_method: Option<PaymentMethod>,
}

impl CreditRequest {
    /// A top-up of `amount`.
    #[must_use]
    pub const fn new(wallet_id: WalletId, amount: Amount) -> Self {
        Self {
            wallet_id,
            amount,
            idempotency_key: None,
            payment_method: None,
        }
    }

    /// Set the retry key.
    #[must_use]
    pub fn idempotency_key(mut self, key: IdempotencyKey) -> Self {
        self.idempotency_key = Some(key);
        self
    }

    /// Record the payment method.
    #[must_use]
    pub const fn payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }
}

/// A direct withdrawal.
#[derive(Debug, Clone)]
pub struct DebitRequest {
    /// Wallet to debit.
    pub wallet_id: WalletId,
    /// Amount to remove.
    pub amount: Amount,
    /// Retry key; defaults to the new transaction's id.
    pub idempotency_key: Option<IdempotencyKey>,
}

impl DebitRequest {
    /// A withdrawal of `amount`.
    #[must_use]
    pub const fn new(wallet_id: WalletId, amount: Amount) -> Self {
        Self {
            wallet_id,
            amount,
            idempotency_key: None,
        }
    }

    /// Set the retry key.
    #[must_use]
    pub fn idempotency_key(mut self, key: IdempotencyKey) -> Self {
        self.idempotency_key = Some(key);
        self
    }
}

/// Outcome of a ledger mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerReceipt {
    /// The entry written, or the one found for a replayed key.
    pub transaction: Transaction,
    /// Wallet balance after the call.
    pub balance_minor: i64,
    /// Available funds after the call.
    pub available_minor: i64,
    /// Whether this was answered from an earlier call with the same key.
    pub replayed: bool,
}

impl LedgerReceipt {
    fn new(transaction: Transaction, wallet: &Wallet, replayed: bool) -> Self {
        Self {
            transaction,
            balance_minor: wallet.balance_minor,
            available_minor: wallet.available_minor(),
            replayed,
        }
    }
}

/// Read-only view of a wallet and its headroom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceSnapshot {
    /// Wallet id.
    pub wallet_id: WalletId,
    /// Owner.
    pub owner_id: OwnerId,
    /// Current tier.
    pub tier: Tier,
    /// Active or deactivated.
    pub status: WalletStatus,
    /// Total funds.
    pub balance_minor: i64,
    /// Sum of open holds.
    pub held_minor: i64,
    /// `balance - held`.
    pub available_minor: i64,
    /// Top-ups in the current window.
    pub daily_topup_used_minor: i64,
    /// Top-up headroom left in the current window.
    pub daily_topup_remaining_minor: i64,
    /// Largest withdrawal allowed right now.
    pub withdraw_limit_minor: i64,
    /// The tier's static limits.
    pub limits: TierDefinition,
}

/// Summary figures compared by [`Ledger::reconcile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SummaryFigures {
    /// Total funds.
    pub balance_minor: i64,
    /// Sum of open holds.
    pub held_minor: i64,
    /// Top-ups in the current window.
    pub daily_topup_used_minor: i64,
}

impl From<&Wallet> for SummaryFigures {
    fn from(wallet: &Wallet) -> Self {
        Self {
            balance_minor: wallet.balance_minor,
            held_minor: wallet.held_minor,
            daily_topup_used_minor: wallet.daily_topup_used_minor,
        }
    }
}

/// Result of recomputing a wallet summary from its log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Wallet id.
    pub wallet_id: WalletId,
    /// Stored figures before reconciliation.
    pub before: SummaryFigures,
    /// Figures derived from the log.
    pub after: SummaryFigures,
    /// Whether the stored summary was rewritten.
    pub drifted: bool,
}

// ============================================================================
// Ledger
// ============================================================================

/// Wallet summaries and the transaction log.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    config: Arc<EngineConfig>,
    wallet_locks: Arc<KeyedLocks<WalletId>>,
    owner_locks: Arc<KeyedLocks<OwnerId>>,
}

impl Ledger {
    pub(crate) fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            store,
            clock,
            config,
            wallet_locks: Arc::new(KeyedLocks::new()),
            owner_locks: Arc::new(KeyedLocks::new()),
        }
    }

    pub(crate) fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub(crate) fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    pub(crate) fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) async fn lock_wallet(&self, wallet_id: &WalletId) -> OwnedMutexGuard<()> {
        self.wallet_locks.lock(wallet_id).await
    }

    fn limits(&self, tier: Tier) -> &TierDefinition {
        self.config.tiers.limits_for(tier)
    }

    pub(crate) fn load_wallet(&self, wallet_id: &WalletId) -> Result<Wallet> {
        self.store
            .get_wallet(wallet_id)?
            .ok_or_else(|| WalletError::WalletNotFound {
                wallet_id: wallet_id.to_string(),
            })
    }

    pub(crate) fn load_hold(&self, reservation_id: &TransactionId) -> Result<Hold> {
        self.store
            .get_hold(reservation_id)?
            .ok_or_else(|| WalletError::ReservationNotFound {
                reservation_id: reservation_id.to_string(),
            })
    }

    /// Answer a retried call from the log.
    ///
    /// Credits, debits and resolutions are written terminal; a hold's `Pending` status
    /// is its recorded outcome until it is resolved. Either way a hit is a replay.
    fn replay(
        &self,
        wallet: &Wallet,
        kind: TransactionKind,
        key: &IdempotencyKey,
        amount_minor: i64,
    ) -> Result<Option<LedgerReceipt>> {
        match self.store.find_by_idempotency_key(&wallet.id, kind, key)? {
            Some(tx) if tx.amount_minor != amount_minor => Err(WalletError::IdempotencyConflict {
                key: key.to_string(),
                recorded_minor: tx.amount_minor,
            }),
            Some(tx) => {
                debug!(
                    wallet_id = %wallet.id,
                    transaction_id = %tx.id,
                    kind = kind.as_str(),
                    "idempotent replay"
                );
                Ok(Some(LedgerReceipt::new(tx, wallet, true)))
            }
            None => Ok(None),
        }
    }

    // =========================================================================
    // Wallet lifecycle
    // =========================================================================

    /// Open a wallet for `owner_id`.
    ///
    /// # Errors
    ///
    /// - `WalletAlreadyExists` if the owner has one.
    /// - `Storage` if the store fails.
    pub async fn open_wallet(&self, owner_id: OwnerId, tier: Tier) -> Result<Wallet> {
        let _guard = self.owner_locks.lock(&owner_id).await;
        if self.store.get_wallet_by_owner(&owner_id)?.is_some() {
            return Err(WalletError::WalletAlreadyExists {
                owner_id: owner_id.to_string(),
            });
        }

        let wallet = Wallet::new(owner_id, tier, self.clock.now());
        let mut writes = WriteSet::new();
        writes.put_wallet(wallet.clone());
        self.store.commit(writes)?;

        info!(wallet_id = %wallet.id, owner_id = %owner_id, tier = ?tier, "wallet opened");
        Ok(wallet)
    }

    /// Get a wallet.
    ///
    /// # Errors
    ///
    /// Returns `WalletNotFound` if it does not exist.
    pub fn wallet(&self, wallet_id: &WalletId) -> Result<Wallet> {
        self.load_wallet(wallet_id)
    }

    /// Get the wallet belonging to `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns `WalletNotFound` if the owner has none.
    pub fn wallet_for_owner(&self, owner_id: &OwnerId) -> Result<Wallet> {
        self.store
            .get_wallet_by_owner(owner_id)?
            .ok_or_else(|| WalletError::WalletNotFound {
                wallet_id: format!("owner:{owner_id}"),
            })
    }

    /// Balance, holds, limits and remaining headroom.
    ///
    /// # Errors
    ///
    /// Returns `WalletNotFound` if it does not exist.
    pub fn balance(&self, wallet_id: &WalletId) -> Result<BalanceSnapshot> {
        let wallet = self.load_wallet(wallet_id)?;
        let limits = self.limits(wallet.tier).clone();
        let now = self.clock.now();
        let remaining = wallet.topup_remaining_minor(&limits, now, self.config.topup_window);
        let used = limits.daily_topup_limit_minor - remaining;

        Ok(BalanceSnapshot {
            wallet_id: wallet.id,
            owner_id: wallet.owner_id,
            tier: wallet.tier,
            status: wallet.status,
            balance_minor: wallet.balance_minor,
            held_minor: wallet.held_minor,
            available_minor: wallet.available_minor(),
            daily_topup_used_minor: used.max(0),
            daily_topup_remaining_minor: remaining,
            withdraw_limit_minor: limits
                .withdraw_limit
                .effective(wallet.available_minor())
                .min(wallet.available_minor().max(0)),
            limits,
        })
    }

    /// Move a wallet to another tier, effective immediately.
    ///
    /// # Errors
    ///
    /// - `WalletNotFound`, `WalletInactive`.
    /// - `WalletLimitExceeded` if current funds exceed the new tier's ceiling.
    pub async fn change_tier(&self, wallet_id: &WalletId, tier: Tier) -> Result<Wallet> {
        let _guard = self.wallet_locks.lock(wallet_id).await;
        let now = self.clock.now();
        let mut wallet = self.load_wallet(wallet_id)?;
        let from = wallet.tier;
        wallet.change_tier(tier, self.limits(tier), now)?;

        let mut writes = WriteSet::new();
        writes.put_wallet(wallet.clone());
        self.store.commit(writes)?;

        info!(wallet_id = %wallet.id, from = ?from, to = ?tier, "tier changed");
        Ok(wallet)
    }

    /// Soft-deactivate a wallet.
    ///
    /// # Errors
    ///
    /// - `WalletNotFound`, `WalletInactive`.
    /// - `OpenHoldsOutstanding` while any hold is open.
    pub async fn deactivate(&self, wallet_id: &WalletId) -> Result<Wallet> {
        let _guard = self.wallet_locks.lock(wallet_id).await;
        let now = self.clock.now();
        let mut wallet = self.load_wallet(wallet_id)?;
        wallet.deactivate(now)?;

        let mut writes = WriteSet::new();
        writes.put_wallet(wallet.clone());
        self.store.commit(writes)?;

        info!(wallet_id = %wallet.id, "wallet deactivated");
        Ok(wallet)
    }

    // =========================================================================
    // Primitives
    // =========================================================================

    /// Top up a wallet.
    ///
    /// # Errors
    ///
    /// - `WalletNotFound`, `WalletInactive`.
    /// - `DailyLimitExceeded`, `WalletLimitExceeded`.
    /// - `IdempotencyConflict` if the key was used with a different amount.
    pub async fn credit(&self, request: CreditRequest) -> Result<LedgerReceipt> {
        let _guard = self.wallet_locks.lock(&request.wallet_id).await;
        let now = self.clock.now();
        let mut wallet = self.load_wallet(&request.wallet_id)?;
        let amount = request.amount;

        if let Some(key) = &request.idempotency_key {
            if let Some(receipt) =
                self.replay(&wallet, TransactionKind::Credit, key, amount.minor())?
            {
                return Ok(receipt);
            }
        }

        if let Err(err) = wallet.apply_credit(
            amount,
            self.limits(wallet.tier),
            now,
            self.config.topup_window,
        ) {
            debug!(wallet_id = %wallet.id, amount_minor = amount.minor(), error = %err, "credit rejected");
            return Err(err);
        }

        let mut tx = Transaction::credit(wallet.id, amount.minor(), wallet.balance_minor, now);
        if let Some(key) = request.idempotency_key {
            tx = tx.with_idempotency_key(key);
        }
        if let Some(method) = request.payment_method {
            tx = tx.with_metadata(serde_json::json!({
                "payment_method": method,
                "fee_minor": method.fee_minor(),
            }));
        }

        let mut writes = WriteSet::new();
        writes.put_wallet(wallet.clone()).append_transaction(tx.clone());
        self.store.commit(writes)?;

        info!(
            wallet_id = %wallet.id,
            transaction_id = %tx.id,
            amount_minor = amount.minor(),
            balance_minor = wallet.balance_minor,
            "wallet credited"
        );
        Ok(LedgerReceipt::new(tx, &wallet, false))
    }

    /// Record a top-up that failed upstream. No balance effect.
    ///
    /// # Errors
    ///
    /// - `WalletNotFound`.
    /// - `IdempotencyConflict` if the key was used with a different amount.
    pub async fn record_failed_credit(
        &self,
        wallet_id: &WalletId,
        amount: Amount,
        key: IdempotencyKey,
        reason: &str,
    ) -> Result<LedgerReceipt> {
        let _guard = self.wallet_locks.lock(wallet_id).await;
        let now = self.clock.now();
        let wallet = self.load_wallet(wallet_id)?;

        if let Some(receipt) = self.replay(&wallet, TransactionKind::Credit, &key, amount.minor())? {
            return Ok(receipt);
        }

        let tx = Transaction::failed_credit(wallet.id, amount.minor(), wallet.balance_minor, reason, now)
            .with_idempotency_key(key);
        let mut writes = WriteSet::new();
        writes.append_transaction(tx.clone());
        self.store.commit(writes)?;

        info!(
            wallet_id = %wallet.id,
            transaction_id = %tx.id,
            amount_minor = amount.minor(),
            reason,
            "failed top-up recorded"
        );
        Ok(LedgerReceipt::new(tx, &wallet, false))
    }

    /// Earmark funds for `order_id`. The returned entry's id is the reservation id.
    ///
    /// # Errors
    ///
    /// - `WalletNotFound`, `WalletInactive`.
    /// - `InsufficientFunds`, `WalletLimitExceeded`.
    /// - `IdempotencyConflict` if the order was reserved with a different amount.
    pub async fn reserve(
        &self,
        wallet_id: &WalletId,
        amount: Amount,
        order_id: OrderId,
    ) -> Result<LedgerReceipt> {
        let _guard = self.wallet_locks.lock(wallet_id).await;
        let now = self.clock.now();
        let mut wallet = self.load_wallet(wallet_id)?;
        let key = IdempotencyKey::from_order(&order_id);

        if let Some(receipt) = self.replay(&wallet, TransactionKind::Hold, &key, amount.minor())? {
            return Ok(receipt);
        }

        let (tx, hold) = self.stage_reserve(&mut wallet, order_id, amount, key, now)?;
        let mut writes = WriteSet::new();
        writes
            .put_wallet(wallet.clone())
            .append_transaction(tx.clone())
            .put_hold(hold);
        self.store.commit(writes)?;

        info!(
            wallet_id = %wallet.id,
            reservation_id = %tx.id,
            order_id = %order_id,
            amount_minor = amount.minor(),
            available_minor = wallet.available_minor(),
            "funds reserved"
        );
        Ok(LedgerReceipt::new(tx, &wallet, false))
    }

    /// Turn a hold into a debit.
    ///
    /// # Errors
    ///
    /// - `ReservationNotFound`.
    /// - `AlreadyResolved` if the hold was captured or released before.
    pub async fn capture(&self, reservation_id: &TransactionId) -> Result<LedgerReceipt> {
        self.resolve(reservation_id, HoldResolution::Captured).await
    }

    /// Return held funds to the available balance.
    ///
    /// # Errors
    ///
    /// - `ReservationNotFound`.
    /// - `AlreadyResolved` if the hold was captured or released before.
    pub async fn release(&self, reservation_id: &TransactionId) -> Result<LedgerReceipt> {
        self.resolve(reservation_id, HoldResolution::Released).await
    }

    async fn resolve(
        &self,
        reservation_id: &TransactionId,
        resolution: HoldResolution,
    ) -> Result<LedgerReceipt> {
        let wallet_id = self.load_hold(reservation_id)?.wallet_id;
        let _guard = self.wallet_locks.lock(&wallet_id).await;
        let now = self.clock.now();
        let mut hold = self.load_hold(reservation_id)?;
        let mut wallet = self.load_wallet(&wallet_id)?;

        let tx = self.stage_resolution(&mut wallet, &mut hold, resolution, now)?;
        let mut writes = WriteSet::new();
        writes
            .put_wallet(wallet.clone())
            .append_transaction(tx.clone())
            .put_hold(hold);
        self.store.commit(writes)?;

        info!(
            wallet_id = %wallet.id,
            reservation_id = %reservation_id,
            transaction_id = %tx.id,
            resolution = ?resolution,
            balance_minor = wallet.balance_minor,
            "hold resolved"
        );
        Ok(LedgerReceipt::new(tx, &wallet, false))
    }

    /// Withdraw from the available balance.
    ///
    /// # Errors
    ///
    /// - `WalletNotFound`, `WalletInactive`.
    /// - `WithdrawLimitExceeded`, `InsufficientFunds`.
    /// - `IdempotencyConflict` if the key was used with a different amount.
    pub async fn debit(&self, request: DebitRequest) -> Result<LedgerReceipt> {
        let _guard = self.wallet_locks.lock(&request.wallet_id).await;
        let now = self.clock.now();
        let mut wallet = self.load_wallet(&request.wallet_id)?;
        let amount = request.amount;

        if let Some(key) = &request.idempotency_key {
            if let Some(receipt) = self.replay(&wallet, TransactionKind::Debit, key, amount.minor())? {
                return Ok(receipt);
            }
        }

        if let Err(err) = wallet.apply_debit(amount, self.limits(wallet.tier), now) {
            debug!(wallet_id = %wallet.id, amount_minor = amount.minor(), error = %err, "debit rejected");
            return Err(err);
        }

        let mut tx = Transaction::debit(wallet.id, amount.minor(), wallet.balance_minor, now);
        if let Some(key) = request.idempotency_key {
            tx = tx.with_idempotency_key(key);
        }

        let mut writes = WriteSet::new();
        writes.put_wallet(wallet.clone()).append_transaction(tx.clone());
        self.store.commit(writes)?;

        info!(
            wallet_id = %wallet.id,
            transaction_id = %tx.id,
            amount_minor = amount.minor(),
            balance_minor = wallet.balance_minor,
            "wallet debited"
        );
        Ok(LedgerReceipt::new(tx, &wallet, false))
    }

    // =========================================================================
    // Staging (shared with the order lifecycle)
    // =========================================================================

    /// Apply a hold to `wallet` and build its log entry and hold record.
    pub(crate) fn stage_reserve(
        &self,
        wallet: &mut Wallet,
        order_id: OrderId,
        amount: Amount,
        key: IdempotencyKey,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<(Transaction, Hold)> {
        if let Err(err) = wallet.apply_hold(amount, self.limits(wallet.tier), now) {
            debug!(wallet_id = %wallet.id, order_id = %order_id, error = %err, "reserve rejected");
            return Err(err);
        }
        let tx = Transaction::hold(wallet.id, order_id, amount.minor(), wallet.balance_minor, now)
            .with_idempotency_key(key);
        let hold = Hold::open(&tx, order_id);
        Ok((tx, hold))
    }

    /// Settle `hold` against `wallet` and build the settling entry.
    pub(crate) fn stage_resolution(
        &self,
        wallet: &mut Wallet,
        hold: &mut Hold,
        resolution: HoldResolution,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Transaction> {
        if let Some(previous) = hold.resolution {
            warn!(
                reservation_id = %hold.reservation_id,
                previous = ?previous,
                attempted = ?resolution,
                "duplicate hold resolution rejected"
            );
            return Err(WalletError::AlreadyResolved {
                reservation_id: hold.reservation_id.to_string(),
                resolution: previous,
            });
        }
        match resolution {
            HoldResolution::Captured => wallet.apply_capture(hold.amount_minor, now)?,
            HoldResolution::Released => wallet.apply_release(hold.amount_minor, now)?,
        }
        let tx = Transaction::resolution_of(hold, resolution, wallet.balance_minor, now);
        hold.resolve(resolution, tx.id, now)?;
        Ok(tx)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// A wallet's log, newest first.
    ///
    /// # Errors
    ///
    /// Returns `WalletNotFound` if it does not exist.
    pub fn transactions(
        &self,
        wallet_id: &WalletId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transaction>> {
        self.load_wallet(wallet_id)?;
        Ok(self
            .store
            .list_transactions_by_wallet(wallet_id, limit, offset)?)
    }

    /// Reward points earned by a wallet.
    ///
    /// # Errors
    ///
    /// Returns `WalletNotFound` if it does not exist.
    pub fn rewards(&self, wallet_id: &WalletId) -> Result<RewardsSummary> {
        let log = self.transactions(wallet_id, usize::MAX, 0)?;
        Ok(rewards::accrue(&log))
    }

    /// Price a top-up.
    #[must_use]
    pub const fn quote_topup(&self, amount: Amount, method: PaymentMethod) -> TopupQuote {
        TopupQuote::new(amount, method)
    }

    // =========================================================================
    // Recovery
    // =========================================================================

    /// Recompute a wallet's summary from its log and hold records, rewriting it if it
    /// drifted.
    ///
    /// # Errors
    ///
    /// Returns `WalletNotFound` if it does not exist, or `Storage` if the store fails.
    pub async fn reconcile(&self, wallet_id: &WalletId) -> Result<ReconcileReport> {
        let _guard = self.wallet_locks.lock(wallet_id).await;
        let now = self.clock.now();
        let mut wallet = self.load_wallet(wallet_id)?;
        wallet.roll_topup_window(now, self.config.topup_window);
        let before = SummaryFigures::from(&wallet);

        let log = self
            .store
            .list_transactions_by_wallet(wallet_id, usize::MAX, 0)?;
        let mut after = SummaryFigures {
            balance_minor: 0,
            held_minor: 0,
            daily_topup_used_minor: 0,
        };
        for tx in &log {
            match (tx.kind, tx.status) {
                (TransactionKind::Hold, _) => {
                    if self.store.get_hold(&tx.id)?.map_or(true, |hold| hold.is_open()) {
                        after.held_minor += tx.amount_minor;
                    }
                }
                (kind, TransactionStatus::Success) => {
                    after.balance_minor += kind.balance_sign() * tx.amount_minor;
                    if kind == TransactionKind::Credit
                        && tx.created_at >= wallet.daily_topup_window_start
                    {
                        after.daily_topup_used_minor += tx.amount_minor;
                    }
                }
                _ => {}
            }
        }

        let drifted = before != after;
        if drifted {
            wallet.balance_minor = after.balance_minor;
            wallet.held_minor = after.held_minor;
            wallet.daily_topup_used_minor = after.daily_topup_used_minor;
            wallet.updated_at = now;

            let mut writes = WriteSet::new();
            writes.put_wallet(wallet);
            self.store.commit(writes)?;
            warn!(wallet_id = %wallet_id, ?before, ?after, "wallet summary drifted; rewritten from log");
        } else {
            debug!(wallet_id = %wallet_id, "wallet summary consistent with log");
        }

        Ok(ReconcileReport {
            wallet_id: *wallet_id,
            before,
            after,
            drifted,
        })
    }
}

