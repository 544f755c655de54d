//! Order lifecycle: placement, delivery signals, cancellation and the stale-hold sweep.
//!
//! Each transition runs inside the owning wallet's critical section. The order's new
//! state and the ledger entry it implies (capture or release) are committed together,
//! so an order is never `Delivered` without its capture or `Cancelled` without its
//! release.

use tracing::{debug, info, warn};

use wallet_core::{
    Amount, CancelReason, CancelledBy, ErrorKind, HoldResolution, IdempotencyKey, LedgerEffect,
    Order, OrderEvent, OrderId, OrderState, Result, TransactionKind, WalletError, WalletId,
};
use wallet_store::WriteSet;

use crate::ledger::Ledger;

/// Reason recorded on orders failed by the sweeper.
pub const STALE_HOLD_REASON: &str = "no delivery partner assigned";

/// Request to place an order.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    /// Wallet to pay from.
    pub wallet_id: WalletId,
    /// Order total.
    pub amount: Amount,
    /// Retry key; a replay returns the order placed under it.
    pub idempotency_key: Option<IdempotencyKey>,
}

impl PlaceOrder {
    /// An order for `amount`.
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

/// Drives orders through their state machine.
#[derive(Clone)]
pub struct OrderLifecycle {
    ledger: Ledger,
}

impl OrderLifecycle {
    pub(crate) const fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    /// Create an order and reserve its funds.
    ///
    /// The order is only persisted once its hold exists, so a rejected reservation
    /// leaves nothing behind.
    ///
    /// # Errors
    ///
    /// - `WalletNotFound`, `WalletInactive`.
    /// - `InsufficientFunds`, `WalletLimitExceeded`.
    /// - `IdempotencyConflict` if the key was used with a different amount.
    pub async fn place_order(&self, request: PlaceOrder) -> Result<Order> {
        let _guard = self.ledger.lock_wallet(&request.wallet_id).await;
        let now = self.ledger.now();
        let store = self.ledger.store();
        let mut wallet = self.ledger.load_wallet(&request.wallet_id)?;
        let amount = request.amount;

        if let Some(key) = &request.idempotency_key {
            if let Some(order) = self.replay(&wallet.id, key, amount)? {
                return Ok(order);
            }
        }

        let mut order = Order::new(
            wallet.id,
            amount.minor(),
            self.ledger.config().cancellation_grace,
            now,
        );
        let key = request
            .idempotency_key
            .unwrap_or_else(|| IdempotencyKey::from_order(&order.id));
        let (tx, hold) = self
            .ledger
            .stage_reserve(&mut wallet, order.id, amount, key, now)?;
        order.apply(OrderEvent::Reserved { reservation_id: tx.id }, now)?;

        let mut writes = WriteSet::new();
        writes
            .put_wallet(wallet.clone())
            .append_transaction(tx.clone())
            .put_hold(hold)
            .put_order(order.clone());
        store.commit(writes)?;

        info!(
            order_id = %order.id,
            wallet_id = %wallet.id,
            reservation_id = %tx.id,
            amount_minor = order.amount_minor,
            available_minor = wallet.available_minor(),
            "order placed"
        );
        Ok(order)
    }

    fn replay(
        &self,
        wallet_id: &WalletId,
        key: &IdempotencyKey,
        amount: Amount,
    ) -> Result<Option<Order>> {
        let store = self.ledger.store();
        let Some(tx) = store.find_by_idempotency_key(wallet_id, TransactionKind::Hold, key)? else {
            return Ok(None);
        };
        if tx.amount_minor != amount.minor() {
            return Err(WalletError::IdempotencyConflict {
                key: key.to_string(),
                recorded_minor: tx.amount_minor,
            });
        }
        let Some(order_id) = tx.related_order_id else {
            return Ok(None);
        };
        let order = store.get_order(&order_id)?;
        if let Some(order) = &order {
            debug!(order_id = %order.id, wallet_id = %wallet_id, "order placement replayed");
        }
        Ok(order)
    }

    /// Get an order.
    ///
    /// # Errors
    ///
    /// Returns `OrderNotFound` if it does not exist.
    pub fn order(&self, order_id: &OrderId) -> Result<Order> {
        self.ledger
            .store()
            .get_order(order_id)?
            .ok_or_else(|| WalletError::OrderNotFound {
                order_id: order_id.to_string(),
            })
    }

    /// A wallet's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `WalletNotFound` if the wallet does not exist.
    pub fn orders_for_wallet(
        &self,
        wallet_id: &WalletId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Order>> {
        self.ledger.load_wallet(wallet_id)?;
        Ok(self
            .ledger
            .store()
            .list_orders_by_wallet(wallet_id, limit, offset)?)
    }

    /// A delivery partner accepted the order.
    ///
    /// # Errors
    ///
    /// `OrderNotFound`, or `InvalidOrderTransition` unless the order is `Held`.
    pub async fn assign(&self, order_id: &OrderId, partner_id: impl Into<String>) -> Result<Order> {
        self.transition(
            order_id,
            OrderEvent::Assign {
                partner_id: partner_id.into(),
            },
        )
        .await
    }

    /// The partner handed the order over; captures the hold.
    ///
    /// # Errors
    ///
    /// - `OrderNotFound`.
    /// - `DeliveryCodeMismatch` if the code is wrong.
    /// - `AlreadyResolved` for a repeated signal on a finished order.
    /// - `InvalidOrderTransition` unless the order is `Assigned`.
    pub async fn confirm_delivery(
        &self,
        order_id: &OrderId,
        delivery_code: impl Into<String>,
    ) -> Result<Order> {
        self.transition(
            order_id,
            OrderEvent::Confirm {
                delivery_code: delivery_code.into(),
            },
        )
        .await
    }

    /// The partner could not deliver; releases the hold.
    ///
    /// # Errors
    ///
    /// - `OrderNotFound`.
    /// - `AlreadyResolved` for a repeated signal on a finished order.
    /// - `InvalidOrderTransition` unless the order is `Assigned`.
    pub async fn fail(&self, order_id: &OrderId, reason: impl Into<String>) -> Result<Order> {
        self.transition(
            order_id,
            OrderEvent::Fail {
                reason: reason.into(),
            },
        )
        .await
    }

    /// Cancel an order and release its hold.
    ///
    /// A `Held` order can be cancelled only before its deadline; an `Assigned` order any
    /// time before it is finished.
    ///
    /// # Errors
    ///
    /// `OrderNotFound`, or `InvalidOrderTransition` outside those windows.
    pub async fn cancel(
        &self,
        order_id: &OrderId,
        reason: CancelReason,
        by: CancelledBy,
    ) -> Result<Order> {
        self.transition(order_id, OrderEvent::Cancel { reason, by })
            .await
    }

    /// Fail `Held` orders older than the configured SLA and release their holds.
    ///
    /// Examines at most one batch of the oldest `Held` orders. Orders that moved on
    /// while the sweep ran are skipped.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store fails.
    pub async fn expire_stale(&self) -> Result<Vec<OrderId>> {
        let config = self.ledger.config();
        let now = self.ledger.now();
        let candidates = self
            .ledger
            .store()
            .list_orders_in_state(OrderState::Held, config.sweep_batch)?;

        let mut expired = Vec::new();
        for order in candidates {
            if order.created_at + config.held_order_sla > now {
                continue;
            }
            let event = OrderEvent::Expire {
                reason: STALE_HOLD_REASON.to_owned(),
            };
            match self.transition(&order.id, event).await {
                Ok(order) => expired.push(order.id),
                Err(err) if err.kind() == ErrorKind::StateConflict => {
                    debug!(order_id = %order.id, error = %err, "stale order moved on before sweep");
                }
                Err(err) => return Err(err),
            }
        }

        if !expired.is_empty() {
            info!(count = expired.len(), "stale held orders failed");
        }
        Ok(expired)
    }

    async fn transition(&self, order_id: &OrderId, event: OrderEvent) -> Result<Order> {
        let wallet_id = self.order(order_id)?.wallet_id;
        let _guard = self.ledger.lock_wallet(&wallet_id).await;
        let now = self.ledger.now();
        let mut order = self.order(order_id)?;
        let from = order.state;

        let effect = match order.apply(event, now) {
            Ok(effect) => effect,
            Err(err @ WalletError::AlreadyResolved { .. }) => {
                warn!(order_id = %order_id, state = ?from, "duplicate delivery signal rejected");
                return Err(err);
            }
            Err(err) => return Err(err),
        };
        let settle = match effect {
            LedgerEffect::None => None,
            LedgerEffect::Capture(reservation_id) => Some((reservation_id, HoldResolution::Captured)),
            LedgerEffect::Release(reservation_id) => Some((reservation_id, HoldResolution::Released)),
        };

        let mut writes = WriteSet::new();
        if let Some((reservation_id, resolution)) = settle {
            let mut wallet = self.ledger.load_wallet(&wallet_id)?;
            let mut hold = self.ledger.load_hold(&reservation_id)?;
            let tx = self
                .ledger
                .stage_resolution(&mut wallet, &mut hold, resolution, now)?;
            writes
                .put_wallet(wallet)
                .append_transaction(tx)
                .put_hold(hold);
        }
        writes.put_order(order.clone());
        self.ledger.store().commit(writes)?;

        info!(
            order_id = %order.id,
            wallet_id = %wallet_id,
            from = ?from,
            to = ?order.state,
            "order transitioned"
        );
        Ok(order)
    }
}
