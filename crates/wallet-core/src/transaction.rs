//! Transaction log entries and hold resolution records.
//!
//! The log is append-only: a [`Transaction`] is never modified once written. Whether a
//! `Hold` is still open lives in a separate [`Hold`] record, which is the only mutable
//! piece of reservation state and moves from open to resolved exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{IdempotencyKey, OrderId, TransactionId, WalletId};

/// What a transaction did to the wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Top-up; increases the balance.
    Credit,
    /// Direct withdrawal; decreases the balance.
    Debit,
    /// Reservation against an order; balance unchanged, available reduced.
    Hold,
    /// Reversal of a hold; balance unchanged, available restored.
    Release,
    /// Conversion of a hold into a debit; decreases the balance.
    Capture,
}

impl TransactionKind {
    /// Stable lowercase label used in storage keys and responses.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
            Self::Hold => "hold",
            Self::Release => "release",
            Self::Capture => "capture",
        }
    }

    /// Signed effect of a successful entry of this kind on `balance_minor`.
    #[must_use]
    pub const fn balance_sign(&self) -> i64 {
        match self {
            Self::Credit => 1,
            Self::Debit | Self::Capture => -1,
            Self::Hold | Self::Release => 0,
        }
    }
}

/// Outcome recorded on a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Awaiting settlement. Holds are written in this state; their settlement is
    /// recorded by a later `Capture` or `Release` entry.
    Pending,
    /// Applied.
    Success,
    /// Rejected upstream (e.g. a failed gateway payment); no balance effect.
    Failed,
}

impl TransactionStatus {
    /// Whether the entry's outcome is final.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

/// An immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique id (ULID, time-ordered).
    pub id: TransactionId,

    /// The wallet affected.
    pub wallet_id: WalletId,

    /// Kind of movement.
    pub kind: TransactionKind,

    /// Amount in minor units, always positive.
    pub amount_minor: i64,

    /// Outcome.
    pub status: TransactionStatus,

    /// The order this entry belongs to, for holds and their resolutions.
    pub related_order_id: Option<OrderId>,

    /// Key under which retries of this request are deduplicated.
    pub idempotency_key: IdempotencyKey,

    /// Wallet balance right after this entry was applied.
    pub balance_after_minor: i64,

    /// Free-form reason codes (payment method, fee, failure reason, ...).
    pub metadata: serde_json::Value,

    /// When the entry was written.
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    fn entry(
        wallet_id: WalletId,
        kind: TransactionKind,
        status: TransactionStatus,
        amount_minor: i64,
        balance_after_minor: i64,
        now: DateTime<Utc>,
    ) -> Self {
        let id = TransactionId::generate();
        Self {
            id,
            wallet_id,
            kind,
            amount_minor,
            status,
            related_order_id: None,
            idempotency_key: IdempotencyKey::from_transaction(&id),
            balance_after_minor,
            metadata: serde_json::Value::Null,
            created_at: now,
        }
    }

    /// A successful top-up.
    #[must_use]
    pub fn credit(
        wallet_id: WalletId,
        amount_minor: i64,
        balance_after_minor: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self::entry(
            wallet_id,
            TransactionKind::Credit,
            TransactionStatus::Success,
            amount_minor,
            balance_after_minor,
            now,
        )
    }

    /// A top-up the gateway reported as failed.
    #[must_use]
    pub fn failed_credit(
        wallet_id: WalletId,
        amount_minor: i64,
        balance_minor: i64,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self::entry(
            wallet_id,
            TransactionKind::Credit,
            TransactionStatus::Failed,
            amount_minor,
            balance_minor,
            now,
        )
        .with_metadata(serde_json::json!({ "failure_reason": reason }))
    }

    /// A direct withdrawal.
    #[must_use]
    pub fn debit(
        wallet_id: WalletId,
        amount_minor: i64,
        balance_after_minor: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self::entry(
            wallet_id,
            TransactionKind::Debit,
            TransactionStatus::Success,
            amount_minor,
            balance_after_minor,
            now,
        )
    }

    /// A reservation for `order_id`, keyed by the order.
    #[must_use]
    pub fn hold(
        wallet_id: WalletId,
        order_id: OrderId,
        amount_minor: i64,
        balance_minor: i64,
        now: DateTime<Utc>,
    ) -> Self {
        let mut tx = Self::entry(
            wallet_id,
            TransactionKind::Hold,
            TransactionStatus::Pending,
            amount_minor,
            balance_minor,
            now,
        );
        tx.related_order_id = Some(order_id);
        tx.idempotency_key = IdempotencyKey::from_order(&order_id);
        tx
    }

    /// The entry settling `hold`, either a capture or a release.
    #[must_use]
    pub fn resolution_of(
        hold: &Hold,
        resolution: HoldResolution,
        balance_after_minor: i64,
        now: DateTime<Utc>,
    ) -> Self {
        let kind = match resolution {
            HoldResolution::Captured => TransactionKind::Capture,
            HoldResolution::Released => TransactionKind::Release,
        };
        let mut tx = Self::entry(
            hold.wallet_id,
            kind,
            TransactionStatus::Success,
            hold.amount_minor,
            balance_after_minor,
            now,
        );
        tx.related_order_id = Some(hold.order_id);
        tx.metadata = serde_json::json!({ "reservation_id": hold.reservation_id.to_string() });
        tx
    }

    /// Replace the idempotency key.
    #[must_use]
    pub fn with_idempotency_key(mut self, key: IdempotencyKey) -> Self {
        self.idempotency_key = key;
        self
    }

    /// Replace the metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// How a hold was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldResolution {
    /// Converted into a debit.
    Captured,
    /// Returned to the available balance.
    Released,
}

/// Settlement state of one reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hold {
    /// The `Hold` transaction id; this is the reservation id.
    pub reservation_id: TransactionId,

    /// The wallet whose funds are held.
    pub wallet_id: WalletId,

    /// The order the funds are held for.
    pub order_id: OrderId,

    /// Held amount in minor units.
    pub amount_minor: i64,

    /// `None` while open.
    pub resolution: Option<HoldResolution>,

    /// The `Capture`/`Release` entry that settled it.
    pub resolved_by: Option<TransactionId>,

    /// When it was settled.
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Hold {
    /// An open hold backed by `hold_tx`.
    #[must_use]
    pub fn open(hold_tx: &Transaction, order_id: OrderId) -> Self {
        Self {
            reservation_id: hold_tx.id,
            wallet_id: hold_tx.wallet_id,
            order_id,
            amount_minor: hold_tx.amount_minor,
            resolution: None,
            resolved_by: None,
            resolved_at: None,
        }
    }

    /// Whether the hold still reduces the available balance.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.resolution.is_none()
    }

    /// Mark the hold settled by `entry`.
    ///
    /// # Errors
    ///
    /// Returns `WalletError::AlreadyResolved` if it was settled before.
    pub fn resolve(
        &mut self,
        resolution: HoldResolution,
        entry: TransactionId,
        now: DateTime<Utc>,
    ) -> crate::Result<()> {
        if let Some(previous) = self.resolution {
            return Err(crate::WalletError::AlreadyResolved {
                reservation_id: self.reservation_id.to_string(),
                resolution: previous,
            });
        }
        self.resolution = Some(resolution);
        self.resolved_by = Some(entry);
        self.resolved_at = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hold_is_pending_and_keyed_by_order() {
        let wallet = WalletId::generate();
        let order = OrderId::generate();
        let tx = Transaction::hold(wallet, order, 150_000, 200_000, Utc::now());

        assert_eq!(tx.kind, TransactionKind::Hold);
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert!(!tx.status.is_terminal());
        assert_eq!(tx.related_order_id, Some(order));
        assert_eq!(tx.idempotency_key, IdempotencyKey::from_order(&order));
    }

    #[test]
    fn default_key_is_transaction_id() {
        let tx = Transaction::credit(WalletId::generate(), 100, 100, Utc::now());
        assert_eq!(tx.idempotency_key.as_str(), tx.id.to_string());
    }

    #[test]
    fn failed_credit_records_reason() {
        let tx = Transaction::failed_credit(WalletId::generate(), 100, 0, "card declined", Utc::now());
        assert_eq!(tx.status, TransactionStatus::Failed);
        assert_eq!(tx.metadata["failure_reason"], "card declined");
    }

    #[test]
    fn hold_resolves_exactly_once() {
        let order = OrderId::generate();
        let tx = Transaction::hold(WalletId::generate(), order, 500, 1_000, Utc::now());
        let mut hold = Hold::open(&tx, order);
        assert!(hold.is_open());

        let capture = Transaction::resolution_of(&hold, HoldResolution::Captured, 500, Utc::now());
        assert_eq!(capture.kind, TransactionKind::Capture);
        hold.resolve(HoldResolution::Captured, capture.id, Utc::now())
            .unwrap();
        assert!(!hold.is_open());

        let err = hold
            .resolve(HoldResolution::Released, TransactionId::generate(), Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            crate::WalletError::AlreadyResolved {
                resolution: HoldResolution::Captured,
                ..
            }
        ));
        assert_eq!(hold.resolved_by, Some(capture.id));
    }

    #[test]
    fn balance_signs() {
        assert_eq!(TransactionKind::Credit.balance_sign(), 1);
        assert_eq!(TransactionKind::Capture.balance_sign(), -1);
        assert_eq!(TransactionKind::Hold.balance_sign(), 0);
    }
}
