//! Order lifecycle state machine.
//!
//! ```text
//! Created ──reserve──▶ Held ──assign──▶ Assigned ──confirm──▶ Delivered
//!                       │  ╲                │  ╲
//!                  cancel  expire       cancel  fail
//!                       ▼     ╲             ▼     ╲
//!                  Cancelled   Failed   Cancelled  Failed
//! ```
//!
//! [`Order::apply`] decides a transition and reports the ledger call it requires. It never
//! touches the ledger itself; the engine commits the order and the ledger effect together.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WalletError};
use crate::ids::{OrderId, TransactionId, WalletId};
use crate::transaction::HoldResolution;

/// Number of digits in a delivery code.
pub const DELIVERY_CODE_LEN: usize = 4;

/// Where an order is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    /// Placed, funds not yet reserved.
    Created,
    /// Funds reserved, waiting for a delivery partner.
    Held,
    /// A delivery partner accepted the order.
    Assigned,
    /// Delivered and paid.
    Delivered,
    /// Cancelled; funds released.
    Cancelled,
    /// Delivery failed; funds released.
    Failed,
}

impl OrderState {
    /// Whether the state is final.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled | Self::Failed)
    }

    /// How the order's hold was settled, for terminal states.
    #[must_use]
    pub const fn resolution(&self) -> Option<HoldResolution> {
        match self {
            Self::Delivered => Some(HoldResolution::Captured),
            Self::Cancelled | Self::Failed => Some(HoldResolution::Released),
            Self::Created | Self::Held | Self::Assigned => None,
        }
    }
}

/// Why an order was cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", content = "note", rename_all = "snake_case")]
pub enum CancelReason {
    /// I changed my mind.
    ChangedMind,
    /// Wrong address selected.
    WrongAddress,
    /// Payment issue.
    PaymentIssue,
    /// Expected quicker delivery.
    ExpectedQuickerDelivery,
    /// Found a better alternative.
    FoundBetterAlternative,
    /// The assigned rider failed verification.
    FlaggedVerification,
    /// Anything else, with the caller's note.
    Other(String),
}

impl CancelReason {
    /// Human-readable label.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::ChangedMind => "I changed my mind",
            Self::WrongAddress => "Wrong address selected",
            Self::PaymentIssue => "Payment issue",
            Self::ExpectedQuickerDelivery => "Expected quicker delivery",
            Self::FoundBetterAlternative => "Found a better alternative",
            Self::FlaggedVerification => "Rider verification flagged",
            Self::Other(note) => note,
        }
    }

    /// Whether the reason is cause enough to cancel after a partner was assigned.
    #[must_use]
    pub const fn is_for_cause(&self) -> bool {
        matches!(self, Self::FlaggedVerification)
    }
}

/// Who asked for a cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelledBy {
    /// The wallet owner.
    User,
    /// Support or operations staff.
    Operator,
    /// An automated process.
    System,
}

/// Reason codes attached to an order as it moves through its lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderMetadata {
    /// Set when cancelled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<CancelReason>,

    /// Set when cancelled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_by: Option<CancelledBy>,

    /// Set when failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    /// The delivery partner, once assigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_id: Option<String>,
}

/// A cash-on-delivery order paid from the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Order id.
    pub id: OrderId,

    /// The paying wallet.
    pub wallet_id: WalletId,

    /// Order total in minor units.
    pub amount_minor: i64,

    /// Current state.
    pub state: OrderState,

    /// When the order was placed.
    pub created_at: DateTime<Utc>,

    /// Last state change.
    pub updated_at: DateTime<Utc>,

    /// A `Held` order can be cancelled by its owner strictly before this instant.
    pub cancellation_deadline: DateTime<Utc>,

    /// The `Hold` transaction backing this order.
    pub reservation_tx_id: Option<TransactionId>,

    /// Code the recipient reads out to the delivery partner.
    pub delivery_code: String,

    /// Reason codes.
    #[serde(default)]
    pub metadata: OrderMetadata,
}

/// Something that happens to an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderEvent {
    /// The ledger reserved the funds.
    Reserved {
        /// The hold transaction.
        reservation_id: TransactionId,
    },
    /// A delivery partner accepted the order.
    Assign {
        /// Partner reference.
        partner_id: String,
    },
    /// The delivery partner confirmed hand-over.
    Confirm {
        /// Code presented by the recipient.
        delivery_code: String,
    },
    /// Cancellation by the owner, an operator, or the system.
    Cancel {
        /// Why.
        reason: CancelReason,
        /// Who.
        by: CancelledBy,
    },
    /// The delivery partner reported a failure.
    Fail {
        /// Why.
        reason: String,
    },
    /// The order sat in `Held` past its SLA.
    Expire {
        /// Why.
        reason: String,
    },
}

impl OrderEvent {
    const fn action(&self) -> &'static str {
        match self {
            Self::Reserved { .. } => "reserve",
            Self::Assign { .. } => "assign",
            Self::Confirm { .. } => "confirm",
            Self::Cancel { .. } => "cancel",
            Self::Fail { .. } => "fail",
            Self::Expire { .. } => "expire",
        }
    }
}

/// The ledger call a transition requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEffect {
    /// No ledger change.
    None,
    /// Capture the hold.
    Capture(TransactionId),
    /// Release the hold.
    Release(TransactionId),
}

impl Order {
    /// A new order in `Created`.
    #[must_use]
    pub fn new(wallet_id: WalletId, amount_minor: i64, grace: Duration, now: DateTime<Utc>) -> Self {
        Self {
            id: OrderId::generate(),
            wallet_id,
            amount_minor,
            state: OrderState::Created,
            created_at: now,
            updated_at: now,
            cancellation_deadline: now + grace,
            reservation_tx_id: None,
            delivery_code: generate_delivery_code(),
            metadata: OrderMetadata::default(),
        }
    }

    /// Apply `event` at `now`.
    ///
    /// On success the order is updated and the required ledger effect returned. On error
    /// the order is unchanged.
    ///
    /// # Errors
    ///
    /// - `InvalidOrderTransition` if the event is not allowed from the current state,
    ///   including a cancellation of a `Held` order at or after its deadline.
    /// - `AlreadyResolved` for a confirmation or failure signal on a terminal order.
    /// - `DeliveryCodeMismatch` if the confirmation code is wrong.
    pub fn apply(&mut self, event: OrderEvent, now: DateTime<Utc>) -> Result<LedgerEffect> {
        let action = event.action();
        let (next, effect) = match (self.state, event) {
            (OrderState::Created, OrderEvent::Reserved { reservation_id }) => {
                self.reservation_tx_id = Some(reservation_id);
                (OrderState::Held, LedgerEffect::None)
            }
            (OrderState::Held, OrderEvent::Assign { partner_id }) => {
                self.metadata.partner_id = Some(partner_id);
                (OrderState::Assigned, LedgerEffect::None)
            }
            (OrderState::Assigned, OrderEvent::Confirm { delivery_code }) => {
                if delivery_code != self.delivery_code {
                    return Err(WalletError::DeliveryCodeMismatch {
                        order_id: self.id.to_string(),
                    });
                }
                (OrderState::Delivered, LedgerEffect::Capture(self.reservation()?))
            }
            (OrderState::Held, OrderEvent::Cancel { reason, by }) => {
                if now >= self.cancellation_deadline {
                    return Err(self.invalid(action));
                }
                let reservation = self.reservation()?;
                self.metadata.cancel_reason = Some(reason);
                self.metadata.cancelled_by = Some(by);
                (OrderState::Cancelled, LedgerEffect::Release(reservation))
            }
            (OrderState::Assigned, OrderEvent::Cancel { reason, by }) => {
                // Owners need a cause once a partner is on the way; staff do not.
                if by == CancelledBy::User && !reason.is_for_cause() {
                    return Err(self.invalid(action));
                }
                let reservation = self.reservation()?;
                self.metadata.cancel_reason = Some(reason);
                self.metadata.cancelled_by = Some(by);
                (OrderState::Cancelled, LedgerEffect::Release(reservation))
            }
            (OrderState::Assigned, OrderEvent::Fail { reason })
            | (OrderState::Held, OrderEvent::Expire { reason }) => {
                let reservation = self.reservation()?;
                self.metadata.failure_reason = Some(reason);
                (OrderState::Failed, LedgerEffect::Release(reservation))
            }
            (state, OrderEvent::Confirm { .. } | OrderEvent::Fail { .. })
                if state.is_terminal() =>
            {
                return Err(self.already_resolved(action));
            }
            _ => return Err(self.invalid(action)),
        };

        self.state = next;
        self.updated_at = now;
        Ok(effect)
    }

    /// Whether the owner can still cancel without cause at `now`.
    #[must_use]
    pub fn cancellable_at(&self, now: DateTime<Utc>) -> bool {
        match self.state {
            OrderState::Held => now < self.cancellation_deadline,
            _ => false,
        }
    }

    fn reservation(&self) -> Result<TransactionId> {
        self.reservation_tx_id.ok_or_else(|| {
            WalletError::Storage(format!("order {} has no reservation recorded", self.id))
        })
    }

    fn invalid(&self, action: &str) -> WalletError {
        WalletError::InvalidOrderTransition {
            order_id: self.id.to_string(),
            from: self.state,
            action: action.to_string(),
        }
    }

    fn already_resolved(&self, action: &str) -> WalletError {
        match (self.reservation_tx_id, self.state.resolution()) {
            (Some(reservation), Some(resolution)) => WalletError::AlreadyResolved {
                reservation_id: reservation.to_string(),
                resolution,
            },
            _ => self.invalid(action),
        }
    }
}

/// Four random digits from a fresh v4 UUID.
fn generate_delivery_code() -> String {
    let bytes = uuid::Uuid::new_v4().into_bytes();
    let value = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) % 10_000;
    format!("{value:0width$}", width = DELIVERY_CODE_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held_order(now: DateTime<Utc>) -> Order {
        let mut order = Order::new(WalletId::generate(), 150_000, Duration::seconds(30), now);
        order
            .apply(
                OrderEvent::Reserved {
                    reservation_id: TransactionId::generate(),
                },
                now,
            )
            .unwrap();
        order
    }

    fn user_cancel() -> OrderEvent {
        OrderEvent::Cancel {
            reason: CancelReason::ChangedMind,
            by: CancelledBy::User,
        }
    }

    #[test]
    fn delivery_code_is_four_digits() {
        let order = Order::new(WalletId::generate(), 1, Duration::seconds(30), Utc::now());
        assert_eq!(order.delivery_code.len(), DELIVERY_CODE_LEN);
        assert!(order.delivery_code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn cancel_just_before_deadline_succeeds() {
        let now = Utc::now();
        let mut order = held_order(now);
        let at = order.cancellation_deadline - Duration::milliseconds(1);
        let effect = order.apply(user_cancel(), at).unwrap();

        assert_eq!(order.state, OrderState::Cancelled);
        assert_eq!(effect, LedgerEffect::Release(order.reservation_tx_id.unwrap()));
        assert_eq!(order.metadata.cancelled_by, Some(CancelledBy::User));
    }

    #[test]
    fn cancel_after_deadline_is_rejected() {
        let now = Utc::now();
        let mut order = held_order(now);
        for at in [
            order.cancellation_deadline,
            order.cancellation_deadline + Duration::milliseconds(1),
        ] {
            let err = order.apply(user_cancel(), at).unwrap_err();
            assert!(matches!(
                err,
                WalletError::InvalidOrderTransition {
                    from: OrderState::Held,
                    ..
                }
            ));
        }
        assert_eq!(order.state, OrderState::Held);
    }

    #[test]
    fn delivery_captures_once() {
        let now = Utc::now();
        let mut order = held_order(now);
        order
            .apply(
                OrderEvent::Assign {
                    partner_id: "rider-7".into(),
                },
                now,
            )
            .unwrap();

        let wrong = OrderEvent::Confirm {
            delivery_code: "x".into(),
        };
        assert!(matches!(
            order.apply(wrong, now),
            Err(WalletError::DeliveryCodeMismatch { .. })
        ));
        assert_eq!(order.state, OrderState::Assigned);

        let confirm = OrderEvent::Confirm {
            delivery_code: order.delivery_code.clone(),
        };
        let effect = order.apply(confirm.clone(), now).unwrap();
        assert!(matches!(effect, LedgerEffect::Capture(_)));
        assert_eq!(order.state, OrderState::Delivered);

        assert!(matches!(
            order.apply(confirm, now),
            Err(WalletError::AlreadyResolved {
                resolution: HoldResolution::Captured,
                ..
            })
        ));
        assert!(matches!(
            order.apply(user_cancel(), now),
            Err(WalletError::InvalidOrderTransition {
                from: OrderState::Delivered,
                ..
            })
        ));
    }

    #[test]
    fn assigned_order_can_be_cancelled_for_cause_after_deadline() {
        let now = Utc::now();
        let mut order = held_order(now);
        order
            .apply(
                OrderEvent::Assign {
                    partner_id: "rider-1".into(),
                },
                now,
            )
            .unwrap();
        let later = now + Duration::minutes(10);
        order
            .apply(
                OrderEvent::Cancel {
                    reason: CancelReason::FlaggedVerification,
                    by: CancelledBy::Operator,
                },
                later,
            )
            .unwrap();
        assert_eq!(order.state, OrderState::Cancelled);
        assert_eq!(
            order.metadata.cancel_reason,
            Some(CancelReason::FlaggedVerification)
        );
    }

    #[test]
    fn owner_needs_cause_to_cancel_assigned_order() {
        let now = Utc::now();
        let mut order = held_order(now);
        order
            .apply(
                OrderEvent::Assign {
                    partner_id: "rider-1".into(),
                },
                now,
            )
            .unwrap();

        let err = order
            .apply(
                OrderEvent::Cancel {
                    reason: CancelReason::ChangedMind,
                    by: CancelledBy::User,
                },
                now,
            )
            .unwrap_err();
        assert!(matches!(err, WalletError::InvalidOrderTransition { .. }));
        assert_eq!(order.state, OrderState::Assigned);

        order
            .apply(
                OrderEvent::Cancel {
                    reason: CancelReason::FlaggedVerification,
                    by: CancelledBy::User,
                },
                now,
            )
            .unwrap();
        assert_eq!(order.state, OrderState::Cancelled);
    }

    #[test]
    fn held_order_cannot_be_confirmed_or_failed() {
        let now = Utc::now();
        let mut order = held_order(now);
        let confirm = OrderEvent::Confirm {
            delivery_code: order.delivery_code.clone(),
        };
        assert!(matches!(
            order.apply(confirm, now),
            Err(WalletError::InvalidOrderTransition { .. })
        ));
        assert!(matches!(
            order.apply(OrderEvent::Fail { reason: "x".into() }, now),
            Err(WalletError::InvalidOrderTransition { .. })
        ));
    }

    #[test]
    fn stale_held_order_expires() {
        let now = Utc::now();
        let mut order = held_order(now);
        let effect = order
            .apply(
                OrderEvent::Expire {
                    reason: "no delivery partner assigned".into(),
                },
                now + Duration::hours(3),
            )
            .unwrap();
        assert!(matches!(effect, LedgerEffect::Release(_)));
        assert_eq!(order.state, OrderState::Failed);
        assert!(matches!(
            order.apply(OrderEvent::Fail { reason: "again".into() }, now),
            Err(WalletError::AlreadyResolved {
                resolution: HoldResolution::Released,
                ..
            })
        ));
    }

    #[test]
    fn other_reason_keeps_note() {
        let reason = CancelReason::Other("ordered twice".into());
        assert_eq!(reason.label(), "ordered twice");
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(json["code"], "other");
        assert_eq!(json["note"], "ordered twice");
        let parsed: CancelReason = serde_json::from_value(serde_json::json!({"code": "wrong_address"})).unwrap();
        assert_eq!(parsed, CancelReason::WrongAddress);
    }
}
