//! HTTP request handlers.

pub mod credentials;
pub mod delivery;
pub mod health;
pub mod orders;
pub mod topups;
pub mod wallets;
pub mod webhooks;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wallet_core::{
    IdempotencyKey, Order, OrderId, OrderMetadata, OrderState, TransactionId, WalletError,
    WalletId,
};

use crate::error::ApiError;

/// Largest page a listing returns.
const MAX_PAGE: usize = 100;

/// Pagination query parameters.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    /// Maximum number of items to return (default: 50, max: 100).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

impl PageQuery {
    /// The limit clamped to the maximum page size.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit.min(MAX_PAGE)
    }
}

/// Parse an optional caller-supplied idempotency key.
pub(crate) fn parse_key(key: Option<String>) -> Result<Option<IdempotencyKey>, ApiError> {
    key.map(|k| IdempotencyKey::new(k).map_err(WalletError::from))
        .transpose()
        .map_err(ApiError::from)
}

/// Order as returned to callers.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    /// Order id.
    pub id: OrderId,
    /// Paying wallet.
    pub wallet_id: WalletId,
    /// Order total in minor units.
    pub amount_minor: i64,
    /// Current state.
    pub state: OrderState,
    /// The hold backing the order.
    pub reservation_id: Option<TransactionId>,
    /// Cancellation without cause is allowed until this instant.
    pub cancellation_deadline: DateTime<Utc>,
    /// Whether the owner can still cancel without cause.
    pub cancellable: bool,
    /// Code the recipient hands to the partner; only shown to the owner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_code: Option<String>,
    /// Cancellation and failure details.
    pub metadata: OrderMetadata,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last transition.
    pub updated_at: DateTime<Utc>,
}

impl OrderResponse {
    /// The owner's view, including the delivery code.
    #[must_use]
    pub fn for_owner(order: Order, now: DateTime<Utc>) -> Self {
        let mut response = Self::for_partner(order.clone(), now);
        response.delivery_code = Some(order.delivery_code);
        response
    }

    /// The partner's view, without the delivery code.
    #[must_use]
    pub fn for_partner(order: Order, now: DateTime<Utc>) -> Self {
        Self {
            cancellable: order.cancellable_at(now),
            id: order.id,
            wallet_id: order.wallet_id,
            amount_minor: order.amount_minor,
            state: order.state,
            reservation_id: order.reservation_tx_id,
            cancellation_deadline: order.cancellation_deadline,
            delivery_code: None,
            metadata: order.metadata,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}
