//! Order handlers for wallet owners.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use wallet_core::{Amount, CancelReason, CancelledBy, Order, OrderId, WalletError};
use wallet_engine::PlaceOrder;

use super::wallets::owner_wallet;
use super::{parse_key, OrderResponse, PageQuery};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Place order request.
#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    /// Order total in minor units.
    pub amount_minor: i64,
    /// Retry key.
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// Place an order and hold its funds.
pub async fn place_order(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let amount = Amount::new(request.amount_minor)?;
    let key = parse_key(request.idempotency_key)?;
    let wallet = owner_wallet(&state, &auth)?;

    let mut place = PlaceOrder::new(wallet.id, amount);
    if let Some(key) = key {
        place = place.idempotency_key(key);
    }
    let order = state.engine.orders().place_order(place).await?;
    Ok((
        StatusCode::CREATED,
        Json(OrderResponse::for_owner(order, state.engine.now())),
    ))
}

/// List orders response.
#[derive(Debug, Serialize)]
pub struct ListOrdersResponse {
    /// Orders (newest first).
    pub orders: Vec<OrderResponse>,
    /// Whether there are more orders.
    pub has_more: bool,
}

/// List the caller's orders.
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<ListOrdersResponse>, ApiError> {
    let wallet = owner_wallet(&state, &auth)?;
    let limit = query.limit();
    let orders = state
        .engine
        .orders()
        .orders_for_wallet(&wallet.id, limit + 1, query.offset)?;
    let has_more = orders.len() > limit;
    let now = state.engine.now();

    Ok(Json(ListOrdersResponse {
        orders: orders
            .into_iter()
            .take(limit)
            .map(|order| OrderResponse::for_owner(order, now))
            .collect(),
        has_more,
    }))
}

/// Load an order the caller owns; someone else's order is reported as missing.
fn owned_order(state: &AppState, auth: &AuthUser, order_id: &str) -> Result<Order, ApiError> {
    let order_id = order_id
        .parse::<OrderId>()
        .map_err(|_| ApiError::NotFound(format!("order not found: {order_id}")))?;
    let wallet = owner_wallet(state, auth)?;
    let order = state.engine.orders().order(&order_id)?;
    if order.wallet_id != wallet.id {
        return Err(WalletError::OrderNotFound {
            order_id: order_id.to_string(),
        }
        .into());
    }
    Ok(order)
}

/// Get one of the caller's orders.
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(order_id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = owned_order(&state, &auth, &order_id)?;
    Ok(Json(OrderResponse::for_owner(order, state.engine.now())))
}

/// Cancel request.
#[derive(Debug, Deserialize)]
pub struct CancelOrderRequest {
    /// Why the order is being cancelled.
    pub reason: CancelReason,
}

/// Cancel one of the caller's orders.
pub async fn cancel_order(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(order_id): Path<String>,
    Json(request): Json<CancelOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = owned_order(&state, &auth, &order_id)?;
    let order = state
        .engine
        .orders()
        .cancel(&order.id, request.reason, CancelledBy::User)
        .await?;
    Ok(Json(OrderResponse::for_owner(order, state.engine.now())))
}
