//! Delivery partner and operator callbacks.
//!
//! Signals are one-shot per order. A repeated confirmation or failure for a finished
//! order is answered with 409 and changes nothing.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use wallet_core::{CancelReason, CancelledBy, OrderId};

use super::OrderResponse;
use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

fn parse_order_id(order_id: &str) -> Result<OrderId, ApiError> {
    order_id
        .parse()
        .map_err(|_| ApiError::NotFound(format!("order not found: {order_id}")))
}

/// Assign request.
#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    /// Partner reference.
    pub partner_id: String,
}

/// A partner accepted the order.
pub async fn assign(
    State(state): State<Arc<AppState>>,
    service: ServiceAuth,
    Path(order_id): Path<String>,
    Json(request): Json<AssignRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&order_id)?;
    tracing::debug!(service = %service.service_name, order_id = %order_id, "Assign signal");
    let order = state
        .engine
        .orders()
        .assign(&order_id, request.partner_id)
        .await?;
    Ok(Json(OrderResponse::for_partner(order, state.engine.now())))
}

/// Confirm request.
#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    /// Code presented by the recipient.
    pub delivery_code: String,
}

/// The partner handed the order over.
pub async fn confirm(
    State(state): State<Arc<AppState>>,
    service: ServiceAuth,
    Path(order_id): Path<String>,
    Json(request): Json<ConfirmRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&order_id)?;
    tracing::debug!(service = %service.service_name, order_id = %order_id, "Confirm signal");
    let order = state
        .engine
        .orders()
        .confirm_delivery(&order_id, request.delivery_code)
        .await?;
    Ok(Json(OrderResponse::for_partner(order, state.engine.now())))
}

/// Fail request.
#[derive(Debug, Deserialize)]
pub struct FailRequest {
    /// Why delivery failed.
    pub reason: String,
}

/// The partner could not deliver.
pub async fn fail(
    State(state): State<Arc<AppState>>,
    service: ServiceAuth,
    Path(order_id): Path<String>,
    Json(request): Json<FailRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&order_id)?;
    tracing::debug!(service = %service.service_name, order_id = %order_id, "Fail signal");
    let order = state
        .engine
        .orders()
        .fail(&order_id, request.reason)
        .await?;
    Ok(Json(OrderResponse::for_partner(order, state.engine.now())))
}

/// Operator cancellation request.
#[derive(Debug, Deserialize)]
pub struct OperatorCancelRequest {
    /// Why the order is being cancelled.
    pub reason: CancelReason,
}

/// An operator cancels an order for cause.
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    service: ServiceAuth,
    Path(order_id): Path<String>,
    Json(request): Json<OperatorCancelRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&order_id)?;
    tracing::info!(service = %service.service_name, order_id = %order_id, "Operator cancellation");
    let order = state
        .engine
        .orders()
        .cancel(&order_id, request.reason, CancelledBy::Operator)
        .await?;
    Ok(Json(OrderResponse::for_partner(order, state.engine.now())))
}
