//! Payment gateway webhook.
//!
//! The gateway reports each top-up once it settles. The event id doubles as the
//! idempotency key, so redelivered events are answered from the first result.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use wallet_core::{
    Amount, IdempotencyKey, PaymentMethod, TransactionId, TransactionStatus, WalletError,
    WalletId,
};
use wallet_engine::crypto::{constant_time_eq, hmac_sha256_hex};
use wallet_engine::CreditRequest;

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the hex HMAC-SHA256 of the raw body.
pub const SIGNATURE_HEADER: &str = "x-payment-signature";

/// Settlement outcome reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Funds were collected.
    Succeeded,
    /// The payment did not go through.
    Failed,
}

/// Payment webhook payload.
#[derive(Debug, Deserialize)]
pub struct PaymentEvent {
    /// Gateway event id.
    pub event_id: String,
    /// Wallet being topped up.
    pub wallet_id: WalletId,
    /// Outcome.
    pub status: PaymentStatus,
    /// Top-up amount in minor units, excluding fees.
    pub amount_minor: i64,
    /// How the payer paid.
    #[serde(default)]
    pub method: Option<PaymentMethod>,
    /// Gateway's reason for a failure.
    #[serde(default)]
    pub failure_reason: Option<String>,
}

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct PaymentEventResponse {
    /// Ledger entry for the event.
    pub transaction_id: TransactionId,
    /// Status of that entry.
    pub status: TransactionStatus,
    /// Whether the event had been processed before.
    pub replayed: bool,
    /// Wallet balance after processing.
    pub balance_minor: i64,
}

fn verify_signature(state: &AppState, headers: &HeaderMap, body: &str) -> Result<(), ApiError> {
    let Some(secret) = &state.config.payment_webhook_secret else {
        return Ok(());
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("Missing payment signature".into()))?;

    let expected = hmac_sha256_hex(secret, body)?;
    if !constant_time_eq(signature, &expected) {
        tracing::warn!("Invalid payment webhook signature");
        return Err(ApiError::BadRequest("Invalid webhook signature".into()));
    }
    Ok(())
}

/// Apply a settled top-up.
pub async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    service: ServiceAuth,
    headers: HeaderMap,
    body: String,
) -> Result<Json<PaymentEventResponse>, ApiError> {
    verify_signature(&state, &headers, &body)?;

    let event: PaymentEvent =
        serde_json::from_str(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let amount = Amount::new(event.amount_minor)?;
    let key = IdempotencyKey::new(event.event_id.clone()).map_err(WalletError::from)?;

    tracing::info!(
        service = %service.service_name,
        event_id = %event.event_id,
        wallet_id = %event.wallet_id,
        status = ?event.status,
        amount_minor = event.amount_minor,
        "Payment event received"
    );

    let ledger = state.engine.ledger();
    let receipt = match event.status {
        PaymentStatus::Succeeded => {
            let mut request = CreditRequest::new(event.wallet_id, amount).idempotency_key(key);
            if let Some(method) = event.method {
                request = request.payment_method(method);
            }
            ledger.credit(request).await?
        }
        PaymentStatus::Failed => {
            let reason = event
                .failure_reason
                .as_deref()
                .unwrap_or("payment failed");
            ledger
                .record_failed_credit(&event.wallet_id, amount, key, reason)
                .await?
        }
    };

    Ok(Json(PaymentEventResponse {
        transaction_id: receipt.transaction.id,
        status: receipt.transaction.status,
        replayed: receipt.replayed,
        balance_minor: receipt.balance_minor,
    }))
}
