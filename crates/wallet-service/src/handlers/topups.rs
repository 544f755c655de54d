//! Top-up pricing.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use wallet_core::{Amount, PaymentMethod, TopupQuote};

use crate::error::ApiError;
use crate::state::AppState;

/// Quote query parameters.
#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    /// Amount to add to the wallet, in minor units.
    pub amount_minor: i64,
    /// How the payer will pay.
    pub method: PaymentMethod,
}

/// Price a top-up: amount, processing fee and total charge.
pub async fn quote(
    State(state): State<Arc<AppState>>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<TopupQuote>, ApiError> {
    let amount = Amount::new(query.amount_minor)?;
    Ok(Json(state.engine.ledger().quote_topup(amount, query.method)))
}
