//! Wallet handlers: opening, balance, tier, history, rewards and withdrawals.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use wallet_core::{Amount, RewardsSummary, Tier, Transaction, Wallet};
use wallet_engine::{BalanceSnapshot, LedgerReceipt, WithdrawRequest};

use super::{parse_key, PageQuery};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// The caller's wallet.
pub(crate) fn owner_wallet(state: &AppState, auth: &AuthUser) -> Result<Wallet, ApiError> {
    Ok(state.engine.ledger().wallet_for_owner(&auth.owner_id)?)
}

/// Open wallet request.
#[derive(Debug, Deserialize)]
pub struct OpenWalletRequest {
    /// Starting tier (default: starter).
    #[serde(default = "default_tier")]
    pub tier: Tier,
}

fn default_tier() -> Tier {
    Tier::Starter
}

/// Open a wallet for the caller.
pub async fn open_wallet(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(request): Json<OpenWalletRequest>,
) -> Result<(StatusCode, Json<Wallet>), ApiError> {
    let wallet = state
        .engine
        .ledger()
        .open_wallet(auth.owner_id, request.tier)
        .await?;
    Ok((StatusCode::CREATED, Json(wallet)))
}

/// Balance, holds, limits and top-up headroom.
pub async fn get_wallet(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<BalanceSnapshot>, ApiError> {
    let wallet = owner_wallet(&state, &auth)?;
    Ok(Json(state.engine.ledger().balance(&wallet.id)?))
}

/// Change tier request.
#[derive(Debug, Deserialize)]
pub struct ChangeTierRequest {
    /// The new tier.
    pub tier: Tier,
}

/// Move the caller's wallet to another tier.
pub async fn change_tier(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(request): Json<ChangeTierRequest>,
) -> Result<Json<Wallet>, ApiError> {
    let wallet = owner_wallet(&state, &auth)?;
    let wallet = state
        .engine
        .ledger()
        .change_tier(&wallet.id, request.tier)
        .await?;
    Ok(Json(wallet))
}

/// Deactivate the caller's wallet.
pub async fn deactivate(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Wallet>, ApiError> {
    let wallet = owner_wallet(&state, &auth)?;
    Ok(Json(state.engine.ledger().deactivate(&wallet.id).await?))
}

/// List transactions response.
#[derive(Debug, Serialize)]
pub struct ListTransactionsResponse {
    /// Transactions (newest first).
    pub transactions: Vec<Transaction>,
    /// Whether there are more transactions.
    pub has_more: bool,
}

/// List the caller's transaction history.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<ListTransactionsResponse>, ApiError> {
    let wallet = owner_wallet(&state, &auth)?;

    // Fetch one more than requested to determine has_more
    let limit = query.limit();
    let mut transactions = state
        .engine
        .ledger()
        .transactions(&wallet.id, limit + 1, query.offset)?;
    let has_more = transactions.len() > limit;
    transactions.truncate(limit);

    Ok(Json(ListTransactionsResponse {
        transactions,
        has_more,
    }))
}

/// Reward points earned by the caller.
pub async fn get_rewards(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<RewardsSummary>, ApiError> {
    let wallet = owner_wallet(&state, &auth)?;
    Ok(Json(state.engine.ledger().rewards(&wallet.id)?))
}

/// Withdrawal request.
#[derive(Deserialize)]
pub struct WithdrawBody {
    /// Amount in minor units.
    pub amount_minor: i64,
    /// The caller's MPIN.
    pub mpin: String,
    /// Retry key.
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// Withdraw from the caller's wallet, authorized by MPIN.
pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<WithdrawBody>,
) -> Result<Json<LedgerReceipt>, ApiError> {
    let wallet = owner_wallet(&state, &auth)?;
    let request = WithdrawRequest {
        wallet_id: wallet.id,
        amount: Amount::new(body.amount_minor)?,
        idempotency_key: parse_key(body.idempotency_key)?,
        mpin: body.mpin,
    };
    Ok(Json(state.engine.withdraw(request).await?))
}
