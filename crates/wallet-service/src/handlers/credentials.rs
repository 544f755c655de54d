//! MPIN handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Set or verify request.
#[derive(Deserialize)]
pub struct MpinRequest {
    /// The four-digit MPIN.
    pub mpin: String,
}

/// Change request.
#[derive(Deserialize)]
pub struct ChangeMpinRequest {
    /// The current MPIN.
    pub old_mpin: String,
    /// The replacement.
    pub new_mpin: String,
}

/// Credential operation response.
#[derive(Debug, Serialize)]
pub struct CredentialResponse {
    /// Whether the operation succeeded.
    pub ok: bool,
}

/// Set the caller's first MPIN.
pub async fn create(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(request): Json<MpinRequest>,
) -> Result<(StatusCode, Json<CredentialResponse>), ApiError> {
    state
        .engine
        .credentials()
        .create_secret(auth.owner_id, &request.mpin)
        .await?;
    Ok((StatusCode::CREATED, Json(CredentialResponse { ok: true })))
}

/// Check the caller's MPIN.
pub async fn verify(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(request): Json<MpinRequest>,
) -> Result<Json<CredentialResponse>, ApiError> {
    state
        .engine
        .credentials()
        .verify_secret(auth.owner_id, &request.mpin)
        .await?;
    Ok(Json(CredentialResponse { ok: true }))
}

/// Replace the caller's MPIN.
pub async fn change(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(request): Json<ChangeMpinRequest>,
) -> Result<Json<CredentialResponse>, ApiError> {
    state
        .engine
        .credentials()
        .change_secret(auth.owner_id, &request.old_mpin, &request.new_mpin)
        .await?;
    Ok(Json(CredentialResponse { ok: true }))
}
