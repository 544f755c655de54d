//! Authentication extractors.
//!
//! - `AuthUser`: wallet owner, from an HS256 bearer token whose subject is the owner id.
//! - `ServiceAuth`: payment gateway, delivery partner or operator, via `x-api-key`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use wallet_core::OwnerId;

use crate::error::ApiError;
use crate::state::AppState;

/// An authenticated wallet owner.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The owner id.
    pub owner_id: OwnerId,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized)?;

        if state.config.allow_test_tokens {
            if let Some(owner) = token.strip_prefix("test-token:") {
                let owner_id = owner
                    .parse::<OwnerId>()
                    .map_err(|_| ApiError::Unauthorized)?;
                return Ok(Self { owner_id });
            }
        }

        let claims = validate_jwt(token, state)?;
        let owner_id = claims
            .sub
            .parse::<OwnerId>()
            .map_err(|_| ApiError::Unauthorized)?;
        Ok(Self { owner_id })
    }
}

/// Service authentication via API key.
#[derive(Debug, Clone)]
pub struct ServiceAuth {
    /// The calling service, from `x-service-name`.
    pub service_name: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for ServiceAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let api_key = parts
            .headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let expected_key = state
            .config
            .service_api_key
            .as_ref()
            .ok_or(ApiError::Unauthorized)?;

        if !wallet_engine::crypto::constant_time_eq(api_key, expected_key) {
            return Err(ApiError::Unauthorized);
        }

        let service_name = parts
            .headers
            .get("x-service-name")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        Ok(Self { service_name })
    }
}

/// Claims carried by user bearer tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (owner id).
    pub sub: String,
    /// Expiration time.
    pub exp: i64,
}

fn validate_jwt(token: &str, state: &AppState) -> Result<JwtClaims, ApiError> {
    let secret = state
        .config
        .auth_jwt_secret
        .as_ref()
        .ok_or(ApiError::Unauthorized)?;

    let validation = Validation::new(Algorithm::HS256);
    let token_data = decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "JWT validation failed");
        ApiError::Unauthorized
    })?;

    Ok(token_data.claims)
}
