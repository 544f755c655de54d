//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use wallet_core::{ErrorKind, WalletError};

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A ledger, order or credential error.
    #[error(transparent)]
    Wallet(#[from] WalletError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

/// Status for a domain error.
fn wallet_status(err: &WalletError) -> StatusCode {
    match err {
        WalletError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
        WalletError::WalletNotFound { .. }
        | WalletError::OrderNotFound { .. }
        | WalletError::ReservationNotFound { .. }
        | WalletError::CredentialNotFound { .. } => StatusCode::NOT_FOUND,
        WalletError::Locked { .. } => StatusCode::LOCKED,
        WalletError::IncorrectSecret { .. } => StatusCode::UNAUTHORIZED,
        _ => match err.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Policy => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::StateConflict => StatusCode::CONFLICT,
            ErrorKind::Security => StatusCode::UNAUTHORIZED,
            ErrorKind::Infra => StatusCode::SERVICE_UNAVAILABLE,
        },
    }
}

/// Structured fields worth returning alongside the message.
fn wallet_details(err: &WalletError) -> Option<serde_json::Value> {
    let details = match err {
        WalletError::InsufficientFunds {
            available_minor,
            required_minor,
        } => serde_json::json!({
            "available_minor": available_minor,
            "required_minor": required_minor,
        }),
        WalletError::WalletLimitExceeded {
            limit_minor,
            resulting_minor,
        } => serde_json::json!({
            "limit_minor": limit_minor,
            "resulting_minor": resulting_minor,
        }),
        WalletError::DailyLimitExceeded {
            limit_minor,
            used_minor,
            requested_minor,
        } => serde_json::json!({
            "limit_minor": limit_minor,
            "used_minor": used_minor,
            "requested_minor": requested_minor,
        }),
        WalletError::WithdrawLimitExceeded {
            limit_minor,
            requested_minor,
        } => serde_json::json!({
            "limit_minor": limit_minor,
            "requested_minor": requested_minor,
        }),
        WalletError::WeakSecret { reason } => serde_json::json!({ "reason": reason }),
        WalletError::Locked { locked_until } => {
            serde_json::json!({ "locked_until": locked_until.to_rfc3339() })
        }
        WalletError::IncorrectSecret { attempts_remaining } => {
            serde_json::json!({ "attempts_remaining": attempts_remaining })
        }
        WalletError::InvalidOrderTransition { from, action, .. } => {
            serde_json::json!({ "state": from, "action": action })
        }
        _ => return None,
    };
    Some(details)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Wallet(err) if err.kind() == ErrorKind::Infra => {
                tracing::error!(error = %err, "Wallet operation failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    err.code(),
                    "The service is temporarily unavailable; retry with the same idempotency key"
                        .to_string(),
                    None,
                )
            }
            Self::Wallet(err) => {
                if err.kind() == ErrorKind::StateConflict {
                    tracing::warn!(code = err.code(), error = %err, "State conflict");
                }
                (wallet_status(err), err.code(), err.to_string(), wallet_details(err))
            }
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wallet_core::HoldResolution;

    #[test]
    fn statuses_follow_error_kind() {
        let cases = [
            (
                WalletError::InvalidAmount { amount_minor: 0 },
                StatusCode::BAD_REQUEST,
            ),
            (
                WalletError::InsufficientFunds {
                    available_minor: 0,
                    required_minor: 1,
                },
                StatusCode::PAYMENT_REQUIRED,
            ),
            (
                WalletError::DailyLimitExceeded {
                    limit_minor: 1,
                    used_minor: 1,
                    requested_minor: 1,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                WalletError::AlreadyResolved {
                    reservation_id: "r".into(),
                    resolution: HoldResolution::Released,
                },
                StatusCode::CONFLICT,
            ),
            (
                WalletError::OrderNotFound {
                    order_id: "o".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                WalletError::Locked {
                    locked_until: chrono::Utc::now(),
                },
                StatusCode::LOCKED,
            ),
            (
                WalletError::IncorrectSecret {
                    attempts_remaining: 2,
                },
                StatusCode::UNAUTHORIZED,
            ),
            (
                WalletError::Storage("down".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(wallet_status(&err), status, "{err:?}");
        }
    }

    #[test]
    fn infra_detail_is_not_returned() {
        let response = ApiError::from(WalletError::Storage("rocksdb: disk full".into())).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
