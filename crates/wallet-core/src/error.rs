//! Error types for the wallet ledger.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::credential::WeakSecretReason;
use crate::ids::IdError;
use crate::order::OrderState;
use crate::transaction::HoldResolution;

/// Result type for wallet ledger operations.
pub type Result<T> = std::result::Result<T, WalletError>;

/// Coarse classification of a [`WalletError`], used to pick a response status and to
/// let operators alert on state conflicts separately from ordinary policy rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input, rejected before any state is read.
    Validation,
    /// A limit or balance rule rejected the request after a read-only check.
    Policy,
    /// The request does not fit the current state of a record.
    StateConflict,
    /// Credential lockout or mismatch.
    Security,
    /// Storage or configuration failure; safe to retry with the same idempotency key.
    Infra,
}

/// Errors that can occur in wallet ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------
    /// Amount was zero or negative.
    #[error("invalid amount: {amount_minor} (must be a positive number of minor units)")]
    InvalidAmount {
        /// The rejected amount.
        amount_minor: i64,
    },

    /// The candidate secret is well-formed but too easy to guess.
    #[error("weak secret: {reason}")]
    WeakSecret {
        /// Which rule rejected it.
        reason: WeakSecretReason,
    },

    /// The candidate secret is not exactly four ASCII digits.
    #[error("secret must be exactly four digits")]
    InvalidSecretFormat,

    /// An identifier or idempotency key could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// The idempotency key was already used for a different request.
    #[error("idempotency key {key} was already used with amount {recorded_minor}")]
    IdempotencyConflict {
        /// The reused key.
        key: String,
        /// Amount recorded under that key.
        recorded_minor: i64,
    },

    /// The delivery code presented at confirmation does not match the order.
    #[error("delivery code does not match order {order_id}")]
    DeliveryCodeMismatch {
        /// The order being confirmed.
        order_id: String,
    },

    // ------------------------------------------------------------------
    // Policy
    // ------------------------------------------------------------------
    /// Not enough available (unheld) funds.
    #[error("insufficient funds: available={available_minor}, required={required_minor}")]
    InsufficientFunds {
        /// Balance minus open holds.
        available_minor: i64,
        /// Amount requested.
        required_minor: i64,
    },

    /// The tier's wallet ceiling would be exceeded.
    #[error("wallet limit exceeded: limit={limit_minor}, resulting={resulting_minor}")]
    WalletLimitExceeded {
        /// The tier's wallet ceiling.
        limit_minor: i64,
        /// Balance plus open holds after the request.
        resulting_minor: i64,
    },

    /// The tier's daily top-up ceiling would be exceeded.
    #[error(
        "daily top-up limit exceeded: limit={limit_minor}, used={used_minor}, requested={requested_minor}"
    )]
    DailyLimitExceeded {
        /// The tier's daily top-up ceiling.
        limit_minor: i64,
        /// Already topped up in the current window.
        used_minor: i64,
        /// Amount requested.
        requested_minor: i64,
    },

    /// The tier's withdrawal ceiling would be exceeded.
    #[error("withdraw limit exceeded: limit={limit_minor}, requested={requested_minor}")]
    WithdrawLimitExceeded {
        /// Effective ceiling for this request.
        limit_minor: i64,
        /// Amount requested.
        requested_minor: i64,
    },

    // ------------------------------------------------------------------
    // State conflict
    // ------------------------------------------------------------------
    /// No hold exists with this reservation id.
    #[error("reservation not found: {reservation_id}")]
    ReservationNotFound {
        /// The reservation (hold transaction) id.
        reservation_id: String,
    },

    /// The hold was already captured or released.
    #[error("reservation {reservation_id} already resolved as {resolution:?}")]
    AlreadyResolved {
        /// The reservation (hold transaction) id.
        reservation_id: String,
        /// How it was resolved.
        resolution: HoldResolution,
    },

    /// The order cannot take this transition from its current state.
    #[error("order {order_id} cannot {action} from state {from:?}")]
    InvalidOrderTransition {
        /// The order.
        order_id: String,
        /// Its current state.
        from: OrderState,
        /// The attempted action.
        action: String,
    },

    /// Wallet not found.
    #[error("wallet not found: {wallet_id}")]
    WalletNotFound {
        /// The wallet (or owner) id that was looked up.
        wallet_id: String,
    },

    /// The owner already has a wallet.
    #[error("wallet already exists for owner {owner_id}")]
    WalletAlreadyExists {
        /// The owner.
        owner_id: String,
    },

    /// The wallet has been deactivated.
    #[error("wallet {wallet_id} is deactivated")]
    WalletInactive {
        /// The wallet.
        wallet_id: String,
    },

    /// The wallet still has open holds.
    #[error("wallet {wallet_id} has {held_minor} held in open reservations")]
    OpenHoldsOutstanding {
        /// The wallet.
        wallet_id: String,
        /// Sum of open holds.
        held_minor: i64,
    },

    /// Order not found.
    #[error("order not found: {order_id}")]
    OrderNotFound {
        /// The order id.
        order_id: String,
    },

    /// No secret has been set for this owner.
    #[error("no credential set for owner {owner_id}")]
    CredentialNotFound {
        /// The owner.
        owner_id: String,
    },

    /// A secret is already set; use change instead.
    #[error("credential already set for owner {owner_id}")]
    SecretAlreadySet {
        /// The owner.
        owner_id: String,
    },

    // ------------------------------------------------------------------
    // Security
    // ------------------------------------------------------------------
    /// Too many failed attempts; verification is refused until `locked_until`.
    #[error("credential locked until {locked_until}")]
    Locked {
        /// When verification becomes possible again.
        locked_until: DateTime<Utc>,
    },

    /// The secret did not match.
    #[error("incorrect secret ({attempts_remaining} attempts remaining)")]
    IncorrectSecret {
        /// Failures left before lockout.
        attempts_remaining: u32,
    },

    // ------------------------------------------------------------------
    // Infra
    // ------------------------------------------------------------------
    /// The persistence store failed; nothing from this request was written.
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl WalletError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount { .. }
            | Self::WeakSecret { .. }
            | Self::InvalidSecretFormat
            | Self::InvalidId(_)
            | Self::IdempotencyConflict { .. }
            | Self::DeliveryCodeMismatch { .. } => ErrorKind::Validation,
            Self::InsufficientFunds { .. }
            | Self::WalletLimitExceeded { .. }
            | Self::DailyLimitExceeded { .. }
            | Self::WithdrawLimitExceeded { .. } => ErrorKind::Policy,
            Self::ReservationNotFound { .. }
            | Self::AlreadyResolved { .. }
            | Self::InvalidOrderTransition { .. }
            | Self::WalletNotFound { .. }
            | Self::WalletAlreadyExists { .. }
            | Self::WalletInactive { .. }
            | Self::OpenHoldsOutstanding { .. }
            | Self::OrderNotFound { .. }
            | Self::CredentialNotFound { .. }
            | Self::SecretAlreadySet { .. } => ErrorKind::StateConflict,
            Self::Locked { .. } | Self::IncorrectSecret { .. } => ErrorKind::Security,
            Self::Storage(_) | Self::Configuration(_) => ErrorKind::Infra,
        }
    }

    /// Stable snake_case code for API responses and log fields.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::WeakSecret { .. } => "weak_secret",
            Self::InvalidSecretFormat => "invalid_secret_format",
            Self::InvalidId(_) => "invalid_id",
            Self::IdempotencyConflict { .. } => "idempotency_conflict",
            Self::DeliveryCodeMismatch { .. } => "delivery_code_mismatch",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::WalletLimitExceeded { .. } => "wallet_limit_exceeded",
            Self::DailyLimitExceeded { .. } => "daily_limit_exceeded",
            Self::WithdrawLimitExceeded { .. } => "withdraw_limit_exceeded",
            Self::ReservationNotFound { .. } => "reservation_not_found",
            Self::AlreadyResolved { .. } => "already_resolved",
            Self::InvalidOrderTransition { .. } => "invalid_order_transition",
            Self::WalletNotFound { .. } => "wallet_not_found",
            Self::WalletAlreadyExists { .. } => "wallet_already_exists",
            Self::WalletInactive { .. } => "wallet_inactive",
            Self::OpenHoldsOutstanding { .. } => "open_holds_outstanding",
            Self::OrderNotFound { .. } => "order_not_found",
            Self::CredentialNotFound { .. } => "credential_not_found",
            Self::SecretAlreadySet { .. } => "secret_already_set",
            Self::Locked { .. } => "locked",
            Self::IncorrectSecret { .. } => "incorrect_secret",
            Self::Storage(_) => "storage_unavailable",
            Self::Configuration(_) => "configuration_error",
        }
    }
}
