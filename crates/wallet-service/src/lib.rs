//! Wallet HTTP API service.
//!
//! Exposes the wallet engine over HTTP:
//!
//! - Wallet balance, tier, history, rewards and MPIN-authorized withdrawals
//! - MPIN management
//! - Order placement and cancellation
//! - Delivery partner callbacks and the payment gateway webhook
//!
//! # Authentication
//!
//! 1. **Bearer tokens** (HS256, subject = owner id) for wallet owners
//! 2. **Service API keys** for the payment gateway, delivery partners and operators

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Axum handlers must be async

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod sweeper;

pub use config::{ConfigError, ServiceConfig};
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
