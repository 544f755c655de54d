//! Router configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{credentials, delivery, health, orders, topups, wallets, webhooks};
use crate::state::AppState;

/// Maximum concurrent requests from delivery partners and operators.
const DELIVERY_MAX_CONCURRENT_REQUESTS: usize = 100;

/// Maximum concurrent requests for owner-facing endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health`
/// - `GET /v1/topups/quote?amount_minor=&method=`
///
/// ## Owner (bearer token)
/// - `POST /v1/wallet`, `GET /v1/wallet`
/// - `POST /v1/wallet/tier`, `POST /v1/wallet/deactivate`
/// - `GET /v1/wallet/transactions`, `GET /v1/wallet/rewards`
/// - `POST /v1/wallet/withdraw`
/// - `POST /v1/mpin`, `POST /v1/mpin/verify`, `POST /v1/mpin/change`
/// - `POST /v1/orders`, `GET /v1/orders`, `GET /v1/orders/:id`
/// - `POST /v1/orders/:id/cancel`
///
/// ## Delivery (service API key)
/// - `POST /v1/delivery/orders/:id/{assign,confirm,fail,cancel}`
///
/// ## Webhooks (service API key, optional body signature)
/// - `POST /webhooks/payments`
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let state = Arc::new(state);

    let delivery_routes = Router::new()
        .route("/orders/:id/assign", post(delivery::assign))
        .route("/orders/:id/confirm", post(delivery::confirm))
        .route("/orders/:id/fail", post(delivery::fail))
        .route("/orders/:id/cancel", post(delivery::cancel))
        .layer(ConcurrencyLimitLayer::new(DELIVERY_MAX_CONCURRENT_REQUESTS));

    let api_routes = Router::new()
        // Wallet
        .route(
            "/wallet",
            post(wallets::open_wallet).get(wallets::get_wallet),
        )
        .route("/wallet/tier", post(wallets::change_tier))
        .route("/wallet/deactivate", post(wallets::deactivate))
        .route("/wallet/transactions", get(wallets::list_transactions))
        .route("/wallet/rewards", get(wallets::get_rewards))
        .route("/wallet/withdraw", post(wallets::withdraw))
        // MPIN
        .route("/mpin", post(credentials::create))
        .route("/mpin/verify", post(credentials::verify))
        .route("/mpin/change", post(credentials::change))
        // Orders
        .route(
            "/orders",
            post(orders::place_order).get(orders::list_orders),
        )
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/cancel", post(orders::cancel_order))
        .route("/topups/quote", get(topups::quote))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS))
        .nest("/delivery", delivery_routes);

    Router::new()
        .route("/health", get(health::health))
        .nest("/v1", api_routes)
        // Retried by the gateway; not concurrency limited
        .route("/webhooks/payments", post(webhooks::payment_webhook))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(origins)
    }
}
