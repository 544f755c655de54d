//! Application state.

use wallet_engine::Engine;

use crate::config::ServiceConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Ledger, credential gate and order lifecycle.
    pub engine: Engine,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(engine: Engine, config: ServiceConfig) -> Self {
        if config.service_api_key.is_none() {
            tracing::warn!("SERVICE_API_KEY not set - payment and delivery callbacks are disabled");
        }
        if config.allow_test_tokens {
            tracing::warn!("Test bearer tokens are accepted - do not run this way in production");
        }
        Self { engine, config }
    }
}
