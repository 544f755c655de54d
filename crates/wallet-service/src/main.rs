//! Wallet service entry point.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wallet_engine::{Engine, SystemClock};
use wallet_service::{create_router, sweeper, AppState, ServiceConfig};
use wallet_store::Store;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wallet=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting wallet service");

    let config = ServiceConfig::from_env();
    let engine_config = config.engine_config()?;

    tracing::info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir,
        jwt_configured = %config.auth_jwt_secret.is_some(),
        webhook_signatures = %config.payment_webhook_secret.is_some(),
        tiers_file = ?config.tiers_file,
        "Service configuration loaded"
    );

    let store = open_store(&config)?;
    let engine = Engine::new(store, Arc::new(SystemClock), engine_config);

    if config.sweep_interval_seconds > 0 {
        sweeper::spawn(
            engine.clone(),
            Duration::from_secs(config.sweep_interval_seconds),
        );
        tracing::info!(
            interval_seconds = config.sweep_interval_seconds,
            "Held order sweeper started"
        );
    }

    let state = AppState::new(engine, config.clone());
    let app = create_router(state);

    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(feature = "rocksdb-backend")]
fn open_store(config: &ServiceConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    tracing::info!(path = %config.data_dir, "Opening RocksDB store");
    Ok(Arc::new(wallet_store::RocksStore::open(&config.data_dir)?))
}

#[cfg(not(feature = "rocksdb-backend"))]
fn open_store(_config: &ServiceConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    tracing::warn!("Built without rocksdb-backend - balances live in memory only");
    Ok(Arc::new(wallet_store::MemoryStore::new()))
}
