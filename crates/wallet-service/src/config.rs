//! Service configuration.

use std::path::Path;

use chrono::Duration;
use wallet_core::{TierDefinition, TierPolicy};
use wallet_engine::config::{
    DEFAULT_CANCELLATION_GRACE_SECONDS, DEFAULT_HELD_ORDER_SLA_MINUTES, DEFAULT_LOCKOUT_MINUTES,
};
use wallet_engine::EngineConfig;

/// Errors raised while turning the environment into a running configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The tier table file could not be read or parsed.
    #[error("cannot load tier table from {path}: {message}")]
    TiersFile {
        /// The configured path.
        path: String,
        /// What went wrong.
        message: String,
    },

    /// The tier table parsed but is not usable.
    #[error("invalid tier table: {0}")]
    InvalidTiers(String),

    /// A duration setting must be positive.
    #[error("{name} must be positive, got {value}")]
    NonPositiveDuration {
        /// The environment variable.
        name: &'static str,
        /// The configured value.
        value: i64,
    },
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/wallet").
    pub data_dir: String,

    /// API key for payment gateway, delivery partner and operator callbacks.
    pub service_api_key: Option<String>,

    /// HS256 secret for user bearer tokens.
    pub auth_jwt_secret: Option<String>,

    /// Accept `test-token:<owner-uuid>` bearer tokens. Never enable in production.
    pub allow_test_tokens: bool,

    /// Shared secret for payment webhook signatures (optional).
    pub payment_webhook_secret: Option<String>,

    /// Key for MPIN hashing.
    pub secret_pepper: String,

    /// Grace period during which a held order can be cancelled.
    pub cancellation_grace_seconds: i64,

    /// Credential lockout length.
    pub lockout_minutes: i64,

    /// Age after which an unassigned held order is failed.
    pub hold_sla_minutes: i64,

    /// Sweeper period; 0 disables it.
    pub sweep_interval_seconds: u64,

    /// Optional JSON tier table replacing the built-in one.
    pub tiers_file: Option<String>,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            data_dir: std::env::var("DATA_DIR").unwrap_or(defaults.data_dir),
            service_api_key: std::env::var("SERVICE_API_KEY").ok(),
            auth_jwt_secret: std::env::var("AUTH_JWT_SECRET").ok(),
            allow_test_tokens: env_parse("ALLOW_TEST_TOKENS").unwrap_or(false),
            payment_webhook_secret: std::env::var("PAYMENT_WEBHOOK_SECRET").ok(),
            secret_pepper: std::env::var("SECRET_PEPPER").unwrap_or(defaults.secret_pepper),
            cancellation_grace_seconds: env_parse("CANCELLATION_GRACE_SECONDS")
                .unwrap_or(defaults.cancellation_grace_seconds),
            lockout_minutes: env_parse("LOCKOUT_MINUTES").unwrap_or(defaults.lockout_minutes),
            hold_sla_minutes: env_parse("HOLD_SLA_MINUTES").unwrap_or(defaults.hold_sla_minutes),
            sweep_interval_seconds: env_parse("SWEEP_INTERVAL_SECONDS")
                .unwrap_or(defaults.sweep_interval_seconds),
            tiers_file: std::env::var("TIERS_FILE").ok(),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_parse("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: env_parse("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or(defaults.request_timeout_seconds),
        }
    }

    /// Build the engine configuration, loading the tier table file if one is set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a duration is not positive, or if the tier table cannot be
    /// read, parsed, or is incomplete.
    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        require_positive("CANCELLATION_GRACE_SECONDS", self.cancellation_grace_seconds)?;
        require_positive("LOCKOUT_MINUTES", self.lockout_minutes)?;
        require_positive("HOLD_SLA_MINUTES", self.hold_sla_minutes)?;

        let mut config = EngineConfig::default()
            .with_secret_pepper(self.secret_pepper.clone())
            .with_cancellation_grace(Duration::seconds(self.cancellation_grace_seconds))
            .with_lockout_duration(Duration::minutes(self.lockout_minutes))
            .with_held_order_sla(Duration::minutes(self.hold_sla_minutes));

        if let Some(path) = &self.tiers_file {
            let definitions = load_tiers_file(path)?;
            let tiers = TierPolicy::from_definitions(definitions)
                .map_err(|e| ConfigError::InvalidTiers(e.to_string()))?;
            tracing::info!(path = %path, "Loaded tier table from file");
            config = config.with_tiers(tiers);
        }
        Ok(config)
    }
}

fn require_positive(name: &'static str, value: i64) -> Result<(), ConfigError> {
    if value <= 0 {
        return Err(ConfigError::NonPositiveDuration { name, value });
    }
    Ok(())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

/// Load a tier table from a JSON file.
fn load_tiers_file(path: &str) -> Result<Vec<TierDefinition>, ConfigError> {
    let to_error = |message: String| ConfigError::TiersFile {
        path: path.to_string(),
        message,
    };
    let contents = std::fs::read_to_string(Path::new(path)).map_err(|e| to_error(e.to_string()))?;
    serde_json::from_str(&contents).map_err(|e| to_error(e.to_string()))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/wallet".into(),
            service_api_key: None,
            auth_jwt_secret: None,
            allow_test_tokens: false,
            payment_webhook_secret: None,
            secret_pepper: "development-pepper".into(),
            cancellation_grace_seconds: DEFAULT_CANCELLATION_GRACE_SECONDS,
            lockout_minutes: DEFAULT_LOCKOUT_MINUTES,
            hold_sla_minutes: DEFAULT_HELD_ORDER_SLA_MINUTES,
            sweep_interval_seconds: 60,
            tiers_file: None,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use wallet_core::Tier;

    #[test]
    fn engine_config_uses_overrides() {
        let config = ServiceConfig {
            cancellation_grace_seconds: 45,
            lockout_minutes: 5,
            ..ServiceConfig::default()
        };
        let engine = config.engine_config().unwrap();
        assert_eq!(engine.cancellation_grace, Duration::seconds(45));
        assert_eq!(engine.lockout_duration, Duration::minutes(5));
    }

    #[test]
    fn non_positive_durations_are_rejected() {
        let config = ServiceConfig {
            cancellation_grace_seconds: -30,
            ..ServiceConfig::default()
        };
        assert!(matches!(
            config.engine_config(),
            Err(ConfigError::NonPositiveDuration {
                name: "CANCELLATION_GRACE_SECONDS",
                value: -30,
            })
        ));

        let config = ServiceConfig {
            lockout_minutes: 0,
            ..ServiceConfig::default()
        };
        assert!(matches!(
            config.engine_config(),
            Err(ConfigError::NonPositiveDuration {
                name: "LOCKOUT_MINUTES",
                ..
            })
        ));

        let config = ServiceConfig {
            hold_sla_minutes: -1,
            ..ServiceConfig::default()
        };
        assert!(config.engine_config().is_err());
    }

    #[test]
    fn tiers_file_replaces_table() {
        let mut definitions = TierPolicy::default().definitions().to_vec();
        definitions[0].wallet_limit_minor = 123;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&definitions).unwrap().as_bytes())
            .unwrap();

        let config = ServiceConfig {
            tiers_file: Some(file.path().to_string_lossy().to_string()),
            ..ServiceConfig::default()
        };
        let engine = config.engine_config().unwrap();
        assert_eq!(engine.tiers.limits_for(Tier::Starter).wallet_limit_minor, 123);
    }

    #[test]
    fn incomplete_tiers_file_rejected() {
        let policy = TierPolicy::default();
        let definitions = &policy.definitions()[..3];
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(definitions).unwrap().as_bytes())
            .unwrap();

        let config = ServiceConfig {
            tiers_file: Some(file.path().to_string_lossy().to_string()),
            ..ServiceConfig::default()
        };
        assert!(matches!(
            config.engine_config(),
            Err(ConfigError::InvalidTiers(_))
        ));
    }

    #[test]
    fn missing_tiers_file_rejected() {
        let config = ServiceConfig {
            tiers_file: Some("/nonexistent/tiers.json".into()),
            ..ServiceConfig::default()
        };
        assert!(matches!(
            config.engine_config(),
            Err(ConfigError::TiersFile { .. })
        ));
    }
}
