//! Engine configuration.

use std::fmt;

use chrono::Duration;
use wallet_core::{TierPolicy, WeakSecretPolicy};

/// Default window during which a `Held` order can be cancelled by its owner.
pub const DEFAULT_CANCELLATION_GRACE_SECONDS: i64 = 30;
/// Default length of the rolling top-up window.
pub const DEFAULT_TOPUP_WINDOW_HOURS: i64 = 24;
/// Failed verifications that trigger a lockout.
pub const DEFAULT_LOCKOUT_THRESHOLD: u32 = 5;
/// Default lockout length.
pub const DEFAULT_LOCKOUT_MINUTES: i64 = 15;
/// Default age after which an unassigned `Held` order is failed by the sweeper.
pub const DEFAULT_HELD_ORDER_SLA_MINUTES: i64 = 120;
/// Orders examined per sweep.
pub const DEFAULT_SWEEP_BATCH: usize = 100;

/// Settings shared by the ledger, credential gate and order lifecycle.
#[derive(Clone)]
pub struct EngineConfig {
    /// Tier table.
    pub tiers: TierPolicy,

    /// A `Held` order can be cancelled without cause until `created_at + grace`.
    pub cancellation_grace: Duration,

    /// Length of the top-up window.
    pub topup_window: Duration,

    /// Consecutive failures before lockout.
    pub lockout_threshold: u32,

    /// How long a lockout lasts.
    pub lockout_duration: Duration,

    /// Key for credential hashing.
    pub secret_pepper: String,

    /// Weak-secret rules.
    pub weak_secrets: WeakSecretPolicy,

    /// Age at which the sweeper fails an unassigned `Held` order.
    pub held_order_sla: Duration,

    /// Orders examined per sweep.
    pub sweep_batch: usize,
}

impl EngineConfig {
    /// Replace the tier table.
    #[must_use]
    pub fn with_tiers(mut self, tiers: TierPolicy) -> Self {
        self.tiers = tiers;
        self
    }

    /// Replace the cancellation grace period.
    #[must_use]
    pub fn with_cancellation_grace(mut self, grace: Duration) -> Self {
        self.cancellation_grace = grace;
        self
    }

    /// Replace the lockout duration.
    #[must_use]
    pub fn with_lockout_duration(mut self, duration: Duration) -> Self {
        self.lockout_duration = duration;
        self
    }

    /// Replace the credential hashing key.
    #[must_use]
    pub fn with_secret_pepper(mut self, pepper: impl Into<String>) -> Self {
        self.secret_pepper = pepper.into();
        self
    }

    /// Replace the held-order SLA.
    #[must_use]
    pub fn with_held_order_sla(mut self, sla: Duration) -> Self {
        self.held_order_sla = sla;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tiers: TierPolicy::default(),
            cancellation_grace: Duration::seconds(DEFAULT_CANCELLATION_GRACE_SECONDS),
            topup_window: Duration::hours(DEFAULT_TOPUP_WINDOW_HOURS),
            lockout_threshold: DEFAULT_LOCKOUT_THRESHOLD,
            lockout_duration: Duration::minutes(DEFAULT_LOCKOUT_MINUTES),
            secret_pepper: "development-pepper".into(),
            weak_secrets: WeakSecretPolicy::default(),
            held_order_sla: Duration::minutes(DEFAULT_HELD_ORDER_SLA_MINUTES),
            sweep_batch: DEFAULT_SWEEP_BATCH,
        }
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("tiers", &self.tiers)
            .field("cancellation_grace", &self.cancellation_grace)
            .field("topup_window", &self.topup_window)
            .field("lockout_threshold", &self.lockout_threshold)
            .field("lockout_duration", &self.lockout_duration)
            .field("secret_pepper", &"<redacted>")
            .field("weak_secrets", &self.weak_secrets)
            .field("held_order_sla", &self.held_order_sla)
            .field("sweep_batch", &self.sweep_batch)
            .finish()
    }
}
