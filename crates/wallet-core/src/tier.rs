//! Tier policy: the ceilings that bound each wallet.
//!
//! Amounts are in minor units (paise). The built-in table matches the published plans;
//! a deployment can replace it at startup with [`TierPolicy::from_definitions`].

use serde::{Deserialize, Serialize};

use crate::error::{Result, WalletError};

// ============================================================================
// Constants
// ============================================================================

/// Starter wallet ceiling (₹5,000).
pub const STARTER_WALLET_LIMIT_MINOR: i64 = 500_000;
/// Starter daily top-up ceiling (₹5,000).
pub const STARTER_DAILY_TOPUP_LIMIT_MINOR: i64 = 500_000;
/// Starter per-withdrawal ceiling (₹3,000).
pub const STARTER_WITHDRAW_LIMIT_MINOR: i64 = 300_000;

/// Pro wallet ceiling (₹15,000).
pub const PRO_WALLET_LIMIT_MINOR: i64 = 1_500_000;
/// Pro daily top-up ceiling (₹10,000).
pub const PRO_DAILY_TOPUP_LIMIT_MINOR: i64 = 1_000_000;
/// Pro per-withdrawal ceiling (₹10,000).
pub const PRO_WITHDRAW_LIMIT_MINOR: i64 = 1_000_000;

/// Elite wallet ceiling (₹50,000).
pub const ELITE_WALLET_LIMIT_MINOR: i64 = 5_000_000;
/// Elite daily top-up ceiling (₹25,000).
pub const ELITE_DAILY_TOPUP_LIMIT_MINOR: i64 = 2_500_000;
/// Elite per-withdrawal ceiling (₹50,000).
pub const ELITE_WITHDRAW_LIMIT_MINOR: i64 = 5_000_000;

/// Supreme wallet ceiling (₹1,50,000).
pub const SUPREME_WALLET_LIMIT_MINOR: i64 = 15_000_000;
/// Supreme daily top-up ceiling (₹1,00,000).
pub const SUPREME_DAILY_TOPUP_LIMIT_MINOR: i64 = 10_000_000;

/// Wallet tiers, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Free tier, mobile number only.
    Starter,
    /// First paid tier, requires KYC.
    Pro,
    /// Second paid tier.
    Elite,
    /// Top tier; withdrawals are bounded only by the available balance.
    Supreme,
}

impl Tier {
    /// All tiers, lowest first.
    pub const ALL: [Self; 4] = [Self::Starter, Self::Pro, Self::Elite, Self::Supreme];

    const fn index(self) -> usize {
        match self {
            Self::Starter => 0,
            Self::Pro => 1,
            Self::Elite => 2,
            Self::Supreme => 3,
        }
    }
}

/// How much identity verification a tier requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationLevel {
    /// A verified mobile number.
    MobileNumber,
    /// PAN and address proof.
    Kyc,
}

/// The per-request withdrawal ceiling of a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "amount_minor", rename_all = "snake_case")]
pub enum WithdrawLimit {
    /// A fixed ceiling in minor units.
    Capped(i64),
    /// The whole available balance may be withdrawn.
    FullBalance,
}

impl WithdrawLimit {
    /// The effective ceiling given the wallet's current available balance.
    #[must_use]
    pub fn effective(self, available_minor: i64) -> i64 {
        match self {
            Self::Capped(limit) => limit,
            Self::FullBalance => available_minor.max(0),
        }
    }
}

/// Static limits for one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierDefinition {
    /// The tier these limits belong to.
    pub name: Tier,
    /// Ceiling on balance plus open holds.
    pub wallet_limit_minor: i64,
    /// Ceiling on successful top-ups within one top-up window.
    pub daily_topup_limit_minor: i64,
    /// Ceiling on a single withdrawal.
    pub withdraw_limit: WithdrawLimit,
    /// Verification the owner must have completed to hold this tier.
    pub required_verification_level: VerificationLevel,
}

/// Lookup table from tier to its definition.
///
/// The table is total over [`Tier`], so [`TierPolicy::limits_for`] cannot fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierPolicy {
    definitions: [TierDefinition; 4],
}

impl TierPolicy {
    /// Build a policy from a loaded table.
    ///
    /// # Errors
    ///
    /// Returns `WalletError::Configuration` if a tier is missing or defined twice, or
    /// if any ceiling is negative.
    pub fn from_definitions(definitions: Vec<TierDefinition>) -> Result<Self> {
        let mut slots: [Option<TierDefinition>; 4] = [None, None, None, None];
        for def in definitions {
            if def.wallet_limit_minor < 0
                || def.daily_topup_limit_minor < 0
                || matches!(def.withdraw_limit, WithdrawLimit::Capped(limit) if limit < 0)
            {
                return Err(WalletError::Configuration(format!(
                    "negative limit for tier {:?}",
                    def.name
                )));
            }
            let slot = &mut slots[def.name.index()];
            if slot.is_some() {
                return Err(WalletError::Configuration(format!(
                    "tier {:?} defined more than once",
                    def.name
                )));
            }
            *slot = Some(def);
        }

        let [starter, pro, elite, supreme] = slots;
        match (starter, pro, elite, supreme) {
            (Some(starter), Some(pro), Some(elite), Some(supreme)) => Ok(Self {
                definitions: [starter, pro, elite, supreme],
            }),
            (starter, pro, elite, supreme) => {
                let present = [
                    starter.is_some(),
                    pro.is_some(),
                    elite.is_some(),
                    supreme.is_some(),
                ];
                let missing: Vec<_> = Tier::ALL
                    .iter()
                    .zip(present)
                    .filter(|(_, present)| !present)
                    .map(|(tier, _)| format!("{tier:?}"))
                    .collect();
                Err(WalletError::Configuration(format!(
                    "tier table is missing: {}",
                    missing.join(", ")
                )))
            }
        }
    }

    /// Limits for `tier`.
    #[must_use]
    pub fn limits_for(&self, tier: Tier) -> &TierDefinition {
        &self.definitions[tier.index()]
    }

    /// All definitions, lowest tier first.
    #[must_use]
    pub fn definitions(&self) -> &[TierDefinition] {
        &self.definitions
    }
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self {
            definitions: [
                TierDefinition {
                    name: Tier::Starter,
                    wallet_limit_minor: STARTER_WALLET_LIMIT_MINOR,
                    daily_topup_limit_minor: STARTER_DAILY_TOPUP_LIMIT_MINOR,
                    withdraw_limit: WithdrawLimit::Capped(STARTER_WITHDRAW_LIMIT_MINOR),
                    required_verification_level: VerificationLevel::MobileNumber,
                },
                TierDefinition {
                    name: Tier::Pro,
                    wallet_limit_minor: PRO_WALLET_LIMIT_MINOR,
                    daily_topup_limit_minor: PRO_DAILY_TOPUP_LIMIT_MINOR,
                    withdraw_limit: WithdrawLimit::Capped(PRO_WITHDRAW_LIMIT_MINOR),
                    required_verification_level: VerificationLevel::Kyc,
                },
                TierDefinition {
                    name: Tier::Elite,
                    wallet_limit_minor: ELITE_WALLET_LIMIT_MINOR,
                    daily_topup_limit_minor: ELITE_DAILY_TOPUP_LIMIT_MINOR,
                    withdraw_limit: WithdrawLimit::Capped(ELITE_WITHDRAW_LIMIT_MINOR),
                    required_verification_level: VerificationLevel::Kyc,
                },
                TierDefinition {
                    name: Tier::Supreme,
                    wallet_limit_minor: SUPREME_WALLET_LIMIT_MINOR,
                    daily_topup_limit_minor: SUPREME_DAILY_TOPUP_LIMIT_MINOR,
                    withdraw_limit: WithdrawLimit::FullBalance,
                    required_verification_level: VerificationLevel::Kyc,
                },
            ],
        }
    }
}
