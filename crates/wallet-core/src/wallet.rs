//! Wallet summary and the balance rules applied to it.
//!
//! `balance_minor` is the total of the owner's funds. Open holds do not reduce it;
//! they are tracked in `held_minor`, and what the owner can still spend is
//! `balance_minor - held_minor`. Every method here is a pure check-then-apply step:
//! on error the wallet is left untouched.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::error::{Result, WalletError};
use crate::ids::{OwnerId, WalletId};
use crate::tier::{Tier, TierDefinition, WithdrawLimit};

/// Whether a wallet accepts balance-affecting calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletStatus {
    /// Normal operation.
    Active,
    /// Soft-deleted; kept for history, rejects mutations.
    Deactivated,
}

/// A stored-value wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Wallet id.
    pub id: WalletId,

    /// The owner; one wallet per owner.
    pub owner_id: OwnerId,

    /// Current tier; changes take effect immediately.
    pub tier: Tier,

    /// Active or deactivated.
    pub status: WalletStatus,

    /// Total funds in minor units, including held funds.
    pub balance_minor: i64,

    /// Sum of open holds.
    pub held_minor: i64,

    /// Successful top-ups in the current window.
    pub daily_topup_used_minor: i64,

    /// Start of the current top-up window.
    pub daily_topup_window_start: DateTime<Utc>,

    /// When the wallet was opened.
    pub created_at: DateTime<Utc>,

    /// Last summary change.
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Open an empty wallet.
    #[must_use]
    pub fn new(owner_id: OwnerId, tier: Tier, now: DateTime<Utc>) -> Self {
        Self {
            id: WalletId::generate(),
            owner_id,
            tier,
            status: WalletStatus::Active,
            balance_minor: 0,
            held_minor: 0,
            daily_topup_used_minor: 0,
            daily_topup_window_start: now,
            created_at: now,
            updated_at: now,
        }
    }

    /// Funds not earmarked by an open hold.
    #[must_use]
    pub const fn available_minor(&self) -> i64 {
        self.balance_minor - self.held_minor
    }

    /// Reject calls against a deactivated wallet.
    ///
    /// # Errors
    ///
    /// Returns `WalletError::WalletInactive` if the wallet is deactivated.
    pub fn ensure_active(&self) -> Result<()> {
        match self.status {
            WalletStatus::Active => Ok(()),
            WalletStatus::Deactivated => Err(WalletError::WalletInactive {
                wallet_id: self.id.to_string(),
            }),
        }
    }

    /// Start a fresh top-up window if the current one has elapsed.
    pub fn roll_topup_window(&mut self, now: DateTime<Utc>, window: Duration) {
        if now >= self.daily_topup_window_start + window {
            self.daily_topup_used_minor = 0;
            self.daily_topup_window_start = now;
        }
    }

    /// Top-up headroom left in the window containing `now`.
    #[must_use]
    pub fn topup_remaining_minor(
        &self,
        limits: &TierDefinition,
        now: DateTime<Utc>,
        window: Duration,
    ) -> i64 {
        let used = if now >= self.daily_topup_window_start + window {
            0
        } else {
            self.daily_topup_used_minor
        };
        (limits.daily_topup_limit_minor - used).max(0)
    }

    fn check_wallet_ceiling(&self, limits: &TierDefinition, extra_minor: i64) -> Result<()> {
        let resulting_minor = self
            .balance_minor
            .checked_add(self.held_minor)
            .and_then(|total| total.checked_add(extra_minor));
        match resulting_minor {
            Some(resulting_minor) if resulting_minor <= limits.wallet_limit_minor => Ok(()),
            resulting_minor => Err(WalletError::WalletLimitExceeded {
                limit_minor: limits.wallet_limit_minor,
                resulting_minor: resulting_minor.unwrap_or(i64::MAX),
            }),
        }
    }

    /// Apply a top-up.
    ///
    /// # Errors
    ///
    /// - `WalletInactive` if deactivated.
    /// - `DailyLimitExceeded` if the window's top-ups would pass the tier ceiling.
    /// - `WalletLimitExceeded` if balance plus open holds would pass the wallet ceiling.
    pub fn apply_credit(
        &mut self,
        amount: Amount,
        limits: &TierDefinition,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<()> {
        self.ensure_active()?;

        let mut next = self.clone();
        next.roll_topup_window(now, window);
        let topup_used_minor = next
            .daily_topup_used_minor
            .checked_add(amount.minor())
            .filter(|used| *used <= limits.daily_topup_limit_minor)
            .ok_or(WalletError::DailyLimitExceeded {
                limit_minor: limits.daily_topup_limit_minor,
                used_minor: next.daily_topup_used_minor,
                requested_minor: amount.minor(),
            })?;
        next.check_wallet_ceiling(limits, amount.minor())?;

        // Both sums are bounded by the tier limits checked above.
        next.balance_minor += amount.minor();
        next.daily_topup_used_minor = topup_used_minor;
        next.updated_at = now;
        *self = next;
        Ok(())
    }

    /// Earmark funds for an order.
    ///
    /// # Errors
    ///
    /// - `WalletInactive` if deactivated.
    /// - `InsufficientFunds` if available funds are below `amount`.
    /// - `WalletLimitExceeded` if balance plus open holds would pass the wallet ceiling.
    pub fn apply_hold(
        &mut self,
        amount: Amount,
        limits: &TierDefinition,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_active()?;
        if self.available_minor() < amount.minor() {
            return Err(WalletError::InsufficientFunds {
                available_minor: self.available_minor(),
                required_minor: amount.minor(),
            });
        }
        self.check_wallet_ceiling(limits, amount.minor())?;

        self.held_minor += amount.minor();
        self.updated_at = now;
        Ok(())
    }

    fn ensure_held(&self, amount_minor: i64) -> Result<()> {
        if self.held_minor < amount_minor || self.balance_minor < amount_minor {
            return Err(WalletError::Storage(format!(
                "wallet {} summary does not cover hold of {amount_minor}; reconcile required",
                self.id
            )));
        }
        Ok(())
    }

    /// Turn a held amount into a debit.
    ///
    /// # Errors
    ///
    /// Returns `WalletError::Storage` if the summary does not account for the hold,
    /// which means it drifted from the log.
    pub fn apply_capture(&mut self, amount_minor: i64, now: DateTime<Utc>) -> Result<()> {
        self.ensure_held(amount_minor)?;
        self.held_minor -= amount_minor;
        self.balance_minor -= amount_minor;
        self.updated_at = now;
        Ok(())
    }

    /// Return a held amount to the available balance.
    ///
    /// # Errors
    ///
    /// Returns `WalletError::Storage` if the summary does not account for the hold.
    pub fn apply_release(&mut self, amount_minor: i64, now: DateTime<Utc>) -> Result<()> {
        self.ensure_held(amount_minor)?;
        self.held_minor -= amount_minor;
        self.updated_at = now;
        Ok(())
    }

    /// Apply a direct withdrawal.
    ///
    /// Only available funds can be withdrawn; held funds belong to open orders.
    ///
    /// # Errors
    ///
    /// - `WalletInactive` if deactivated.
    /// - `WithdrawLimitExceeded` if above the tier's per-withdrawal ceiling.
    /// - `InsufficientFunds` if above the available balance.
    pub fn apply_debit(
        &mut self,
        amount: Amount,
        limits: &TierDefinition,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_active()?;
        if let WithdrawLimit::Capped(limit_minor) = limits.withdraw_limit {
            if amount.minor() > limit_minor {
                return Err(WalletError::WithdrawLimitExceeded {
                    limit_minor,
                    requested_minor: amount.minor(),
                });
            }
        }
        if amount.minor() > self.available_minor() {
            return Err(WalletError::InsufficientFunds {
                available_minor: self.available_minor(),
                required_minor: amount.minor(),
            });
        }

        self.balance_minor -= amount.minor();
        self.updated_at = now;
        Ok(())
    }

    /// Move to another tier.
    ///
    /// # Errors
    ///
    /// - `WalletInactive` if deactivated.
    /// - `WalletLimitExceeded` if current funds exceed the new tier's ceiling.
    pub fn change_tier(
        &mut self,
        tier: Tier,
        limits: &TierDefinition,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_active()?;
        self.check_wallet_ceiling(limits, 0)?;
        self.tier = tier;
        self.updated_at = now;
        Ok(())
    }

    /// Soft-deactivate.
    ///
    /// # Errors
    ///
    /// - `WalletInactive` if already deactivated.
    /// - `OpenHoldsOutstanding` while any hold is open.
    pub fn deactivate(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.ensure_active()?;
        if self.held_minor > 0 {
            return Err(WalletError::OpenHoldsOutstanding {
                wallet_id: self.id.to_string(),
                held_minor: self.held_minor,
            });
        }
        self.status = WalletStatus::Deactivated;
        self.updated_at = now;
        Ok(())
    }
}
