//! Positive money amounts in minor units.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WalletError};

/// A strictly positive amount of minor currency units (paise).
///
/// Every ledger primitive takes an `Amount`, so a zero or negative value is rejected
/// before any state is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Amount(i64);

impl Amount {
    /// Validate a raw minor-unit value.
    ///
    /// # Errors
    ///
    /// Returns `WalletError::InvalidAmount` unless `value > 0`.
    pub const fn new(value: i64) -> Result<Self> {
        if value > 0 {
            Ok(Self(value))
        } else {
            Err(WalletError::InvalidAmount {
                amount_minor: value,
            })
        }
    }

    /// The value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for Amount {
    type Error = WalletError;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for i64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}
