//! MPIN credential record and weak-secret rules.
//!
//! Hashing and comparison live in the engine; this module only decides whether a
//! candidate is acceptable and how the attempt counter moves.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WalletError};
use crate::ids::OwnerId;

/// Number of digits in an MPIN.
pub const MPIN_LEN: usize = 4;

/// Common patterns rejected regardless of the other rules.
pub const DEFAULT_DENY_LIST: &[&str] = &[
    "1212", "2121", "1122", "2211", "1221", "2020", "6969", "1010", "0101", "1357", "2468",
];

/// A syntactically valid MPIN candidate: exactly four ASCII digits.
#[derive(Clone, PartialEq, Eq)]
pub struct Mpin(String);

impl Mpin {
    /// Validate the format of a candidate.
    ///
    /// # Errors
    ///
    /// Returns `WalletError::InvalidSecretFormat` unless `candidate` is four ASCII digits.
    pub fn parse(candidate: &str) -> Result<Self> {
        if candidate.len() == MPIN_LEN && candidate.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(candidate.to_string()))
        } else {
            Err(WalletError::InvalidSecretFormat)
        }
    }

    /// The digits.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn digits(&self) -> [i16; MPIN_LEN] {
        let mut out = [0; MPIN_LEN];
        for (slot, b) in out.iter_mut().zip(self.0.bytes()) {
            *slot = i16::from(b - b'0');
        }
        out
    }
}

impl fmt::Debug for Mpin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Mpin(****)")
    }
}

/// Why a candidate was judged too easy to guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeakSecretReason {
    /// All four digits are the same.
    RepeatedDigits,
    /// Consecutive ascending or descending digits.
    Sequential,
    /// On the deny-list of common patterns.
    CommonPattern,
    /// Reads like a birth year.
    BirthYear,
}

impl fmt::Display for WeakSecretReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RepeatedDigits => "all digits are the same",
            Self::Sequential => "digits form a sequence",
            Self::CommonPattern => "commonly used pattern",
            Self::BirthYear => "looks like a year",
        })
    }
}

/// Rules that reject guessable MPINs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeakSecretPolicy {
    /// Exact patterns to reject.
    pub deny_list: Vec<String>,

    /// Inclusive range of year-like values to reject, if any.
    pub birth_year_range: Option<(u16, u16)>,
}

impl Default for WeakSecretPolicy {
    fn default() -> Self {
        Self {
            deny_list: DEFAULT_DENY_LIST.iter().map(|s| (*s).to_string()).collect(),
            birth_year_range: Some((1930, 2030)),
        }
    }
}

impl WeakSecretPolicy {
    /// The first rule `mpin` breaks, if any.
    #[must_use]
    pub fn check(&self, mpin: &Mpin) -> Option<WeakSecretReason> {
        let d = mpin.digits();
        if d.iter().all(|&x| x == d[0]) {
            return Some(WeakSecretReason::RepeatedDigits);
        }
        let steps: Vec<i16> = d.windows(2).map(|w| w[1] - w[0]).collect();
        if steps.iter().all(|&s| s == 1) || steps.iter().all(|&s| s == -1) {
            return Some(WeakSecretReason::Sequential);
        }
        if self.deny_list.iter().any(|p| p == mpin.as_str()) {
            return Some(WeakSecretReason::CommonPattern);
        }
        if let Some((from, to)) = self.birth_year_range {
            if let Ok(value) = mpin.as_str().parse::<u16>() {
                if (from..=to).contains(&value) {
                    return Some(WeakSecretReason::BirthYear);
                }
            }
        }
        None
    }

    /// Parse and vet a candidate.
    ///
    /// # Errors
    ///
    /// - `InvalidSecretFormat` unless four ASCII digits.
    /// - `WeakSecret` if any rule rejects it.
    pub fn validate(&self, candidate: &str) -> Result<Mpin> {
        let mpin = Mpin::parse(candidate)?;
        match self.check(&mpin) {
            Some(reason) => Err(WalletError::WeakSecret { reason }),
            None => Ok(mpin),
        }
    }
}

/// Stored credential for one owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// The owner.
    pub owner_id: OwnerId,

    /// Hex-encoded keyed hash of the MPIN.
    pub secret_hash: String,

    /// Consecutive failed verifications.
    pub failed_attempts: u32,

    /// Verification is refused until this instant.
    pub locked_until: Option<DateTime<Utc>>,

    /// When the secret was last set.
    pub last_changed_at: DateTime<Utc>,
}

impl CredentialRecord {
    /// A fresh record.
    #[must_use]
    pub const fn new(owner_id: OwnerId, secret_hash: String, now: DateTime<Utc>) -> Self {
        Self {
            owner_id,
            secret_hash,
            failed_attempts: 0,
            locked_until: None,
            last_changed_at: now,
        }
    }

    /// Refuse while a lock is active; forget an expired one.
    ///
    /// # Errors
    ///
    /// Returns `WalletError::Locked` while `now < locked_until`.
    pub fn check_unlocked(&mut self, now: DateTime<Utc>) -> Result<()> {
        match self.locked_until {
            Some(locked_until) if now < locked_until => Err(WalletError::Locked { locked_until }),
            Some(_) => {
                self.locked_until = None;
                self.failed_attempts = 0;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Count a mismatch, locking at `threshold`. Returns the error to report.
    pub fn record_failure(
        &mut self,
        threshold: u32,
        lockout: Duration,
        now: DateTime<Utc>,
    ) -> WalletError {
        self.failed_attempts = self.failed_attempts.saturating_add(1);
        if self.failed_attempts >= threshold {
            self.locked_until = Some(now + lockout);
        }
        WalletError::IncorrectSecret {
            attempts_remaining: threshold.saturating_sub(self.failed_attempts),
        }
    }

    /// Reset the counter after a match.
    pub fn record_success(&mut self) {
        self.failed_attempts = 0;
        self.locked_until = None;
    }

    /// Store a new hash and reset the counter.
    pub fn replace_secret(&mut self, secret_hash: String, now: DateTime<Utc>) {
        self.secret_hash = secret_hash;
        self.last_changed_at = now;
        self.record_success();
    }
}
