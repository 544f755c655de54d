//! The credential gate: MPIN creation, verification with lockout, and change.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use wallet_core::{CredentialRecord, Mpin, OwnerId, Result, WalletError};
use wallet_store::{Store, WriteSet};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::crypto;
use crate::locks::KeyedLocks;

/// Guards the per-owner MPIN.
///
/// Weak and malformed candidates are rejected before the store is touched. Verification
/// attempts for one owner are serialized so the failure counter cannot be raced past the
/// lockout threshold.
#[derive(Clone)]
pub struct CredentialGate {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    config: Arc<EngineConfig>,
    locks: Arc<KeyedLocks<OwnerId>>,
}

impl CredentialGate {
    pub(crate) fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            store,
            clock,
            config,
            locks: Arc::new(KeyedLocks::new()),
        }
    }

    /// Set the first MPIN for `owner_id`.
    ///
    /// # Errors
    ///
    /// - `InvalidSecretFormat` or `WeakSecret` for a rejected candidate.
    /// - `SecretAlreadySet` if the owner already has one.
    pub async fn create_secret(&self, owner_id: OwnerId, candidate: &str) -> Result<()> {
        let mpin = self.config.weak_secrets.validate(candidate)?;

        let _guard = self.locks.lock(&owner_id).await;
        if self.store.get_credential(&owner_id)?.is_some() {
            return Err(WalletError::SecretAlreadySet {
                owner_id: owner_id.to_string(),
            });
        }

        let now = self.clock.now();
        let hash = crypto::hash_secret(&self.config.secret_pepper, &owner_id, &mpin)?;
        let mut writes = WriteSet::new();
        writes.put_credential(CredentialRecord::new(owner_id, hash, now));
        self.store.commit(writes)?;

        info!(owner_id = %owner_id, "credential created");
        Ok(())
    }

    /// Check `candidate` against the stored MPIN.
    ///
    /// # Errors
    ///
    /// - `InvalidSecretFormat` (not counted as an attempt).
    /// - `CredentialNotFound`.
    /// - `Locked` while a lockout is active.
    /// - `IncorrectSecret` on mismatch, with the attempts left.
    pub async fn verify_secret(&self, owner_id: OwnerId, candidate: &str) -> Result<()> {
        let mpin = Mpin::parse(candidate)?;

        let _guard = self.locks.lock(&owner_id).await;
        let now = self.clock.now();
        let mut record = self.load(&owner_id)?;
        let before = record.clone();

        let outcome = self.check(&mut record, &mpin, now);
        if record != before {
            self.save(record)?;
        }
        outcome
    }

    /// Replace the MPIN after verifying the current one.
    ///
    /// The new candidate is checked first, so a weak replacement costs no attempt. A
    /// mismatch on the old secret counts like any failed verification; the hash is only
    /// replaced when both steps pass.
    ///
    /// # Errors
    ///
    /// Any error of [`Self::verify_secret`] or of the candidate checks in
    /// [`Self::create_secret`].
    pub async fn change_secret(
        &self,
        owner_id: OwnerId,
        old_candidate: &str,
        new_candidate: &str,
    ) -> Result<()> {
        let new_mpin = self.config.weak_secrets.validate(new_candidate)?;
        let old_mpin = Mpin::parse(old_candidate)?;

        let _guard = self.locks.lock(&owner_id).await;
        let now = self.clock.now();
        let mut record = self.load(&owner_id)?;
        let before = record.clone();

        if let Err(err) = self.check(&mut record, &old_mpin, now) {
            if record != before {
                self.save(record)?;
            }
            return Err(err);
        }

        let hash = crypto::hash_secret(&self.config.secret_pepper, &owner_id, &new_mpin)?;
        record.replace_secret(hash, now);
        self.save(record)?;

        info!(owner_id = %owner_id, "credential changed");
        Ok(())
    }

    /// Whether `owner_id` has an MPIN set.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store fails.
    pub fn has_secret(&self, owner_id: &OwnerId) -> Result<bool> {
        Ok(self.store.get_credential(owner_id)?.is_some())
    }

    fn check(&self, record: &mut CredentialRecord, mpin: &Mpin, now: DateTime<Utc>) -> Result<()> {
        record.check_unlocked(now)?;

        let hash = crypto::hash_secret(&self.config.secret_pepper, &record.owner_id, mpin)?;
        if crypto::constant_time_eq(&hash, &record.secret_hash) {
            record.record_success();
            return Ok(());
        }

        let err = record.record_failure(
            self.config.lockout_threshold,
            self.config.lockout_duration,
            now,
        );
        match record.locked_until {
            Some(locked_until) => warn!(
                owner_id = %record.owner_id,
                failed_attempts = record.failed_attempts,
                %locked_until,
                "credential locked"
            ),
            None => debug!(
                owner_id = %record.owner_id,
                failed_attempts = record.failed_attempts,
                "credential mismatch"
            ),
        }
        Err(err)
    }

    fn load(&self, owner_id: &OwnerId) -> Result<CredentialRecord> {
        self.store
            .get_credential(owner_id)?
            .ok_or_else(|| WalletError::CredentialNotFound {
                owner_id: owner_id.to_string(),
            })
    }

    fn save(&self, record: CredentialRecord) -> Result<()> {
        let mut writes = WriteSet::new();
        writes.put_credential(record);
        Ok(self.store.commit(writes)?)
    }
}
