//! Storage layer for the wallet ledger.
//!
//! Two backends implement [`Store`]:
//!
//! - [`MemoryStore`]: maps behind a lock, for tests and single-process deployments
//! - [`RocksStore`]: `RocksDB` with column families (feature `rocksdb-backend`)
//!
//! # Atomicity
//!
//! Every mutation goes through [`Store::commit`] with a [`WriteSet`]. A write set is
//! applied all-or-nothing: after a failed commit no part of it is readable. Callers build
//! the whole effect of one ledger operation (summary, log entries, hold record, order)
//! and commit it once.
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use wallet_core::{OwnerId, Tier, Wallet};
//! use wallet_store::{MemoryStore, Store, WriteSet};
//!
//! let store = MemoryStore::new();
//! let wallet = Wallet::new(OwnerId::generate(), Tier::Starter, Utc::now());
//!
//! let mut writes = WriteSet::new();
//! writes.put_wallet(wallet.clone());
//! store.commit(writes).unwrap();
//!
//! assert_eq!(store.get_wallet(&wallet.id).unwrap(), Some(wallet));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod memory;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use wallet_core::{
    CredentialRecord, Hold, IdempotencyKey, Order, OrderId, OrderState, OwnerId, Transaction,
    TransactionId, TransactionKind, Wallet, WalletId,
};

/// Records to write in one atomic commit.
#[derive(Debug, Clone, Default)]
pub struct WriteSet {
    pub(crate) wallets: Vec<Wallet>,
    pub(crate) transactions: Vec<Transaction>,
    pub(crate) holds: Vec<Hold>,
    pub(crate) orders: Vec<Order>,
    pub(crate) credentials: Vec<CredentialRecord>,
}

impl WriteSet {
    /// An empty write set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a wallet summary.
    pub fn put_wallet(&mut self, wallet: Wallet) -> &mut Self {
        self.wallets.push(wallet);
        self
    }

    /// Append a log entry. Entries are immutable; appending an existing id is an error.
    pub fn append_transaction(&mut self, transaction: Transaction) -> &mut Self {
        self.transactions.push(transaction);
        self
    }

    /// Insert or replace a hold record.
    pub fn put_hold(&mut self, hold: Hold) -> &mut Self {
        self.holds.push(hold);
        self
    }

    /// Insert or replace an order.
    pub fn put_order(&mut self, order: Order) -> &mut Self {
        self.orders.push(order);
        self
    }

    /// Insert or replace a credential record.
    pub fn put_credential(&mut self, credential: CredentialRecord) -> &mut Self {
        self.credentials.push(credential);
        self
    }

    /// Whether there is nothing to write.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
            && self.transactions.is_empty()
            && self.holds.is_empty()
            && self.orders.is_empty()
            && self.credentials.is_empty()
    }
}

/// The storage trait defining all persistence operations.
///
/// Reads are consistent per call. Writers serialize per wallet above this layer; the
/// store only guarantees that a [`WriteSet`] lands atomically.
pub trait Store: Send + Sync {
    // =========================================================================
    // Wallets
    // =========================================================================

    /// Get a wallet by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn get_wallet(&self, wallet_id: &WalletId) -> Result<Option<Wallet>>;

    /// Get the wallet belonging to an owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn get_wallet_by_owner(&self, owner_id: &OwnerId) -> Result<Option<Wallet>>;

    // =========================================================================
    // Transaction log
    // =========================================================================

    /// Get a log entry by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<Transaction>>;

    /// Find the entry recorded under an idempotency key for this wallet and kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn find_by_idempotency_key(
        &self,
        wallet_id: &WalletId,
        kind: TransactionKind,
        key: &IdempotencyKey,
    ) -> Result<Option<Transaction>>;

    /// List a wallet's entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn list_transactions_by_wallet(
        &self,
        wallet_id: &WalletId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transaction>>;

    // =========================================================================
    // Holds
    // =========================================================================

    /// Get a hold by its reservation (hold transaction) id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn get_hold(&self, reservation_id: &TransactionId) -> Result<Option<Hold>>;

    // =========================================================================
    // Orders
    // =========================================================================

    /// Get an order by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>>;

    /// List a wallet's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn list_orders_by_wallet(
        &self,
        wallet_id: &WalletId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Order>>;

    /// List orders currently in `state`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn list_orders_in_state(&self, state: OrderState, limit: usize) -> Result<Vec<Order>>;

    // =========================================================================
    // Credentials
    // =========================================================================

    /// Get an owner's credential record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn get_credential(&self, owner_id: &OwnerId) -> Result<Option<CredentialRecord>>;

    // =========================================================================
    // Writes
    // =========================================================================

    /// Apply a write set atomically.
    ///
    /// # Errors
    ///
    /// - `StoreError::Conflict` if the set would overwrite a log entry or bind an owner
    ///   that already has a wallet to a second one.
    /// - `StoreError::Database`/`Serialization` if the backend fails; nothing is written.
    fn commit(&self, writes: WriteSet) -> Result<()>;
}
