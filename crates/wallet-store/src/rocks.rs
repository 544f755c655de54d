//! `RocksDB` storage implementation.
//!
//! Values are CBOR. Every [`WriteSet`] becomes a single `WriteBatch`, so a commit is
//! atomic across column families.

use std::path::Path;
use std::sync::Arc;

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use wallet_core::{
    CredentialRecord, Hold, IdempotencyKey, Order, OrderId, OrderState, OwnerId, Transaction,
    TransactionId, TransactionKind, Wallet, WalletId,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{Store, WriteSet};

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::info!("opened rocksdb wallet store");
        Ok(Self { db: Arc::new(db) })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get_raw(&self, name: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.cf(name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn get_value<T: serde::de::DeserializeOwned>(&self, name: &str, key: &[u8]) -> Result<Option<T>> {
        self.get_raw(name, key)?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Keys under `prefix` in ascending order.
    fn prefix_keys(&self, name: &'static str, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        let cf = self.cf(name)?;
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward));

        let mut out = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            out.push(key.to_vec());
        }
        Ok(out)
    }

    /// Newest-first page of ids indexed under a wallet.
    fn wallet_index_page(
        &self,
        name: &'static str,
        wallet_id: &WalletId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<[u8; keys::ID_LEN]>> {
        let prefix = keys::wallet_prefix(wallet_id);
        self.prefix_keys(name, &prefix)?
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .map(|key| keys::trailing_id(key, name))
            .collect()
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Wallets
    // =========================================================================

    fn get_wallet(&self, wallet_id: &WalletId) -> Result<Option<Wallet>> {
        self.get_value(cf::WALLETS, &keys::wallet_key(wallet_id))
    }

    fn get_wallet_by_owner(&self, owner_id: &OwnerId) -> Result<Option<Wallet>> {
        let Some(raw) = self.get_raw(cf::WALLETS_BY_OWNER, &keys::owner_key(owner_id))? else {
            return Ok(None);
        };
        let wallet_id = WalletId::from_bytes(keys::trailing_id(&raw, cf::WALLETS_BY_OWNER)?);
        self.get_wallet(&wallet_id)
    }

    // =========================================================================
    // Transaction log
    // =========================================================================

    fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<Transaction>> {
        self.get_value(cf::TRANSACTIONS, &keys::transaction_key(transaction_id))
    }

    fn find_by_idempotency_key(
        &self,
        wallet_id: &WalletId,
        kind: TransactionKind,
        key: &IdempotencyKey,
    ) -> Result<Option<Transaction>> {
        let index_key = keys::idempotency_key(wallet_id, kind, key);
        let Some(raw) = self.get_raw(cf::IDEMPOTENCY, &index_key)? else {
            return Ok(None);
        };
        let tx_id = TransactionId::from_bytes(keys::trailing_id(&raw, cf::IDEMPOTENCY)?);
        self.get_transaction(&tx_id)
    }

    fn list_transactions_by_wallet(
        &self,
        wallet_id: &WalletId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transaction>> {
        let mut transactions = Vec::new();
        for id in self.wallet_index_page(cf::TRANSACTIONS_BY_WALLET, wallet_id, limit, offset)? {
            if let Some(tx) = self.get_transaction(&TransactionId::from_bytes(id))? {
                transactions.push(tx);
            }
        }
        Ok(transactions)
    }

    // =========================================================================
    // Holds
    // =========================================================================

    fn get_hold(&self, reservation_id: &TransactionId) -> Result<Option<Hold>> {
        self.get_value(cf::HOLDS, &keys::transaction_key(reservation_id))
    }

    // =========================================================================
    // Orders
    // =========================================================================

    fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>> {
        self.get_value(cf::ORDERS, &keys::order_key(order_id))
    }

    fn list_orders_by_wallet(
        &self,
        wallet_id: &WalletId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Order>> {
        let mut orders = Vec::new();
        for id in self.wallet_index_page(cf::ORDERS_BY_WALLET, wallet_id, limit, offset)? {
            if let Some(order) = self.get_order(&OrderId::from_bytes(id))? {
                orders.push(order);
            }
        }
        Ok(orders)
    }

    fn list_orders_in_state(&self, state: OrderState, limit: usize) -> Result<Vec<Order>> {
        let prefix = keys::order_state_prefix(state);
        let mut orders = Vec::new();
        for key in self.prefix_keys(cf::ORDERS_BY_STATE, &prefix)? {
            if orders.len() >= limit {
                break;
            }
            let id = OrderId::from_bytes(keys::trailing_id(&key, cf::ORDERS_BY_STATE)?);
            if let Some(order) = self.get_order(&id)? {
                orders.push(order);
            }
        }
        Ok(orders)
    }

    // =========================================================================
    // Credentials
    // =========================================================================

    fn get_credential(&self, owner_id: &OwnerId) -> Result<Option<CredentialRecord>> {
        self.get_value(cf::CREDENTIALS, &keys::credential_key(owner_id))
    }

    // =========================================================================
    // Writes
    // =========================================================================

    fn commit(&self, writes: WriteSet) -> Result<()> {
        let cf_wallets = self.cf(cf::WALLETS)?;
        let cf_owners = self.cf(cf::WALLETS_BY_OWNER)?;
        let cf_tx = self.cf(cf::TRANSACTIONS)?;
        let cf_tx_by_wallet = self.cf(cf::TRANSACTIONS_BY_WALLET)?;
        let cf_idempotency = self.cf(cf::IDEMPOTENCY)?;
        let cf_holds = self.cf(cf::HOLDS)?;
        let cf_orders = self.cf(cf::ORDERS)?;
        let cf_orders_by_wallet = self.cf(cf::ORDERS_BY_WALLET)?;
        let cf_orders_by_state = self.cf(cf::ORDERS_BY_STATE)?;
        let cf_credentials = self.cf(cf::CREDENTIALS)?;

        let mut batch = WriteBatch::default();

        for wallet in &writes.wallets {
            let owner_key = keys::owner_key(&wallet.owner_id);
            if let Some(raw) = self.get_raw(cf::WALLETS_BY_OWNER, &owner_key)? {
                if raw.as_slice() != wallet.id.as_bytes() {
                    return Err(StoreError::Conflict(format!(
                        "owner {} already has a wallet",
                        wallet.owner_id
                    )));
                }
            }
            batch.put_cf(&cf_wallets, keys::wallet_key(&wallet.id), Self::serialize(wallet)?);
            batch.put_cf(&cf_owners, owner_key, wallet.id.as_bytes());
        }

        for tx in &writes.transactions {
            let tx_key = keys::transaction_key(&tx.id);
            if self.get_raw(cf::TRANSACTIONS, &tx_key)?.is_some() {
                return Err(StoreError::Conflict(format!(
                    "transaction {} already exists",
                    tx.id
                )));
            }
            batch.put_cf(&cf_tx, &tx_key, Self::serialize(tx)?);
            batch.put_cf(
                &cf_tx_by_wallet,
                keys::wallet_child_key(&tx.wallet_id, tx.id.to_bytes()),
                [],
            );
            let index_key = keys::idempotency_key(&tx.wallet_id, tx.kind, &tx.idempotency_key);
            if self.get_raw(cf::IDEMPOTENCY, &index_key)?.is_none() {
                batch.put_cf(&cf_idempotency, index_key, &tx_key);
            }
        }

        for hold in &writes.holds {
            batch.put_cf(
                &cf_holds,
                keys::transaction_key(&hold.reservation_id),
                Self::serialize(hold)?,
            );
        }

        for order in &writes.orders {
            match self.get_order(&order.id)? {
                Some(previous) if previous.state != order.state => {
                    batch.delete_cf(
                        &cf_orders_by_state,
                        keys::order_state_key(previous.state, &order.id),
                    );
                }
                Some(_) => {}
                None => batch.put_cf(
                    &cf_orders_by_wallet,
                    keys::wallet_child_key(&order.wallet_id, order.id.to_bytes()),
                    [],
                ),
            }
            batch.put_cf(
                &cf_orders_by_state,
                keys::order_state_key(order.state, &order.id),
                [],
            );
            batch.put_cf(&cf_orders, keys::order_key(&order.id), Self::serialize(order)?);
        }

        for credential in &writes.credentials {
            batch.put_cf(
                &cf_credentials,
                keys::credential_key(&credential.owner_id),
                Self::serialize(credential)?,
            );
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }
}
