//! In-memory storage implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use wallet_core::{
    CredentialRecord, Hold, IdempotencyKey, Order, OrderId, OrderState, OwnerId, Transaction,
    TransactionId, TransactionKind, Wallet, WalletId,
};

use crate::error::{Result, StoreError};
use crate::{Store, WriteSet};

#[derive(Default)]
struct Inner {
    wallets: HashMap<WalletId, Wallet>,
    wallets_by_owner: HashMap<OwnerId, WalletId>,
    transactions: HashMap<TransactionId, Transaction>,
    transactions_by_wallet: HashMap<WalletId, Vec<TransactionId>>,
    idempotency: HashMap<(WalletId, TransactionKind, IdempotencyKey), TransactionId>,
    holds: HashMap<TransactionId, Hold>,
    orders: HashMap<OrderId, Order>,
    orders_by_wallet: HashMap<WalletId, Vec<OrderId>>,
    credentials: HashMap<OwnerId, CredentialRecord>,
}

impl Inner {
    fn check(&self, writes: &WriteSet) -> Result<()> {
        for tx in &writes.transactions {
            if self.transactions.contains_key(&tx.id) {
                return Err(StoreError::Conflict(format!(
                    "transaction {} already exists",
                    tx.id
                )));
            }
        }
        for wallet in &writes.wallets {
            if let Some(existing) = self.wallets_by_owner.get(&wallet.owner_id) {
                if *existing != wallet.id {
                    return Err(StoreError::Conflict(format!(
                        "owner {} already has wallet {existing}",
                        wallet.owner_id
                    )));
                }
            }
        }
        Ok(())
    }

    fn apply(&mut self, writes: WriteSet) {
        for wallet in writes.wallets {
            self.wallets_by_owner.insert(wallet.owner_id, wallet.id);
            self.wallets.insert(wallet.id, wallet);
        }
        for tx in writes.transactions {
            self.transactions_by_wallet
                .entry(tx.wallet_id)
                .or_default()
                .push(tx.id);
            self.idempotency
                .entry((tx.wallet_id, tx.kind, tx.idempotency_key.clone()))
                .or_insert(tx.id);
            self.transactions.insert(tx.id, tx);
        }
        for hold in writes.holds {
            self.holds.insert(hold.reservation_id, hold);
        }
        for order in writes.orders {
            if !self.orders.contains_key(&order.id) {
                self.orders_by_wallet
                    .entry(order.wallet_id)
                    .or_default()
                    .push(order.id);
            }
            self.orders.insert(order.id, order);
        }
        for credential in writes.credentials {
            self.credentials.insert(credential.owner_id, credential);
        }
    }
}

/// Store backed by hash maps behind one lock.
///
/// Log and order indexes keep append order, so listings are newest first even for
/// entries minted in the same millisecond.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as if the backend were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.ensure_available()?;
        self.inner
            .read()
            .map_err(|_| StoreError::Database("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.ensure_available()?;
        self.inner
            .write()
            .map_err(|_| StoreError::Database("memory store lock poisoned".into()))
    }

    fn ensure_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Database("store unavailable".into()));
        }
        Ok(())
    }
}

fn page<T>(ids: &[T], limit: usize, offset: usize) -> impl Iterator<Item = &T> {
    ids.iter().rev().skip(offset).take(limit)
}

impl Store for MemoryStore {
    fn get_wallet(&self, wallet_id: &WalletId) -> Result<Option<Wallet>> {
        Ok(self.read()?.wallets.get(wallet_id).cloned())
    }

    fn get_wallet_by_owner(&self, owner_id: &OwnerId) -> Result<Option<Wallet>> {
        let inner = self.read()?;
        Ok(inner
            .wallets_by_owner
            .get(owner_id)
            .and_then(|id| inner.wallets.get(id))
            .cloned())
    }

    fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<Transaction>> {
        Ok(self.read()?.transactions.get(transaction_id).cloned())
    }

    fn find_by_idempotency_key(
        &self,
        wallet_id: &WalletId,
        kind: TransactionKind,
        key: &IdempotencyKey,
    ) -> Result<Option<Transaction>> {
        let inner = self.read()?;
        Ok(inner
            .idempotency
            .get(&(*wallet_id, kind, key.clone()))
            .and_then(|id| inner.transactions.get(id))
            .cloned())
    }

    fn list_transactions_by_wallet(
        &self,
        wallet_id: &WalletId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transaction>> {
        let inner = self.read()?;
        let Some(ids) = inner.transactions_by_wallet.get(wallet_id) else {
            return Ok(Vec::new());
        };
        Ok(page(ids, limit, offset)
            .filter_map(|id| inner.transactions.get(id).cloned())
            .collect())
    }

    fn get_hold(&self, reservation_id: &TransactionId) -> Result<Option<Hold>> {
        Ok(self.read()?.holds.get(reservation_id).cloned())
    }

    fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>> {
        Ok(self.read()?.orders.get(order_id).cloned())
    }

    fn list_orders_by_wallet(
        &self,
        wallet_id: &WalletId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Order>> {
        let inner = self.read()?;
        let Some(ids) = inner.orders_by_wallet.get(wallet_id) else {
            return Ok(Vec::new());
        };
        Ok(page(ids, limit, offset)
            .filter_map(|id| inner.orders.get(id).cloned())
            .collect())
    }

    fn list_orders_in_state(&self, state: OrderState, limit: usize) -> Result<Vec<Order>> {
        let inner = self.read()?;
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|order| order.state == state)
            .cloned()
            .collect();
        orders.sort_by_key(|order| order.id);
        orders.truncate(limit);
        Ok(orders)
    }

    fn get_credential(&self, owner_id: &OwnerId) -> Result<Option<CredentialRecord>> {
        Ok(self.read()?.credentials.get(owner_id).cloned())
    }

    fn commit(&self, writes: WriteSet) -> Result<()> {
        let mut inner = self.write()?;
        inner.check(&writes)?;
        inner.apply(writes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wallet_core::{Tier, TransactionStatus};

    fn store_with_wallet() -> (MemoryStore, Wallet) {
        let store = MemoryStore::new();
        let wallet = Wallet::new(OwnerId::generate(), Tier::Starter, Utc::now());
        let mut writes = WriteSet::new();
        writes.put_wallet(wallet.clone());
        store.commit(writes).unwrap();
        (store, wallet)
    }

    #[test]
    fn wallet_lookup_by_owner() {
        let (store, wallet) = store_with_wallet();
        let found = store.get_wallet_by_owner(&wallet.owner_id).unwrap();
        assert_eq!(found.map(|w| w.id), Some(wallet.id));
    }

    #[test]
    fn second_wallet_for_owner_conflicts() {
        let (store, wallet) = store_with_wallet();
        let other = Wallet::new(wallet.owner_id, Tier::Pro, Utc::now());
        let mut writes = WriteSet::new();
        writes.put_wallet(other);
        assert!(matches!(store.commit(writes), Err(StoreError::Conflict(_))));
    }

    #[test]
    fn transactions_listed_newest_first() {
        let (store, wallet) = store_with_wallet();
        let now = Utc::now();
        let first = Transaction::credit(wallet.id, 100, 100, now);
        let second = Transaction::credit(wallet.id, 200, 300, now);

        let mut writes = WriteSet::new();
        writes
            .append_transaction(first.clone())
            .append_transaction(second.clone());
        store.commit(writes).unwrap();

        let listed = store.list_transactions_by_wallet(&wallet.id, 10, 0).unwrap();
        assert_eq!(listed, vec![second.clone(), first.clone()]);

        let page2 = store.list_transactions_by_wallet(&wallet.id, 1, 1).unwrap();
        assert_eq!(page2, vec![first.clone()]);

        let found = store
            .find_by_idempotency_key(&wallet.id, first.kind, &first.idempotency_key)
            .unwrap();
        assert_eq!(found.map(|tx| tx.status), Some(TransactionStatus::Success));
    }

    #[test]
    fn failed_commit_writes_nothing() {
        let (store, wallet) = store_with_wallet();
        let tx = Transaction::credit(wallet.id, 100, 100, Utc::now());
        let mut writes = WriteSet::new();
        writes.append_transaction(tx.clone());
        store.commit(writes.clone()).unwrap();

        // Same entry again plus a summary change: the whole set must be refused.
        let mut changed = wallet.clone();
        changed.balance_minor = 999;
        writes.put_wallet(changed);
        assert!(store.commit(writes).is_err());
        assert_eq!(store.get_wallet(&wallet.id).unwrap(), Some(wallet));
    }

    #[test]
    fn unavailable_store_fails_reads_and_writes() {
        let (store, wallet) = store_with_wallet();
        store.set_unavailable(true);
        assert!(store.get_wallet(&wallet.id).is_err());
        assert!(store.commit(WriteSet::new()).is_err());
        store.set_unavailable(false);
        assert!(store.get_wallet(&wallet.id).unwrap().is_some());
    }
}
