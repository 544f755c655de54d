//! Key encoding utilities for `RocksDB`.
//!
//! UUIDs and ULIDs are stored as their 16 raw bytes. Composite index keys put the
//! grouping id first so a prefix scan returns one wallet's entries in ULID order.

use wallet_core::{
    IdempotencyKey, OrderId, OrderState, OwnerId, TransactionId, TransactionKind, WalletId,
};

use crate::error::{Result, StoreError};

/// Length of an encoded id.
pub const ID_LEN: usize = 16;

/// Key for a wallet summary.
#[must_use]
pub fn wallet_key(wallet_id: &WalletId) -> Vec<u8> {
    wallet_id.as_bytes().to_vec()
}

/// Key for the owner index.
#[must_use]
pub fn owner_key(owner_id: &OwnerId) -> Vec<u8> {
    owner_id.as_bytes().to_vec()
}

/// Key for a log entry or hold record.
#[must_use]
pub fn transaction_key(transaction_id: &TransactionId) -> Vec<u8> {
    transaction_id.to_bytes().to_vec()
}

/// Key for an order.
#[must_use]
pub fn order_key(order_id: &OrderId) -> Vec<u8> {
    order_id.to_bytes().to_vec()
}

/// Key for a credential record.
#[must_use]
pub fn credential_key(owner_id: &OwnerId) -> Vec<u8> {
    owner_id.as_bytes().to_vec()
}

/// Prefix shared by every index entry of one wallet.
#[must_use]
pub fn wallet_prefix(wallet_id: &WalletId) -> Vec<u8> {
    wallet_id.as_bytes().to_vec()
}

/// Wallet index key.
///
/// Format: `wallet_id (16 bytes) || child_id (16 bytes)`
#[must_use]
pub fn wallet_child_key(wallet_id: &WalletId, child: [u8; ID_LEN]) -> Vec<u8> {
    let mut key = Vec::with_capacity(2 * ID_LEN);
    key.extend_from_slice(wallet_id.as_bytes());
    key.extend_from_slice(&child);
    key
}

const fn kind_tag(kind: TransactionKind) -> u8 {
    match kind {
        TransactionKind::Credit => 1,
        TransactionKind::Debit => 2,
        TransactionKind::Hold => 3,
        TransactionKind::Release => 4,
        TransactionKind::Capture => 5,
    }
}

const fn state_tag(state: OrderState) -> u8 {
    match state {
        OrderState::Created => 1,
        OrderState::Held => 2,
        OrderState::Assigned => 3,
        OrderState::Delivered => 4,
        OrderState::Cancelled => 5,
        OrderState::Failed => 6,
    }
}

/// Idempotency index key.
///
/// Format: `wallet_id (16 bytes) || kind (1 byte) || key (utf-8)`
#[must_use]
pub fn idempotency_key(
    wallet_id: &WalletId,
    kind: TransactionKind,
    key: &IdempotencyKey,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(ID_LEN + 1 + key.as_str().len());
    out.extend_from_slice(wallet_id.as_bytes());
    out.push(kind_tag(kind));
    out.extend_from_slice(key.as_str().as_bytes());
    out
}

/// Order state index key.
///
/// Format: `state (1 byte) || order_id (16 bytes)`
#[must_use]
pub fn order_state_key(state: OrderState, order_id: &OrderId) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + ID_LEN);
    key.push(state_tag(state));
    key.extend_from_slice(&order_id.to_bytes());
    key
}

/// Prefix for all orders in `state`.
#[must_use]
pub fn order_state_prefix(state: OrderState) -> Vec<u8> {
    vec![state_tag(state)]
}

/// The trailing 16-byte id of a composite key, or a stored id value.
///
/// # Errors
///
/// Returns `StoreError::CorruptKey` if `bytes` is shorter than an id.
pub fn trailing_id(bytes: &[u8], column_family: &'static str) -> Result<[u8; ID_LEN]> {
    bytes
        .len()
        .checked_sub(ID_LEN)
        .and_then(|start| bytes[start..].try_into().ok())
        .ok_or(StoreError::CorruptKey { column_family })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_child_key_format() {
        let wallet_id = WalletId::generate();
        let tx_id = TransactionId::generate();
        let key = wallet_child_key(&wallet_id, tx_id.to_bytes());

        assert_eq!(key.len(), 32);
        assert!(key.starts_with(&wallet_prefix(&wallet_id)));
        assert_eq!(&key[16..], tx_id.to_bytes());
    }

    #[test]
    fn trailing_id_roundtrip() {
        let wallet_id = WalletId::generate();
        let tx_id = TransactionId::generate();
        let key = wallet_child_key(&wallet_id, tx_id.to_bytes());

        let extracted = TransactionId::from_bytes(trailing_id(&key, "test").unwrap());
        assert_eq!(extracted, tx_id);
    }

    #[test]
    fn short_key_is_corrupt() {
        assert!(matches!(
            trailing_id(&[1, 2, 3], "test"),
            Err(StoreError::CorruptKey { .. })
        ));
    }

    #[test]
    fn idempotency_keys_are_scoped_by_kind() {
        let wallet_id = WalletId::generate();
        let key = IdempotencyKey::new("evt-1").unwrap();
        assert_ne!(
            idempotency_key(&wallet_id, TransactionKind::Credit, &key),
            idempotency_key(&wallet_id, TransactionKind::Debit, &key)
        );
    }

    #[test]
    fn state_keys_group_by_state() {
        let order = OrderId::generate();
        let key = order_state_key(OrderState::Held, &order);
        assert!(key.starts_with(&order_state_prefix(OrderState::Held)));
        assert!(!key.starts_with(&order_state_prefix(OrderState::Assigned)));
    }
}
