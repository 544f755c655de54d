//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Wallet summaries, keyed by `wallet_id`.
    pub const WALLETS: &str = "wallets";

    /// Index: wallet by owner, keyed by `owner_id`. Value is the `wallet_id`.
    pub const WALLETS_BY_OWNER: &str = "wallets_by_owner";

    /// Log entries, keyed by `transaction_id` (ULID).
    pub const TRANSACTIONS: &str = "transactions";

    /// Index: entries by wallet, keyed by `wallet_id || transaction_id`.
    /// Value is empty (index only).
    pub const TRANSACTIONS_BY_WALLET: &str = "transactions_by_wallet";

    /// Index: idempotency keys, keyed by `wallet_id || kind || key`.
    /// Value is the `transaction_id`.
    pub const IDEMPOTENCY: &str = "idempotency";

    /// Hold records, keyed by reservation `transaction_id`.
    pub const HOLDS: &str = "holds";

    /// Orders, keyed by `order_id` (ULID).
    pub const ORDERS: &str = "orders";

    /// Index: orders by wallet, keyed by `wallet_id || order_id`.
    pub const ORDERS_BY_WALLET: &str = "orders_by_wallet";

    /// Index: orders by state, keyed by `state || order_id`.
    pub const ORDERS_BY_STATE: &str = "orders_by_state";

    /// Credential records, keyed by `owner_id`.
    pub const CREDENTIALS: &str = "credentials";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::WALLETS,
        cf::WALLETS_BY_OWNER,
        cf::TRANSACTIONS,
        cf::TRANSACTIONS_BY_WALLET,
        cf::IDEMPOTENCY,
        cf::HOLDS,
        cf::ORDERS,
        cf::ORDERS_BY_WALLET,
        cf::ORDERS_BY_STATE,
        cf::CREDENTIALS,
    ]
}
