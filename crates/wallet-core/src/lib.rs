//! Core types and rules for the GridPe wallet ledger.
//!
//! This crate is pure: no I/O, no clocks, no locks. Every time-dependent rule takes `now`
//! as an argument.
//!
//! - **Identifiers**: `OwnerId`, `WalletId`, `TransactionId`, `OrderId`, `IdempotencyKey`
//! - **Tiers**: `Tier`, `TierDefinition`, `TierPolicy`
//! - **Wallets**: `Wallet` and its balance rules
//! - **Log**: `Transaction`, `Hold`
//! - **Orders**: `Order`, `OrderState`, `OrderEvent`
//! - **Credentials**: `CredentialRecord`, `Mpin`, `WeakSecretPolicy`
//! - **Fees and rewards**: `PaymentMethod`, `TopupQuote`, `RewardsSummary`
//!
//! # Money
//!
//! All amounts are `i64` minor units (paise). `₹1 = 100`.
//!
//! - `balance_minor` is the total of the owner's funds
//! - `held_minor` is the sum of open holds
//! - available funds are `balance_minor - held_minor`

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod amount;
pub mod credential;
pub mod error;
pub mod fees;
pub mod ids;
pub mod order;
pub mod rewards;
pub mod tier;
pub mod transaction;
pub mod wallet;

pub use amount::Amount;
pub use credential::{CredentialRecord, Mpin, WeakSecretPolicy, WeakSecretReason, MPIN_LEN};
pub use error::{ErrorKind, Result, WalletError};
pub use fees::{PaymentMethod, TopupQuote};
pub use ids::{IdError, IdempotencyKey, OrderId, OwnerId, TransactionId, WalletId};
pub use order::{
    CancelReason, CancelledBy, LedgerEffect, Order, OrderEvent, OrderMetadata, OrderState,
};
pub use rewards::{RewardsSummary, MIN_REDEEMABLE_POINTS, POINTS_PER_RUPEE};
pub use tier::{Tier, TierDefinition, TierPolicy, VerificationLevel, WithdrawLimit};
pub use transaction::{Hold, HoldResolution, Transaction, TransactionKind, TransactionStatus};
pub use wallet::{Wallet, WalletStatus};
