//! Concurrent wallet services.
//!
//! [`Engine`] wires three services over one [`wallet_store::Store`]:
//!
//! - [`Ledger`]: wallet summaries, credits, holds, captures, releases and debits.
//! - [`CredentialGate`]: MPIN creation, verification with lockout, and change.
//! - [`OrderLifecycle`]: order placement, delivery signals, cancellation and the
//!   stale-hold sweep.
//!
//! All balance-affecting calls for one wallet are serialized through a per-wallet
//! critical section; calls for different wallets run in parallel. Each call commits its
//! summary change and log entries as one write set.
//!
//! # Example
//!
//! ```
//! use wallet_core::{Amount, OwnerId, Tier};
//! use wallet_engine::{CreditRequest, Engine, EngineConfig};
//!
//! # async fn example() -> wallet_core::Result<()> {
//! let engine = Engine::in_memory(EngineConfig::default());
//! let wallet = engine.ledger().open_wallet(OwnerId::generate(), Tier::Starter).await?;
//! let receipt = engine
//!     .ledger()
//!     .credit(CreditRequest::new(wallet.id, Amount::new(200_000)?))
//!     .await?;
//! assert_eq!(receipt.balance_minor, 200_000);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod config;
pub mod credentials;
pub mod crypto;
pub mod engine;
pub mod ledger;
pub mod locks;
pub mod orders;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use credentials::CredentialGate;
pub use engine::{Engine, WithdrawRequest};
pub use ledger::{
    BalanceSnapshot, CreditRequest, DebitRequest, Ledger, LedgerReceipt, ReconcileReport,
    SummaryFigures,
};
pub use locks::KeyedLocks;
pub use orders::{OrderLifecycle, PlaceOrder, STALE_HOLD_REASON};
