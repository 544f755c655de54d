//! Reward points derived from settled transactions.

use serde::{Deserialize, Serialize};

use crate::transaction::{Transaction, TransactionKind, TransactionStatus};

/// Points earned per rupee (100 minor units).
pub const POINTS_PER_RUPEE: i64 = 40;
/// Smallest balance that can be redeemed.
pub const MIN_REDEEMABLE_POINTS: i64 = 500;

/// Points balance for a wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardsSummary {
    /// Total points accrued.
    pub points: i64,
    /// Whether the total clears the redemption minimum.
    pub redeemable: bool,
    /// Points still needed before redemption is possible.
    pub points_to_redeem: i64,
}

/// Points for one amount.
#[must_use]
pub const fn points_for(amount_minor: i64) -> i64 {
    amount_minor * POINTS_PER_RUPEE / 100
}

/// Whether an entry earns points: successful top-ups and captured order payments.
#[must_use]
pub fn earns_points(tx: &Transaction) -> bool {
    tx.status == TransactionStatus::Success
        && matches!(tx.kind, TransactionKind::Credit | TransactionKind::Capture)
}

/// Aggregate points over a wallet's log.
pub fn accrue<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> RewardsSummary {
    let amount_minor: i64 = transactions
        .into_iter()
        .filter(|tx| earns_points(tx))
        .map(|tx| tx.amount_minor)
        .sum();
    let points = points_for(amount_minor);
    RewardsSummary {
        points,
        redeemable: points >= MIN_REDEEMABLE_POINTS,
        points_to_redeem: (MIN_REDEEMABLE_POINTS - points).max(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{OrderId, WalletId};
    use chrono::Utc;

    #[test]
    fn only_settled_inflows_and_captures_count() {
        let wallet = WalletId::generate();
        let now = Utc::now();
        let log = vec![
            Transaction::credit(wallet, 1_000, 1_000, now),
            Transaction::failed_credit(wallet, 50_000, 1_000, "declined", now),
            Transaction::hold(wallet, OrderId::generate(), 500, 1_000, now),
            Transaction::debit(wallet, 250, 750, now),
        ];
        let summary = accrue(&log);
        assert_eq!(summary.points, 400);
        assert!(!summary.redeemable);
        assert_eq!(summary.points_to_redeem, 100);
    }

    #[test]
    fn fractional_points_are_floored() {
        assert_eq!(points_for(1), 0);
        assert_eq!(points_for(3), 1);
        assert_eq!(points_for(1_250), 500);
    }
}
