//! Flat processing fees for top-ups.
//!
//! The fee is charged by the payment method on top of the top-up amount. It is recorded
//! on the credit for reference and never touches the wallet balance.

use serde::{Deserialize, Serialize};

use crate::amount::Amount;

/// Net banking fee (₹5).
pub const NET_BANKING_FEE_MINOR: i64 = 500;
/// Card fee (₹9).
pub const CARD_FEE_MINOR: i64 = 900;

/// How a top-up is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// UPI transfer, free.
    Upi,
    /// Net banking.
    NetBanking,
    /// Debit or credit card.
    Card,
}

impl PaymentMethod {
    /// Fee for one top-up in minor units.
    #[must_use]
    pub const fn fee_minor(self) -> i64 {
        match self {
            Self::Upi => 0,
            Self::NetBanking => NET_BANKING_FEE_MINOR,
            Self::Card => CARD_FEE_MINOR,
        }
    }
}

/// What a top-up will cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopupQuote {
    /// Payment method.
    pub method: PaymentMethod,
    /// Credited to the wallet.
    pub amount_minor: i64,
    /// Processing fee.
    pub fee_minor: i64,
    /// Charged to the payer.
    pub total_minor: i64,
}

impl TopupQuote {
    /// Quote a top-up of `amount` paid with `method`.
    #[must_use]
    pub const fn new(amount: Amount, method: PaymentMethod) -> Self {
        let fee_minor = method.fee_minor();
        Self {
            method,
            amount_minor: amount.minor(),
            fee_minor,
            total_minor: amount.minor() + fee_minor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_is_added_on_top() {
        let amount = Amount::new(100_000).unwrap();
        let card = TopupQuote::new(amount, PaymentMethod::Card);
        assert_eq!(card.total_minor, 100_900);

        let upi = TopupQuote::new(amount, PaymentMethod::Upi);
        assert_eq!(upi.fee_minor, 0);
        assert_eq!(upi.total_minor, 100_000);
    }
}
