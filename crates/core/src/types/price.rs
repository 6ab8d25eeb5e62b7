//! Catalogue prices.
//!
//! Every Rotharc enhancement is sold in euros, so the price type carries no
//! currency code and formats the way the French storefront displays it:
//! `4 999 €` for whole amounts and `4 999,50 €` otherwise.

use core::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// A price in euros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Create a price from a whole number of euros.
    #[must_use]
    pub fn euros(amount: u32) -> Self {
        Self(Decimal::from(amount))
    }

    /// Create a price from a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// The decimal amount in euros.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.0.round_dp(2);
        let whole = rounded.trunc();
        let cents = ((rounded - whole) * Decimal::ONE_HUNDRED).trunc();

        let digits = whole.abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('\u{202f}');
            }
            grouped.push(c);
        }
        if rounded.is_sign_negative() && !rounded.is_zero() {
            grouped.insert(0, '-');
        }

        if cents.is_zero() {
            write!(f, "{grouped} €")
        } else {
            write!(f, "{grouped},{:02} €", cents.abs().to_u32().unwrap_or(0))
        }
    }
}
