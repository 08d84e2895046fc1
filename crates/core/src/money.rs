use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An amount in a ledger currency, held with two fractional digits.
///
/// Values always fit in `i64` minor units; constructors that could break
/// that return `None` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    /// Accepts a decimal with at most two fractional digits that fits in
    /// `i64` cents.
    pub fn try_from_decimal(decimal: Decimal) -> Option<Self> {
        let normalized = decimal.normalize();
        if normalized.scale() > 2 {
            return None;
        }
        (normalized * Decimal::from(100)).to_i64()?;
        Some(Money(normalized.round_dp(2)))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
