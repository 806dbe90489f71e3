//! Monetary types for price and amount representation.

use rust_decimal::Decimal;

/// Price represented as a Decimal for precision.
pub type Price = Decimal;

/// Monetary amount (stake, margin, balance) represented as a Decimal.
pub type Amount = Decimal;
