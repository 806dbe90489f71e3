//! Quote and candle types driving position recomputation. Ephemeral; never
//! persisted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::{Price, Symbol};

/// Whether a quote came from an upstream source or was generated locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteFreshness {
    /// Fetched from an upstream source this tick.
    Live,
    /// Generated from the last-known-good base price.
    Synthetic,
}

impl QuoteFreshness {
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, QuoteFreshness::Live)
    }
}

/// A point-in-time price for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    pub symbol: Symbol,
    pub price: Price,
    /// 24-hour change, as a percentage.
    pub change_24h: Decimal,
    /// 24-hour traded volume.
    pub volume: Decimal,
    pub timestamp: DateTime<Utc>,
    pub freshness: QuoteFreshness,
}

impl PriceQuote {
    /// A synthetic quote for `symbol` at `price`, stamped now.
    #[must_use]
    pub fn synthetic(symbol: Symbol, price: Price, change_24h: Decimal) -> Self {
        Self {
            symbol,
            price,
            change_24h,
            volume: Decimal::ZERO,
            timestamp: Utc::now(),
            freshness: QuoteFreshness::Synthetic,
        }
    }
}

/// One OHLC bar of a historical series.
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: Decimal,
}
