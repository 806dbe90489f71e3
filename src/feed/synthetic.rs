//! Synthetic quote generation.
//!
//! The guaranteed-last link of the provider chain: never fails, always
//! produces a plausible quote anchored to a per-symbol base price. Bases are
//! seeded with defaults and refreshed whenever a live quote comes through,
//! so synthetic output stays near the last-known-good price.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use parking_lot::Mutex;
use rand::Rng;
use rust_decimal::Decimal;

use crate::domain::{Candle, PriceQuote, Symbol};

/// Maximum perturbation per refresh, in basis points (200 = 2%).
const MAX_DRIFT_BPS: i64 = 200;

/// Base price for a symbol never seen before, live or seeded.
const UNKNOWN_SYMBOL_BASE: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

fn seed_bases() -> HashMap<Symbol, Decimal> {
    [
        ("BTCUSD", Decimal::from_parts(43250, 0, 0, false, 0)),
        ("ETHUSD", Decimal::from_parts(2280, 0, 0, false, 0)),
        ("SOLUSD", Decimal::from_parts(98, 0, 0, false, 0)),
        ("EURUSD", Decimal::from_parts(108, 0, 0, false, 2)),
        ("GBPUSD", Decimal::from_parts(127, 0, 0, false, 2)),
        ("USDJPY", Decimal::from_parts(14950, 0, 0, false, 2)),
        ("XAUUSD", Decimal::from_parts(2040, 0, 0, false, 0)),
        ("XAGUSD", Decimal::from_parts(2410, 0, 0, false, 2)),
    ]
    .into_iter()
    .map(|(s, p)| (Symbol::new(s), p))
    .collect()
}

/// Generates bounded pseudo-random quotes around last-known-good bases.
pub struct SyntheticGenerator {
    bases: Mutex<HashMap<Symbol, Decimal>>,
}

impl Default for SyntheticGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bases: Mutex::new(seed_bases()),
        }
    }

    /// Record a live price as the new base for a symbol.
    pub fn observe(&self, symbol: &Symbol, price: Decimal) {
        if price > Decimal::ZERO {
            self.bases.lock().insert(symbol.clone(), price);
        }
    }

    /// Current base price for a symbol.
    #[must_use]
    pub fn base(&self, symbol: &Symbol) -> Decimal {
        self.bases
            .lock()
            .get(symbol)
            .copied()
            .unwrap_or(UNKNOWN_SYMBOL_BASE)
    }

    fn drift(&self, base: Decimal) -> Decimal {
        let bps = rand::thread_rng().gen_range(-MAX_DRIFT_BPS..=MAX_DRIFT_BPS);
        base * (Decimal::ONE + Decimal::new(bps, 4))
    }

    /// Generate a quote for a symbol; the perturbed price becomes the new
    /// base so consecutive synthetic quotes walk rather than jump.
    #[must_use]
    pub fn quote(&self, symbol: &Symbol) -> PriceQuote {
        let base = self.base(symbol);
        let price = self.drift(base);
        self.bases.lock().insert(symbol.clone(), price);

        let change_24h = if base.is_zero() {
            Decimal::ZERO
        } else {
            (price - base) / base * Decimal::from(100)
        };
        PriceQuote::synthetic(symbol.clone(), price, change_24h)
    }

    /// Generate a full OHLC run of `lookback` bars, one per `step`, ending
    /// now, anchored to the symbol's base price.
    #[must_use]
    pub fn history(&self, symbol: &Symbol, lookback: usize, step: Duration) -> Vec<Candle> {
        let mut price = self.base(symbol);
        let end = Utc::now();
        let mut candles = Vec::with_capacity(lookback);

        for i in (0..lookback).rev() {
            let open = price;
            let a = self.drift(open);
            let b = self.drift(open);
            let close = self.drift(open);
            let high = open.max(a).max(b).max(close);
            let low = open.min(a).min(b).min(close);
            candles.push(Candle {
                timestamp: end - step * i32::try_from(i).unwrap_or(i32::MAX),
                open,
                high,
                low,
                close,
                volume: Decimal::ZERO,
            });
            price = close;
        }
        candles
    }
}
