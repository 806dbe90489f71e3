//! Instrument classification and contract sizes.
//!
//! Contract size is keyed by instrument class, not by symbol, so new
//! instruments of a known class need no code change.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;

use super::Symbol;

/// Instrument class, which determines the contract size used for lot math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentClass {
    /// Fiat currency pair (EURUSD, GBPJPY, ...).
    FiatPair,
    /// Cryptocurrency (BTCUSD, ETHUSD, ...).
    Crypto,
    /// Precious metal (XAUUSD, XAGUSD, ...).
    Metal,
}

impl InstrumentClass {
    /// Standard contract size for one lot of this class.
    #[must_use]
    pub fn contract_size(self) -> Decimal {
        match self {
            InstrumentClass::FiatPair => Decimal::from(100_000),
            InstrumentClass::Crypto => Decimal::ONE,
            InstrumentClass::Metal => Decimal::from(100),
        }
    }
}

/// Substrings that mark a symbol as crypto under the legacy mapping.
const CRYPTO_MARKERS: &[&str] = &["BTC", "ETH", "SOL", "XRP", "DOGE", "ADA"];

/// Substrings that mark a symbol as a metal under the legacy mapping.
const METAL_MARKERS: &[&str] = &["XAU", "XAG", "XPT", "XPD"];

/// Resolves symbols to instrument classes.
///
/// An explicit symbol table is consulted first; symbols absent from the
/// table fall back to the legacy substring mapping so existing symbol
/// aliases keep classifying the way they always did.
#[derive(Debug, Clone, Default)]
pub struct InstrumentCatalog {
    entries: HashMap<Symbol, InstrumentClass>,
}

impl InstrumentCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an explicit symbol → class entry, overriding the fallback.
    #[must_use]
    pub fn with_entry(mut self, symbol: Symbol, class: InstrumentClass) -> Self {
        self.entries.insert(symbol, class);
        self
    }

    /// Resolve the class for a symbol.
    #[must_use]
    pub fn classify(&self, symbol: &Symbol) -> InstrumentClass {
        if let Some(class) = self.entries.get(symbol) {
            return *class;
        }
        let s = symbol.as_str();
        if CRYPTO_MARKERS.iter().any(|m| s.contains(m)) {
            InstrumentClass::Crypto
        } else if METAL_MARKERS.iter().any(|m| s.contains(m)) {
            InstrumentClass::Metal
        } else {
            InstrumentClass::FiatPair
        }
    }

    /// Contract size for a symbol, via its class.
    #[must_use]
    pub fn contract_size(&self, symbol: &Symbol) -> Decimal {
        self.classify(symbol).contract_size()
    }
}
