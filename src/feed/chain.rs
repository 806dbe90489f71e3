//! Provider strategy chain.
//!
//! Providers are tried in registration order; the first successful response
//! wins. The synthetic generator is the guaranteed-last strategy, so the
//! chain is total: every request yields quotes, and transport errors stop
//! here.

use std::collections::HashMap;

use chrono::Duration;
use tracing::warn;

use crate::domain::{Candle, PriceQuote, Symbol};

use super::provider::QuoteProvider;
use super::synthetic::SyntheticGenerator;

/// Bar spacing for synthetic history runs.
const SYNTHETIC_BAR_STEP_MINUTES: i64 = 15;

/// Ordered chain of quote providers with a synthetic fallback.
pub struct ProviderChain {
    providers: Vec<Box<dyn QuoteProvider>>,
    synthetic: SyntheticGenerator,
}

impl Default for ProviderChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderChain {
    /// An empty chain: every request is served synthetically.
    #[must_use]
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            synthetic: SyntheticGenerator::new(),
        }
    }

    /// Append a provider. Order of registration is order of attempt.
    #[must_use]
    pub fn with_provider(mut self, provider: Box<dyn QuoteProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Fetch quotes for all `symbols`. Infallible: symbols no provider could
    /// serve come back tagged synthetic.
    pub async fn current_prices(&self, symbols: &[Symbol]) -> HashMap<Symbol, PriceQuote> {
        let mut quotes: HashMap<Symbol, PriceQuote> = HashMap::with_capacity(symbols.len());
        let mut missing: Vec<Symbol> = symbols.to_vec();

        for provider in &self.providers {
            if missing.is_empty() {
                break;
            }
            match provider.fetch_quotes(&missing).await {
                Ok(batch) => {
                    for (symbol, quote) in batch {
                        self.synthetic.observe(&symbol, quote.price);
                        quotes.insert(symbol, quote);
                    }
                    missing.retain(|s| !quotes.contains_key(s));
                }
                Err(error) => {
                    warn!(
                        provider = provider.name(),
                        error = %error,
                        "quote fetch failed, trying next provider"
                    );
                }
            }
        }

        for symbol in missing {
            let quote = self.synthetic.quote(&symbol);
            quotes.insert(symbol, quote);
        }
        quotes
    }

    /// Fetch a historical series. Infallible: when every provider fails, a
    /// synthetic OHLC run anchored to the symbol's base price is generated.
    pub async fn historical_series(&self, symbol: &Symbol, lookback: usize) -> Vec<Candle> {
        for provider in &self.providers {
            match provider.fetch_history(symbol, lookback).await {
                Ok(candles) => return candles,
                Err(error) => {
                    warn!(
                        provider = provider.name(),
                        symbol = %symbol,
                        error = %error,
                        "history fetch failed, trying next provider"
                    );
                }
            }
        }
        self.synthetic
            .history(symbol, lookback, Duration::minutes(SYNTHETIC_BAR_STEP_MINUTES))
    }

    /// The synthetic generator backing this chain.
    #[must_use]
    pub fn synthetic(&self) -> &SyntheticGenerator {
        &self.synthetic
    }
}
