//! Quote provider trait.
//!
//! A provider is one transport strategy for the same logical request. The
//! chain tries providers in order and falls back to the synthetic generator,
//! so provider errors never reach feed consumers.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::{Candle, PriceQuote, Symbol};
use crate::error::FeedError;

/// One source of quotes and historical candles.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Fetch current quotes for the given symbols in one batch.
    ///
    /// A provider may return a partial map; missing symbols are filled by
    /// the next link in the chain.
    async fn fetch_quotes(
        &self,
        symbols: &[Symbol],
    ) -> Result<HashMap<Symbol, PriceQuote>, FeedError>;

    /// Fetch an ordered historical OHLC series, oldest first.
    async fn fetch_history(
        &self,
        symbol: &Symbol,
        lookback: usize,
    ) -> Result<Vec<Candle>, FeedError>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}
