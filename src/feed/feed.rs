//! The price feed: subscriber registry plus polling loop.
//!
//! The registry is owned here and mutated only through `subscribe` and
//! `unsubscribe`. Each poll tick fetches the whole active symbol set in one
//! batch and fans out per symbol, in arrival order within a symbol's stream.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::domain::{Candle, PriceQuote, Symbol};

use super::chain::ProviderChain;

/// Default polling cadence.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Continuous quote source for subscribed symbols.
pub struct PriceFeed {
    chain: ProviderChain,
    subscribers: Mutex<HashMap<Symbol, Vec<mpsc::UnboundedSender<PriceQuote>>>>,
    poll_interval: Duration,
}

impl PriceFeed {
    #[must_use]
    pub fn new(chain: ProviderChain) -> Self {
        Self {
            chain,
            subscribers: Mutex::new(HashMap::new()),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Register interest in a symbol. Quotes arrive on the returned channel
    /// starting from the next poll tick.
    pub fn subscribe(&self, symbol: Symbol) -> mpsc::UnboundedReceiver<PriceQuote> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().entry(symbol).or_default().push(tx);
        rx
    }

    /// Drop a symbol from the active set. No further callbacks are delivered
    /// for it; receivers see their channel close.
    pub fn unsubscribe(&self, symbol: &Symbol) {
        if self.subscribers.lock().remove(symbol).is_some() {
            info!(symbol = %symbol, "unsubscribed");
        }
    }

    /// Symbols currently polled.
    #[must_use]
    pub fn active_symbols(&self) -> Vec<Symbol> {
        self.subscribers.lock().keys().cloned().collect()
    }

    /// One-shot quote fetch; does not touch the registry.
    pub async fn current_prices(&self, symbols: &[Symbol]) -> HashMap<Symbol, PriceQuote> {
        self.chain.current_prices(symbols).await
    }

    /// Historical OHLC series for a symbol.
    pub async fn historical_series(&self, symbol: &Symbol, lookback: usize) -> Vec<Candle> {
        self.chain.historical_series(symbol, lookback).await
    }

    /// Run one poll tick: batch-fetch every active symbol and fan out.
    pub async fn tick(&self) {
        let symbols = self.active_symbols();
        if symbols.is_empty() {
            return;
        }

        let quotes = self.chain.current_prices(&symbols).await;

        let mut registry = self.subscribers.lock();
        let mut delivered = 0usize;
        for (symbol, quote) in quotes {
            // Subscribers may have unsubscribed while the fetch was in
            // flight; their results are dropped here.
            let Some(senders) = registry.get_mut(&symbol) else {
                continue;
            };
            senders.retain(|tx| tx.send(quote.clone()).is_ok());
            delivered += senders.len();
            if senders.is_empty() {
                registry.remove(&symbol);
            }
        }
        debug!(subscribers = delivered, "tick fan-out complete");
    }

    /// Poll forever at the configured cadence.
    pub async fn run(&self) {
        info!(interval_secs = self.poll_interval.as_secs(), "price feed started");
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.tick().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_feed() -> PriceFeed {
        PriceFeed::new(ProviderChain::new())
    }

    #[tokio::test]
    async fn subscribe_receives_quotes_on_tick() {
        let feed = synthetic_feed();
        let mut rx = feed.subscribe(Symbol::new("BTCUSD"));

        feed.tick().await;

        let quote = rx.try_recv().expect("quote after tick");
        assert_eq!(quote.symbol, Symbol::new("BTCUSD"));
    }

    #[tokio::test]
    async fn unsubscribe_stops_callbacks_immediately() {
        let feed = synthetic_feed();
        let symbol = Symbol::new("ETHUSD");
        let mut rx = feed.subscribe(symbol.clone());

        feed.unsubscribe(&symbol);
        feed.tick().await;

        // Channel closed, nothing delivered.
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
        assert!(feed.active_symbols().is_empty());
    }

    #[tokio::test]
    async fn dropped_receiver_is_pruned_from_registry() {
        let feed = synthetic_feed();
        let rx = feed.subscribe(Symbol::new("XAUUSD"));
        drop(rx);

        feed.tick().await;
        assert!(feed.active_symbols().is_empty());
    }

    #[tokio::test]
    async fn batch_tick_covers_all_active_symbols() {
        let feed = synthetic_feed();
        let mut rx_btc = feed.subscribe(Symbol::new("BTCUSD"));
        let mut rx_eur = feed.subscribe(Symbol::new("EURUSD"));

        feed.tick().await;

        assert!(rx_btc.try_recv().is_ok());
        assert!(rx_eur.try_recv().is_ok());
    }
}
