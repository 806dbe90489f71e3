//! REST quote providers.
//!
//! Two connection modes exist for the same upstream API: a direct request
//! and one relayed through a CORS proxy. Both parse the same wire format,
//! so they share a provider type parameterized by mode.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::domain::{Candle, PriceQuote, QuoteFreshness, Symbol};
use crate::error::FeedError;

use super::provider::QuoteProvider;

/// How the request reaches the upstream API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Straight to the upstream endpoint.
    Direct,
    /// Through a CORS relay that wraps the upstream URL.
    Proxied,
}

/// Wire format for one quote in the upstream response.
#[derive(Debug, Deserialize)]
struct QuotePayload {
    symbol: String,
    price: Decimal,
    #[serde(default)]
    change_24h: Decimal,
    #[serde(default)]
    volume: Decimal,
    /// Milliseconds since epoch.
    timestamp: i64,
}

#[derive(Debug, Deserialize)]
struct QuotesResponse {
    quotes: Vec<QuotePayload>,
}

/// Wire format for one OHLC bar.
#[derive(Debug, Deserialize)]
struct CandlePayload {
    timestamp: i64,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    #[serde(default)]
    volume: Decimal,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    candles: Vec<CandlePayload>,
}

fn millis_to_utc(millis: i64) -> Result<DateTime<Utc>, FeedError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| FeedError::Payload(format!("bad timestamp {millis}")))
}

/// REST provider for one connection mode.
pub struct HttpQuoteProvider {
    client: Client,
    base_url: String,
    mode: ConnectionMode,
    proxy_url: Option<String>,
}

impl HttpQuoteProvider {
    /// Direct-connection provider.
    #[must_use]
    pub fn direct(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            mode: ConnectionMode::Direct,
            proxy_url: None,
        }
    }

    /// Proxy-relayed provider. `proxy_url` is prepended to the request URL.
    #[must_use]
    pub fn proxied(base_url: impl Into<String>, proxy_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            mode: ConnectionMode::Proxied,
            proxy_url: Some(proxy_url.into()),
        }
    }

    fn request_url(&self, path_and_query: &str) -> String {
        let upstream = format!("{}{}", self.base_url, path_and_query);
        match (&self.mode, &self.proxy_url) {
            (ConnectionMode::Proxied, Some(proxy)) => format!("{proxy}{upstream}"),
            _ => upstream,
        }
    }
}

#[async_trait]
impl QuoteProvider for HttpQuoteProvider {
    async fn fetch_quotes(
        &self,
        symbols: &[Symbol],
    ) -> Result<HashMap<Symbol, PriceQuote>, FeedError> {
        let joined = symbols
            .iter()
            .map(Symbol::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let url = self.request_url(&format!("/prices?symbols={joined}"));

        debug!(provider = self.name(), url = %url, "fetching quotes");

        let response: QuotesResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut quotes = HashMap::with_capacity(response.quotes.len());
        for payload in response.quotes {
            let symbol = Symbol::new(payload.symbol);
            quotes.insert(
                symbol.clone(),
                PriceQuote {
                    symbol,
                    price: payload.price,
                    change_24h: payload.change_24h,
                    volume: payload.volume,
                    timestamp: millis_to_utc(payload.timestamp)?,
                    freshness: QuoteFreshness::Live,
                },
            );
        }
        Ok(quotes)
    }

    async fn fetch_history(
        &self,
        symbol: &Symbol,
        lookback: usize,
    ) -> Result<Vec<Candle>, FeedError> {
        let url = self.request_url(&format!(
            "/history?symbol={}&limit={lookback}",
            symbol.as_str()
        ));

        debug!(provider = self.name(), url = %url, "fetching history");

        let response: HistoryResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.candles.is_empty() {
            return Err(FeedError::NoData(symbol.as_str().to_string()));
        }

        let mut candles = Vec::with_capacity(response.candles.len());
        for payload in response.candles {
            candles.push(Candle {
                timestamp: millis_to_utc(payload.timestamp)?,
                open: payload.open,
                high: payload.high,
                low: payload.low,
                close: payload.close,
                volume: payload.volume,
            });
        }
        candles.sort_by_key(|c| c.timestamp);
        Ok(candles)
    }

    fn name(&self) -> &'static str {
        match self.mode {
            ConnectionMode::Direct => "http-direct",
            ConnectionMode::Proxied => "http-proxied",
        }
    }
}
