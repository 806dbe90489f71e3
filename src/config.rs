//! Configuration loading and logging initialization.
//!
//! Loaded from a TOML file; every section has serde defaults so a missing
//! file or section falls back to a working demo setup.

use std::path::Path;

use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{ConfigError, Result};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Price feed configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Upstream quote API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Optional CORS relay prefix for the proxied transport strategy.
    #[serde(default)]
    pub proxy_url: Option<String>,
    /// Polling cadence for push-style updates.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Default candle count for historical series.
    #[serde(default = "default_history_lookback")]
    pub history_lookback: usize,
    /// Symbols the demo loop subscribes to.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,
}

fn default_api_url() -> String {
    "https://quotes.example.com/v1".to_string()
}

const fn default_poll_interval() -> u64 {
    5
}

const fn default_history_lookback() -> usize {
    96
}

fn default_symbols() -> Vec<String> {
    vec!["BTCUSD".into(), "ETHUSD".into(), "EURUSD".into(), "XAUUSD".into()]
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            proxy_url: None,
            poll_interval_seconds: default_poll_interval(),
            history_lookback: default_history_lookback(),
            symbols: default_symbols(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load from a TOML file. A missing file yields the defaults; a present
    /// but malformed file is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.feed.api_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "feed.api_url",
                reason: "must not be empty".into(),
            }
            .into());
        }
        if self.feed.poll_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "feed.poll_interval_seconds",
                reason: "must be at least 1".into(),
            }
            .into());
        }
        Ok(())
    }

    /// Initialize the tracing subscriber with this logging configuration.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.logging.level));

        match self.logging.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).init();
            }
            _ => {
                fmt().with_env_filter(filter).init();
            }
        }
    }
}
