use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info};

use margindesk::config::Config;
use margindesk::domain::{InstrumentCatalog, Symbol};
use margindesk::engine::LifecycleManager;
use margindesk::feed::{HttpQuoteProvider, PriceFeed, ProviderChain};
use margindesk::store::MemoryStore;

#[derive(Parser)]
#[command(name = "margindesk", about = "Leveraged position simulation core")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the quote loop against an in-memory store.
    Run,
    /// Fetch current quotes for the given symbols and print them.
    Quote { symbols: Vec<String> },
    /// Fetch a historical OHLC series for one symbol.
    History { symbol: String },
}

fn build_chain(config: &Config) -> ProviderChain {
    let mut chain = ProviderChain::new()
        .with_provider(Box::new(HttpQuoteProvider::direct(&config.feed.api_url)));
    if let Some(proxy) = &config.feed.proxy_url {
        chain = chain.with_provider(Box::new(HttpQuoteProvider::proxied(
            &config.feed.api_url,
            proxy,
        )));
    }
    chain
}

async fn run(config: Config) -> anyhow::Result<()> {
    let feed = Arc::new(
        PriceFeed::new(build_chain(&config))
            .with_poll_interval(Duration::from_secs(config.feed.poll_interval_seconds)),
    );
    let engine = Arc::new(LifecycleManager::new(
        Arc::new(MemoryStore::new()),
        InstrumentCatalog::new(),
    ));

    for raw in &config.feed.symbols {
        let symbol = Symbol::new(raw);
        let mut rx = feed.subscribe(symbol.clone());
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            while let Some(quote) = rx.recv().await {
                info!(
                    symbol = %quote.symbol,
                    price = %quote.price,
                    live = quote.freshness.is_live(),
                    "quote"
                );
                engine.apply_price_quote(&quote);
            }
        });
    }

    let poller = Arc::clone(&feed);
    tokio::spawn(async move { poller.run().await });

    let mut expiry = tokio::time::interval(Duration::from_secs(30));
    loop {
        expiry.tick().await;
        let expired = engine.expire_due();
        if expired > 0 {
            info!(expired, "expiry sweep");
        }
    }
}

async fn quote(config: Config, symbols: Vec<String>) -> anyhow::Result<()> {
    let chain = build_chain(&config);
    let symbols: Vec<Symbol> = symbols.iter().map(Symbol::new).collect();
    let quotes = chain.current_prices(&symbols).await;
    for symbol in &symbols {
        if let Some(quote) = quotes.get(symbol) {
            let tag = if quote.freshness.is_live() { "live" } else { "synthetic" };
            println!("{symbol}  {}  ({tag})", quote.price);
        }
    }
    Ok(())
}

async fn history(config: Config, symbol: String) -> anyhow::Result<()> {
    let chain = build_chain(&config);
    let candles = chain
        .historical_series(&Symbol::new(symbol), config.feed.history_lookback)
        .await;
    for candle in candles {
        println!(
            "{}  o={} h={} l={} c={}",
            candle.timestamp, candle.open, candle.high, candle.low, candle.close
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    config.init_logging();
    info!("margindesk starting");

    let result = tokio::select! {
        result = async {
            match cli.command {
                Command::Run => run(config).await,
                Command::Quote { symbols } => quote(config, symbols).await,
                Command::History { symbol } => history(config, symbol).await,
            }
        } => result,
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
            Ok(())
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Fatal error");
        std::process::exit(1);
    }

    info!("margindesk stopped");
}
