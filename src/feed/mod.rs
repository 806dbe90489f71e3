//! Price feed adapter: transport strategies, synthetic fallback, and the
//! subscriber registry.

mod chain;
#[allow(clippy::module_inception)]
mod feed;
mod http;
mod provider;
mod synthetic;

pub use chain::ProviderChain;
pub use feed::PriceFeed;
pub use http::{ConnectionMode, HttpQuoteProvider};
pub use provider::QuoteProvider;
pub use synthetic::SyntheticGenerator;
