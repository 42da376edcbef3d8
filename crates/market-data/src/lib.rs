//! Tickerbridge Market Data Crate
//!
//! Provider-agnostic market data with ordered fallback across vendors.
//!
//! # Overview
//!
//! - Eleven operations in four categories: realtime quotes, historical bars,
//!   fundamentals (profiles, metrics, dividends, earnings, calendar) and news
//! - Vendor adapters for Yahoo Finance, Finnhub and Alpha Vantage
//! - Single-key fallback: providers are tried in priority order until one
//!   gives a usable answer
//! - Batch resolution: each provider only sees the keys earlier providers
//!   could not resolve, and every requested key gets exactly one entry
//!
//! # Architecture
//!
//! ```text
//! +--------------------+
//! | MarketDataService  |  (one method per operation)
//! +--------------------+
//!       |         |
//!       v         v
//! +----------+ +---------------+
//! | Fallback | | BatchResolver |
//! +----------+ +---------------+
//!       |         |
//!       v         v
//! +--------------------+
//! |  ProviderRegistry  |  (priority order, capability filter)
//! +--------------------+
//!           |
//!           v
//! +--------------------+
//! | MarketDataProvider |  (Yahoo, Finnhub, Alpha Vantage)
//! +--------------------+
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tickerbridge_market_data::{build_registry, MarketDataService, ProviderSettings};
//!
//! # async fn run() -> Result<(), tickerbridge_market_data::errors::MarketDataError> {
//! let registry = build_registry(&ProviderSettings::from_env()?)?;
//! let service = MarketDataService::new(Arc::new(registry));
//! let quote = service.get_quote("AAPL", None).await?;
//! println!("{} {}", quote.symbol, quote.price);
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;
pub mod service;
pub mod settings;

#[cfg(test)]
mod testing;

pub use errors::{AttemptOutcome, MarketDataError, ProviderAttempt};

pub use models::{
    AssetProfile, Bar, BatchResult, DateRange, Dividend, EarningsOptions, EarningsReport,
    Fundamentals, Interval, KeyedResult, NewsArticle, ProviderId, Quote, SymbolMatch,
    UpcomingEarningsOptions,
};

pub use provider::alpha_vantage::AlphaVantageProvider;
pub use provider::finnhub::FinnhubProvider;
pub use provider::yahoo::YahooProvider;
pub use provider::{
    BatchPolicy, Capability, CapabilityCategory, ChunkedBatch, MarketDataProvider,
    ProviderCapabilities, ProviderDescriptor, CHUNK_SIZE,
};

pub use registry::{
    BatchResolver, Emptiness, EmptinessPolicy, FallbackExecutor, ProviderRegistry,
    RegisteredProvider,
};

pub use service::MarketDataService;
pub use settings::{build_registry, ProviderSetting, ProviderSettings, KNOWN_PROVIDERS};
