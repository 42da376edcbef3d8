//! Market data provider trait definitions.
//!
//! This module defines the core `MarketDataProvider` trait that all
//! market data providers must implement.

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::{
    AssetProfile, Bar, BatchResult, DateRange, Dividend, EarningsOptions, EarningsReport,
    Fundamentals, Interval, NewsArticle, Quote, SymbolMatch, UpcomingEarningsOptions,
};
use crate::registry::EmptinessPolicy;

use super::capabilities::{BatchPolicy, Capability, ProviderCapabilities, ProviderDescriptor};
use super::chunking::ChunkedBatch;

/// Trait for market data providers.
///
/// Implement this trait to add support for a new market data source. Every
/// data operation defaults to [`MarketDataError::NotSupported`]; adapters
/// override the ones they implement and declare them in `capabilities()`.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use tickerbridge_market_data::provider::{
///     CapabilityCategory, MarketDataProvider, ProviderCapabilities,
/// };
///
/// struct MyProvider {
///     api_key: String,
/// }
///
/// #[async_trait]
/// impl MarketDataProvider for MyProvider {
///     fn id(&self) -> &'static str {
///         "MY_PROVIDER"
///     }
///
///     fn capabilities(&self) -> ProviderCapabilities {
///         ProviderCapabilities::from_categories(&[CapabilityCategory::Realtime])
///     }
///
///     async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
///         // ... call the vendor
///     }
/// }
/// ```
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Unique identifier for this provider.
    ///
    /// Should be a constant string like "YAHOO", "ALPHA_VANTAGE", etc.
    fn id(&self) -> &'static str;

    /// Provider priority for ordering.
    ///
    /// Lower values = higher priority. Default is 10.
    fn priority(&self) -> i32 {
        10
    }

    /// Operations this provider implements.
    fn capabilities(&self) -> ProviderCapabilities;

    /// Pacing for the emulated `get_quotes` / `get_profiles`.
    fn batch_policy(&self) -> BatchPolicy {
        BatchPolicy::default()
    }

    /// Descriptor built from `id()`, `priority()` and `capabilities()`.
    fn descriptor(&self) -> ProviderDescriptor {
        ProviderDescriptor::new(self.id(), self.priority(), self.capabilities())
    }

    /// Latest quote for a symbol.
    async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let _ = symbol;
        Err(self.unsupported(Capability::Quote))
    }

    /// Latest quotes for many symbols.
    ///
    /// Default implementation calls `get_quote` per symbol, paced by
    /// `batch_policy()`. Zero-priced quotes count as failures.
    async fn get_quotes(&self, symbols: &[String]) -> Result<BatchResult<Quote>, MarketDataError> {
        Ok(ChunkedBatch::new(self.id(), Capability::Quotes, self.batch_policy())
            .run(symbols, EmptinessPolicy::Reject, |symbol| async move {
                self.get_quote(&symbol).await
            })
            .await)
    }

    async fn get_profile(&self, symbol: &str) -> Result<AssetProfile, MarketDataError> {
        let _ = symbol;
        Err(self.unsupported(Capability::Profile))
    }

    /// Profiles for many symbols; chunked over `get_profile` by default.
    async fn get_profiles(
        &self,
        symbols: &[String],
    ) -> Result<BatchResult<AssetProfile>, MarketDataError> {
        Ok(
            ChunkedBatch::new(self.id(), Capability::Profiles, self.batch_policy())
                .run(symbols, EmptinessPolicy::Reject, |symbol| async move {
                    self.get_profile(&symbol).await
                })
                .await,
        )
    }

    /// Bars for `range`, ascending by timestamp.
    async fn get_time_series(
        &self,
        symbol: &str,
        interval: Interval,
        range: DateRange,
    ) -> Result<Vec<Bar>, MarketDataError> {
        let _ = (symbol, interval, range);
        Err(self.unsupported(Capability::TimeSeries))
    }

    async fn get_fundamentals(&self, symbol: &str) -> Result<Fundamentals, MarketDataError> {
        let _ = symbol;
        Err(self.unsupported(Capability::Fundamentals))
    }

    /// Dividends with an ex-date inside `range`. An empty list is a valid answer.
    async fn get_dividends(
        &self,
        symbol: &str,
        range: DateRange,
    ) -> Result<Vec<Dividend>, MarketDataError> {
        let _ = (symbol, range);
        Err(self.unsupported(Capability::Dividends))
    }

    async fn get_earnings(
        &self,
        symbol: &str,
        options: &EarningsOptions,
    ) -> Result<Vec<EarningsReport>, MarketDataError> {
        let _ = (symbol, options);
        Err(self.unsupported(Capability::Earnings))
    }

    async fn get_upcoming_earnings(
        &self,
        options: &UpcomingEarningsOptions,
    ) -> Result<Vec<EarningsReport>, MarketDataError> {
        let _ = options;
        Err(self.unsupported(Capability::UpcomingEarnings))
    }

    async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolMatch>, MarketDataError> {
        let _ = query;
        Err(self.unsupported(Capability::SymbolSearch))
    }

    /// News for `symbols`, or general market news when `symbols` is empty.
    async fn get_market_news(
        &self,
        symbols: &[String],
        limit: usize,
    ) -> Result<Vec<NewsArticle>, MarketDataError> {
        let _ = (symbols, limit);
        Err(self.unsupported(Capability::MarketNews))
    }

    #[doc(hidden)]
    fn unsupported(&self, capability: Capability) -> MarketDataError {
        MarketDataError::NotSupported {
            operation: capability.to_string(),
            provider: self.id().to_string(),
        }
    }
}
