//! Market data service - one entry point per operation.
//!
//! ```text
//! caller ──▶ MarketDataService ──▶ FallbackExecutor ──▶ provider 1, 2, ...
//!                    │
//!                    └──────────▶ BatchResolver ────▶ provider 1 (all keys)
//!                                                     provider 2 (pending keys)
//! ```
//!
//! Every operation takes an optional preferred provider id. When it names a
//! registered provider supporting the operation, that provider is tried
//! first; otherwise priority order applies.

use std::sync::Arc;

use crate::errors::MarketDataError;
use crate::models::{
    AssetProfile, Bar, BatchResult, DateRange, Dividend, EarningsOptions, EarningsReport,
    Fundamentals, Interval, NewsArticle, Quote, SymbolMatch, UpcomingEarningsOptions,
};
use crate::provider::{Capability, ProviderDescriptor};
use crate::registry::{BatchResolver, EmptinessPolicy, FallbackExecutor, ProviderRegistry};

/// Provider-agnostic access to every market data operation.
#[derive(Clone, Debug)]
pub struct MarketDataService {
    registry: Arc<ProviderRegistry>,
    fallback: FallbackExecutor,
    batch: BatchResolver,
}

impl MarketDataService {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            fallback: FallbackExecutor::new(Arc::clone(&registry)),
            batch: BatchResolver::new(Arc::clone(&registry)),
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Registered providers, highest priority first.
    pub fn providers(&self) -> Vec<ProviderDescriptor> {
        self.registry.descriptors()
    }

    // ========================================================================
    // Realtime
    // ========================================================================

    pub async fn get_quote(
        &self,
        symbol: &str,
        preferred: Option<&str>,
    ) -> Result<Quote, MarketDataError> {
        self.fallback
            .resolve_preferring(
                Capability::Quote,
                EmptinessPolicy::for_capability(Capability::Quote),
                preferred,
                |p| async move { p.get_quote(symbol).await },
            )
            .await
    }

    /// Quotes for many symbols. Never fails as a whole; look at each entry.
    pub async fn get_quotes(
        &self,
        symbols: &[String],
        preferred: Option<&str>,
    ) -> BatchResult<Quote> {
        self.batch
            .resolve_batch_preferring(Capability::Quotes, symbols, preferred, |p, pending| async move {
                p.get_quotes(&pending).await
            })
            .await
    }

    // ========================================================================
    // Fundamentals
    // ========================================================================

    pub async fn get_profile(
        &self,
        symbol: &str,
        preferred: Option<&str>,
    ) -> Result<AssetProfile, MarketDataError> {
        self.fallback
            .resolve_preferring(
                Capability::Profile,
                EmptinessPolicy::for_capability(Capability::Profile),
                preferred,
                |p| async move { p.get_profile(symbol).await },
            )
            .await
    }

    pub async fn get_profiles(
        &self,
        symbols: &[String],
        preferred: Option<&str>,
    ) -> BatchResult<AssetProfile> {
        self.batch
            .resolve_batch_preferring(
                Capability::Profiles,
                symbols,
                preferred,
                |p, pending| async move { p.get_profiles(&pending).await },
            )
            .await
    }

    pub async fn get_fundamentals(
        &self,
        symbol: &str,
        preferred: Option<&str>,
    ) -> Result<Fundamentals, MarketDataError> {
        self.fallback
            .resolve_preferring(
                Capability::Fundamentals,
                EmptinessPolicy::for_capability(Capability::Fundamentals),
                preferred,
                |p| async move { p.get_fundamentals(symbol).await },
            )
            .await
    }

    /// Dividends in `range`. An empty list from the first provider that
    /// answers is a valid result.
    pub async fn get_dividends(
        &self,
        symbol: &str,
        range: DateRange,
        preferred: Option<&str>,
    ) -> Result<Vec<Dividend>, MarketDataError> {
        validate_range(&range)?;
        self.fallback
            .resolve_preferring(
                Capability::Dividends,
                EmptinessPolicy::for_capability(Capability::Dividends),
                preferred,
                |p| async move { p.get_dividends(symbol, range).await },
            )
            .await
    }

    pub async fn get_earnings(
        &self,
        symbol: &str,
        options: &EarningsOptions,
        preferred: Option<&str>,
    ) -> Result<Vec<EarningsReport>, MarketDataError> {
        self.fallback
            .resolve_preferring(
                Capability::Earnings,
                EmptinessPolicy::for_capability(Capability::Earnings),
                preferred,
                |p| async move { p.get_earnings(symbol, options).await },
            )
            .await
    }

    pub async fn get_upcoming_earnings(
        &self,
        options: &UpcomingEarningsOptions,
        preferred: Option<&str>,
    ) -> Result<Vec<EarningsReport>, MarketDataError> {
        if options.from > options.to {
            return Err(MarketDataError::InvalidConfig(format!(
                "calendar window starts after it ends ({} > {})",
                options.from, options.to
            )));
        }
        self.fallback
            .resolve_preferring(
                Capability::UpcomingEarnings,
                EmptinessPolicy::for_capability(Capability::UpcomingEarnings),
                preferred,
                |p| async move { p.get_upcoming_earnings(options).await },
            )
            .await
    }

    // ========================================================================
    // Historical
    // ========================================================================

    pub async fn get_time_series(
        &self,
        symbol: &str,
        interval: Interval,
        range: DateRange,
        preferred: Option<&str>,
    ) -> Result<Vec<Bar>, MarketDataError> {
        validate_range(&range)?;
        self.fallback
            .resolve_preferring(
                Capability::TimeSeries,
                EmptinessPolicy::for_capability(Capability::TimeSeries),
                preferred,
                |p| async move { p.get_time_series(symbol, interval, range).await },
            )
            .await
    }

    pub async fn search_symbols(
        &self,
        query: &str,
        preferred: Option<&str>,
    ) -> Result<Vec<SymbolMatch>, MarketDataError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(MarketDataError::InvalidConfig(
                "search query is empty".to_string(),
            ));
        }
        self.fallback
            .resolve_preferring(
                Capability::SymbolSearch,
                EmptinessPolicy::for_capability(Capability::SymbolSearch),
                preferred,
                |p| async move { p.search_symbols(query).await },
            )
            .await
    }

    // ========================================================================
    // News
    // ========================================================================

    /// Latest news for `symbols`, or general market news when empty.
    pub async fn get_market_news(
        &self,
        symbols: &[String],
        limit: usize,
        preferred: Option<&str>,
    ) -> Result<Vec<NewsArticle>, MarketDataError> {
        self.fallback
            .resolve_preferring(
                Capability::MarketNews,
                EmptinessPolicy::for_capability(Capability::MarketNews),
                preferred,
                |p| async move { p.get_market_news(symbols, limit).await },
            )
            .await
    }
}

fn validate_range(range: &DateRange) -> Result<(), MarketDataError> {
    if range.is_valid() {
        Ok(())
    } else {
        Err(MarketDataError::InvalidConfig(format!(
            "range starts after it ends ({} > {})",
            range.start, range.end
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderCapabilities;
    use crate::testing::{Answer, ScriptedProvider};
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    fn service(providers: Vec<Arc<ScriptedProvider>>) -> MarketDataService {
        let mut registry = ProviderRegistry::new();
        for p in providers {
            registry.register_provider(p).unwrap();
        }
        MarketDataService::new(Arc::new(registry))
    }

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_dividends_single_provider_empty() {
        let provider = Arc::new(ScriptedProvider::new("A", 1).answer("KO", Answer::Empty));
        let svc = service(vec![provider.clone()]);

        let dividends = svc
            .get_dividends("KO", DateRange::last_days(365), None)
            .await
            .unwrap();
        assert!(dividends.is_empty());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_quote_falls_back_in_priority_order() {
        let a = Arc::new(ScriptedProvider::new("A", 1).answer("AAPL", Answer::Empty));
        let b = Arc::new(ScriptedProvider::new("B", 2).answer("AAPL", Answer::Price(dec!(189))));
        let svc = service(vec![b, a]);

        let quote = svc.get_quote("AAPL", None).await.unwrap();
        assert_eq!(quote.source, "B");
        assert_eq!(quote.price, dec!(189));
    }

    #[tokio::test]
    async fn test_quotes_batch() {
        let a = Arc::new(ScriptedProvider::new("A", 1).answer("AAPL", Answer::Price(dec!(189))));
        let b = Arc::new(ScriptedProvider::new("B", 2).answer("MSFT", Answer::Price(dec!(410))));
        let svc = service(vec![a, b]);

        let result = svc.get_quotes(&keys(&["AAPL", "MSFT", "ZZZZ"]), None).await;
        assert_eq!(result.len(), 3);
        assert_eq!(result.successes().count(), 2);
        let zzzz = result.get("ZZZZ").unwrap();
        assert!(!zzzz.success);
        assert!(zzzz.error.is_some());
    }

    #[tokio::test]
    async fn test_profiles_use_default_chunking() {
        let a = Arc::new(ScriptedProvider::new("A", 1).answer("AAPL", Answer::Price(dec!(1))));
        let b = Arc::new(ScriptedProvider::new("B", 2).answer("MSFT", Answer::Price(dec!(1))));
        let svc = service(vec![a, b]);

        let result = svc.get_profiles(&keys(&["AAPL", "MSFT"]), None).await;
        assert!(result.is_complete());
        assert_eq!(
            result.get("AAPL").unwrap().value.as_ref().unwrap().name.as_deref(),
            Some("AAPL Inc")
        );
        assert_eq!(result.get("MSFT").unwrap().source.as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn test_preferred_provider() {
        let a = Arc::new(ScriptedProvider::new("A", 1).answer("AAPL", Answer::Price(dec!(1))));
        let b = Arc::new(ScriptedProvider::new("B", 2).answer("AAPL", Answer::Price(dec!(2))));
        let svc = service(vec![a.clone(), b]);

        let fundamentals = svc.get_fundamentals("AAPL", Some("B")).await.unwrap();
        assert_eq!(fundamentals.source, "B");
        assert_eq!(a.calls(), 0);

        // Unknown preferred ids fall back to priority order
        let fundamentals = svc.get_fundamentals("AAPL", Some("NOPE")).await.unwrap();
        assert_eq!(fundamentals.source, "A");
    }

    #[tokio::test]
    async fn test_unsupported_capability() {
        let quotes_only = ScriptedProvider::new("A", 1)
            .with_capabilities(ProviderCapabilities::none().with(Capability::Quote));
        let svc = service(vec![Arc::new(quotes_only)]);

        assert!(matches!(
            svc.get_market_news(&[], 10, None).await,
            Err(MarketDataError::NoProvidersAvailable {
                capability: Capability::MarketNews
            })
        ));
    }

    #[tokio::test]
    async fn test_upcoming_earnings_and_news() {
        let a = Arc::new(
            ScriptedProvider::new("A", 1)
                .answer("*", Answer::Price(dec!(1.5)))
                .answer("AAPL", Answer::Price(dec!(1))),
        );
        let svc = service(vec![a]);

        let upcoming = svc
            .get_upcoming_earnings(&UpcomingEarningsOptions::next_days(7), None)
            .await
            .unwrap();
        assert_eq!(upcoming.len(), 1);

        let news = svc.get_market_news(&keys(&["AAPL"]), 5, None).await.unwrap();
        assert_eq!(news[0].headline, "AAPL news");
    }

    #[tokio::test]
    async fn test_invalid_inputs_are_rejected() {
        let svc = service(vec![Arc::new(ScriptedProvider::new("A", 1))]);
        let now = Utc::now();
        let backwards = DateRange::new(now, now - Duration::days(1));

        assert!(matches!(
            svc.get_time_series("AAPL", Interval::OneDay, backwards, None).await,
            Err(MarketDataError::InvalidConfig(_))
        ));
        assert!(matches!(
            svc.search_symbols("  ", None).await,
            Err(MarketDataError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_search_trims_query() {
        let a = Arc::new(ScriptedProvider::new("A", 1).answer("apple", Answer::Price(dec!(1))));
        let svc = service(vec![a]);

        let matches = svc.search_symbols(" apple ", None).await.unwrap();
        assert_eq!(matches[0].symbol, "apple");
    }
}
