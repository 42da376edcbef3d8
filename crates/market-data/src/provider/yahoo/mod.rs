//! Yahoo Finance market data provider.
//!
//! This provider uses the Yahoo Finance chart and search APIs through
//! `yahoo_finance_api` to fetch:
//! - Latest quotes for equities, ETFs, crypto (BTC-USD) and FX (EURUSD=X)
//! - Historical bars at any supported interval
//! - Symbol search results
//!
//! No API key is required.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use num_traits::FromPrimitive;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tracing::{debug, warn};
use urlencoding::encode;
use yahoo_finance_api as yahoo;

use crate::errors::MarketDataError;
use crate::models::{Bar, DateRange, Interval, Quote, SymbolMatch};
use crate::provider::{Capability, MarketDataProvider, ProviderCapabilities};

const PROVIDER_ID: &str = "YAHOO";

/// Yahoo Finance market data provider.
pub struct YahooProvider {
    connector: yahoo::YahooConnector,
}

impl YahooProvider {
    /// Create a new Yahoo Finance provider.
    pub fn new() -> Result<Self, MarketDataError> {
        let connector = yahoo::YahooConnector::new().map_err(|e| {
            MarketDataError::provider(
                PROVIDER_ID,
                format!("Failed to initialize Yahoo connector: {}", e),
            )
        })?;
        Ok(Self { connector })
    }

    /// Convert chrono DateTime<Utc> to time::OffsetDateTime for the Yahoo API.
    fn to_offset_datetime(dt: DateTime<Utc>) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(dt.timestamp())
            .unwrap_or_else(|_| OffsetDateTime::now_utc())
    }

    fn map_error(symbol: &str, e: yahoo::YahooError) -> MarketDataError {
        match e {
            yahoo::YahooError::NoQuotes | yahoo::YahooError::NoResult => {
                MarketDataError::SymbolNotFound(symbol.to_string())
            }
            other => MarketDataError::provider(PROVIDER_ID, other.to_string()),
        }
    }
}

/// Convert a Yahoo chart row into a bar. Rows with a non-finite close are
/// rejected.
fn to_bar(q: &yahoo::Quote) -> Result<Bar, MarketDataError> {
    let timestamp: DateTime<Utc> = Utc
        .timestamp_opt(q.timestamp as i64, 0)
        .single()
        .ok_or_else(|| MarketDataError::ValidationFailed {
            message: format!("Invalid timestamp: {}", q.timestamp),
        })?;

    let close = Decimal::from_f64_retain(q.close).ok_or_else(|| {
        MarketDataError::ValidationFailed {
            message: format!("Failed to convert close price {} to Decimal", q.close),
        }
    })?;

    let mut bar = Bar::new(
        timestamp,
        Decimal::from_f64_retain(q.open).unwrap_or(close),
        Decimal::from_f64_retain(q.high).unwrap_or(close),
        Decimal::from_f64_retain(q.low).unwrap_or(close),
        close,
    );
    bar.volume = Decimal::from_u64(q.volume);
    bar.adj_close = Decimal::from_f64_retain(q.adjclose);
    Ok(bar)
}

fn to_quote(symbol: &str, q: &yahoo::Quote, currency: &str) -> Result<Quote, MarketDataError> {
    let bar = to_bar(q)?;
    let mut quote = Quote::new(symbol, bar.timestamp, bar.close, currency, PROVIDER_ID)
        .with_range(bar.open, bar.high, bar.low);
    quote.volume = bar.volume;
    Ok(quote)
}

/// Yahoo reports "EQUITY", "ETF", "CRYPTOCURRENCY", ...; keep them uppercase.
fn normalize_quote_type(raw: &str) -> String {
    match raw.to_uppercase().as_str() {
        "" => "UNKNOWN".to_string(),
        other => other.to_string(),
    }
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn priority(&self) -> i32 {
        10
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::none()
            .with(Capability::Quote)
            .with(Capability::Quotes)
            .with(Capability::TimeSeries)
            .with(Capability::SymbolSearch)
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        debug!("Fetching latest quote for {} from Yahoo", symbol);

        let response = self
            .connector
            .get_latest_quotes(symbol, "1d")
            .await
            .map_err(|e| Self::map_error(symbol, e))?;

        let currency = response
            .metadata()
            .ok()
            .and_then(|m| m.currency.clone())
            .unwrap_or_else(|| "USD".to_string());

        let last = response.last_quote().map_err(|e| {
            warn!("No quotes returned for {}: {}", symbol, e);
            MarketDataError::SymbolNotFound(symbol.to_string())
        })?;

        to_quote(symbol, &last, &currency)
    }

    async fn get_time_series(
        &self,
        symbol: &str,
        interval: Interval,
        range: DateRange,
    ) -> Result<Vec<Bar>, MarketDataError> {
        debug!(
            "Fetching {} bars for {} from {} to {} from Yahoo",
            interval,
            symbol,
            range.start.format("%Y-%m-%d"),
            range.end.format("%Y-%m-%d")
        );

        let response = self
            .connector
            .get_quote_history_interval(
                symbol,
                Self::to_offset_datetime(range.start),
                Self::to_offset_datetime(range.end),
                interval.as_str(),
            )
            .await
            .map_err(|e| Self::map_error(symbol, e))?;

        match response.quotes() {
            Ok(rows) => {
                let bars: Vec<Bar> = rows
                    .iter()
                    .filter_map(|q| match to_bar(q) {
                        Ok(bar) => Some(bar),
                        Err(e) => {
                            warn!("Skipping bar due to conversion error: {}", e);
                            None
                        }
                    })
                    .collect();
                Ok(crate::models::clip_to_range(bars, &range))
            }
            // An existing symbol with no rows in the window
            Err(yahoo::YahooError::NoQuotes) => Ok(vec![]),
            Err(e) => Err(MarketDataError::provider(PROVIDER_ID, e.to_string())),
        }
    }

    async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolMatch>, MarketDataError> {
        debug!("Searching Yahoo for '{}'", query);

        let result = self
            .connector
            .search_ticker(&encode(query))
            .await
            .map_err(|e| MarketDataError::provider(PROVIDER_ID, e.to_string()))?;

        Ok(result
            .quotes
            .iter()
            .map(|item| {
                let name = if item.long_name.is_empty() {
                    &item.short_name
                } else {
                    &item.long_name
                };
                SymbolMatch::new(
                    &item.symbol,
                    name,
                    &item.exchange,
                    normalize_quote_type(&item.quote_type),
                    PROVIDER_ID,
                )
                .with_score(item.score)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::BatchPolicy;

    fn row(timestamp: i64, close: f64) -> yahoo::Quote {
        yahoo::Quote {
            timestamp: timestamp as _,
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            volume: 1_000,
            close,
            adjclose: close,
        }
    }

    #[test]
    fn test_to_quote() {
        let quote = to_quote("SHOP.TO", &row(1_704_067_200, 100.5), "CAD").unwrap();
        assert_eq!(quote.symbol, "SHOP.TO");
        assert_eq!(quote.currency, "CAD");
        assert_eq!(quote.source, "YAHOO");
        assert_eq!(quote.price.to_string(), "100.5");
        assert_eq!(quote.high.map(|h| h.to_string()), Some("101.5".to_string()));
        assert_eq!(quote.volume, Decimal::from_u64(1_000));
        assert_eq!(quote.timestamp, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_non_finite_close_is_rejected() {
        assert!(matches!(
            to_bar(&row(1_704_067_200, f64::NAN)),
            Err(MarketDataError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn test_normalize_quote_type() {
        assert_eq!(normalize_quote_type("etf"), "ETF");
        assert_eq!(normalize_quote_type(""), "UNKNOWN");
    }

    #[test]
    fn test_capabilities() {
        let provider = YahooProvider::new().unwrap();
        let caps = provider.capabilities();
        assert!(caps.supports(Capability::Quote));
        assert!(caps.supports(Capability::Quotes));
        assert!(caps.supports(Capability::TimeSeries));
        assert!(caps.supports(Capability::SymbolSearch));
        assert!(!caps.supports(Capability::Profile));
        assert!(!caps.supports(Capability::MarketNews));
        assert_eq!(provider.priority(), 10);
        assert_eq!(provider.batch_policy(), BatchPolicy::default());
    }
}
