//! Finnhub market data provider implementation.
//!
//! This module provides market data from Finnhub API:
//! - Quotes via /quote, candles via /stock/candle
//! - Company profiles via /stock/profile2, metrics via /stock/metric
//! - Dividends, earnings history and the earnings calendar
//! - Symbol search via /search, news via /company-news and /news
//!
//! Finnhub free tier is limited to 60 API calls per minute.
//! API documentation: https://finnhub.io/docs/api

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::MarketDataError;
use crate::models::{
    AssetProfile, Bar, DateRange, Dividend, EarningsOptions, EarningsReport, Fundamentals,
    Interval, NewsArticle, Quote, SymbolMatch, UpcomingEarningsOptions,
};
use crate::provider::{MarketDataProvider, ProviderCapabilities};

const BASE_URL: &str = "https://finnhub.io/api/v1";
const PROVIDER_ID: &str = "FINNHUB";

// ============================================================================
// API Response Structures
// ============================================================================

/// Response from /quote endpoint
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    /// Current price
    c: Option<f64>,
    /// High price of the day
    h: Option<f64>,
    /// Low price of the day
    l: Option<f64>,
    /// Open price of the day
    o: Option<f64>,
    /// Previous close
    pc: Option<f64>,
    /// Timestamp (Unix)
    t: Option<i64>,
}

/// Response from /stock/candle endpoint
#[derive(Debug, Deserialize)]
struct CandleResponse {
    /// Status: "ok" or "no_data"
    s: String,
    #[serde(default)]
    c: Vec<f64>,
    #[serde(default)]
    h: Vec<f64>,
    #[serde(default)]
    l: Vec<f64>,
    #[serde(default)]
    o: Vec<f64>,
    #[serde(default)]
    v: Vec<f64>,
    #[serde(default)]
    t: Vec<i64>,
}

/// Response from /search endpoint
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItem {
    /// Full description/name
    description: String,
    /// Display symbol
    display_symbol: String,
    /// Symbol for API calls
    symbol: String,
    /// Security type (e.g., "Common Stock", "ETF")
    #[serde(rename = "type")]
    security_type: String,
}

/// Response from /stock/profile2 endpoint
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    name: Option<String>,
    ticker: Option<String>,
    #[serde(default)]
    description: Option<String>,
    /// Finnhub industry classification
    finnhub_industry: Option<String>,
    country: Option<String>,
    exchange: Option<String>,
    currency: Option<String>,
    weburl: Option<String>,
    logo: Option<String>,
    /// Market capitalization (in millions)
    market_capitalization: Option<f64>,
    employee_total: Option<f64>,
}

/// Response from /stock/metric?metric=all
#[derive(Debug, Deserialize)]
struct MetricResponse {
    #[serde(default)]
    metric: Metrics,
}

/// Subset of the metric map. Percentages are reported as whole numbers.
#[derive(Debug, Default, Deserialize)]
struct Metrics {
    #[serde(rename = "marketCapitalization")]
    market_cap_millions: Option<f64>,
    #[serde(rename = "peTTM")]
    pe_ttm: Option<f64>,
    #[serde(rename = "pbAnnual")]
    pb_annual: Option<f64>,
    #[serde(rename = "epsTTM")]
    eps_ttm: Option<f64>,
    #[serde(rename = "dividendYieldIndicatedAnnual")]
    dividend_yield_pct: Option<f64>,
    beta: Option<f64>,
    #[serde(rename = "revenueTTM")]
    revenue_ttm: Option<f64>,
    #[serde(rename = "netProfitMarginTTM")]
    net_margin_pct: Option<f64>,
    #[serde(rename = "roeTTM")]
    roe_pct: Option<f64>,
    #[serde(rename = "52WeekHigh")]
    week_52_high: Option<f64>,
    #[serde(rename = "52WeekLow")]
    week_52_low: Option<f64>,
}

/// Item of /stock/dividend
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DividendItem {
    /// Ex-dividend date
    date: NaiveDate,
    amount: f64,
    pay_date: Option<NaiveDate>,
    record_date: Option<NaiveDate>,
    declaration_date: Option<NaiveDate>,
    currency: Option<String>,
}

/// Item of /stock/earnings
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EarningsItem {
    period: NaiveDate,
    actual: Option<f64>,
    estimate: Option<f64>,
    surprise_percent: Option<f64>,
}

/// Response from /calendar/earnings
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EarningsCalendarResponse {
    #[serde(default)]
    earnings_calendar: Vec<CalendarItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarItem {
    date: NaiveDate,
    symbol: String,
    eps_actual: Option<f64>,
    eps_estimate: Option<f64>,
    revenue_actual: Option<f64>,
    revenue_estimate: Option<f64>,
}

/// Item of /company-news and /news
#[derive(Debug, Deserialize)]
struct NewsItem {
    /// Unix seconds
    datetime: i64,
    headline: String,
    #[serde(default)]
    image: Option<String>,
    /// Comma separated tickers
    #[serde(default)]
    related: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    url: String,
}

/// Error response from Finnhub
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

// ============================================================================
// FinnhubProvider
// ============================================================================

/// Finnhub market data provider.
///
/// Covers every capability; requires an API key.
pub struct FinnhubProvider {
    client: Client,
    api_key: String,
}

impl FinnhubProvider {
    /// Create a new Finnhub provider with the given API key.
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, api_key }
    }

    /// GET an endpoint and decode the JSON body.
    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, MarketDataError> {
        let url = format!("{}{}", BASE_URL, endpoint);

        debug!("Finnhub request: {} with {} params", endpoint, params.len());

        let response = self
            .client
            .get(&url)
            .header("X-Finnhub-Token", &self.api_key)
            .query(params)
            .send()
            .await
            .map_err(|e| MarketDataError::from_http(PROVIDER_ID, e))?;

        let status = response.status();

        // 403 is how Finnhub reports an exhausted quota or a premium endpoint
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(MarketDataError::provider(
                PROVIDER_ID,
                "Invalid or missing API key",
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| MarketDataError::provider(PROVIDER_ID, format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            if let Ok(ErrorResponse { error: Some(msg) }) = serde_json::from_str::<ErrorResponse>(&body) {
                return Err(MarketDataError::provider(PROVIDER_ID, msg));
            }
            return Err(MarketDataError::provider(
                PROVIDER_ID,
                format!("HTTP {} - {}", status, body),
            ));
        }

        parse(&body, endpoint)
    }
}

fn parse<T: DeserializeOwned>(body: &str, endpoint: &str) -> Result<T, MarketDataError> {
    serde_json::from_str(body).map_err(|e| {
        MarketDataError::provider(
            PROVIDER_ID,
            format!("Failed to parse {} response: {}", endpoint, e),
        )
    })
}

fn decimal(v: f64) -> Option<Decimal> {
    Decimal::try_from(v).ok()
}

fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

/// Finnhub candle resolution for an interval.
fn resolution(interval: Interval) -> &'static str {
    match interval {
        Interval::OneMinute => "1",
        Interval::FiveMinutes => "5",
        Interval::FifteenMinutes => "15",
        Interval::ThirtyMinutes => "30",
        Interval::OneHour => "60",
        Interval::OneDay => "D",
        Interval::OneWeek => "W",
        Interval::OneMonth => "M",
    }
}

fn map_quote(symbol: &str, response: QuoteResponse) -> Result<Quote, MarketDataError> {
    let close = response
        .c
        .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

    // Unknown symbols come back as all zeros rather than an error
    if close == 0.0 && response.o.unwrap_or(0.0) == 0.0 {
        return Err(MarketDataError::SymbolNotFound(symbol.to_string()));
    }

    let price = decimal(close).ok_or_else(|| MarketDataError::ValidationFailed {
        message: format!("Invalid close price: {}", close),
    })?;
    let ts = response.t.and_then(timestamp).unwrap_or_else(Utc::now);

    let mut quote = Quote::new(symbol, ts, price, "USD", PROVIDER_ID);
    quote.open = response.o.and_then(decimal);
    quote.high = response.h.and_then(decimal);
    quote.low = response.l.and_then(decimal);
    quote.previous_close = response.pc.and_then(decimal);
    Ok(quote)
}

fn map_candles(response: CandleResponse) -> Result<Vec<Bar>, MarketDataError> {
    if response.s == "no_data" {
        return Err(MarketDataError::NoDataForRange);
    }
    if response.s != "ok" {
        return Err(MarketDataError::provider(
            PROVIDER_ID,
            format!("Unexpected candle status: {}", response.s),
        ));
    }

    let len = response.t.len();
    if [response.c.len(), response.o.len(), response.h.len(), response.l.len()]
        .iter()
        .any(|&n| n != len)
    {
        return Err(MarketDataError::provider(
            PROVIDER_ID,
            "Mismatched array lengths in candle response",
        ));
    }

    let mut bars = Vec::with_capacity(len);
    for i in 0..len {
        let Some(ts) = timestamp(response.t[i]) else {
            warn!("Invalid timestamp at index {}: {}", i, response.t[i]);
            continue;
        };
        let (Some(o), Some(h), Some(l), Some(c)) = (
            decimal(response.o[i]),
            decimal(response.h[i]),
            decimal(response.l[i]),
            decimal(response.c[i]),
        ) else {
            warn!("Invalid prices at index {}", i);
            continue;
        };

        let mut bar = Bar::new(ts, o, h, l, c);
        bar.volume = response.v.get(i).copied().and_then(decimal);
        bars.push(bar);
    }

    Ok(bars)
}

fn map_profile(symbol: &str, response: ProfileResponse) -> Result<AssetProfile, MarketDataError> {
    if response.name.is_none() && response.ticker.is_none() {
        return Err(MarketDataError::SymbolNotFound(symbol.to_string()));
    }

    Ok(AssetProfile {
        source: Some(PROVIDER_ID.to_string()),
        symbol: Some(response.ticker.unwrap_or_else(|| symbol.to_string())),
        name: response.name,
        asset_type: Some("Stock".to_string()),
        sector: response.finnhub_industry.clone(),
        industry: response.finnhub_industry,
        website: response.weburl,
        description: response.description,
        country: response.country,
        exchange: response.exchange,
        currency: response.currency,
        employees: response.employee_total.map(|e| e as u64),
        logo_url: response.logo,
        // Finnhub reports market cap in millions
        market_cap: response.market_capitalization.map(|mc| mc * 1_000_000.0),
    })
}

fn map_metrics(symbol: &str, m: Metrics) -> Fundamentals {
    let pct = |v: Option<f64>| v.map(|p| p / 100.0);
    Fundamentals {
        symbol: symbol.to_string(),
        market_cap: m.market_cap_millions.map(|mc| mc * 1_000_000.0),
        pe_ratio: m.pe_ttm,
        forward_pe: None,
        peg_ratio: None,
        price_to_book: m.pb_annual,
        eps: m.eps_ttm,
        dividend_yield: pct(m.dividend_yield_pct),
        beta: m.beta,
        revenue_ttm: m.revenue_ttm.map(|r| r * 1_000_000.0),
        profit_margin: pct(m.net_margin_pct),
        return_on_equity: pct(m.roe_pct),
        week_52_high: m.week_52_high,
        week_52_low: m.week_52_low,
        shares_outstanding: None,
        source: PROVIDER_ID.to_string(),
    }
}

fn map_dividend(symbol: &str, item: DividendItem) -> Option<Dividend> {
    Some(Dividend {
        symbol: symbol.to_string(),
        ex_date: item.date,
        payment_date: item.pay_date,
        record_date: item.record_date,
        declaration_date: item.declaration_date,
        amount: decimal(item.amount)?,
        currency: item.currency,
        source: PROVIDER_ID.to_string(),
    })
}

fn map_earnings(symbol: &str, item: EarningsItem) -> EarningsReport {
    let mut report = EarningsReport::new(symbol, item.period, PROVIDER_ID);
    report.eps_actual = item.actual;
    report.eps_estimate = item.estimate;
    report.surprise_percent = item.surprise_percent;
    report
}

fn map_calendar(item: CalendarItem) -> EarningsReport {
    let mut report = EarningsReport::new(item.symbol, item.date, PROVIDER_ID);
    report.report_date = Some(item.date);
    report.eps_actual = item.eps_actual;
    report.eps_estimate = item.eps_estimate;
    report.revenue_actual = item.revenue_actual;
    report.revenue_estimate = item.revenue_estimate;
    report
}

fn map_news(item: NewsItem) -> Option<NewsArticle> {
    Some(NewsArticle {
        published_at: timestamp(item.datetime)?,
        headline: item.headline,
        url: item.url,
        summary: item.summary.filter(|s| !s.is_empty()),
        publisher: item.source,
        image_url: item.image.filter(|s| !s.is_empty()),
        symbols: item
            .related
            .map(|r| {
                r.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        source: PROVIDER_ID.to_string(),
    })
}

// ============================================================================
// MarketDataProvider Implementation
// ============================================================================

#[async_trait]
impl MarketDataProvider for FinnhubProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn priority(&self) -> i32 {
        20
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            quote: true,
            quotes: true,
            profile: true,
            profiles: true,
            time_series: true,
            fundamentals: true,
            dividends: true,
            earnings: true,
            upcoming_earnings: true,
            symbol_search: true,
            market_news: true,
        }
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        debug!("Fetching latest quote for {} from Finnhub", symbol);
        let response: QuoteResponse = self.fetch("/quote", &[("symbol", symbol)]).await?;
        map_quote(symbol, response)
    }

    async fn get_profile(&self, symbol: &str) -> Result<AssetProfile, MarketDataError> {
        debug!("Fetching profile for {} from Finnhub", symbol);
        // Unknown symbols return `{}`, which decodes to an all-None profile
        let response: ProfileResponse = self.fetch("/stock/profile2", &[("symbol", symbol)]).await?;
        map_profile(symbol, response)
    }

    async fn get_time_series(
        &self,
        symbol: &str,
        interval: Interval,
        range: DateRange,
    ) -> Result<Vec<Bar>, MarketDataError> {
        let from = range.start.timestamp().to_string();
        let to = range.end.timestamp().to_string();
        let params = [
            ("symbol", symbol),
            ("resolution", resolution(interval)),
            ("from", from.as_str()),
            ("to", to.as_str()),
        ];

        let response: CandleResponse = self.fetch("/stock/candle", &params).await?;
        let bars = crate::models::clip_to_range(map_candles(response)?, &range);

        debug!(
            "Finnhub: fetched {} {} bars for {} ({} to {})",
            bars.len(),
            interval,
            symbol,
            range.start.format("%Y-%m-%d"),
            range.end.format("%Y-%m-%d")
        );
        Ok(bars)
    }

    async fn get_fundamentals(&self, symbol: &str) -> Result<Fundamentals, MarketDataError> {
        let response: MetricResponse = self
            .fetch("/stock/metric", &[("symbol", symbol), ("metric", "all")])
            .await?;
        Ok(map_metrics(symbol, response.metric))
    }

    async fn get_dividends(
        &self,
        symbol: &str,
        range: DateRange,
    ) -> Result<Vec<Dividend>, MarketDataError> {
        let from = range.start.format("%Y-%m-%d").to_string();
        let to = range.end.format("%Y-%m-%d").to_string();
        let items: Vec<DividendItem> = self
            .fetch(
                "/stock/dividend",
                &[("symbol", symbol), ("from", from.as_str()), ("to", to.as_str())],
            )
            .await?;

        let mut dividends: Vec<Dividend> = items
            .into_iter()
            .filter_map(|item| map_dividend(symbol, item))
            .collect();
        dividends.sort_by_key(|d| d.ex_date);
        Ok(dividends)
    }

    async fn get_earnings(
        &self,
        symbol: &str,
        options: &EarningsOptions,
    ) -> Result<Vec<EarningsReport>, MarketDataError> {
        let limit = options.limit.map(|l| l.to_string());
        let mut params = vec![("symbol", symbol)];
        if let Some(limit) = limit.as_deref() {
            params.push(("limit", limit));
        }

        let items: Vec<EarningsItem> = self.fetch("/stock/earnings", &params).await?;
        let reports = items.into_iter().map(|i| map_earnings(symbol, i)).collect();
        Ok(crate::models::newest_first(reports, options.limit))
    }

    async fn get_upcoming_earnings(
        &self,
        options: &UpcomingEarningsOptions,
    ) -> Result<Vec<EarningsReport>, MarketDataError> {
        let from = options.from.format("%Y-%m-%d").to_string();
        let to = options.to.format("%Y-%m-%d").to_string();
        let mut params = vec![("from", from.as_str()), ("to", to.as_str())];
        if let [only] = options.symbols.as_slice() {
            params.push(("symbol", only.as_str()));
        }

        let response: EarningsCalendarResponse = self.fetch("/calendar/earnings", &params).await?;
        let mut reports: Vec<EarningsReport> = response
            .earnings_calendar
            .into_iter()
            .filter(|item| options.wants(&item.symbol))
            .map(map_calendar)
            .collect();
        reports.sort_by_key(|r| r.period);
        Ok(reports)
    }

    async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolMatch>, MarketDataError> {
        debug!("Searching Finnhub for '{}'", query);
        let response: SearchResponse = self.fetch("/search", &[("q", query)]).await?;

        Ok(response
            .result
            .into_iter()
            .map(|item| {
                SymbolMatch::new(
                    item.symbol,
                    item.description,
                    item.display_symbol,
                    map_security_type(&item.security_type),
                    PROVIDER_ID,
                )
            })
            .collect())
    }

    async fn get_market_news(
        &self,
        symbols: &[String],
        limit: usize,
    ) -> Result<Vec<NewsArticle>, MarketDataError> {
        let items: Vec<NewsItem> = if symbols.is_empty() {
            self.fetch("/news", &[("category", "general")]).await?
        } else {
            let range = DateRange::last_days(7);
            let from = range.start.format("%Y-%m-%d").to_string();
            let to = range.end.format("%Y-%m-%d").to_string();
            let mut per_symbol = Vec::with_capacity(symbols.len());
            for symbol in symbols {
                let batch = self
                    .fetch::<Vec<NewsItem>>(
                        "/company-news",
                        &[("symbol", symbol.as_str()), ("from", from.as_str()), ("to", to.as_str())],
                    )
                    .await;
                per_symbol.push((symbol.as_str(), batch));
            }
            merge_company_news(per_symbol)?
        };

        let articles = items.into_iter().filter_map(map_news).collect();
        Ok(crate::models::latest_unique(articles, limit))
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Combine per-symbol company news. A failing symbol is skipped; the call
/// only fails when every symbol did.
fn merge_company_news(
    per_symbol: Vec<(&str, Result<Vec<NewsItem>, MarketDataError>)>,
) -> Result<Vec<NewsItem>, MarketDataError> {
    let mut items = Vec::new();
    let mut last_error = None;
    let mut answered = false;

    for (symbol, batch) in per_symbol {
        match batch {
            Ok(batch) => {
                answered = true;
                items.extend(batch);
            }
            Err(e) => {
                warn!("Finnhub company news for {} failed: {}", symbol, e);
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) if !answered => Err(e),
        _ => Ok(items),
    }
}

/// Map Finnhub security type to our asset type.
fn map_security_type(finnhub_type: &str) -> String {
    match finnhub_type.to_lowercase().as_str() {
        "common stock" | "stock" => "Stock".to_string(),
        "etf" | "etp" => "ETF".to_string(),
        "mutual fund" | "fund" => "Mutual Fund".to_string(),
        "adr" | "american depositary receipt" => "ADR".to_string(),
        "reit" => "REIT".to_string(),
        "preferred stock" | "preferred" => "Preferred Stock".to_string(),
        _ => finnhub_type.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
