//! Alpha Vantage market data provider implementation.
//!
//! This module provides market data from Alpha Vantage API:
//! - Latest quotes via GLOBAL_QUOTE
//! - Intraday, daily, weekly and monthly series via TIME_SERIES_*
//! - Profiles and fundamentals via OVERVIEW
//! - Dividends via DIVIDENDS, earnings via EARNINGS
//! - Symbol search via SYMBOL_SEARCH, news via NEWS_SENTIMENT
//!
//! Note: Alpha Vantage free tier is limited to 5 API calls per minute.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use log::{debug, warn};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::MarketDataError;
use crate::models::{
    AssetProfile, Bar, DateRange, Dividend, EarningsOptions, EarningsReport, Fundamentals,
    Interval, NewsArticle, Quote, SymbolMatch,
};
use crate::provider::{BatchPolicy, MarketDataProvider, ProviderCapabilities};

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER_ID: &str = "ALPHA_VANTAGE";

/// Alpha Vantage market data provider.
///
/// Free tier is limited to 5 API calls per minute, so emulated batches run
/// one request at a time with a long pause between chunks.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
}

// ============================================================================
// Response structures for Alpha Vantage API
// ============================================================================

/// Top-level keys Alpha Vantage uses for errors and throttling notices.
/// Every endpoint may answer with these instead of data.
#[derive(Debug, Default, Deserialize)]
struct ApiNotice {
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

/// GLOBAL_QUOTE response
#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote", default)]
    quote: Option<GlobalQuote>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "01. symbol")]
    symbol: Option<String>,
    #[serde(rename = "02. open")]
    open: Option<String>,
    #[serde(rename = "03. high")]
    high: Option<String>,
    #[serde(rename = "04. low")]
    low: Option<String>,
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "06. volume")]
    volume: Option<String>,
    #[serde(rename = "07. latest trading day")]
    latest_trading_day: Option<String>,
    #[serde(rename = "08. previous close")]
    previous_close: Option<String>,
}

/// One bar of any TIME_SERIES_* response
#[derive(Debug, Deserialize)]
struct RawBar {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: Option<String>,
}

/// OVERVIEW response
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CompanyOverviewResponse {
    symbol: Option<String>,
    asset_type: Option<String>,
    name: Option<String>,
    description: Option<String>,
    exchange: Option<String>,
    currency: Option<String>,
    country: Option<String>,
    sector: Option<String>,
    industry: Option<String>,
    official_site: Option<String>,
    market_capitalization: Option<String>,
    #[serde(rename = "PERatio")]
    pe_ratio: Option<String>,
    #[serde(rename = "PEGRatio")]
    peg_ratio: Option<String>,
    #[serde(rename = "ForwardPE")]
    forward_pe: Option<String>,
    price_to_book_ratio: Option<String>,
    #[serde(rename = "EPS")]
    eps: Option<String>,
    dividend_yield: Option<String>,
    beta: Option<String>,
    #[serde(rename = "RevenueTTM")]
    revenue_ttm: Option<String>,
    profit_margin: Option<String>,
    #[serde(rename = "ReturnOnEquityTTM")]
    return_on_equity_ttm: Option<String>,
    #[serde(rename = "52WeekHigh")]
    week_52_high: Option<String>,
    #[serde(rename = "52WeekLow")]
    week_52_low: Option<String>,
    shares_outstanding: Option<String>,
}

/// DIVIDENDS response
#[derive(Debug, Deserialize)]
struct DividendsResponse {
    #[serde(default)]
    data: Vec<DividendItem>,
}

#[derive(Debug, Deserialize)]
struct DividendItem {
    ex_dividend_date: String,
    declaration_date: Option<String>,
    record_date: Option<String>,
    payment_date: Option<String>,
    amount: String,
}

/// EARNINGS response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EarningsResponse {
    #[serde(default)]
    quarterly_earnings: Vec<QuarterlyEarnings>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuarterlyEarnings {
    fiscal_date_ending: String,
    reported_date: Option<String>,
    #[serde(rename = "reportedEPS")]
    reported_eps: Option<String>,
    #[serde(rename = "estimatedEPS")]
    estimated_eps: Option<String>,
    surprise_percentage: Option<String>,
}

/// SYMBOL_SEARCH response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    best_matches: Vec<SearchMatch>,
}

#[derive(Debug, Deserialize)]
struct SearchMatch {
    #[serde(rename = "1. symbol")]
    symbol: String,
    #[serde(rename = "2. name")]
    name: String,
    #[serde(rename = "3. type")]
    match_type: String,
    #[serde(rename = "4. region")]
    region: String,
    #[serde(rename = "8. currency")]
    currency: Option<String>,
    #[serde(rename = "9. matchScore")]
    match_score: Option<String>,
}

/// NEWS_SENTIMENT response
#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    feed: Vec<FeedItem>,
}

#[derive(Debug, Deserialize)]
struct FeedItem {
    title: String,
    url: String,
    /// e.g. "20240501T123000"
    time_published: String,
    summary: Option<String>,
    banner_image: Option<String>,
    source: Option<String>,
    #[serde(default)]
    ticker_sentiment: Vec<TickerSentiment>,
}

#[derive(Debug, Deserialize)]
struct TickerSentiment {
    ticker: String,
}

// ============================================================================
// Parsing helpers
// ============================================================================

/// Parse a numeric string field, treating "None", "-" and "" as absent.
fn parse_f64(s: &Option<String>) -> Option<f64> {
    s.as_deref()
        .filter(|v| !v.is_empty() && *v != "None" && *v != "-")
        .and_then(|v| v.parse::<f64>().ok())
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s.trim()).ok()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

fn parse_opt_date(s: &Option<String>) -> Option<NaiveDate> {
    s.as_deref().and_then(parse_date)
}

/// Series keys are "YYYY-MM-DD" or "YYYY-MM-DD HH:MM:SS".
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| parse_date(s).and_then(|d| d.and_hms_opt(0, 0, 0)))?;
    Utc.from_local_datetime(&naive).single()
}

/// Alpha Vantage percentages are fractions already, except when suffixed.
fn parse_ratio(s: &Option<String>) -> Option<f64> {
    let raw = s.as_deref()?.trim();
    match raw.strip_suffix('%') {
        Some(pct) => pct.parse::<f64>().ok().map(|v| v / 100.0),
        None => parse_f64(s),
    }
}

/// Map API notices to errors. Throttling notices become `RateLimited`.
fn check_api_error(notice: &ApiNotice) -> Result<(), MarketDataError> {
    if let Some(ref msg) = notice.error_message {
        if msg.contains("Invalid API call") || msg.contains("not found") {
            return Err(MarketDataError::SymbolNotFound(msg.clone()));
        }
        return Err(MarketDataError::provider(PROVIDER_ID, msg.clone()));
    }

    for msg in [&notice.note, &notice.information].into_iter().flatten() {
        if msg.contains("API call frequency")
            || msg.contains("rate limit")
            || msg.contains("requests per day")
        {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }
        if msg.contains("demo") || msg.contains("premium") {
            return Err(MarketDataError::provider(PROVIDER_ID, msg.clone()));
        }
        warn!("Alpha Vantage notice: {}", msg);
    }

    Ok(())
}

/// Check the notice keys, then decode the body as `T`.
fn decode<T: DeserializeOwned>(body: &str, function: &str) -> Result<T, MarketDataError> {
    let notice: ApiNotice = serde_json::from_str(body).unwrap_or_default();
    check_api_error(&notice)?;

    serde_json::from_str(body).map_err(|e| {
        MarketDataError::provider(
            PROVIDER_ID,
            format!("Failed to parse {} response: {}", function, e),
        )
    })
}

/// Series function, interval parameter and whether it is intraday.
fn series_function(interval: Interval) -> (&'static str, Option<&'static str>) {
    match interval {
        Interval::OneMinute => ("TIME_SERIES_INTRADAY", Some("1min")),
        Interval::FiveMinutes => ("TIME_SERIES_INTRADAY", Some("5min")),
        Interval::FifteenMinutes => ("TIME_SERIES_INTRADAY", Some("15min")),
        Interval::ThirtyMinutes => ("TIME_SERIES_INTRADAY", Some("30min")),
        Interval::OneHour => ("TIME_SERIES_INTRADAY", Some("60min")),
        Interval::OneDay => ("TIME_SERIES_DAILY", None),
        Interval::OneWeek => ("TIME_SERIES_WEEKLY", None),
        Interval::OneMonth => ("TIME_SERIES_MONTHLY", None),
    }
}

fn map_global_quote(symbol: &str, response: GlobalQuoteResponse) -> Result<Quote, MarketDataError> {
    let q = response
        .quote
        .filter(|q| q.symbol.is_some())
        .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

    let price = q
        .price
        .as_deref()
        .and_then(parse_decimal)
        .ok_or_else(|| MarketDataError::ValidationFailed {
            message: format!("Missing price for {}", symbol),
        })?;
    let ts = q
        .latest_trading_day
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or_else(Utc::now);

    let mut quote = Quote::new(symbol, ts, price, "USD", PROVIDER_ID);
    quote.open = q.open.as_deref().and_then(parse_decimal);
    quote.high = q.high.as_deref().and_then(parse_decimal);
    quote.low = q.low.as_deref().and_then(parse_decimal);
    quote.volume = q.volume.as_deref().and_then(parse_decimal);
    quote.previous_close = q.previous_close.as_deref().and_then(parse_decimal);
    Ok(quote)
}

/// Decode whichever "... Time Series ..." object the response carries.
fn map_series(body: &str) -> Result<Vec<Bar>, MarketDataError> {
    let root: HashMap<String, serde_json::Value> = decode(body, "TIME_SERIES")?;

    let series = root
        .into_iter()
        .find(|(k, _)| k.contains("Time Series"))
        .map(|(_, v)| v)
        .ok_or(MarketDataError::NoDataForRange)?;

    let raw: HashMap<String, RawBar> = serde_json::from_value(series).map_err(|e| {
        MarketDataError::provider(PROVIDER_ID, format!("Failed to parse series: {}", e))
    })?;

    let mut bars = Vec::with_capacity(raw.len());
    for (key, bar) in raw {
        let Some(ts) = parse_timestamp(&key) else {
            warn!("Skipping bar with invalid timestamp: {}", key);
            continue;
        };
        let (Some(o), Some(h), Some(l), Some(c)) = (
            parse_decimal(&bar.open),
            parse_decimal(&bar.high),
            parse_decimal(&bar.low),
            parse_decimal(&bar.close),
        ) else {
            warn!("Skipping bar with invalid prices at {}", key);
            continue;
        };

        let mut b = Bar::new(ts, o, h, l, c);
        b.volume = bar.volume.as_deref().and_then(parse_decimal);
        bars.push(b);
    }

    Ok(bars)
}

fn map_profile(overview: &CompanyOverviewResponse) -> AssetProfile {
    let asset_type = overview
        .asset_type
        .as_ref()
        .map(|t| match t.to_uppercase().as_str() {
            "COMMON STOCK" => "Stock".to_string(),
            "MUTUAL FUND" => "Mutual Fund".to_string(),
            _ => t.clone(),
        });

    AssetProfile {
        source: Some(PROVIDER_ID.to_string()),
        symbol: overview.symbol.clone(),
        name: overview.name.clone(),
        asset_type,
        sector: overview.sector.clone().filter(|s| s != "None"),
        industry: overview.industry.clone().filter(|s| s != "None"),
        website: overview.official_site.clone().filter(|s| s != "None"),
        description: overview.description.clone().filter(|s| s != "None"),
        country: overview.country.clone(),
        exchange: overview.exchange.clone(),
        currency: overview.currency.clone(),
        employees: None,
        logo_url: None,
        market_cap: parse_f64(&overview.market_capitalization),
    }
}

fn map_fundamentals(symbol: &str, o: &CompanyOverviewResponse) -> Fundamentals {
    Fundamentals {
        symbol: symbol.to_string(),
        market_cap: parse_f64(&o.market_capitalization),
        pe_ratio: parse_f64(&o.pe_ratio),
        forward_pe: parse_f64(&o.forward_pe),
        peg_ratio: parse_f64(&o.peg_ratio),
        price_to_book: parse_f64(&o.price_to_book_ratio),
        eps: parse_f64(&o.eps),
        dividend_yield: parse_ratio(&o.dividend_yield),
        beta: parse_f64(&o.beta),
        revenue_ttm: parse_f64(&o.revenue_ttm),
        profit_margin: parse_ratio(&o.profit_margin),
        return_on_equity: parse_ratio(&o.return_on_equity_ttm),
        week_52_high: parse_f64(&o.week_52_high),
        week_52_low: parse_f64(&o.week_52_low),
        shares_outstanding: parse_f64(&o.shares_outstanding),
        source: PROVIDER_ID.to_string(),
    }
}

fn map_dividend(symbol: &str, item: DividendItem) -> Option<Dividend> {
    Some(Dividend {
        symbol: symbol.to_string(),
        ex_date: parse_date(&item.ex_dividend_date)?,
        payment_date: parse_opt_date(&item.payment_date),
        record_date: parse_opt_date(&item.record_date),
        declaration_date: parse_opt_date(&item.declaration_date),
        amount: parse_decimal(&item.amount)?,
        currency: None,
        source: PROVIDER_ID.to_string(),
    })
}

fn map_earnings(symbol: &str, item: QuarterlyEarnings) -> Option<EarningsReport> {
    let mut report = EarningsReport::new(symbol, parse_date(&item.fiscal_date_ending)?, PROVIDER_ID);
    report.report_date = parse_opt_date(&item.reported_date);
    report.eps_actual = parse_f64(&item.reported_eps);
    report.eps_estimate = parse_f64(&item.estimated_eps);
    report.surprise_percent = parse_f64(&item.surprise_percentage);
    Some(report)
}

fn map_search(item: SearchMatch) -> SymbolMatch {
    let mut m = SymbolMatch::new(item.symbol, item.name, item.region, item.match_type, PROVIDER_ID);
    m.currency = item.currency;
    m.score = parse_f64(&item.match_score);
    m
}

fn map_feed(item: FeedItem) -> Option<NewsArticle> {
    let published = NaiveDateTime::parse_from_str(&item.time_published, "%Y%m%dT%H%M%S").ok()?;
    Some(NewsArticle {
        headline: item.title,
        url: item.url,
        published_at: Utc.from_utc_datetime(&published),
        summary: item.summary.filter(|s| !s.is_empty()),
        publisher: item.source,
        image_url: item.banner_image.filter(|s| !s.is_empty()),
        symbols: item.ticker_sentiment.into_iter().map(|t| t.ticker).collect(),
        source: PROVIDER_ID.to_string(),
    })
}

// ============================================================================
// AlphaVantageProvider implementation
// ============================================================================

impl AlphaVantageProvider {
    /// Create a new Alpha Vantage provider with the given API key.
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, api_key }
    }

    /// Make a request to the Alpha Vantage API and return the raw body.
    async fn fetch(&self, params: &[(&str, &str)]) -> Result<String, MarketDataError> {
        let mut all_params: Vec<(&str, &str)> = params.to_vec();
        all_params.push(("apikey", &self.api_key));

        let url = reqwest::Url::parse_with_params(BASE_URL, &all_params).map_err(|e| {
            MarketDataError::provider(PROVIDER_ID, format!("Failed to build URL: {}", e))
        })?;

        debug!(
            "Alpha Vantage request: {}",
            url.as_str().replace(&self.api_key, "***")
        );

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MarketDataError::from_http(PROVIDER_ID, e))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        if !status.is_success() {
            return Err(MarketDataError::provider(PROVIDER_ID, format!("HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| MarketDataError::provider(PROVIDER_ID, e.to_string()))
    }

    async fn fetch_overview(&self, symbol: &str) -> Result<CompanyOverviewResponse, MarketDataError> {
        let body = self.fetch(&[("function", "OVERVIEW"), ("symbol", symbol)]).await?;
        let overview: CompanyOverviewResponse = decode(&body, "OVERVIEW")?;

        // Unknown symbols answer with `{}`
        if overview.symbol.is_none() {
            return Err(MarketDataError::SymbolNotFound(symbol.to_string()));
        }
        Ok(overview)
    }
}

#[async_trait]
impl MarketDataProvider for AlphaVantageProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn priority(&self) -> i32 {
        30
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
            upcoming_earnings: false,
            symbol_search: true,
            market_news: true,
        }
    }

    fn batch_policy(&self) -> BatchPolicy {
        BatchPolicy::new(1, Duration::from_secs(15))
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let body = self
            .fetch(&[("function", "GLOBAL_QUOTE"), ("symbol", symbol)])
            .await?;
        map_global_quote(symbol, decode(&body, "GLOBAL_QUOTE")?)
    }

    async fn get_profile(&self, symbol: &str) -> Result<AssetProfile, MarketDataError> {
        let overview = self.fetch_overview(symbol).await?;
        debug!("Alpha Vantage: fetched company overview for {}", symbol);
        Ok(map_profile(&overview))
    }

    async fn get_time_series(
        &self,
        symbol: &str,
        interval: Interval,
        range: DateRange,
    ) -> Result<Vec<Bar>, MarketDataError> {
        let (function, av_interval) = series_function(interval);
        // compact covers the latest 100 points
        let outputsize = if (Utc::now() - range.start).num_days() > 100 || interval.is_intraday() {
            "full"
        } else {
            "compact"
        };

        let mut params = vec![
            ("function", function),
            ("symbol", symbol),
            ("outputsize", outputsize),
        ];
        if let Some(i) = av_interval {
            params.push(("interval", i));
        }

        let body = self.fetch(&params).await?;
        let bars = crate::models::clip_to_range(map_series(&body)?, &range);

        debug!(
            "Alpha Vantage: {} {} bars for {} in range",
            bars.len(),
            interval,
            symbol
        );
        Ok(bars)
    }

    async fn get_fundamentals(&self, symbol: &str) -> Result<Fundamentals, MarketDataError> {
        let overview = self.fetch_overview(symbol).await?;
        Ok(map_fundamentals(symbol, &overview))
    }

    async fn get_dividends(
        &self,
        symbol: &str,
        range: DateRange,
    ) -> Result<Vec<Dividend>, MarketDataError> {
        let body = self
            .fetch(&[("function", "DIVIDENDS"), ("symbol", symbol)])
            .await?;
        let response: DividendsResponse = decode(&body, "DIVIDENDS")?;

        let (start, end) = (range.start.date_naive(), range.end.date_naive());
        let mut dividends: Vec<Dividend> = response
            .data
            .into_iter()
            .filter_map(|item| map_dividend(symbol, item))
            .filter(|d| d.ex_date >= start && d.ex_date <= end)
            .collect();
        dividends.sort_by_key(|d| d.ex_date);
        Ok(dividends)
    }

    async fn get_earnings(
        &self,
        symbol: &str,
        options: &EarningsOptions,
    ) -> Result<Vec<EarningsReport>, MarketDataError> {
        let body = self
            .fetch(&[("function", "EARNINGS"), ("symbol", symbol)])
            .await?;
        let response: EarningsResponse = decode(&body, "EARNINGS")?;

        let reports = response
            .quarterly_earnings
            .into_iter()
            .filter_map(|item| map_earnings(symbol, item))
            .collect();
        Ok(crate::models::newest_first(reports, options.limit))
    }

    async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolMatch>, MarketDataError> {
        let body = self
            .fetch(&[("function", "SYMBOL_SEARCH"), ("keywords", query)])
            .await?;
        let response: SearchResponse = decode(&body, "SYMBOL_SEARCH")?;
        Ok(response.best_matches.into_iter().map(map_search).collect())
    }

    async fn get_market_news(
        &self,
        symbols: &[String],
        limit: usize,
    ) -> Result<Vec<NewsArticle>, MarketDataError> {
        let tickers = symbols.join(",");
        let limit_param = limit.clamp(1, 1000).to_string();
        let mut params = vec![
            ("function", "NEWS_SENTIMENT"),
            ("sort", "LATEST"),
            ("limit", limit_param.as_str()),
        ];
        if !tickers.is_empty() {
            params.push(("tickers", tickers.as_str()));
        }

        let body = self.fetch(&params).await?;
        let response: NewsResponse = decode(&body, "NEWS_SENTIMENT")?;
        let articles = response.feed.into_iter().filter_map(map_feed).collect();
        Ok(crate::models::latest_unique(articles, limit))
    }
}
