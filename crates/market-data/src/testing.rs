//! Scripted provider used by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::errors::MarketDataError;
use crate::models::{
    AssetProfile, Bar, BatchResult, DateRange, Dividend, EarningsOptions, EarningsReport,
    Fundamentals, Interval, KeyedResult, NewsArticle, Quote, SymbolMatch,
    UpcomingEarningsOptions,
};
use crate::provider::{
    BatchPolicy, ChunkedBatch, Capability, CapabilityCategory, MarketDataProvider,
    ProviderCapabilities,
};
use crate::registry::EmptinessPolicy;

/// What the provider says for a key.
#[derive(Clone, Debug)]
pub(crate) enum Answer {
    /// A populated record; the value becomes the price / amount / eps.
    Price(Decimal),
    /// A well-formed but empty payload.
    Empty,
    /// An error.
    Fail,
}

pub(crate) struct ScriptedProvider {
    id: &'static str,
    priority: i32,
    capabilities: ProviderCapabilities,
    answers: HashMap<String, Answer>,
    extra_keys: Vec<String>,
    fail_batches: bool,
    calls: AtomicUsize,
    batch_calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedProvider {
    /// Supports everything; unknown keys fail.
    pub(crate) fn new(id: &'static str, priority: i32) -> Self {
        Self {
            id,
            priority,
            capabilities: ProviderCapabilities::from_categories(&CapabilityCategory::ALL),
            answers: HashMap::new(),
            extra_keys: Vec::new(),
            fail_batches: false,
            calls: AtomicUsize::new(0),
            batch_calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn answer(mut self, key: &str, answer: Answer) -> Self {
        self.answers.insert(key.to_string(), answer);
        self
    }

    pub(crate) fn with_capabilities(mut self, capabilities: ProviderCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Batch answers also carry `key`, requested or not.
    pub(crate) fn with_extra_key(mut self, key: &str) -> Self {
        self.extra_keys.push(key.to_string());
        self
    }

    /// Batch calls fail as a whole.
    pub(crate) fn failing_batches(mut self) -> Self {
        self.fail_batches = true;
        self
    }

    /// Single-key calls made so far.
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Key lists passed to batch calls, in call order.
    pub(crate) fn batch_calls(&self) -> Vec<Vec<String>> {
        self.batch_calls.lock().unwrap().clone()
    }

    fn lookup(&self, key: &str) -> Result<Option<Decimal>, MarketDataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.answers.get(key) {
            Some(Answer::Price(v)) => Ok(Some(*v)),
            Some(Answer::Empty) => Ok(None),
            Some(Answer::Fail) | None => Err(MarketDataError::SymbolNotFound(key.to_string())),
        }
    }

    fn quote(&self, symbol: &str, price: Decimal) -> Quote {
        Quote::new(symbol, Utc::now(), price, "USD", self.id)
    }

    fn report(&self, symbol: &str, eps: Decimal) -> EarningsReport {
        let mut report = EarningsReport::new(
            symbol,
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            self.id,
        );
        report.eps_actual = eps.to_string().parse().ok();
        report
    }
}

#[async_trait]
impl MarketDataProvider for ScriptedProvider {
    fn id(&self) -> &'static str {
        self.id
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn capabilities(&self) -> ProviderCapabilities {
        self.capabilities
    }

    fn batch_policy(&self) -> BatchPolicy {
        BatchPolicy::new(5, Duration::ZERO)
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let price = self.lookup(symbol)?.unwrap_or(Decimal::ZERO);
        Ok(self.quote(symbol, price))
    }

    async fn get_quotes(&self, symbols: &[String]) -> Result<BatchResult<Quote>, MarketDataError> {
        self.batch_calls.lock().unwrap().push(symbols.to_vec());
        if self.fail_batches {
            return Err(MarketDataError::provider(self.id, "batch endpoint down"));
        }

        let mut result = ChunkedBatch::new(self.id, Capability::Quotes, self.batch_policy())
            .run(symbols, EmptinessPolicy::Reject, |symbol| async move {
                self.get_quote(&symbol).await
            })
            .await;
        for key in &self.extra_keys {
            result.insert(KeyedResult::ok(
                key.clone(),
                self.quote(key, Decimal::ONE),
                self.id,
            ));
        }
        Ok(result)
    }

    async fn get_profile(&self, symbol: &str) -> Result<AssetProfile, MarketDataError> {
        Ok(match self.lookup(symbol)? {
            Some(_) => AssetProfile::with_name(format!("{} Inc", symbol))
                .symbol(symbol)
                .source(self.id),
            None => AssetProfile::new().symbol(symbol).source(self.id),
        })
    }

    async fn get_time_series(
        &self,
        symbol: &str,
        _interval: Interval,
        range: DateRange,
    ) -> Result<Vec<Bar>, MarketDataError> {
        Ok(match self.lookup(symbol)? {
            Some(p) => vec![Bar::new(range.end, p, p, p, p)],
            None => vec![],
        })
    }

    async fn get_fundamentals(&self, symbol: &str) -> Result<Fundamentals, MarketDataError> {
        let mut fundamentals = Fundamentals::new(symbol, self.id);
        if let Some(p) = self.lookup(symbol)? {
            fundamentals.pe_ratio = p.to_string().parse().ok();
        }
        Ok(fundamentals)
    }

    async fn get_dividends(
        &self,
        symbol: &str,
        range: DateRange,
    ) -> Result<Vec<Dividend>, MarketDataError> {
        Ok(match self.lookup(symbol)? {
            Some(amount) => vec![Dividend {
                symbol: symbol.to_string(),
                ex_date: range.end.date_naive(),
                payment_date: None,
                record_date: None,
                declaration_date: None,
                amount,
                currency: Some("USD".to_string()),
                source: self.id.to_string(),
            }],
            None => vec![],
        })
    }

    async fn get_earnings(
        &self,
        symbol: &str,
        _options: &EarningsOptions,
    ) -> Result<Vec<EarningsReport>, MarketDataError> {
        Ok(match self.lookup(symbol)? {
            Some(eps) => vec![self.report(symbol, eps)],
            None => vec![],
        })
    }

    async fn get_upcoming_earnings(
        &self,
        _options: &UpcomingEarningsOptions,
    ) -> Result<Vec<EarningsReport>, MarketDataError> {
        Ok(match self.lookup("*")? {
            Some(eps) => vec![self.report("AAPL", eps)],
            None => vec![],
        })
    }

    async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolMatch>, MarketDataError> {
        Ok(match self.lookup(query)? {
            Some(_) => vec![SymbolMatch::new(query, query, "NASDAQ", "EQUITY", self.id)],
            None => vec![],
        })
    }

    async fn get_market_news(
        &self,
        symbols: &[String],
        limit: usize,
    ) -> Result<Vec<NewsArticle>, MarketDataError> {
        let key = symbols.first().map(String::as_str).unwrap_or("*");
        Ok(match self.lookup(key)? {
            Some(_) => vec![NewsArticle {
                headline: format!("{} news", key),
                url: format!("https://news.example/{}", key),
                published_at: Utc::now(),
                summary: None,
                publisher: None,
                image_url: None,
                symbols: symbols.to_vec(),
                source: self.id.to_string(),
            }]
            .into_iter()
            .take(limit)
            .collect(),
            None => vec![],
        })
    }
}
