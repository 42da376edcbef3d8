//! Corporate events: dividends and earnings.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single dividend distribution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dividend {
    pub symbol: String,
    pub ex_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declaration_date: Option<NaiveDate>,
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    pub source: String,
}

/// Reported or scheduled earnings for one fiscal period.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsReport {
    pub symbol: String,
    /// Fiscal period end, or the scheduled report date for calendar entries
    pub period: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eps_actual: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eps_estimate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surprise_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue_actual: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue_estimate: Option<f64>,
    pub source: String,
}

impl EarningsReport {
    pub fn new(symbol: impl Into<String>, period: NaiveDate, source: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            period,
            report_date: None,
            eps_actual: None,
            eps_estimate: None,
            surprise_percent: None,
            revenue_actual: None,
            revenue_estimate: None,
            source: source.into(),
        }
    }
}

/// Options for historical earnings lookups.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarningsOptions {
    /// Most recent N periods; `None` means whatever the vendor returns.
    pub limit: Option<usize>,
}

/// Options for the upcoming earnings calendar.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcomingEarningsOptions {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    /// Restrict the calendar to these symbols; empty means all.
    #[serde(default)]
    pub symbols: Vec<String>,
}

impl UpcomingEarningsOptions {
    /// Calendar for the next `days` days.
    pub fn next_days(days: i64) -> Self {
        let from = Utc::now();
        Self {
            from,
            to: from + chrono::Duration::days(days),
            symbols: Vec::new(),
        }
    }

    pub(crate) fn wants(&self, symbol: &str) -> bool {
        self.symbols.is_empty() || self.symbols.iter().any(|s| s.eq_ignore_ascii_case(symbol))
    }
}

/// Keep the newest `limit` reports, newest first.
pub(crate) fn newest_first(mut reports: Vec<EarningsReport>, limit: Option<usize>) -> Vec<EarningsReport> {
    reports.sort_by(|a, b| b.period.cmp(&a.period));
    if let Some(limit) = limit {
        reports.truncate(limit);
    }
    reports
}
