use serde::{Deserialize, Serialize};

/// Valuation and financial metrics for a company.
///
/// Every metric is optional; vendors cover different subsets.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fundamentals {
    pub symbol: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,

    /// Trailing price-to-earnings ratio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pe_ratio: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_pe: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub peg_ratio: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_to_book: Option<f64>,

    /// Trailing twelve month earnings per share
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eps: Option<f64>,

    /// Dividend yield (as decimal, e.g., 0.025 for 2.5%)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dividend_yield: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue_ttm: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_margin: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_on_equity: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_52_high: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_52_low: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub shares_outstanding: Option<f64>,

    /// Provider that supplied the metrics
    pub source: String,
}

impl Fundamentals {
    pub fn new(symbol: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            source: source.into(),
            ..Default::default()
        }
    }

    /// Whether at least one metric is populated.
    pub fn has_metrics(&self) -> bool {
        [
            self.market_cap,
            self.pe_ratio,
            self.forward_pe,
            self.peg_ratio,
            self.price_to_book,
            self.eps,
            self.dividend_yield,
            self.beta,
            self.revenue_ttm,
            self.profit_margin,
            self.return_on_equity,
            self.week_52_high,
            self.week_52_low,
            self.shares_outstanding,
        ]
        .iter()
        .any(|m| m.is_some_and(|v| v != 0.0))
    }
}
