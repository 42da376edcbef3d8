use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Latest market quote for a symbol
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Symbol as requested by the caller
    pub symbol: String,

    /// Timestamp of the quote
    pub timestamp: DateTime<Utc>,

    /// Opening price (optional for intraday)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<Decimal>,

    /// High price (optional for intraday)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<Decimal>,

    /// Low price (optional for intraday)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<Decimal>,

    /// Current/last price (required)
    pub price: Decimal,

    /// Previous session close
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_close: Option<Decimal>,

    /// Trading volume (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<Decimal>,

    /// Quote currency
    pub currency: String,

    /// Source of the quote (YAHOO, FINNHUB, ALPHA_VANTAGE, etc.)
    pub source: String,
}

impl Quote {
    /// Create a new quote with minimal required fields
    pub fn new(
        symbol: impl Into<String>,
        timestamp: DateTime<Utc>,
        price: Decimal,
        currency: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            open: None,
            high: None,
            low: None,
            price,
            previous_close: None,
            volume: None,
            currency: currency.into(),
            source: source.into(),
        }
    }

    /// Set the day's open/high/low
    pub fn with_range(mut self, open: Decimal, high: Decimal, low: Decimal) -> Self {
        self.open = Some(open);
        self.high = Some(high);
        self.low = Some(low);
        self
    }

    /// Set the trading volume
    pub fn with_volume(mut self, volume: Decimal) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Absolute change versus the previous close, when known.
    pub fn change(&self) -> Option<Decimal> {
        self.previous_close.map(|pc| self.price - pc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_quote_new() {
        let quote = Quote::new("AAPL", Utc::now(), dec!(150.25), "USD", "YAHOO");
        assert_eq!(quote.price, dec!(150.25));
        assert_eq!(quote.currency, "USD");
        assert!(quote.open.is_none());
        assert!(quote.change().is_none());
    }

    #[test]
    fn test_quote_builders() {
        let mut quote = Quote::new("AAPL", Utc::now(), dec!(150.25), "USD", "YAHOO")
            .with_range(dec!(148.00), dec!(152.00), dec!(147.50))
            .with_volume(dec!(1000000));
        quote.previous_close = Some(dec!(149.25));

        assert_eq!(quote.open, Some(dec!(148.00)));
        assert_eq!(quote.high, Some(dec!(152.00)));
        assert_eq!(quote.low, Some(dec!(147.50)));
        assert_eq!(quote.volume, Some(dec!(1000000)));
        assert_eq!(quote.change(), Some(dec!(1.00)));
    }

    #[test]
    fn test_quote_serializes_camel_case() {
        let mut quote = Quote::new("MSFT", Utc::now(), dec!(410), "USD", "FINNHUB");
        quote.previous_close = Some(dec!(400));

        let json = serde_json::to_string(&quote).unwrap();
        assert!(json.contains("previousClose"));
        assert!(!json.contains("volume"));
    }
}
