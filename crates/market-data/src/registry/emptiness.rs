//! Emptiness checks applied to provider payloads.
//!
//! A provider can answer "successfully" with nothing useful in it: a quote
//! with a zero price, a profile without a name, an empty list. Each record
//! type decides what empty means for it through [`Emptiness`], and each
//! operation decides what to do with an empty answer through
//! [`EmptinessPolicy`].

use rust_decimal::Decimal;

use crate::models::{AssetProfile, Fundamentals, Quote};
use crate::provider::Capability;

/// Whether a payload carries usable data.
pub trait Emptiness {
    fn is_empty_payload(&self) -> bool;
}

impl Emptiness for Quote {
    /// Zero price and no intraday range.
    fn is_empty_payload(&self) -> bool {
        let blank = |v: Option<Decimal>| v.map_or(true, |d| d.is_zero());
        self.price.is_zero() && blank(self.open) && blank(self.high) && blank(self.low)
    }
}

impl Emptiness for AssetProfile {
    /// None of name, sector, industry or description.
    fn is_empty_payload(&self) -> bool {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        blank(&self.name) && blank(&self.sector) && blank(&self.industry) && blank(&self.description)
    }
}

impl Emptiness for Fundamentals {
    fn is_empty_payload(&self) -> bool {
        !self.has_metrics()
    }
}

impl<T> Emptiness for Vec<T> {
    fn is_empty_payload(&self) -> bool {
        self.is_empty()
    }
}

/// What an operation does with an empty payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmptinessPolicy {
    /// Empty is a soft failure; try the next provider.
    Reject,
    /// Empty is a valid answer and ends the fallback.
    Accept,
    /// Try the next provider, but if nobody has data return an empty answer
    /// that some provider gave instead of failing.
    PreferNonEmpty,
}

impl EmptinessPolicy {
    /// Policy used by the service for each operation.
    pub fn for_capability(capability: Capability) -> Self {
        match capability {
            Capability::Dividends => Self::Accept,
            Capability::Earnings | Capability::UpcomingEarnings => Self::PreferNonEmpty,
            Capability::Quote
            | Capability::Quotes
            | Capability::Profile
            | Capability::Profiles
            | Capability::TimeSeries
            | Capability::Fundamentals
            | Capability::SymbolSearch
            | Capability::MarketNews => Self::Reject,
        }
    }

    /// Whether `payload` ends the search for a provider.
    pub fn accepts<T: Emptiness>(&self, payload: &T) -> bool {
        match self {
            Self::Accept => true,
            Self::Reject | Self::PreferNonEmpty => !payload.is_empty_payload(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn test_quote_emptiness() {
        let zero = Quote::new("AAPL", Utc::now(), Decimal::ZERO, "USD", "TEST");
        assert!(zero.is_empty_payload());

        let zero_with_range = zero.clone().with_range(dec!(1), dec!(2), dec!(0.5));
        assert!(!zero_with_range.is_empty_payload());

        let priced = Quote::new("AAPL", Utc::now(), dec!(189.5), "USD", "TEST");
        assert!(!priced.is_empty_payload());
    }

    #[test]
    fn test_profile_emptiness() {
        assert!(AssetProfile::new().is_empty_payload());
        assert!(AssetProfile::new().symbol("AAPL").country("US").is_empty_payload());
        assert!(!AssetProfile::new().sector("Technology").is_empty_payload());
        assert!(AssetProfile::with_name("  ").is_empty_payload());
    }

    #[test]
    fn test_fundamentals_emptiness() {
        let mut f = Fundamentals::new("AAPL", "TEST");
        assert!(f.is_empty_payload());
        f.beta = Some(1.2);
        assert!(!f.is_empty_payload());
    }

    #[test]
    fn test_policy_accepts() {
        let empty: Vec<u32> = vec![];
        assert!(EmptinessPolicy::Accept.accepts(&empty));
        assert!(!EmptinessPolicy::Reject.accepts(&empty));
        assert!(!EmptinessPolicy::PreferNonEmpty.accepts(&empty));
        assert!(EmptinessPolicy::Reject.accepts(&vec![1]));
    }

    #[test]
    fn test_policy_per_capability() {
        assert_eq!(
            EmptinessPolicy::for_capability(Capability::Dividends),
            EmptinessPolicy::Accept
        );
        assert_eq!(
            EmptinessPolicy::for_capability(Capability::Earnings),
            EmptinessPolicy::PreferNonEmpty
        );
        assert_eq!(
            EmptinessPolicy::for_capability(Capability::MarketNews),
            EmptinessPolicy::Reject
        );
    }
}
