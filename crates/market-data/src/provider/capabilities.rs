//! Provider capabilities, descriptors and batch pacing.
//!
//! This module defines what a market data provider can do, how the registry
//! orders it, and how its emulated multi-key calls are paced.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::MarketDataError;
use crate::models::ProviderId;

use super::chunking::CHUNK_SIZE;

/// One operation of the provider interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Quote,
    Quotes,
    Profile,
    Profiles,
    TimeSeries,
    Fundamentals,
    Dividends,
    Earnings,
    UpcomingEarnings,
    SymbolSearch,
    MarketNews,
}

impl Capability {
    pub const ALL: [Capability; 11] = [
        Capability::Quote,
        Capability::Quotes,
        Capability::Profile,
        Capability::Profiles,
        Capability::TimeSeries,
        Capability::Fundamentals,
        Capability::Dividends,
        Capability::Earnings,
        Capability::UpcomingEarnings,
        Capability::SymbolSearch,
        Capability::MarketNews,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::Quotes => "quotes",
            Self::Profile => "profile",
            Self::Profiles => "profiles",
            Self::TimeSeries => "time_series",
            Self::Fundamentals => "fundamentals",
            Self::Dividends => "dividends",
            Self::Earnings => "earnings",
            Self::UpcomingEarnings => "upcoming_earnings",
            Self::SymbolSearch => "symbol_search",
            Self::MarketNews => "market_news",
        }
    }

    pub fn category(&self) -> CapabilityCategory {
        match self {
            Self::Quote | Self::Quotes => CapabilityCategory::Realtime,
            Self::TimeSeries | Self::Dividends => CapabilityCategory::Historical,
            Self::Profile
            | Self::Profiles
            | Self::Fundamentals
            | Self::Earnings
            | Self::UpcomingEarnings
            | Self::SymbolSearch => CapabilityCategory::Fundamentals,
            Self::MarketNews => CapabilityCategory::News,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Capability::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| MarketDataError::InvalidConfig(format!("Unknown capability: {}", s)))
    }
}

/// Coarse grouping of capabilities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityCategory {
    Realtime,
    Historical,
    Fundamentals,
    News,
}

impl CapabilityCategory {
    pub const ALL: [CapabilityCategory; 4] = [
        CapabilityCategory::Realtime,
        CapabilityCategory::Historical,
        CapabilityCategory::Fundamentals,
        CapabilityCategory::News,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Realtime => "realtime",
            Self::Historical => "historical",
            Self::Fundamentals => "fundamentals",
            Self::News => "news",
        }
    }

    /// Capabilities belonging to this category.
    pub fn capabilities(self) -> impl Iterator<Item = Capability> {
        Capability::ALL
            .into_iter()
            .filter(move |c| c.category() == self)
    }
}

impl fmt::Display for CapabilityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-shape capability matrix. Anything not set is unsupported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCapabilities {
    pub quote: bool,
    pub quotes: bool,
    pub profile: bool,
    pub profiles: bool,
    pub time_series: bool,
    pub fundamentals: bool,
    pub dividends: bool,
    pub earnings: bool,
    pub upcoming_earnings: bool,
    pub symbol_search: bool,
    pub market_news: bool,
}

impl ProviderCapabilities {
    /// Nothing supported.
    pub fn none() -> Self {
        Self::default()
    }

    /// Every operation of every listed category.
    pub fn from_categories(categories: &[CapabilityCategory]) -> Self {
        Self::from_capabilities(categories.iter().flat_map(|c| c.capabilities()))
    }

    pub fn from_capabilities(capabilities: impl IntoIterator<Item = Capability>) -> Self {
        capabilities
            .into_iter()
            .fold(Self::none(), |caps, c| caps.with(c))
    }

    pub fn with(mut self, capability: Capability) -> Self {
        *self.flag_mut(capability) = true;
        self
    }

    pub fn without(mut self, capability: Capability) -> Self {
        *self.flag_mut(capability) = false;
        self
    }

    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Quote => self.quote,
            Capability::Quotes => self.quotes,
            Capability::Profile => self.profile,
            Capability::Profiles => self.profiles,
            Capability::TimeSeries => self.time_series,
            Capability::Fundamentals => self.fundamentals,
            Capability::Dividends => self.dividends,
            Capability::Earnings => self.earnings,
            Capability::UpcomingEarnings => self.upcoming_earnings,
            Capability::SymbolSearch => self.symbol_search,
            Capability::MarketNews => self.market_news,
        }
    }

    /// Whether any operation of `category` is supported.
    pub fn supports_category(&self, category: CapabilityCategory) -> bool {
        category.capabilities().any(|c| self.supports(c))
    }

    /// Supported operations in declaration order.
    pub fn supported(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| self.supports(*c))
            .collect()
    }

    /// Operations supported by both matrices.
    pub fn intersect(&self, other: &ProviderCapabilities) -> Self {
        Self::from_capabilities(
            Capability::ALL
                .into_iter()
                .filter(|c| self.supports(*c) && other.supports(*c)),
        )
    }

    fn flag_mut(&mut self, capability: Capability) -> &mut bool {
        match capability {
            Capability::Quote => &mut self.quote,
            Capability::Quotes => &mut self.quotes,
            Capability::Profile => &mut self.profile,
            Capability::Profiles => &mut self.profiles,
            Capability::TimeSeries => &mut self.time_series,
            Capability::Fundamentals => &mut self.fundamentals,
            Capability::Dividends => &mut self.dividends,
            Capability::Earnings => &mut self.earnings,
            Capability::UpcomingEarnings => &mut self.upcoming_earnings,
            Capability::SymbolSearch => &mut self.symbol_search,
            Capability::MarketNews => &mut self.market_news,
        }
    }
}

/// Parses a comma separated list of capability or category names,
/// e.g. `"quote,historical,market_news"`.
impl FromStr for ProviderCapabilities {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut caps = Self::none();
        for token in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let lowered = token.to_ascii_lowercase();
            if let Some(category) = CapabilityCategory::ALL
                .into_iter()
                .find(|c| c.as_str() == lowered)
            {
                for c in category.capabilities() {
                    caps = caps.with(c);
                }
            } else {
                caps = caps.with(token.parse()?);
            }
        }
        Ok(caps)
    }
}

/// Registry-side description of a provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDescriptor {
    /// Unique name within a registry (e.g. "YAHOO")
    pub name: ProviderId,
    /// Lower is tried first
    pub priority: i32,
    pub capabilities: ProviderCapabilities,
}

impl ProviderDescriptor {
    pub fn new(
        name: impl Into<ProviderId>,
        priority: i32,
        capabilities: ProviderCapabilities,
    ) -> Self {
        Self {
            name: name.into(),
            priority,
            capabilities,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_capabilities(mut self, capabilities: ProviderCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

/// Pacing for emulated multi-key calls.
///
/// The chunk width is fixed at [`CHUNK_SIZE`](crate::provider::CHUNK_SIZE) for
/// every provider. A policy only narrows how many of a chunk's requests run at
/// once and sets the pause slept between chunks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchPolicy {
    pub max_concurrency: usize,
    pub pause: Duration,
}

impl BatchPolicy {
    /// `max_concurrency` is clamped to `1..=CHUNK_SIZE`.
    pub fn new(max_concurrency: usize, pause: Duration) -> Self {
        Self {
            max_concurrency: max_concurrency.clamp(1, CHUNK_SIZE),
            pause,
        }
    }
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            max_concurrency: CHUNK_SIZE,
            pause: Duration::from_secs(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_names_round_trip() {
        for c in Capability::ALL {
            assert_eq!(c.as_str().parse::<Capability>().unwrap(), c);
        }
        assert_eq!(
            "Time-Series".parse::<Capability>().unwrap(),
            Capability::TimeSeries
        );
        assert!("teleport".parse::<Capability>().is_err());
    }

    #[test]
    fn test_every_capability_has_one_category() {
        let total: usize = CapabilityCategory::ALL
            .iter()
            .map(|c| c.capabilities().count())
            .sum();
        assert_eq!(total, Capability::ALL.len());
        assert_eq!(Capability::Dividends.category(), CapabilityCategory::Historical);
        assert_eq!(
            Capability::SymbolSearch.category(),
            CapabilityCategory::Fundamentals
        );
    }

    #[test]
    fn test_from_categories() {
        let caps = ProviderCapabilities::from_categories(&[CapabilityCategory::Realtime]);
        assert!(caps.supports(Capability::Quote));
        assert!(caps.supports(Capability::Quotes));
        assert!(!caps.supports(Capability::TimeSeries));
        assert!(caps.supports_category(CapabilityCategory::Realtime));
        assert!(!caps.supports_category(CapabilityCategory::News));
    }

    #[test]
    fn test_absent_is_false() {
        let caps = ProviderCapabilities::none().with(Capability::MarketNews);
        assert_eq!(caps.supported(), vec![Capability::MarketNews]);
    }

    #[test]
    fn test_parse_mixed_list() {
        let caps: ProviderCapabilities = "quote, historical".parse().unwrap();
        assert_eq!(
            caps.supported(),
            vec![Capability::Quote, Capability::TimeSeries, Capability::Dividends]
        );
        assert!("quote,bogus".parse::<ProviderCapabilities>().is_err());
    }

    #[test]
    fn test_intersect() {
        let a = ProviderCapabilities::from_categories(&[
            CapabilityCategory::Realtime,
            CapabilityCategory::News,
        ]);
        let b: ProviderCapabilities = "quote,market_news,profile".parse().unwrap();
        assert_eq!(
            a.intersect(&b).supported(),
            vec![Capability::Quote, Capability::MarketNews]
        );
    }

    #[test]
    fn test_batch_policy_clamps_concurrency() {
        assert_eq!(BatchPolicy::new(0, Duration::ZERO).max_concurrency, 1);
        assert_eq!(BatchPolicy::new(50, Duration::ZERO).max_concurrency, CHUNK_SIZE);
        assert_eq!(BatchPolicy::default().max_concurrency, CHUNK_SIZE);
    }
}
