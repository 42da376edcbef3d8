//! Market data models
//!
//! This module contains the normalized records every provider maps into:
//! - `types` - Type aliases for common identifiers (ProviderId)
//! - `quote` - Latest quote (Quote)
//! - `profile` - Asset profile data (AssetProfile)
//! - `time_series` - OHLCV bars and request parameters (Bar, Interval, DateRange)
//! - `fundamentals` - Valuation and financial metrics (Fundamentals)
//! - `corporate` - Dividends and earnings (Dividend, EarningsReport, options)
//! - `news` - News articles (NewsArticle)
//! - `search` - Symbol search results (SymbolMatch)
//! - `batch` - Per-key batch results (KeyedResult, BatchResult)

mod batch;
mod corporate;
mod fundamentals;
mod news;
mod profile;
mod quote;
mod search;
mod time_series;
mod types;

pub use batch::{BatchResult, KeyedResult};
pub use corporate::{Dividend, EarningsOptions, EarningsReport, UpcomingEarningsOptions};
pub use fundamentals::Fundamentals;
pub use news::NewsArticle;
pub use profile::AssetProfile;
pub use quote::Quote;
pub use search::SymbolMatch;
pub use time_series::{Bar, DateRange, Interval};
pub use types::ProviderId;

pub(crate) use corporate::newest_first;
pub(crate) use news::latest_unique;
pub(crate) use time_series::clip_to_range;
