use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{routing::get, Router};
use chrono::{NaiveDate, TimeZone, Utc};
use serde::Serialize;
use tickerbridge_market_data::{BatchResult, DateRange};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{
    config::Config,
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

mod events;
mod providers;
mod quotes;
mod reference;

pub fn app_router(state: Arc<AppState>, config: &Config) -> Router {
    let cors = if config.cors_allow_origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins = config
            .cors_allow_origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(origin) => Some(origin),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                    None
                }
            })
            .collect::<Vec<_>>();
        CorsLayer::new().allow_origin(origins)
    };

    let api = Router::new()
        .merge(quotes::router())
        .merge(reference::router())
        .merge(events::router())
        .merge(providers::router());

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api/v1", api)
        .with_state(state)
        .layer(cors)
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

/// One key of a batch response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BatchEntry<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub(crate) fn batch_response<T>(result: BatchResult<T>) -> BTreeMap<String, BatchEntry<T>> {
    result
        .into_iter()
        .map(|mut entry| {
            let key = std::mem::take(&mut entry.key);
            let source = entry.source.take().map(|s| s.to_string());
            let (data, error) = match entry.into_result() {
                Ok(value) => (Some(value), None),
                Err(e) => (None, Some(e.to_string())),
            };
            (
                key,
                BatchEntry {
                    success: data.is_some(),
                    data,
                    source,
                    error,
                },
            )
        })
        .collect()
}

/// Split `A,B , c` into upper-cased symbols.
pub(crate) fn parse_symbols(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Whole days from `start` 00:00 to `end` 23:59:59 UTC, defaulting to the
/// last `default_days`.
pub(crate) fn date_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    default_days: i64,
) -> ApiResult<DateRange> {
    let fallback = DateRange::last_days(default_days);
    let start = match start.and_then(|d| d.and_hms_opt(0, 0, 0)) {
        Some(naive) => Utc.from_utc_datetime(&naive),
        None => fallback.start,
    };
    let end = match end.and_then(|d| d.and_hms_opt(23, 59, 59)) {
        Some(naive) => Utc.from_utc_datetime(&naive),
        None => fallback.end,
    };

    let range = DateRange::new(start, end);
    if !range.is_valid() {
        return Err(ApiError::BadRequest(format!(
            "start {} is after end {}",
            start.date_naive(),
            end.date_naive()
        )));
    }
    Ok(range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickerbridge_market_data::{KeyedResult, MarketDataError};

    #[test]
    fn test_parse_symbols() {
        assert_eq!(parse_symbols(Some("aapl, MSFT,,shop.to ")), vec!["AAPL", "MSFT", "SHOP.TO"]);
        assert!(parse_symbols(None).is_empty());
    }

    #[test]
    fn test_batch_response_entries() {
        let mut result: BatchResult<u32> = BatchResult::new(["AAPL", "ZZZZ", "MSFT"]);
        result.insert(KeyedResult::ok("AAPL", 7, "YAHOO"));
        result.insert(KeyedResult::failed(
            "ZZZZ",
            MarketDataError::SymbolNotFound("ZZZZ".into()),
        ));

        let body = batch_response(result);
        assert_eq!(body.len(), 3);

        let aapl = &body["AAPL"];
        assert!(aapl.success);
        assert_eq!(aapl.data, Some(7));
        assert_eq!(aapl.source.as_deref(), Some("YAHOO"));
        assert!(aapl.error.is_none());

        let zzzz = &body["ZZZZ"];
        assert!(!zzzz.success);
        assert!(zzzz.data.is_none() && zzzz.source.is_none());
        assert_eq!(zzzz.error.as_deref(), Some("Symbol not found: ZZZZ"));

        // Never answered
        assert!(!body["MSFT"].success);
        assert!(body["MSFT"].error.is_some());
    }

    #[test]
    fn test_date_range() {
        let range = date_range(NaiveDate::from_ymd_opt(2024, 1, 1), NaiveDate::from_ymd_opt(2024, 1, 31), 30).unwrap();
        assert_eq!(range.start.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(range.end.to_rfc3339(), "2024-01-31T23:59:59+00:00");

        assert!(matches!(
            date_range(NaiveDate::from_ymd_opt(2024, 2, 1), NaiveDate::from_ymd_opt(2024, 1, 1), 30),
            Err(ApiError::BadRequest(_))
        ));
    }
}
