use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use tickerbridge_market_data::{Bar, Interval, Quote};

use super::{batch_response, date_range, parse_symbols, BatchEntry};
use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

#[derive(serde::Deserialize)]
struct ProviderQuery {
    provider: Option<String>,
}

#[derive(serde::Deserialize)]
struct QuotesQuery {
    symbols: Option<String>,
    provider: Option<String>,
}

#[derive(serde::Deserialize)]
struct HistoryQuery {
    interval: Option<String>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    provider: Option<String>,
}

async fn get_quote(
    Path(symbol): Path<String>,
    Query(q): Query<ProviderQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Quote>> {
    let quote = state
        .market_data
        .get_quote(&symbol.to_uppercase(), q.provider.as_deref())
        .await?;
    Ok(Json(quote))
}

async fn get_quotes(
    Query(q): Query<QuotesQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<BTreeMap<String, BatchEntry<Quote>>>> {
    let symbols = parse_symbols(q.symbols.as_deref());
    if symbols.is_empty() {
        return Err(ApiError::BadRequest("symbols is required".to_string()));
    }
    let result = state
        .market_data
        .get_quotes(&symbols, q.provider.as_deref())
        .await;
    Ok(Json(batch_response(result)))
}

async fn get_history(
    Path(symbol): Path<String>,
    Query(q): Query<HistoryQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<Bar>>> {
    let interval = match q.interval.as_deref() {
        Some(raw) => raw.parse::<Interval>().map_err(ApiError::BadRequest)?,
        None => Interval::OneDay,
    };
    let range = date_range(q.start, q.end, 365)?;

    let bars = state
        .market_data
        .get_time_series(&symbol.to_uppercase(), interval, range, q.provider.as_deref())
        .await?;
    Ok(Json(bars))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/quotes", get(get_quotes))
        .route("/quotes/{symbol}", get(get_quote))
        .route("/history/{symbol}", get(get_history))
}
