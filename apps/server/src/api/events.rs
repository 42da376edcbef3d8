//! Corporate events and news: dividends, earnings, the earnings calendar.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use tickerbridge_market_data::{
    Dividend, EarningsOptions, EarningsReport, NewsArticle, UpcomingEarningsOptions,
};

use super::{date_range, parse_symbols};
use crate::{error::ApiResult, main_lib::AppState};

const DEFAULT_NEWS_LIMIT: usize = 20;
const MAX_NEWS_LIMIT: usize = 100;

#[derive(serde::Deserialize)]
struct DividendsQuery {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    provider: Option<String>,
}

#[derive(serde::Deserialize)]
struct EarningsQuery {
    limit: Option<usize>,
    provider: Option<String>,
}

#[derive(serde::Deserialize)]
struct CalendarQuery {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    symbols: Option<String>,
    provider: Option<String>,
}

#[derive(serde::Deserialize)]
struct NewsQuery {
    symbols: Option<String>,
    limit: Option<usize>,
    provider: Option<String>,
}

async fn get_dividends(
    Path(symbol): Path<String>,
    Query(q): Query<DividendsQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<Dividend>>> {
    let range = date_range(q.start, q.end, 5 * 365)?;
    let dividends = state
        .market_data
        .get_dividends(&symbol.to_uppercase(), range, q.provider.as_deref())
        .await?;
    Ok(Json(dividends))
}

async fn get_earnings(
    Path(symbol): Path<String>,
    Query(q): Query<EarningsQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<EarningsReport>>> {
    let options = EarningsOptions { limit: q.limit };
    let reports = state
        .market_data
        .get_earnings(&symbol.to_uppercase(), &options, q.provider.as_deref())
        .await?;
    Ok(Json(reports))
}

async fn get_upcoming_earnings(
    Query(q): Query<CalendarQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<EarningsReport>>> {
    // Defaults to the coming week
    let window = date_range(
        q.from.or_else(|| Some(chrono::Utc::now().date_naive())),
        q.to.or_else(|| Some(chrono::Utc::now().date_naive() + chrono::Duration::days(7))),
        7,
    )?;
    let options = UpcomingEarningsOptions {
        from: window.start,
        to: window.end,
        symbols: parse_symbols(q.symbols.as_deref()),
    };
    let reports = state
        .market_data
        .get_upcoming_earnings(&options, q.provider.as_deref())
        .await?;
    Ok(Json(reports))
}

async fn get_news(
    Query(q): Query<NewsQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<NewsArticle>>> {
    let symbols = parse_symbols(q.symbols.as_deref());
    let limit = q.limit.unwrap_or(DEFAULT_NEWS_LIMIT).clamp(1, MAX_NEWS_LIMIT);
    let articles = state
        .market_data
        .get_market_news(&symbols, limit, q.provider.as_deref())
        .await?;
    Ok(Json(articles))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dividends/{symbol}", get(get_dividends))
        .route("/earnings/upcoming", get(get_upcoming_earnings))
        .route("/earnings/{symbol}", get(get_earnings))
        .route("/news", get(get_news))
}
