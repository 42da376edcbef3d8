use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use tickerbridge_market_data::{AssetProfile, Fundamentals, SymbolMatch};

use super::{batch_response, parse_symbols, BatchEntry};
use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

#[derive(serde::Deserialize)]
struct ProviderQuery {
    provider: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProfilesQuery {
    symbols: Option<String>,
    provider: Option<String>,
}

#[derive(serde::Deserialize)]
struct SearchQuery {
    q: Option<String>,
    provider: Option<String>,
}

async fn get_profile(
    Path(symbol): Path<String>,
    Query(q): Query<ProviderQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<AssetProfile>> {
    let profile = state
        .market_data
        .get_profile(&symbol.to_uppercase(), q.provider.as_deref())
        .await?;
    Ok(Json(profile))
}

async fn get_profiles(
    Query(q): Query<ProfilesQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<BTreeMap<String, BatchEntry<AssetProfile>>>> {
    let symbols = parse_symbols(q.symbols.as_deref());
    if symbols.is_empty() {
        return Err(ApiError::BadRequest("symbols is required".to_string()));
    }
    let result = state
        .market_data
        .get_profiles(&symbols, q.provider.as_deref())
        .await;
    Ok(Json(batch_response(result)))
}

async fn get_fundamentals(
    Path(symbol): Path<String>,
    Query(q): Query<ProviderQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Fundamentals>> {
    let fundamentals = state
        .market_data
        .get_fundamentals(&symbol.to_uppercase(), q.provider.as_deref())
        .await?;
    Ok(Json(fundamentals))
}

async fn search_symbols(
    Query(q): Query<SearchQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<SymbolMatch>>> {
    let query = q.q.unwrap_or_default();
    let matches = state
        .market_data
        .search_symbols(&query, q.provider.as_deref())
        .await?;
    Ok(Json(matches))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/profiles", get(get_profiles))
        .route("/profiles/{symbol}", get(get_profile))
        .route("/fundamentals/{symbol}", get(get_fundamentals))
        .route("/search", get(search_symbols))
}
