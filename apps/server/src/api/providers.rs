use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use tickerbridge_market_data::ProviderDescriptor;

use crate::main_lib::AppState;

/// Registered providers, highest priority first.
async fn list_providers(State(state): State<Arc<AppState>>) -> Json<Vec<ProviderDescriptor>> {
    Json(state.market_data.providers())
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/providers", get(list_providers))
}
