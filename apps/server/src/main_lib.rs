use std::sync::Arc;

use crate::config::Config;
use tickerbridge_market_data::{build_registry, MarketDataService, ProviderSettings};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub struct AppState {
    pub market_data: Arc<MarketDataService>,
}

impl AppState {
    pub fn new(market_data: MarketDataService) -> Arc<Self> {
        Arc::new(Self {
            market_data: Arc::new(market_data),
        })
    }
}

pub fn init_tracing() {
    let log_format = std::env::var("TB_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let settings = ProviderSettings::from_env()?;
    let registry = build_registry(&settings)?;

    tracing::info!(
        "Market data providers: {:?} (request timeout {:?})",
        registry
            .descriptors()
            .iter()
            .map(|d| format!("{}@{}", d.name, d.priority))
            .collect::<Vec<_>>(),
        config.request_timeout
    );

    Ok(AppState::new(MarketDataService::new(Arc::new(registry))))
}
