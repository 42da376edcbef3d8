//! Provider settings and registry construction.
//!
//! Settings come from the environment:
//!
//! | Variable              | Meaning                                              |
//! |-----------------------|------------------------------------------------------|
//! | `TB_PROVIDERS`        | Comma list of enabled ids (`YAHOO,FINNHUB,...`)      |
//! | `<ID>_API_KEY`        | API key for a keyed vendor                           |
//! | `<ID>_PRIORITY`       | Priority override, lower is tried first              |
//! | `<ID>_CAPABILITIES`   | Capabilities or categories to keep, e.g. `realtime`  |
//! | `<ID>_ENABLED`        | `false` keeps a listed provider out of the registry  |
//!
//! Without `TB_PROVIDERS`, Yahoo is enabled plus every vendor whose key is set.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::MarketDataError;
use crate::provider::alpha_vantage::AlphaVantageProvider;
use crate::provider::finnhub::FinnhubProvider;
use crate::provider::yahoo::YahooProvider;
use crate::provider::{MarketDataProvider, ProviderCapabilities};
use crate::registry::ProviderRegistry;

pub const PROVIDER_YAHOO: &str = "YAHOO";
pub const PROVIDER_FINNHUB: &str = "FINNHUB";
pub const PROVIDER_ALPHA_VANTAGE: &str = "ALPHA_VANTAGE";

/// Every vendor this crate ships an adapter for.
pub const KNOWN_PROVIDERS: [&str; 3] = [PROVIDER_YAHOO, PROVIDER_FINNHUB, PROVIDER_ALPHA_VANTAGE];

/// Configuration for one provider.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSetting {
    /// Provider ID (e.g., "YAHOO", "ALPHA_VANTAGE")
    pub id: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Overrides the adapter's own priority when set
    pub priority: Option<i32>,
    pub enabled: bool,
    /// Narrows the adapter's capabilities when set
    pub capabilities: Option<ProviderCapabilities>,
}

impl ProviderSetting {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_capabilities(mut self, capabilities: ProviderCapabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    fn has_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// The full provider configuration, in the order ids were listed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub providers: Vec<ProviderSetting>,
}

impl ProviderSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, MarketDataError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings from a variable map.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, MarketDataError> {
        Self::from_lookup(|name| vars.get(name).cloned())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, MarketDataError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let ids: Vec<String> = match var("TB_PROVIDERS") {
            Some(list) => list
                .split(',')
                .map(|id| id.trim().to_ascii_uppercase())
                .filter(|id| !id.is_empty())
                .collect(),
            None => KNOWN_PROVIDERS
                .iter()
                .filter(|id| **id == PROVIDER_YAHOO || var(&format!("{}_API_KEY", id)).is_some())
                .map(|id| id.to_string())
                .collect(),
        };

        let mut providers = Vec::with_capacity(ids.len());
        for id in ids {
            if providers.iter().any(|p: &ProviderSetting| p.id == id) {
                debug!("Provider {} listed twice, keeping the first", id);
                continue;
            }

            let mut setting = ProviderSetting::new(id.as_str());
            setting.api_key = var(&format!("{}_API_KEY", id));

            if let Some(raw) = var(&format!("{}_PRIORITY", id)) {
                let priority = raw.parse::<i32>().map_err(|_| {
                    MarketDataError::InvalidConfig(format!("{}_PRIORITY is not an integer: {}", id, raw))
                })?;
                setting.priority = Some(priority);
            }

            if let Some(raw) = var(&format!("{}_CAPABILITIES", id)) {
                setting.capabilities = Some(raw.parse::<ProviderCapabilities>()?);
            }

            if let Some(raw) = var(&format!("{}_ENABLED", id)) {
                setting.enabled = parse_flag(&raw).ok_or_else(|| {
                    MarketDataError::InvalidConfig(format!("{}_ENABLED is not a boolean: {}", id, raw))
                })?;
                if !setting.enabled {
                    debug!("Provider {} disabled by {}_ENABLED", id, id);
                }
            }

            providers.push(setting);
        }

        Ok(Self { providers })
    }

    pub fn enabled(&self) -> impl Iterator<Item = &ProviderSetting> {
        self.providers.iter().filter(|p| p.enabled)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Create the adapter for a setting.
///
/// Returns `Ok(None)` for unknown ids and keyed vendors without a key.
fn create_provider(
    setting: &ProviderSetting,
) -> Result<Option<Arc<dyn MarketDataProvider>>, MarketDataError> {
    let key = || setting.api_key.clone().unwrap_or_default();

    match setting.id.as_str() {
        PROVIDER_YAHOO => Ok(Some(Arc::new(YahooProvider::new()?))),
        PROVIDER_FINNHUB if setting.has_key() => Ok(Some(Arc::new(FinnhubProvider::new(key())))),
        PROVIDER_ALPHA_VANTAGE if setting.has_key() => {
            Ok(Some(Arc::new(AlphaVantageProvider::new(key()))))
        }
        PROVIDER_FINNHUB | PROVIDER_ALPHA_VANTAGE => {
            warn!("Provider {} requires {}_API_KEY, skipping", setting.id, setting.id);
            Ok(None)
        }
        other => {
            warn!("Unknown market data provider '{}', skipping", other);
            Ok(None)
        }
    }
}

/// Build a registry holding every enabled provider that could be created.
pub fn build_registry(settings: &ProviderSettings) -> Result<ProviderRegistry, MarketDataError> {
    let adapters = settings
        .enabled()
        .map(|s| create_provider(s).map(|adapter| (s, adapter)))
        .collect::<Result<Vec<_>, _>>()?;

    registry_from(
        adapters
            .into_iter()
            .filter_map(|(setting, adapter)| adapter.map(|a| (setting, a))),
    )
}

/// Register adapters, applying priority and capability overrides.
fn registry_from<'a>(
    adapters: impl IntoIterator<Item = (&'a ProviderSetting, Arc<dyn MarketDataProvider>)>,
) -> Result<ProviderRegistry, MarketDataError> {
    let mut registry = ProviderRegistry::new();

    for (setting, adapter) in adapters {
        let mut descriptor = adapter.descriptor();
        if let Some(priority) = setting.priority {
            descriptor = descriptor.with_priority(priority);
        }
        if let Some(narrowed) = setting.capabilities {
            let capabilities = descriptor.capabilities.intersect(&narrowed);
            descriptor = descriptor.with_capabilities(capabilities);
        }
        registry.register(descriptor, adapter)?;
    }

    if registry.is_empty() {
        warn!("No market data providers initialized");
    } else {
        info!(
            "Market data registry initialized with {} providers: {:?}",
            registry.len(),
            registry
                .descriptors()
                .iter()
                .map(|d| d.name.to_string())
                .collect::<Vec<_>>()
        );
    }

    Ok(registry)
}
