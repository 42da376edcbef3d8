//! Provider registry.
//!
//! The registry owns every configured adapter together with its descriptor
//! and answers one question: which adapters, in which order, should be tried
//! for a capability. It is built once at startup and shared read-only.

use std::fmt;
use std::sync::Arc;

use log::{debug, info};

use crate::errors::MarketDataError;
use crate::provider::{Capability, MarketDataProvider, ProviderDescriptor};

/// An adapter together with the descriptor it was registered under.
#[derive(Clone)]
pub struct RegisteredProvider {
    descriptor: ProviderDescriptor,
    adapter: Arc<dyn MarketDataProvider>,
}

impl RegisteredProvider {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn priority(&self) -> i32 {
        self.descriptor.priority
    }

    pub fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    pub fn adapter(&self) -> &Arc<dyn MarketDataProvider> {
        &self.adapter
    }
}

impl fmt::Debug for RegisteredProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredProvider")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Provider registry for orchestrating market data fetching.
#[derive(Clone, Debug, Default)]
pub struct ProviderRegistry {
    /// Registration order; sorting happens per lookup so ties stay stable.
    providers: Vec<RegisteredProvider>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under an explicit descriptor.
    ///
    /// Fails with [`MarketDataError::DuplicateProvider`] if the name is taken.
    pub fn register(
        &mut self,
        descriptor: ProviderDescriptor,
        adapter: Arc<dyn MarketDataProvider>,
    ) -> Result<(), MarketDataError> {
        if self.get(&descriptor.name).is_some() {
            return Err(MarketDataError::DuplicateProvider(descriptor.name.to_string()));
        }

        info!(
            "Registered provider '{}' (priority {}, capabilities: {})",
            descriptor.name,
            descriptor.priority,
            descriptor
                .capabilities
                .supported()
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join(",")
        );

        self.providers.push(RegisteredProvider { descriptor, adapter });
        Ok(())
    }

    /// Register an adapter under its own `descriptor()`.
    pub fn register_provider(
        &mut self,
        adapter: Arc<dyn MarketDataProvider>,
    ) -> Result<(), MarketDataError> {
        let descriptor = adapter.descriptor();
        self.register(descriptor, adapter)
    }

    /// Adapters supporting `capability`, lowest priority value first.
    ///
    /// Equal priorities keep registration order. Never fails; an empty list
    /// means nobody supports the capability.
    pub fn providers_for(&self, capability: Capability) -> Vec<RegisteredProvider> {
        let mut candidates: Vec<RegisteredProvider> = self
            .providers
            .iter()
            .filter(|p| p.descriptor.capabilities.supports(capability))
            .cloned()
            .collect();

        // sort_by_key is stable
        candidates.sort_by_key(|p| p.descriptor.priority);
        candidates
    }

    /// Like [`providers_for`](Self::providers_for), with `preferred` moved to
    /// the front when it supports the capability.
    pub fn providers_preferring(
        &self,
        capability: Capability,
        preferred: Option<&str>,
    ) -> Vec<RegisteredProvider> {
        let mut candidates = self.providers_for(capability);

        if let Some(preferred) = preferred {
            match candidates.iter().position(|p| p.name() == preferred) {
                Some(index) => {
                    let chosen = candidates.remove(index);
                    candidates.insert(0, chosen);
                }
                None => debug!(
                    "Preferred provider '{}' does not support {}, using priority order",
                    preferred, capability
                ),
            }
        }

        candidates
    }

    /// Every descriptor, in priority order.
    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        let mut descriptors: Vec<_> = self.providers.iter().map(|p| p.descriptor.clone()).collect();
        descriptors.sort_by_key(|d| d.priority);
        descriptors
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredProvider> {
        self.providers.iter().find(|p| p.name() == name)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{CapabilityCategory, ProviderCapabilities};
    use crate::testing::ScriptedProvider;

    fn registry_of(providers: Vec<ScriptedProvider>) -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        for p in providers {
            registry.register_provider(Arc::new(p)).unwrap();
        }
        registry
    }

    fn names(providers: &[RegisteredProvider]) -> Vec<&str> {
        providers.iter().map(|p| p.name()).collect()
    }

    #[test]
    fn test_provider_ordering_by_priority() {
        let registry = registry_of(vec![
            ScriptedProvider::new("LOW_PRIORITY", 20),
            ScriptedProvider::new("HIGH_PRIORITY", 5),
            ScriptedProvider::new("MED_PRIORITY", 10),
        ]);

        let ordered = registry.providers_for(Capability::Quote);
        assert_eq!(
            names(&ordered),
            vec!["HIGH_PRIORITY", "MED_PRIORITY", "LOW_PRIORITY"]
        );
    }

    #[test]
    fn test_ties_keep_registration_order() {
        let registry = registry_of(vec![
            ScriptedProvider::new("B", 10),
            ScriptedProvider::new("A", 10),
            ScriptedProvider::new("C", 1),
        ]);

        assert_eq!(names(&registry.providers_for(Capability::Quote)), vec!["C", "B", "A"]);
    }

    #[test]
    fn test_filter_by_capability() {
        let news_only = ScriptedProvider::new("NEWS", 1).with_capabilities(
            ProviderCapabilities::from_categories(&[CapabilityCategory::News]),
        );
        let registry = registry_of(vec![news_only, ScriptedProvider::new("QUOTES", 2)]);

        assert_eq!(names(&registry.providers_for(Capability::Quote)), vec!["QUOTES"]);
        assert_eq!(names(&registry.providers_for(Capability::MarketNews)), vec!["NEWS"]);
        assert!(registry.providers_for(Capability::SymbolSearch).is_empty());
    }

    #[test]
    fn test_preferred_provider_first() {
        let registry = registry_of(vec![
            ScriptedProvider::new("PROVIDER_A", 5),
            ScriptedProvider::new("PROVIDER_B", 10),
            ScriptedProvider::new("PROVIDER_C", 15),
        ]);

        let ordered = registry.providers_preferring(Capability::Quote, Some("PROVIDER_C"));
        assert_eq!(names(&ordered), vec!["PROVIDER_C", "PROVIDER_A", "PROVIDER_B"]);

        let unknown = registry.providers_preferring(Capability::Quote, Some("NOPE"));
        assert_eq!(names(&unknown), vec!["PROVIDER_A", "PROVIDER_B", "PROVIDER_C"]);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = ProviderRegistry::new();
        registry
            .register_provider(Arc::new(ScriptedProvider::new("YAHOO", 1)))
            .unwrap();

        let err = registry
            .register_provider(Arc::new(ScriptedProvider::new("YAHOO", 2)))
            .unwrap_err();
        assert!(matches!(err, MarketDataError::DuplicateProvider(ref name) if name == "YAHOO"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_explicit_descriptor_overrides_adapter_defaults() {
        let mut registry = ProviderRegistry::new();
        let adapter = Arc::new(ScriptedProvider::new("FINNHUB", 1));
        let descriptor = adapter
            .descriptor()
            .with_priority(50)
            .with_capabilities(ProviderCapabilities::none().with(Capability::Quote));
        registry.register(descriptor, adapter).unwrap();
        registry
            .register_provider(Arc::new(ScriptedProvider::new("YAHOO", 10)))
            .unwrap();

        assert_eq!(names(&registry.providers_for(Capability::Quote)), vec!["YAHOO", "FINNHUB"]);
        assert_eq!(names(&registry.providers_for(Capability::Dividends)), vec!["YAHOO"]);

        let descriptors = registry.descriptors();
        assert_eq!(descriptors[0].name, "YAHOO");
        assert_eq!(descriptors[1].priority, 50);
    }
}
