//! Multi-key resolution across providers.
//!
//! Each provider in priority order is handed only the keys earlier providers
//! could not resolve. Successful keys are never overwritten, every requested
//! key ends up with exactly one entry, and the whole call never fails.

use std::future::Future;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::errors::MarketDataError;
use crate::models::{BatchResult, KeyedResult, ProviderId};
use crate::provider::{Capability, MarketDataProvider};

use super::emptiness::Emptiness;
use super::provider_registry::ProviderRegistry;

/// Fills a key set from successive providers.
#[derive(Clone, Debug)]
pub struct BatchResolver {
    registry: Arc<ProviderRegistry>,
}

impl BatchResolver {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    /// Resolve `keys` with the per-provider batch operation `op`.
    ///
    /// `op` receives a provider and the keys still pending for it.
    pub async fn resolve_batch<T, F, Fut>(
        &self,
        capability: Capability,
        keys: &[String],
        op: F,
    ) -> BatchResult<T>
    where
        T: Emptiness,
        F: Fn(Arc<dyn MarketDataProvider>, Vec<String>) -> Fut,
        Fut: Future<Output = Result<BatchResult<T>, MarketDataError>>,
    {
        self.resolve_batch_preferring(capability, keys, None, op).await
    }

    /// [`resolve_batch`](Self::resolve_batch), starting with `preferred` when
    /// it supports the capability.
    pub async fn resolve_batch_preferring<T, F, Fut>(
        &self,
        capability: Capability,
        keys: &[String],
        preferred: Option<&str>,
        op: F,
    ) -> BatchResult<T>
    where
        T: Emptiness,
        F: Fn(Arc<dyn MarketDataProvider>, Vec<String>) -> Fut,
        Fut: Future<Output = Result<BatchResult<T>, MarketDataError>>,
    {
        let mut result: BatchResult<T> = BatchResult::new(keys.iter().cloned());
        if result.is_empty() {
            return result;
        }

        let candidates = self.registry.providers_preferring(capability, preferred);
        if candidates.is_empty() {
            warn!("No providers available for {}", capability);
            for key in keys {
                result.insert(KeyedResult::failed(
                    key.clone(),
                    MarketDataError::NoProvidersAvailable { capability },
                ));
            }
            return result;
        }

        for provider in candidates {
            let pending = result.pending_keys();
            if pending.is_empty() {
                break;
            }

            let name = provider.name().to_string();
            debug!(
                "Asking provider '{}' for {} of {} keys ({})",
                name,
                pending.len(),
                result.len(),
                capability
            );

            match op(Arc::clone(provider.adapter()), pending.clone()).await {
                Ok(answer) => overlay(&mut result, answer, &pending, &name, capability),
                Err(e) => {
                    warn!(
                        "Provider '{}' failed {} for {} keys: {}",
                        name,
                        capability,
                        pending.len(),
                        e
                    );
                    for key in &pending {
                        if let Some(entry) = result.get_mut(key) {
                            entry.error = Some(e.duplicate());
                        }
                    }
                }
            }
        }

        let resolved = result.successes().count();
        if resolved < result.len() {
            info!(
                "Resolved {}/{} keys for {}",
                resolved,
                result.len(),
                capability
            );
        }
        result
    }
}

/// Merge one provider's answer into the running result.
///
/// Only keys in `pending` are touched. Keys the provider left out of its
/// answer are recorded as empty.
fn overlay<T: Emptiness>(
    result: &mut BatchResult<T>,
    answer: BatchResult<T>,
    pending: &[String],
    provider: &str,
    capability: Capability,
) {
    let empty = || MarketDataError::EmptyResult {
        provider: provider.to_string(),
        capability,
    };

    let mut answered = std::collections::HashSet::new();
    for entry in answer {
        if !pending.contains(&entry.key) {
            debug!("Ignoring unrequested key '{}' from '{}'", entry.key, provider);
            continue;
        }
        answered.insert(entry.key.clone());

        match entry.value {
            Some(value) if !value.is_empty_payload() => {
                let source = ProviderId::from(provider.to_string());
                result.insert(KeyedResult::ok(entry.key, value, source));
            }
            _ => {
                if let Some(current) = result.get_mut(&entry.key) {
                    current.error = Some(entry.error.unwrap_or_else(empty));
                }
            }
        }
    }

    for key in pending.iter().filter(|k| !answered.contains(*k)) {
        if let Some(current) = result.get_mut(key) {
            current.error = Some(empty());
        }
    }
}
