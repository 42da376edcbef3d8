//! Single-key fallback across providers.

use std::future::Future;
use std::sync::Arc;

use log::{debug, warn};

use crate::errors::{MarketDataError, ProviderAttempt};
use crate::provider::{Capability, MarketDataProvider};

use super::emptiness::{Emptiness, EmptinessPolicy};
use super::provider_registry::ProviderRegistry;

/// Tries providers in order until one gives an acceptable answer.
#[derive(Clone, Debug)]
pub struct FallbackExecutor {
    registry: Arc<ProviderRegistry>,
}

impl FallbackExecutor {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Run `op` against the providers of `capability` in priority order.
    ///
    /// The first result accepted by `policy` is returned and later providers
    /// are never called. Errors and rejected empty payloads move on to the
    /// next provider; when the list is exhausted the caller gets
    /// [`MarketDataError::AllProvidersFailed`] with one attempt per provider.
    pub async fn resolve<T, F, Fut>(
        &self,
        capability: Capability,
        policy: EmptinessPolicy,
        op: F,
    ) -> Result<T, MarketDataError>
    where
        T: Emptiness,
        F: Fn(Arc<dyn MarketDataProvider>) -> Fut,
        Fut: Future<Output = Result<T, MarketDataError>>,
    {
        self.resolve_preferring(capability, policy, None, op).await
    }

    /// [`resolve`](Self::resolve), trying `preferred` first when it supports
    /// the capability.
    pub async fn resolve_preferring<T, F, Fut>(
        &self,
        capability: Capability,
        policy: EmptinessPolicy,
        preferred: Option<&str>,
        op: F,
    ) -> Result<T, MarketDataError>
    where
        T: Emptiness,
        F: Fn(Arc<dyn MarketDataProvider>) -> Fut,
        Fut: Future<Output = Result<T, MarketDataError>>,
    {
        let candidates = self.registry.providers_preferring(capability, preferred);
        if candidates.is_empty() {
            warn!("No providers available for {}", capability);
            return Err(MarketDataError::NoProvidersAvailable { capability });
        }

        let mut attempts = Vec::with_capacity(candidates.len());
        let mut empty_answer: Option<T> = None;

        for provider in candidates {
            let name = provider.name().to_string();
            debug!("Trying provider '{}' for {}", name, capability);

            match op(Arc::clone(provider.adapter())).await {
                Ok(value) if policy.accepts(&value) => {
                    debug!("Provider '{}' answered {}", name, capability);
                    return Ok(value);
                }
                Ok(value) => {
                    debug!("Provider '{}' returned an empty {}, trying next", name, capability);
                    attempts.push(ProviderAttempt::empty(name));
                    if policy == EmptinessPolicy::PreferNonEmpty && empty_answer.is_none() {
                        empty_answer = Some(value);
                    }
                }
                Err(e) => {
                    if e.is_soft() {
                        debug!("Provider '{}' failed {}: {}, trying next", name, capability, e);
                    } else {
                        warn!("Provider '{}' failed {}: {}, trying next", name, capability, e);
                    }
                    attempts.push(ProviderAttempt::from_error(name, &e));
                }
            }
        }

        if let Some(value) = empty_answer {
            debug!("No provider had data for {}, returning empty answer", capability);
            return Ok(value);
        }

        let error = MarketDataError::AllProvidersFailed {
            capability,
            attempts,
        };
        warn!("{}", error);
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AttemptOutcome;
    use crate::models::Quote;
    use crate::provider::ProviderCapabilities;
    use crate::testing::{Answer, ScriptedProvider};
    use rust_decimal_macros::dec;

    fn executor(providers: Vec<Arc<ScriptedProvider>>) -> FallbackExecutor {
        let mut registry = ProviderRegistry::new();
        for p in providers {
            registry.register_provider(p).unwrap();
        }
        FallbackExecutor::new(Arc::new(registry))
    }

    async fn quote(executor: &FallbackExecutor, symbol: &str) -> Result<Quote, MarketDataError> {
        executor
            .resolve(Capability::Quote, EmptinessPolicy::Reject, |p| async move {
                p.get_quote(symbol).await
            })
            .await
    }

    #[tokio::test]
    async fn test_first_non_empty_wins() {
        let a = Arc::new(ScriptedProvider::new("A", 1).answer("AAPL", Answer::Price(dec!(189))));
        let b = Arc::new(ScriptedProvider::new("B", 2).answer("AAPL", Answer::Price(dec!(190))));
        let exec = executor(vec![b.clone(), a.clone()]);

        let q = quote(&exec, "AAPL").await.unwrap();
        assert_eq!(q.price, dec!(189));
        assert_eq!(q.source, "A");
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 0);
    }

    #[tokio::test]
    async fn test_fallthrough_on_empty() {
        let a = Arc::new(ScriptedProvider::new("A", 1).answer("AAPL", Answer::Empty));
        let b = Arc::new(ScriptedProvider::new("B", 2).answer("AAPL", Answer::Price(dec!(190))));
        let exec = executor(vec![a.clone(), b.clone()]);

        let q = quote(&exec, "AAPL").await.unwrap();
        assert_eq!(q.source, "B");
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);
    }

    #[tokio::test]
    async fn test_fallthrough_on_error() {
        let a = Arc::new(ScriptedProvider::new("A", 1).answer("AAPL", Answer::Fail));
        let b = Arc::new(ScriptedProvider::new("B", 2).answer("AAPL", Answer::Price(dec!(190))));
        let exec = executor(vec![a, b]);

        assert_eq!(quote(&exec, "AAPL").await.unwrap().source, "B");
    }

    #[tokio::test]
    async fn test_all_failed_lists_every_attempt() {
        let exec = executor(vec![
            Arc::new(ScriptedProvider::new("A", 1).answer("ZZZZ", Answer::Fail)),
            Arc::new(ScriptedProvider::new("B", 2).answer("ZZZZ", Answer::Empty)),
            Arc::new(ScriptedProvider::new("C", 3).answer("ZZZZ", Answer::Fail)),
        ]);

        match quote(&exec, "ZZZZ").await {
            Err(MarketDataError::AllProvidersFailed {
                capability,
                attempts,
            }) => {
                assert_eq!(capability, Capability::Quote);
                let order: Vec<_> = attempts.iter().map(|a| a.provider_id.as_ref()).collect();
                assert_eq!(order, vec!["A", "B", "C"]);
                assert!(attempts[0].error().is_some());
                assert_eq!(attempts[1].outcome, AttemptOutcome::Empty);
            }
            other => panic!("expected AllProvidersFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_providers_available() {
        let news_only = ScriptedProvider::new("NEWS", 1)
            .with_capabilities(ProviderCapabilities::none().with(Capability::MarketNews));
        let exec = executor(vec![Arc::new(news_only)]);

        assert!(matches!(
            quote(&exec, "AAPL").await,
            Err(MarketDataError::NoProvidersAvailable {
                capability: Capability::Quote
            })
        ));
    }

    #[tokio::test]
    async fn test_accept_policy_returns_empty_immediately() {
        let a = Arc::new(ScriptedProvider::new("A", 1).answer("KO", Answer::Empty));
        let b = Arc::new(ScriptedProvider::new("B", 2).answer("KO", Answer::Price(dec!(0.5))));
        let exec = executor(vec![a, b.clone()]);

        let result = exec
            .resolve(Capability::Dividends, EmptinessPolicy::Accept, |p| async move {
                p.get_dividends("KO", crate::models::DateRange::last_days(365))
                    .await
            })
            .await
            .unwrap();

        assert!(result.is_empty());
        assert_eq!(b.calls(), 0);
    }

    #[tokio::test]
    async fn test_prefer_non_empty() {
        let empty = Arc::new(ScriptedProvider::new("A", 1).answer("MSFT", Answer::Empty));
        let failing = Arc::new(ScriptedProvider::new("B", 2).answer("MSFT", Answer::Fail));
        let exec = executor(vec![empty.clone(), failing.clone()]);

        let earnings = |exec: FallbackExecutor| async move {
            exec.resolve(
                Capability::Earnings,
                EmptinessPolicy::PreferNonEmpty,
                |p| async move { p.get_earnings("MSFT", &Default::default()).await },
            )
            .await
        };

        // Nobody has data, one provider answered empty: the empty answer wins.
        let result = earnings(exec.clone()).await.unwrap();
        assert!(result.is_empty());
        assert_eq!(failing.calls(), 1);

        // A later provider with data is preferred over the earlier empty one.
        let with_data = Arc::new(ScriptedProvider::new("C", 3).answer("MSFT", Answer::Price(dec!(2.9))));
        let exec = executor(vec![empty, failing, with_data]);
        let result = earnings(exec).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].source, "C");
    }

    #[tokio::test]
    async fn test_preferred_provider_tried_first() {
        let a = Arc::new(ScriptedProvider::new("A", 1).answer("AAPL", Answer::Price(dec!(1))));
        let b = Arc::new(ScriptedProvider::new("B", 2).answer("AAPL", Answer::Price(dec!(2))));
        let exec = executor(vec![a.clone(), b]);

        let q = exec
            .resolve_preferring(
                Capability::Quote,
                EmptinessPolicy::Reject,
                Some("B"),
                |p| async move { p.get_quote("AAPL").await },
            )
            .await
            .unwrap();
        assert_eq!(q.source, "B");
        assert_eq!(a.calls(), 0);
    }
}
