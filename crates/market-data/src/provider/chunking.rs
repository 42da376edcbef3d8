//! Emulated multi-key calls for providers without a native batch endpoint.
//!
//! Keys are cut into ordered chunks of [`CHUNK_SIZE`]. Inside a chunk at most
//! `max_concurrency` single-key requests are in flight and the chunk waits for
//! all of them; chunks run one after another with `pause` slept between them.

use std::future::Future;

use futures::stream::{self, StreamExt};
use log::debug;

use crate::errors::MarketDataError;
use crate::models::{BatchResult, KeyedResult, ProviderId};
use crate::registry::{Emptiness, EmptinessPolicy};

use super::capabilities::{BatchPolicy, Capability};

/// Keys per chunk. Shared by every provider.
pub const CHUNK_SIZE: usize = 5;

/// Runs a single-key operation over many keys for one provider.
#[derive(Clone, Debug)]
pub struct ChunkedBatch<'a> {
    provider: &'a str,
    capability: Capability,
    policy: BatchPolicy,
}

impl<'a> ChunkedBatch<'a> {
    pub fn new(provider: &'a str, capability: Capability, policy: BatchPolicy) -> Self {
        Self {
            provider,
            capability,
            policy,
        }
    }

    /// Call `op` once per distinct key and collect the outcomes.
    ///
    /// Failures stay local to their key and nothing falls back to another
    /// provider. Payloads rejected by `emptiness` are recorded as
    /// [`MarketDataError::EmptyResult`].
    pub async fn run<T, F, Fut>(
        &self,
        keys: &[String],
        emptiness: EmptinessPolicy,
        op: F,
    ) -> BatchResult<T>
    where
        T: Emptiness + Send,
        F: Fn(String) -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, MarketDataError>> + Send,
    {
        let mut result = BatchResult::new(keys.iter().cloned());
        let keys: Vec<String> = result.keys().map(str::to_string).collect();
        let concurrency = self.policy.max_concurrency.clamp(1, CHUNK_SIZE);

        for (index, chunk) in keys.chunks(CHUNK_SIZE).enumerate() {
            if index > 0 && !self.policy.pause.is_zero() {
                debug!(
                    "{}: pausing {:?} before chunk {}",
                    self.provider,
                    self.policy.pause,
                    index + 1
                );
                tokio::time::sleep(self.policy.pause).await;
            }

            let outcomes: Vec<(String, Result<T, MarketDataError>)> =
                stream::iter(chunk.iter().cloned())
                    .map(|key| {
                        let fut = op(key.clone());
                        async move { (key, fut.await) }
                    })
                    .buffer_unordered(concurrency)
                    .collect()
                    .await;

            for (key, outcome) in outcomes {
                result.insert(self.to_keyed(key, outcome, emptiness));
            }
        }

        result
    }

    fn to_keyed<T: Emptiness>(
        &self,
        key: String,
        outcome: Result<T, MarketDataError>,
        emptiness: EmptinessPolicy,
    ) -> KeyedResult<T> {
        match outcome {
            Ok(value) if emptiness.accepts(&value) => {
                KeyedResult::ok(key, value, ProviderId::from(self.provider.to_string()))
            }
            Ok(_) => KeyedResult::failed(
                key,
                MarketDataError::EmptyResult {
                    provider: self.provider.to_string(),
                    capability: self.capability,
                },
            ),
            Err(e) => KeyedResult::failed(key, e),
        }
    }
}
