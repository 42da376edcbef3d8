//! Provider registry module.
//!
//! This module provides orchestration for market data providers, including:
//! - Provider registration and priority ordering
//! - Single-key fallback across providers
//! - Multi-key resolution that fills gaps provider by provider
//! - Emptiness checks deciding when a payload counts as an answer

mod batch;
mod emptiness;
mod fallback;
mod provider_registry;

pub use batch::BatchResolver;
pub use emptiness::{Emptiness, EmptinessPolicy};
pub use fallback::FallbackExecutor;
pub use provider_registry::{ProviderRegistry, RegisteredProvider};
