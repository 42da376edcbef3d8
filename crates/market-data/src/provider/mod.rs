//! Market data provider abstractions and implementations.
//!
//! This module contains:
//! - The `MarketDataProvider` trait that all providers implement
//! - Capabilities, descriptors and batch pacing
//! - Chunked emulation of multi-key calls
//! - Concrete provider implementations (Yahoo, Finnhub, Alpha Vantage)
//!
//! Adapters only translate between a vendor's wire format and the normalized
//! models. Ordering, fallback and merging live in the registry module.

mod capabilities;
mod chunking;
mod traits;

pub mod alpha_vantage;
pub mod finnhub;
pub mod yahoo;

// Re-exports
pub use capabilities::{
    BatchPolicy, Capability, CapabilityCategory, ProviderCapabilities, ProviderDescriptor,
};
pub use chunking::{ChunkedBatch, CHUNK_SIZE};
pub use traits::MarketDataProvider;
