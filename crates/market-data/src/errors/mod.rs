//! Error types for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all market data operations
//! - [`ProviderAttempt`] / [`AttemptOutcome`]: per-provider diagnostics carried
//!   by the terminal [`MarketDataError::AllProvidersFailed`] error

mod attempts;

pub use attempts::{summarize_attempts, AttemptOutcome, ProviderAttempt};

use thiserror::Error;

use crate::provider::Capability;

/// Errors that can occur during market data operations.
///
/// Provider-level variants are recovered by the fallback executor and the
/// batch resolver; only the aggregate variants reach single-key callers.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The requested symbol was not found by the provider.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// No data available for the requested date range.
    /// The symbol exists but has no records in the specified period.
    #[error("No data for date range")]
    NoDataForRange,

    /// The provider answered, but the payload carried no usable data.
    #[error("Empty result from {provider} for {capability}")]
    EmptyResult {
        /// The provider that returned the empty payload
        provider: String,
        /// The operation that was attempted
        capability: Capability,
    },

    /// The provider rate limited the request (HTTP 429 or quota notice).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// A provider-specific error occurred.
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// The provider does not implement the requested operation.
    #[error("Operation '{operation}' not supported by {provider}")]
    NotSupported {
        /// The operation that was requested
        operation: String,
        /// The provider that doesn't support it
        provider: String,
    },

    /// Data validation failed.
    /// The provider returned data that could not be normalized.
    #[error("Validation failed: {message}")]
    ValidationFailed {
        /// Description of the validation failure
        message: String,
    },

    /// No registered provider declares the requested capability.
    #[error("No providers available for {capability}")]
    NoProvidersAvailable {
        /// The capability nobody supports
        capability: Capability,
    },

    /// Every candidate provider was tried and none produced a usable result.
    #[error("All providers failed for {capability}: {}", summarize_attempts(.attempts))]
    AllProvidersFailed {
        /// The capability that was requested
        capability: Capability,
        /// One entry per provider tried, in the order they were tried
        attempts: Vec<ProviderAttempt>,
    },

    /// Placeholder error for a batch key no provider has answered yet.
    #[error("Not yet resolved")]
    NotYetResolved,

    /// A provider with the same name is already registered.
    #[error("Provider already registered: {0}")]
    DuplicateProvider(String),

    /// Provider configuration could not be parsed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A network error occurred while communicating with a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// Whether this error is a "no data" answer rather than a fault.
    ///
    /// Soft errors are expected during fallback (a vendor without coverage for
    /// a symbol) and are logged at debug level; everything else is a warning.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            Self::SymbolNotFound(_)
                | Self::NoDataForRange
                | Self::EmptyResult { .. }
                | Self::NotSupported { .. }
                | Self::NotYetResolved
        )
    }

    /// Whether no provider had data for the request.
    ///
    /// True for a bare not-found answer, and for an aggregate failure in which
    /// every provider answered "unknown symbol" or empty rather than failing.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::SymbolNotFound(_) | Self::NoDataForRange => true,
            Self::AllProvidersFailed { attempts, .. } => {
                !attempts.is_empty() && attempts.iter().all(ProviderAttempt::is_no_data)
            }
            _ => false,
        }
    }

    /// Copy of this error for fanning one adapter fault out to many keys.
    ///
    /// `Network` errors cannot be cloned and become a `ProviderError` carrying
    /// the original message.
    pub fn duplicate(&self) -> Self {
        match self {
            Self::SymbolNotFound(s) => Self::SymbolNotFound(s.clone()),
            Self::NoDataForRange => Self::NoDataForRange,
            Self::EmptyResult {
                provider,
                capability,
            } => Self::EmptyResult {
                provider: provider.clone(),
                capability: *capability,
            },
            Self::RateLimited { provider } => Self::RateLimited {
                provider: provider.clone(),
            },
            Self::Timeout { provider } => Self::Timeout {
                provider: provider.clone(),
            },
            Self::ProviderError { provider, message } => Self::ProviderError {
                provider: provider.clone(),
                message: message.clone(),
            },
            Self::NotSupported {
                operation,
                provider,
            } => Self::NotSupported {
                operation: operation.clone(),
                provider: provider.clone(),
            },
            Self::ValidationFailed { message } => Self::ValidationFailed {
                message: message.clone(),
            },
            Self::NoProvidersAvailable { capability } => Self::NoProvidersAvailable {
                capability: *capability,
            },
            Self::AllProvidersFailed {
                capability,
                attempts,
            } => Self::AllProvidersFailed {
                capability: *capability,
                attempts: attempts.clone(),
            },
            Self::NotYetResolved => Self::NotYetResolved,
            Self::DuplicateProvider(name) => Self::DuplicateProvider(name.clone()),
            Self::InvalidConfig(msg) => Self::InvalidConfig(msg.clone()),
            Self::Network(e) => Self::ProviderError {
                provider: "network".to_string(),
                message: e.to_string(),
            },
        }
    }

    /// Map a reqwest failure, keeping timeouts distinct.
    pub fn from_http(provider: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                provider: provider.to_string(),
            }
        } else {
            Self::Network(err)
        }
    }

    /// Shorthand for a [`MarketDataError::ProviderError`].
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderError {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_errors() {
        assert!(MarketDataError::SymbolNotFound("ZZZZ".to_string()).is_soft());
        assert!(MarketDataError::NoDataForRange.is_soft());
        assert!(MarketDataError::EmptyResult {
            provider: "YAHOO".to_string(),
            capability: Capability::Quote,
        }
        .is_soft());
        assert!(!MarketDataError::RateLimited {
            provider: "FINNHUB".to_string()
        }
        .is_soft());
        assert!(!MarketDataError::provider("YAHOO", "HTTP 500").is_soft());
    }

    #[test]
    fn test_not_found_errors() {
        assert!(MarketDataError::SymbolNotFound("ZZZZ".into()).is_not_found());
        assert!(MarketDataError::AllProvidersFailed {
            capability: Capability::Quote,
            attempts: vec![
                ProviderAttempt::from_error("A", &MarketDataError::SymbolNotFound("ZZZZ".into())),
                ProviderAttempt::empty("B"),
            ],
        }
        .is_not_found());

        // One real fault means the answer is unknown, not missing
        assert!(!MarketDataError::AllProvidersFailed {
            capability: Capability::Quote,
            attempts: vec![
                ProviderAttempt::from_error("A", &MarketDataError::SymbolNotFound("ZZZZ".into())),
                ProviderAttempt::from_error("B", &MarketDataError::Timeout { provider: "B".into() }),
            ],
        }
        .is_not_found());
        assert!(!MarketDataError::AllProvidersFailed {
            capability: Capability::Quote,
            attempts: vec![],
        }
        .is_not_found());
        assert!(!MarketDataError::NoProvidersAvailable {
            capability: Capability::MarketNews
        }
        .is_not_found());
    }

    #[test]
    fn test_duplicate_keeps_variant() {
        let original = MarketDataError::RateLimited {
            provider: "FINNHUB".to_string(),
        };
        let copy = original.duplicate();
        assert!(matches!(copy, MarketDataError::RateLimited { ref provider } if provider == "FINNHUB"));
        assert_eq!(copy.to_string(), original.to_string());
    }

    #[test]
    fn test_error_display() {
        let error = MarketDataError::SymbolNotFound("INVALID".to_string());
        assert_eq!(format!("{}", error), "Symbol not found: INVALID");

        let error = MarketDataError::RateLimited {
            provider: "YAHOO".to_string(),
        };
        assert_eq!(format!("{}", error), "Rate limited: YAHOO");

        let error = MarketDataError::ProviderError {
            provider: "ALPHA_VANTAGE".to_string(),
            message: "API key invalid".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Provider error: ALPHA_VANTAGE - API key invalid"
        );

        let error = MarketDataError::NoProvidersAvailable {
            capability: Capability::Dividends,
        };
        assert_eq!(format!("{}", error), "No providers available for dividends");
    }

    #[test]
    fn test_all_providers_failed_display_lists_attempts() {
        let error = MarketDataError::AllProvidersFailed {
            capability: Capability::Quote,
            attempts: vec![
                ProviderAttempt::failed("YAHOO", "Symbol not found: ZZZZ"),
                ProviderAttempt::empty("FINNHUB"),
            ],
        };
        let text = error.to_string();
        assert!(text.starts_with("All providers failed for quote"));
        assert!(text.contains("YAHOO: ERROR (Symbol not found: ZZZZ)"));
        assert!(text.contains("FINNHUB: EMPTY"));
    }
}
