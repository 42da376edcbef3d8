//! Per-provider attempt tracking for fallback diagnostics.

use serde::Serialize;

use crate::models::ProviderId;

use super::MarketDataError;

/// What happened when a provider was tried.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AttemptOutcome {
    /// The provider answered with a payload judged empty for the operation.
    Empty,

    /// The provider does not know the symbol or has no rows for the range.
    NotFound { message: String },

    /// The provider returned an error.
    Failed { message: String },
}

/// Record of a single provider attempt during a fallback run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderAttempt {
    pub provider_id: ProviderId,
    pub outcome: AttemptOutcome,
}

impl ProviderAttempt {
    pub fn empty(provider_id: impl Into<ProviderId>) -> Self {
        Self {
            provider_id: provider_id.into(),
            outcome: AttemptOutcome::Empty,
        }
    }

    pub fn failed(provider_id: impl Into<ProviderId>, message: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            outcome: AttemptOutcome::Failed {
                message: message.into(),
            },
        }
    }

    /// Record an adapter error, keeping "no such symbol" apart from faults.
    pub fn from_error(provider_id: impl Into<ProviderId>, error: &MarketDataError) -> Self {
        let message = error.to_string();
        let outcome = match error {
            MarketDataError::SymbolNotFound(_) | MarketDataError::NoDataForRange => {
                AttemptOutcome::NotFound { message }
            }
            _ => AttemptOutcome::Failed { message },
        };
        Self {
            provider_id: provider_id.into(),
            outcome,
        }
    }

    /// Error message, if the attempt failed with one.
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            AttemptOutcome::Failed { message } | AttemptOutcome::NotFound { message } => {
                Some(message)
            }
            AttemptOutcome::Empty => None,
        }
    }

    /// The provider had nothing for the request, as opposed to failing.
    pub fn is_no_data(&self) -> bool {
        matches!(
            self.outcome,
            AttemptOutcome::Empty | AttemptOutcome::NotFound { .. }
        )
    }
}

/// One-line summary for logging/debugging.
pub fn summarize_attempts(attempts: &[ProviderAttempt]) -> String {
    if attempts.is_empty() {
        return "no attempts".to_string();
    }

    attempts
        .iter()
        .map(|a| match &a.outcome {
            AttemptOutcome::Empty => format!("{}: EMPTY", a.provider_id),
            AttemptOutcome::NotFound { message } => {
                format!("{}: NOT FOUND ({})", a.provider_id, message)
            }
            AttemptOutcome::Failed { message } => format!("{}: ERROR ({})", a.provider_id, message),
        })
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempts_summary() {
        let attempts = vec![
            ProviderAttempt::failed("YAHOO", "Timeout: YAHOO"),
            ProviderAttempt::empty("ALPHA_VANTAGE"),
            ProviderAttempt::failed("FINNHUB", "Rate limited: FINNHUB"),
        ];

        let summary = summarize_attempts(&attempts);
        assert_eq!(
            summary,
            "YAHOO: ERROR (Timeout: YAHOO) -> ALPHA_VANTAGE: EMPTY -> FINNHUB: ERROR (Rate limited: FINNHUB)"
        );
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(summarize_attempts(&[]), "no attempts");
    }

    #[test]
    fn test_attempt_error_accessor() {
        assert_eq!(
            ProviderAttempt::failed("A", "boom").error(),
            Some("boom")
        );
        assert_eq!(ProviderAttempt::empty("B").error(), None);
    }

    #[test]
    fn test_from_error_separates_missing_symbols() {
        let missing = ProviderAttempt::from_error("A", &MarketDataError::SymbolNotFound("ZZZZ".into()));
        assert!(matches!(missing.outcome, AttemptOutcome::NotFound { .. }));
        assert!(missing.is_no_data());
        assert_eq!(missing.error(), Some("Symbol not found: ZZZZ"));

        let fault = ProviderAttempt::from_error("B", &MarketDataError::provider("B", "HTTP 500"));
        assert!(matches!(fault.outcome, AttemptOutcome::Failed { .. }));
        assert!(!fault.is_no_data());
        assert!(ProviderAttempt::empty("C").is_no_data());
    }
}
