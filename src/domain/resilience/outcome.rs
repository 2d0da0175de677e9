//! Request outcomes fed into telemetry, the breaker and the limiter

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::domain::image::{ErrorKind, ProviderError, ProviderKind};

/// One finished provider attempt
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOutcome {
    pub provider: ProviderKind,
    pub success: bool,
    pub latency: Duration,
    pub status: Option<u16>,
    pub error_kind: Option<ErrorKind>,
    /// Monotonic time used for window eviction
    pub at: Instant,
    /// Wall-clock time reported in snapshots
    pub timestamp: DateTime<Utc>,
}

impl RequestOutcome {
    pub fn success(provider: ProviderKind, latency: Duration) -> Self {
        Self {
            provider,
            success: true,
            latency,
            status: Some(200),
            error_kind: None,
            at: Instant::now(),
            timestamp: Utc::now(),
        }
    }

    pub fn failure(provider: ProviderKind, latency: Duration, error: &ProviderError) -> Self {
        Self {
            provider,
            success: false,
            latency,
            status: error.status,
            error_kind: Some(error.kind),
            at: Instant::now(),
            timestamp: Utc::now(),
        }
    }

    pub fn class(&self) -> OutcomeClass {
        match (self.success, self.error_kind) {
            (true, _) => OutcomeClass::Success,
            (false, Some(ErrorKind::RateLimit)) => OutcomeClass::RateLimited,
            (false, Some(ErrorKind::Cancelled)) => OutcomeClass::Cancelled,
            (false, _) => OutcomeClass::Failure,
        }
    }
}

/// Coarse view of an outcome used to adjust adaptive state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeClass {
    Success,
    RateLimited,
    Failure,
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_class() {
        let provider = ProviderKind::OpenAi;
        let latency = Duration::from_millis(10);

        assert_eq!(
            RequestOutcome::success(provider, latency).class(),
            OutcomeClass::Success
        );
        assert_eq!(
            RequestOutcome::failure(provider, latency, &ProviderError::rate_limited("slow")).class(),
            OutcomeClass::RateLimited
        );
        assert_eq!(
            RequestOutcome::failure(provider, latency, &ProviderError::cancelled()).class(),
            OutcomeClass::Cancelled
        );
        assert_eq!(
            RequestOutcome::failure(provider, latency, &ProviderError::from_status(502, "")).class(),
            OutcomeClass::Failure
        );
    }

    #[test]
    fn test_failure_carries_status() {
        let outcome = RequestOutcome::failure(
            ProviderKind::Stability,
            Duration::ZERO,
            &ProviderError::rate_limited("slow down"),
        );
        assert_eq!(outcome.status, Some(429));
        assert_eq!(outcome.error_kind, Some(ErrorKind::RateLimit));
    }
}
