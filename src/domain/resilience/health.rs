//! Health views exposed for reporting and gating decisions

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::image::ProviderKind;

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    #[default]
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rolling telemetry for a single provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderTelemetry {
    pub provider: ProviderKind,
    /// Fraction of successful outcomes in the window; 1.0 when empty
    pub success_rate: f64,
    pub avg_latency_ms: f64,
    pub consecutive_failures: u32,
    pub window_size: usize,
    pub last_check: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
}

impl ProviderTelemetry {
    /// Neutral state for a provider that has not been called yet
    pub fn healthy(provider: ProviderKind) -> Self {
        Self {
            provider,
            success_rate: 1.0,
            avg_latency_ms: 0.0,
            consecutive_failures: 0,
            window_size: 0,
            last_check: None,
            last_success: None,
        }
    }
}

/// Read-only provider status composed from telemetry, breaker and limiter
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub provider: ProviderKind,
    pub success_rate: f64,
    pub avg_latency_ms: f64,
    pub last_check: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub circuit_state: CircuitState,
    pub consecutive_failures: u32,
    pub breaker_failures: u32,
    pub adaptive_delay_ms: u64,
    pub health_score: f64,
    pub window_size: usize,
}

/// Verdict of the circuit breaker for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerDecision {
    pub allowed: bool,
    pub state: CircuitState,
    pub reason: Option<String>,
}

impl BreakerDecision {
    pub fn allow(state: CircuitState) -> Self {
        Self {
            allowed: true,
            state,
            reason: None,
        }
    }

    pub fn deny(state: CircuitState, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            state,
            reason: Some(reason.into()),
        }
    }
}

/// Advisory verdict of the rate limiter for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub recommended_delay: Duration,
    pub reason: Option<String>,
}

impl RateDecision {
    pub fn proceed() -> Self {
        Self {
            allowed: true,
            recommended_delay: Duration::ZERO,
            reason: None,
        }
    }

    pub fn wait(delay: Duration, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            recommended_delay: delay,
            reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_state_serde() {
        assert_eq!(
            serde_json::to_string(&CircuitState::HalfOpen).unwrap(),
            "\"half_open\""
        );
        assert_eq!(CircuitState::default(), CircuitState::Closed);
    }

    #[test]
    fn test_healthy_defaults() {
        let telemetry = ProviderTelemetry::healthy(ProviderKind::OpenAi);
        assert_eq!(telemetry.success_rate, 1.0);
        assert_eq!(telemetry.window_size, 0);
        assert!(telemetry.last_success.is_none());
    }
}
