//! Resilience domain: outcomes, health views and gating decisions

mod config;
mod health;
mod outcome;

pub use config::{CircuitBreakerConfig, RateLimiterConfig, TelemetryConfig};
pub use health::{
    BreakerDecision, CircuitState, HealthSnapshot, ProviderTelemetry, RateDecision,
};
pub use outcome::{OutcomeClass, RequestOutcome};
