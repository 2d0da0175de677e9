//! Per-provider circuit breaker

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::TelemetryStore;
use crate::domain::resilience::{BreakerDecision, CircuitBreakerConfig, CircuitState};
use crate::domain::ProviderKind;
use crate::infrastructure::observability::record_circuit_transition;

/// Breaker state of a single provider
#[derive(Debug, Clone, Default)]
struct ProviderCircuit {
    state: CircuitState,
    failures: u32,
    opened_at: Option<Instant>,
    /// Set while a half-open probe is in flight
    probe_started: Option<Instant>,
}

/// Circuit breaker keyed by provider
///
/// closed: every request passes. open: requests are denied until the
/// recovery timeout elapses. half_open: exactly one probe is admitted and
/// its result closes or re-opens the circuit.
#[derive(Debug)]
pub struct CircuitBreaker {
    circuits: DashMap<ProviderKind, ProviderCircuit>,
    telemetry: Arc<TelemetryStore>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(telemetry: Arc<TelemetryStore>, config: CircuitBreakerConfig) -> Self {
        let circuits = DashMap::new();
        for provider in ProviderKind::ALL {
            circuits.insert(provider, ProviderCircuit::default());
        }

        Self {
            circuits,
            telemetry,
            config,
        }
    }

    /// Decide whether a request may be sent to the provider
    pub fn allow_request(&self, provider: ProviderKind) -> BreakerDecision {
        let now = Instant::now();
        let recovery = self.config.recovery_timeout();
        let mut circuit = self.circuits.entry(provider).or_default();
        let current = circuit.state;

        match current {
            CircuitState::Closed => BreakerDecision::allow(CircuitState::Closed),
            CircuitState::Open => {
                let elapsed = circuit
                    .opened_at
                    .map(|at| now.saturating_duration_since(at))
                    .unwrap_or(recovery);

                if elapsed >= recovery {
                    circuit.state = CircuitState::HalfOpen;
                    circuit.probe_started = Some(now);
                    drop(circuit);
                    self.transitioned(provider, CircuitState::Open, CircuitState::HalfOpen);
                    BreakerDecision::allow(CircuitState::HalfOpen)
                } else {
                    BreakerDecision::deny(
                        CircuitState::Open,
                        format!(
                            "circuit open for {}, retry in {:?}",
                            provider,
                            recovery - elapsed
                        ),
                    )
                }
            }
            CircuitState::HalfOpen => {
                let probe_lost = circuit
                    .probe_started
                    .map(|at| now.saturating_duration_since(at) >= recovery)
                    .unwrap_or(true);

                if probe_lost {
                    circuit.probe_started = Some(now);
                    debug!(provider = %provider, "Admitting half-open probe");
                    BreakerDecision::allow(CircuitState::HalfOpen)
                } else {
                    BreakerDecision::deny(
                        CircuitState::HalfOpen,
                        format!("probe already in flight for {}", provider),
                    )
                }
            }
        }
    }

    /// Feed the result of an attempt that reached the provider
    pub fn record_result(&self, provider: ProviderKind, success: bool, latency: Duration) {
        let now = Instant::now();
        let mut circuit = self.circuits.entry(provider).or_default();
        let before = circuit.state;

        if success {
            match before {
                CircuitState::HalfOpen => {
                    circuit.state = CircuitState::Closed;
                    circuit.failures = 0;
                    circuit.opened_at = None;
                    circuit.probe_started = None;
                }
                CircuitState::Closed => {
                    circuit.failures = circuit.failures.saturating_sub(1);
                }
                CircuitState::Open => {}
            }
        } else {
            circuit.failures += 1;
            let failures = circuit.failures;
            match before {
                CircuitState::Closed if failures >= self.config.failure_threshold => {
                    circuit.state = CircuitState::Open;
                    circuit.opened_at = Some(now);
                }
                CircuitState::HalfOpen => {
                    circuit.state = CircuitState::Open;
                    circuit.opened_at = Some(now);
                    circuit.probe_started = None;
                }
                _ => {}
            }
        }

        let after = circuit.state;
        let failures = circuit.failures;
        drop(circuit);

        debug!(provider = %provider, success, ?latency, failures, state = %after, "Breaker result recorded");

        if before != after {
            self.transitioned(provider, before, after);
        }
    }

    /// Release a half-open probe slot without counting a failure
    pub fn record_cancelled(&self, provider: ProviderKind) {
        if let Some(mut circuit) = self.circuits.get_mut(&provider) {
            if circuit.state == CircuitState::HalfOpen {
                circuit.probe_started = None;
            }
        }
    }

    pub fn state(&self, provider: ProviderKind) -> CircuitState {
        self.circuits
            .get(&provider)
            .map(|c| c.state)
            .unwrap_or_default()
    }

    pub fn failure_count(&self, provider: ProviderKind) -> u32 {
        self.circuits.get(&provider).map(|c| c.failures).unwrap_or(0)
    }

    /// Force the provider back to closed
    pub fn reset(&self, provider: ProviderKind) {
        let before = self.state(provider);
        self.circuits.insert(provider, ProviderCircuit::default());

        if before != CircuitState::Closed {
            self.transitioned(provider, before, CircuitState::Closed);
        }
    }

    /// Reporting score in [0, 1]
    pub fn health_score(&self, provider: ProviderKind) -> f64 {
        match self.state(provider) {
            CircuitState::Open => 0.0,
            CircuitState::HalfOpen => 0.3,
            CircuitState::Closed => {
                let telemetry = self.telemetry.health(provider);
                let reference_ms = self.config.reference_latency().as_secs_f64() * 1000.0;
                let latency_score = if reference_ms > 0.0 {
                    1.0 - (telemetry.avg_latency_ms / reference_ms).min(1.0)
                } else {
                    0.0
                };

                (0.7 * telemetry.success_rate + 0.3 * latency_score).clamp(0.0, 1.0)
            }
        }
    }

    fn transitioned(&self, provider: ProviderKind, from: CircuitState, to: CircuitState) {
        match to {
            CircuitState::Open => {
                warn!(provider = %provider, from = %from, "Circuit opened");
            }
            CircuitState::HalfOpen => {
                info!(provider = %provider, "Circuit half-open, probing");
            }
            CircuitState::Closed => {
                info!(provider = %provider, from = %from, "Circuit closed");
            }
        }

        record_circuit_transition(provider, from, to);
    }
}
