//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use super::config::MetricsConfig;
use crate::domain::{CircuitState, ProviderKind};

/// Prometheus metrics handle used to render the exposition text
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl std::fmt::Debug for PrometheusMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusMetrics").finish_non_exhaustive()
    }
}

impl PrometheusMetrics {
    /// Render the current metrics in Prometheus text format
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Initialize Prometheus metrics
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    let builder = PrometheusBuilder::new();

    match builder.install_recorder() {
        Ok(handle) => {
            register_default_metrics();

            tracing::info!("Prometheus metrics initialized");

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

fn register_default_metrics() {
    gauge!("imagegen_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

/// Record one provider attempt
pub fn record_attempt(provider: ProviderKind, outcome: &str, duration: Duration) {
    let labels = [
        ("provider", provider.as_str().to_string()),
        ("outcome", outcome.to_string()),
    ];

    counter!("imagegen_attempts_total", &labels).increment(1);
    histogram!("imagegen_attempt_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Record a cache lookup result (`exact`, `similar`, `miss` or `stale`)
pub fn record_cache_lookup(result: &'static str) {
    counter!("imagegen_cache_lookups_total", "result" => result).increment(1);
}

/// Record a circuit breaker state change
pub fn record_circuit_transition(provider: ProviderKind, from: CircuitState, to: CircuitState) {
    counter!(
        "imagegen_circuit_transitions_total",
        "provider" => provider.as_str(),
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);

    let open = if to == CircuitState::Closed { 0.0 } else { 1.0 };
    gauge!("imagegen_circuit_open", "provider" => provider.as_str()).set(open);
}

/// Record the estimated cost of an attempt
pub fn record_cost(provider: ProviderKind, cost_usd: f64) {
    histogram!("imagegen_estimated_cost_usd", "provider" => provider.as_str()).record(cost_usd);
}

/// Record the current adaptive delay of a provider
pub fn record_adaptive_delay(provider: ProviderKind, delay: Duration) {
    gauge!("imagegen_adaptive_delay_seconds", "provider" => provider.as_str())
        .set(delay.as_secs_f64());
}

/// Record time spent waiting on the rate limiter
pub fn record_rate_limit_wait(provider: ProviderKind, waited: Duration) {
    histogram!("imagegen_rate_limit_wait_seconds", "provider" => provider.as_str())
        .record(waited.as_secs_f64());
}
