//! Observability infrastructure - Prometheus metrics

mod config;
mod metrics;

pub use config::MetricsConfig;
pub use metrics::{
    init_metrics, record_adaptive_delay, record_attempt, record_cache_lookup, record_circuit_transition,
    record_cost, record_rate_limit_wait, PrometheusMetrics,
};
