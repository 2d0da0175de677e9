//! Telemetry, rate limiter and circuit breaker configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bounds of the per-provider outcome window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Maximum outcomes kept per provider
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,

    /// Maximum age of a kept outcome in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Smoothing factor of the latency moving average
    #[serde(default = "default_latency_alpha")]
    pub latency_alpha: f64,
}

fn default_window_capacity() -> usize {
    1000
}

fn default_window_secs() -> u64 {
    3600
}

fn default_latency_alpha() -> f64 {
    0.2
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            window_capacity: default_window_capacity(),
            window_secs: default_window_secs(),
            latency_alpha: default_latency_alpha(),
        }
    }
}

impl TelemetryConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Adaptive rate limiter tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Ceiling for growth caused by non-throttling failures
    #[serde(default = "default_failure_delay_cap_ms")]
    pub failure_delay_cap_ms: u64,

    #[serde(default = "default_rate_limit_factor")]
    pub rate_limit_factor: f64,

    #[serde(default = "default_success_factor")]
    pub success_factor: f64,

    #[serde(default = "default_failure_factor")]
    pub failure_factor: f64,

    /// How long a throttling event keeps gating requests, in seconds
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,

    /// Lookback used for the volume/success-rate check, in seconds
    #[serde(default = "default_volume_window_secs")]
    pub volume_window_secs: u64,

    #[serde(default = "default_high_volume_threshold")]
    pub high_volume_threshold: usize,

    #[serde(default = "default_min_success_rate")]
    pub min_success_rate: f64,
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_min_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    300_000
}

fn default_failure_delay_cap_ms() -> u64 {
    60_000
}

fn default_rate_limit_factor() -> f64 {
    2.5
}

fn default_success_factor() -> f64 {
    0.95
}

fn default_failure_factor() -> f64 {
    1.2
}

fn default_rate_limit_window_secs() -> u64 {
    900
}

fn default_volume_window_secs() -> u64 {
    300
}

fn default_high_volume_threshold() -> usize {
    10
}

fn default_min_success_rate() -> f64 {
    0.7
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            failure_delay_cap_ms: default_failure_delay_cap_ms(),
            rate_limit_factor: default_rate_limit_factor(),
            success_factor: default_success_factor(),
            failure_factor: default_failure_factor(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
            volume_window_secs: default_volume_window_secs(),
            high_volume_threshold: default_high_volume_threshold(),
            min_success_rate: default_min_success_rate(),
        }
    }
}

impl RateLimiterConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn failure_delay_cap(&self) -> Duration {
        Duration::from_millis(self.failure_delay_cap_ms)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn volume_window(&self) -> Duration {
        Duration::from_secs(self.volume_window_secs)
    }

    /// Check the delay bounds are ordered and the factors move in the right direction
    pub fn validate(&self) -> Result<(), String> {
        if self.min_delay_ms > self.max_delay_ms {
            return Err("rate_limit.min_delay_ms must not exceed max_delay_ms".to_string());
        }
        if self.base_delay_ms < self.min_delay_ms || self.base_delay_ms > self.max_delay_ms {
            return Err("rate_limit.base_delay_ms must lie within [min_delay_ms, max_delay_ms]".to_string());
        }
        // NaN and infinite factors would overflow Duration arithmetic
        if !self.rate_limit_factor.is_finite() || self.rate_limit_factor < 2.0 {
            return Err("rate_limit.rate_limit_factor must be a finite value of at least 2.0".to_string());
        }
        if !(0.0..=1.0).contains(&self.success_factor) {
            return Err("rate_limit.success_factor must be within [0, 1]".to_string());
        }
        if !self.failure_factor.is_finite() || self.failure_factor < 1.0 {
            return Err("rate_limit.failure_factor must be a finite value of at least 1.0".to_string());
        }
        if !(0.0..=1.0).contains(&self.min_success_rate) {
            return Err("rate_limit.min_success_rate must be within [0, 1]".to_string());
        }
        Ok(())
    }
}

/// Circuit breaker tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Time an open circuit waits before admitting a probe, in seconds
    #[serde(default = "default_recovery_timeout_secs")]
    pub recovery_timeout_secs: u64,

    /// Latency at which the health score's latency component reaches zero
    #[serde(default = "default_reference_latency_ms")]
    pub reference_latency_ms: u64,
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_recovery_timeout_secs() -> u64 {
    60
}

fn default_reference_latency_ms() -> u64 {
    30_000
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            recovery_timeout_secs: default_recovery_timeout_secs(),
            reference_latency_ms: default_reference_latency_ms(),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_secs(self.recovery_timeout_secs)
    }

    pub fn reference_latency(&self) -> Duration {
        Duration::from_millis(self.reference_latency_ms)
    }
}
