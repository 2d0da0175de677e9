//! Provider resilience: telemetry, adaptive rate limiting and circuit breaking

mod circuit_breaker;
mod rate_limiter;
mod telemetry;

pub use circuit_breaker::CircuitBreaker;
pub use rate_limiter::AdaptiveRateLimiter;
pub use telemetry::TelemetryStore;
