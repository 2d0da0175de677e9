//! Adaptive rate limiter
//!
//! Keeps a per-provider delay that grows on throttling and failures and
//! shrinks on success. Decisions are advisory; the circuit breaker is the
//! hard gate.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

use super::TelemetryStore;
use crate::domain::resilience::{OutcomeClass, RateDecision, RateLimiterConfig};
use crate::domain::ProviderKind;
use crate::infrastructure::observability::record_adaptive_delay;

#[derive(Debug, Clone)]
struct LimiterState {
    adaptive_delay: Duration,
    last_rate_limit: Option<Instant>,
}

/// Per-provider adaptive backoff
#[derive(Debug)]
pub struct AdaptiveRateLimiter {
    states: DashMap<ProviderKind, LimiterState>,
    telemetry: Arc<TelemetryStore>,
    config: RateLimiterConfig,
}

impl AdaptiveRateLimiter {
    pub fn new(telemetry: Arc<TelemetryStore>, config: RateLimiterConfig) -> Self {
        Self {
            states: DashMap::new(),
            telemetry,
            config,
        }
    }

    fn initial_state(&self) -> LimiterState {
        LimiterState {
            adaptive_delay: self.clamp(self.config.base_delay()),
            last_rate_limit: None,
        }
    }

    fn clamp(&self, delay: Duration) -> Duration {
        delay.clamp(self.config.min_delay(), self.config.max_delay())
    }

    /// Decide whether a request to the provider should go out now
    pub fn should_proceed(&self, provider: ProviderKind) -> RateDecision {
        let now = Instant::now();
        let state = self
            .states
            .get(&provider)
            .map(|s| s.clone())
            .unwrap_or_else(|| self.initial_state());

        if let Some(limited_at) = state.last_rate_limit {
            let elapsed = now.saturating_duration_since(limited_at);
            if elapsed < self.config.rate_limit_window() && elapsed < state.adaptive_delay {
                let remaining = state.adaptive_delay - elapsed;
                return RateDecision::wait(
                    remaining,
                    format!("{} rate limited {:?} ago", provider, elapsed),
                );
            }
        }

        let (volume, success_rate) = self.telemetry.recent(provider, self.config.volume_window());
        if volume >= self.config.high_volume_threshold && success_rate < self.config.min_success_rate {
            return RateDecision::wait(
                state.adaptive_delay * 2,
                format!(
                    "{} degraded: success rate {:.2} over {} recent requests",
                    provider, success_rate, volume
                ),
            );
        }

        RateDecision::proceed()
    }

    /// Adjust the provider's delay after an attempt
    pub fn record_outcome(&self, provider: ProviderKind, outcome: OutcomeClass) {
        let now = Instant::now();
        let initial = self.initial_state();
        let mut state = self.states.entry(provider).or_insert(initial);
        let before = state.adaptive_delay;

        match outcome {
            OutcomeClass::RateLimited => {
                state.adaptive_delay = self.clamp(before.mul_f64(self.config.rate_limit_factor));
                state.last_rate_limit = Some(now);
            }
            OutcomeClass::Success => {
                state.adaptive_delay = self.clamp(before.mul_f64(self.config.success_factor));
            }
            OutcomeClass::Failure => {
                let cap = self.config.failure_delay_cap();
                if before < cap {
                    state.adaptive_delay = self.clamp(before.mul_f64(self.config.failure_factor).min(cap));
                }
            }
            OutcomeClass::Cancelled => {}
        }

        let after = state.adaptive_delay;
        drop(state);

        if after != before {
            debug!(provider = %provider, ?before, ?after, "Adaptive delay adjusted");
            record_adaptive_delay(provider, after);
        }
    }

    /// Current adaptive delay of a provider
    pub fn current_delay(&self, provider: ProviderKind) -> Duration {
        self.states
            .get(&provider)
            .map(|s| s.adaptive_delay)
            .unwrap_or_else(|| self.initial_state().adaptive_delay)
    }

    /// Forget all state for a provider
    pub fn reset(&self, provider: ProviderKind) {
        self.states.remove(&provider);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProviderError, RequestOutcome};

    fn limiter() -> (Arc<TelemetryStore>, AdaptiveRateLimiter) {
        let telemetry = Arc::new(TelemetryStore::default());
        let limiter = AdaptiveRateLimiter::new(telemetry.clone(), RateLimiterConfig::default());
        (telemetry, limiter)
    }

    const P: ProviderKind = ProviderKind::OpenAi;

    #[tokio::test]
    async fn test_starts_at_base_delay_and_proceeds() {
        let (_, limiter) = limiter();

        assert_eq!(limiter.current_delay(P), Duration::from_secs(1));
        assert!(limiter.should_proceed(P).allowed);
    }

    #[tokio::test]
    async fn test_rate_limit_multiplies_delay() {
        let (_, limiter) = limiter();

        limiter.record_outcome(P, OutcomeClass::RateLimited);
        assert_eq!(limiter.current_delay(P), Duration::from_millis(2500));
    }

    #[tokio::test]
    async fn test_success_shrinks_to_floor() {
        let (_, limiter) = limiter();

        for _ in 0..100 {
            limiter.record_outcome(P, OutcomeClass::Success);
        }
        assert_eq!(limiter.current_delay(P), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_failures_capped_at_failure_cap() {
        let (_, limiter) = limiter();

        for _ in 0..100 {
            limiter.record_outcome(P, OutcomeClass::Failure);
        }
        assert_eq!(limiter.current_delay(P), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_failure_never_lowers_delay_above_cap() {
        let (_, limiter) = limiter();

        for _ in 0..5 {
            limiter.record_outcome(P, OutcomeClass::RateLimited);
        }
        let throttled = limiter.current_delay(P);
        assert!(throttled > Duration::from_secs(60));

        limiter.record_outcome(P, OutcomeClass::Failure);
        assert_eq!(limiter.current_delay(P), throttled);
    }

    #[tokio::test]
    async fn test_delay_bounds_hold_for_any_sequence() {
        let (_, limiter) = limiter();
        let pattern = [
            OutcomeClass::RateLimited,
            OutcomeClass::RateLimited,
            OutcomeClass::Failure,
            OutcomeClass::Success,
            OutcomeClass::RateLimited,
            OutcomeClass::Cancelled,
        ];

        for outcome in pattern.iter().cycle().take(300) {
            let before = limiter.current_delay(P);
            limiter.record_outcome(P, *outcome);
            let after = limiter.current_delay(P);

            assert!(after >= Duration::from_millis(500));
            assert!(after <= Duration::from_secs(300));
            if *outcome == OutcomeClass::RateLimited {
                assert!(after >= (before * 2).min(Duration::from_secs(300)));
            }
        }
    }

    #[tokio::test]
    async fn test_cancelled_leaves_delay_unchanged() {
        let (_, limiter) = limiter();

        limiter.record_outcome(P, OutcomeClass::Cancelled);
        assert_eq!(limiter.current_delay(P), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recent_rate_limit_gates_for_remaining_delay() {
        let (_, limiter) = limiter();

        limiter.record_outcome(P, OutcomeClass::RateLimited);
        tokio::time::advance(Duration::from_millis(1000)).await;

        let decision = limiter.should_proceed(P);
        assert!(!decision.allowed);
        assert_eq!(decision.recommended_delay, Duration::from_millis(1500));

        tokio::time::advance(Duration::from_millis(1500)).await;
        assert!(limiter.should_proceed(P).allowed);
    }

    #[tokio::test]
    async fn test_high_volume_low_success_doubles_delay() {
        let (telemetry, limiter) = limiter();

        for i in 0..10 {
            let outcome = if i < 6 {
                RequestOutcome::failure(P, Duration::from_millis(10), &ProviderError::from_status(500, ""))
            } else {
                RequestOutcome::success(P, Duration::from_millis(10))
            };
            telemetry.record(outcome);
        }

        let decision = limiter.should_proceed(P);
        assert!(!decision.allowed);
        assert_eq!(decision.recommended_delay, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_low_volume_failures_do_not_gate() {
        let (telemetry, limiter) = limiter();

        for _ in 0..9 {
            telemetry.record(RequestOutcome::failure(
                P,
                Duration::from_millis(10),
                &ProviderError::from_status(500, ""),
            ));
        }

        assert!(limiter.should_proceed(P).allowed);
    }
}
