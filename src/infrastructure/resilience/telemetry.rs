//! Per-provider rolling telemetry

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::time::Instant;

use crate::domain::resilience::{OutcomeClass, ProviderTelemetry, RequestOutcome, TelemetryConfig};
use crate::domain::ProviderKind;

/// Outcome window and derived statistics of one provider
#[derive(Debug, Default)]
struct ProviderWindow {
    outcomes: VecDeque<RequestOutcome>,
    avg_latency_ms: Option<f64>,
    consecutive_failures: u32,
    last_check: Option<DateTime<Utc>>,
    last_success: Option<DateTime<Utc>>,
}

impl ProviderWindow {
    fn evict(&mut self, capacity: usize, max_age: Duration, now: Instant) {
        while self.outcomes.len() > capacity {
            self.outcomes.pop_front();
        }

        while self
            .outcomes
            .front()
            .is_some_and(|o| now.saturating_duration_since(o.at) > max_age)
        {
            self.outcomes.pop_front();
        }
    }

    /// Success rate over outcomes attributable to the provider
    fn success_rate<'a>(outcomes: impl Iterator<Item = &'a RequestOutcome>) -> (usize, f64) {
        let (total, successes) = outcomes
            .filter(|o| o.class() != OutcomeClass::Cancelled)
            .fold((0usize, 0usize), |(total, ok), o| {
                (total + 1, ok + usize::from(o.success))
            });

        if total == 0 {
            (0, 1.0)
        } else {
            (total, successes as f64 / total as f64)
        }
    }
}

/// Rolling window of request outcomes per provider
///
/// Each provider has its own map entry, so recording for one provider never
/// blocks another.
#[derive(Debug)]
pub struct TelemetryStore {
    windows: DashMap<ProviderKind, ProviderWindow>,
    config: TelemetryConfig,
}

impl TelemetryStore {
    /// Create a store with every known provider in a healthy state
    pub fn new(config: TelemetryConfig) -> Self {
        let windows = DashMap::new();
        for provider in ProviderKind::ALL {
            windows.insert(provider, ProviderWindow::default());
        }

        Self { windows, config }
    }

    /// Append an outcome and update the provider's statistics
    pub fn record(&self, outcome: RequestOutcome) {
        let now = Instant::now();
        let mut window = self.windows.entry(outcome.provider).or_default();

        window.last_check = Some(outcome.timestamp);

        match outcome.class() {
            OutcomeClass::Success => {
                window.consecutive_failures = 0;
                window.last_success = Some(outcome.timestamp);
            }
            OutcomeClass::RateLimited | OutcomeClass::Failure => {
                window.consecutive_failures += 1;
            }
            OutcomeClass::Cancelled => {}
        }

        if outcome.class() != OutcomeClass::Cancelled {
            let latency_ms = outcome.latency.as_secs_f64() * 1000.0;
            let alpha = self.config.latency_alpha;
            window.avg_latency_ms = Some(match window.avg_latency_ms {
                Some(avg) => alpha * latency_ms + (1.0 - alpha) * avg,
                None => latency_ms,
            });
        }

        window.outcomes.push_back(outcome);
        window.evict(self.config.window_capacity, self.config.max_age(), now);
    }

    /// Snapshot of a provider's telemetry
    pub fn health(&self, provider: ProviderKind) -> ProviderTelemetry {
        let now = Instant::now();
        let mut window = self.windows.entry(provider).or_default();
        window.evict(self.config.window_capacity, self.config.max_age(), now);

        let (_, success_rate) = ProviderWindow::success_rate(window.outcomes.iter());

        ProviderTelemetry {
            provider,
            success_rate,
            avg_latency_ms: window.avg_latency_ms.unwrap_or(0.0),
            consecutive_failures: window.consecutive_failures,
            window_size: window.outcomes.len(),
            last_check: window.last_check,
            last_success: window.last_success,
        }
    }

    /// Volume and success rate over the last `window`
    pub fn recent(&self, provider: ProviderKind, window: Duration) -> (usize, f64) {
        let now = Instant::now();
        let Some(entry) = self.windows.get(&provider) else {
            return (0, 1.0);
        };

        ProviderWindow::success_rate(
            entry
                .outcomes
                .iter()
                .filter(|o| now.saturating_duration_since(o.at) <= window),
        )
    }

    /// Providers with telemetry
    pub fn providers(&self) -> Vec<ProviderKind> {
        let mut providers: Vec<ProviderKind> = self.windows.iter().map(|e| *e.key()).collect();
        providers.sort();
        providers
    }
}

impl Default for TelemetryStore {
    fn default() -> Self {
        Self::new(TelemetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProviderError;

    fn ok(latency_ms: u64) -> RequestOutcome {
        RequestOutcome::success(ProviderKind::OpenAi, Duration::from_millis(latency_ms))
    }

    fn failed() -> RequestOutcome {
        RequestOutcome::failure(
            ProviderKind::OpenAi,
            Duration::from_millis(100),
            &ProviderError::from_status(503, "busy"),
        )
    }

    #[test]
    fn test_known_providers_start_healthy() {
        let store = TelemetryStore::default();

        for provider in ProviderKind::ALL {
            let health = store.health(provider);
            assert_eq!(health.success_rate, 1.0);
            assert_eq!(health.consecutive_failures, 0);
            assert_eq!(health.window_size, 0);
        }
    }

    #[tokio::test]
    async fn test_latency_ema_seeded_by_first_sample() {
        let store = TelemetryStore::default();

        store.record(ok(1000));
        assert!((store.health(ProviderKind::OpenAi).avg_latency_ms - 1000.0).abs() < 1e-6);

        store.record(ok(2000));
        // 0.2 * 2000 + 0.8 * 1000
        assert!((store.health(ProviderKind::OpenAi).avg_latency_ms - 1200.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_success_rate_and_consecutive_failures() {
        let store = TelemetryStore::default();

        store.record(ok(10));
        store.record(failed());
        store.record(failed());
        store.record(ok(10));
        store.record(failed());

        let health = store.health(ProviderKind::OpenAi);
        assert!((health.success_rate - 0.4).abs() < 1e-9);
        assert_eq!(health.consecutive_failures, 1);
        assert_eq!(health.window_size, 5);
        assert!(health.last_success.is_some());
    }

    #[tokio::test]
    async fn test_cancelled_outcomes_do_not_count_against_provider() {
        let store = TelemetryStore::default();

        store.record(ok(10));
        store.record(RequestOutcome::failure(
            ProviderKind::OpenAi,
            Duration::from_millis(5),
            &ProviderError::cancelled(),
        ));

        let health = store.health(ProviderKind::OpenAi);
        assert_eq!(health.success_rate, 1.0);
        assert_eq!(health.consecutive_failures, 0);
        assert_eq!(health.window_size, 2);
    }

    #[tokio::test]
    async fn test_window_bounded_by_count() {
        let store = TelemetryStore::new(TelemetryConfig {
            window_capacity: 3,
            ..Default::default()
        });

        store.record(failed());
        for _ in 0..3 {
            store.record(ok(10));
        }

        let health = store.health(ProviderKind::OpenAi);
        assert_eq!(health.window_size, 3);
        assert_eq!(health.success_rate, 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_bounded_by_age() {
        let store = TelemetryStore::new(TelemetryConfig {
            window_secs: 60,
            ..Default::default()
        });

        store.record(failed());
        tokio::time::advance(Duration::from_secs(61)).await;
        store.record(ok(10));

        let health = store.health(ProviderKind::OpenAi);
        assert_eq!(health.window_size, 1);
        assert_eq!(health.success_rate, 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recent_window() {
        let store = TelemetryStore::default();

        store.record(failed());
        store.record(failed());
        tokio::time::advance(Duration::from_secs(600)).await;
        store.record(ok(10));

        let (count, rate) = store.recent(ProviderKind::OpenAi, Duration::from_secs(300));
        assert_eq!(count, 1);
        assert_eq!(rate, 1.0);

        let (count, rate) = store.recent(ProviderKind::OpenAi, Duration::from_secs(3600));
        assert_eq!(count, 3);
        assert!((rate - 1.0 / 3.0).abs() < 1e-9);
    }
}
