//! Usage record entities and cost aggregation

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::image::{ErrorKind, ImageSize, ProviderKind};

/// Unique identifier for a usage record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsageRecordId(String);

impl UsageRecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new unique ID
    pub fn generate() -> Self {
        Self(format!("usage-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UsageRecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the ledger is told about one attempted generation
#[derive(Debug, Clone)]
pub struct UsageEvent {
    pub provider: ProviderKind,
    pub operation: String,
    pub model: String,
    pub size: ImageSize,
    pub success: bool,
    pub cached: bool,
    pub latency: Duration,
    pub prompt_length: usize,
    pub error_kind: Option<ErrorKind>,
}

impl UsageEvent {
    /// A successful paid generation
    pub fn generated(
        provider: ProviderKind,
        model: impl Into<String>,
        size: ImageSize,
        latency: Duration,
        prompt_length: usize,
    ) -> Self {
        Self {
            provider,
            operation: "generate".to_string(),
            model: model.into(),
            size,
            success: true,
            cached: false,
            latency,
            prompt_length,
            error_kind: None,
        }
    }

    /// A request answered from the cache
    pub fn cache_hit(
        provider: ProviderKind,
        model: impl Into<String>,
        size: ImageSize,
        latency: Duration,
        prompt_length: usize,
    ) -> Self {
        Self {
            operation: "cache_hit".to_string(),
            cached: true,
            ..Self::generated(provider, model, size, latency, prompt_length)
        }
    }

    /// A failed attempt
    pub fn failed(
        provider: ProviderKind,
        model: impl Into<String>,
        size: ImageSize,
        latency: Duration,
        prompt_length: usize,
        error_kind: ErrorKind,
    ) -> Self {
        Self {
            success: false,
            error_kind: Some(error_kind),
            ..Self::generated(provider, model, size, latency, prompt_length)
        }
    }
}

/// A single persisted usage record; never mutated once written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    id: UsageRecordId,
    pub timestamp: DateTime<Utc>,
    pub provider: ProviderKind,
    pub operation: String,
    pub model: String,
    pub size: String,
    pub success: bool,
    /// Estimated cost in micro-dollars
    pub cost_micros: i64,
    pub prompt_length: u32,
    pub latency_ms: u64,
    pub cached: bool,
    pub error_kind: Option<ErrorKind>,
}

impl UsageRecord {
    /// Build the record for an event priced at `cost_micros`
    pub fn from_event(event: &UsageEvent, cost_micros: i64) -> Self {
        Self {
            id: UsageRecordId::generate(),
            timestamp: Utc::now(),
            provider: event.provider,
            operation: event.operation.clone(),
            model: event.model.clone(),
            size: event.size.to_string(),
            success: event.success,
            cost_micros,
            prompt_length: u32::try_from(event.prompt_length).unwrap_or(u32::MAX),
            latency_ms: u64::try_from(event.latency.as_millis()).unwrap_or(u64::MAX),
            cached: event.cached,
            error_kind: event.error_kind,
        }
    }

    /// Rebuild a stored record
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: UsageRecordId,
        timestamp: DateTime<Utc>,
        provider: ProviderKind,
        operation: String,
        model: String,
        size: String,
        success: bool,
        cost_micros: i64,
        prompt_length: u32,
        latency_ms: u64,
        cached: bool,
        error_kind: Option<ErrorKind>,
    ) -> Self {
        Self {
            id,
            timestamp,
            provider,
            operation,
            model,
            size,
            success,
            cost_micros,
            prompt_length,
            latency_ms,
            cached,
            error_kind,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn id(&self) -> &UsageRecordId {
        &self.id
    }

    pub fn cost_usd(&self) -> f64 {
        self.cost_micros as f64 / 1_000_000.0
    }

    /// Successful call that was actually sent to a provider
    pub fn is_paid(&self) -> bool {
        self.success && !self.cached
    }
}

/// Spend for one UTC day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCost {
    pub date: NaiveDate,
    pub requests: u64,
    pub cached: u64,
    pub cost: f64,
}

/// Aggregated spend over a window of days
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostSummary {
    pub window_days: u32,
    pub total_cost: f64,
    pub per_provider_cost: BTreeMap<ProviderKind, f64>,
    pub total_requests: u64,
    pub paid_requests: u64,
    pub cached_count: u64,
    pub failed_requests: u64,
    /// Average real cost applied to the requests served from cache
    pub estimated_savings: f64,
    pub cache_hit_rate: f64,
    pub cost_per_request: f64,
    pub daily: Vec<DailyCost>,
}

impl CostSummary {
    pub fn from_records<'a>(
        window_days: u32,
        records: impl IntoIterator<Item = &'a UsageRecord>,
    ) -> Self {
        let mut total_micros: i64 = 0;
        let mut per_provider: BTreeMap<ProviderKind, i64> = BTreeMap::new();
        let mut daily: BTreeMap<NaiveDate, (u64, u64, i64)> = BTreeMap::new();
        let mut summary = Self {
            window_days,
            ..Self::default()
        };

        for record in records {
            summary.total_requests += 1;
            total_micros += record.cost_micros;
            *per_provider.entry(record.provider).or_insert(0) += record.cost_micros;

            if record.cached {
                summary.cached_count += 1;
            } else if record.success {
                summary.paid_requests += 1;
            } else {
                summary.failed_requests += 1;
            }

            let day = daily.entry(record.timestamp.date_naive()).or_insert((0, 0, 0));
            day.0 += 1;
            if record.cached {
                day.1 += 1;
            }
            day.2 += record.cost_micros;
        }

        summary.total_cost = micros_to_usd(total_micros);
        summary.per_provider_cost = per_provider
            .into_iter()
            .map(|(provider, micros)| (provider, micros_to_usd(micros)))
            .collect();

        if summary.paid_requests > 0 {
            let average = summary.total_cost / summary.paid_requests as f64;
            summary.estimated_savings = summary.cached_count as f64 * average;
        }

        let served = summary.cached_count + summary.paid_requests;
        if served > 0 {
            summary.cache_hit_rate = summary.cached_count as f64 / served as f64;
        }

        if summary.total_requests > 0 {
            summary.cost_per_request = summary.total_cost / summary.total_requests as f64;
        }

        summary.daily = daily
            .into_iter()
            .map(|(date, (requests, cached, micros))| DailyCost {
                date,
                requests,
                cached,
                cost: micros_to_usd(micros),
            })
            .collect();

        summary
    }
}

fn micros_to_usd(micros: i64) -> f64 {
    micros as f64 / 1_000_000.0
}
