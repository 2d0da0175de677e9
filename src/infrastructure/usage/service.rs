//! Cost ledger: prices attempts, persists usage records and aggregates spend

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use tracing::{debug, warn};

use crate::domain::usage::{CostSummary, CostTable, UsageEvent, UsageRecord, UsageRepository};
use crate::domain::DomainError;
use crate::infrastructure::observability::record_cost;

/// Records the estimated cost of every attempted generation
#[derive(Debug, Clone)]
pub struct CostLedger {
    repository: Arc<dyn UsageRepository>,
    prices: CostTable,
}

impl CostLedger {
    pub fn new(repository: Arc<dyn UsageRepository>, prices: CostTable) -> Self {
        Self { repository, prices }
    }

    /// Price in micro-dollars charged for `event`
    fn price_micros(&self, event: &UsageEvent) -> i64 {
        if event.cached || !event.success {
            return 0;
        }

        match self.prices.lookup_micros(event.provider, &event.model, event.size) {
            Some(micros) => micros,
            None => {
                warn!(
                    provider = %event.provider,
                    model = %event.model,
                    size = %event.size,
                    "No price configured; recording zero cost"
                );
                0
            }
        }
    }

    /// Append a usage record and return its estimated cost in USD.
    ///
    /// A storage failure is logged and does not change the returned cost.
    pub async fn record(&self, event: UsageEvent) -> f64 {
        let record = UsageRecord::from_event(&event, self.price_micros(&event));
        let cost = record.cost_usd();

        debug!(
            provider = %record.provider,
            operation = %record.operation,
            success = record.success,
            cached = record.cached,
            cost,
            "Recording usage"
        );

        if let Err(e) = self.repository.record(record).await {
            warn!(provider = %event.provider, error = %e, "Failed to persist usage record");
        }

        if cost > 0.0 {
            record_cost(event.provider, cost);
        }

        cost
    }

    /// Spend over the last `window_days` days
    pub async fn summary(&self, window_days: u32) -> Result<CostSummary, DomainError> {
        let since = Utc::now() - ChronoDuration::days(i64::from(window_days));
        let records = self.repository.since(since).await?;

        Ok(CostSummary::from_records(window_days, &records))
    }

    /// Delete records older than `older_than_days`, returning how many went
    pub async fn prune(&self, older_than_days: u32) -> Result<usize, DomainError> {
        let before = Utc::now() - ChronoDuration::days(i64::from(older_than_days));
        let removed = self.repository.delete_before(before).await?;

        debug!(removed, older_than_days, "Pruned usage records");
        Ok(removed)
    }
}
