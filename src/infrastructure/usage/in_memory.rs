//! In-memory usage repository

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::usage::{UsageRecord, UsageRepository};
use crate::domain::DomainError;

/// In-memory usage repository, bounded to `max_records`
#[derive(Debug)]
pub struct InMemoryUsageRepository {
    records: RwLock<Vec<UsageRecord>>,
    max_records: usize,
}

impl InMemoryUsageRepository {
    pub fn new(max_records: usize) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            max_records,
        }
    }

    /// Drop the oldest records once over the limit
    fn evict_if_needed(&self, records: &mut Vec<UsageRecord>) {
        if records.len() <= self.max_records {
            return;
        }

        records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        let to_remove = records.len() - self.max_records;
        records.drain(..to_remove);
    }
}

impl Default for InMemoryUsageRepository {
    fn default() -> Self {
        Self::new(100_000)
    }
}

#[async_trait]
impl UsageRepository for InMemoryUsageRepository {
    async fn record(&self, record: UsageRecord) -> Result<(), DomainError> {
        let mut records = self.records.write().map_err(|e| {
            DomainError::internal(format!("Failed to acquire write lock: {}", e))
        })?;

        records.push(record);
        self.evict_if_needed(&mut records);

        Ok(())
    }

    async fn since(&self, since: DateTime<Utc>) -> Result<Vec<UsageRecord>, DomainError> {
        let records = self.records.read().map_err(|e| {
            DomainError::internal(format!("Failed to acquire read lock: {}", e))
        })?;

        let mut results: Vec<_> = records
            .iter()
            .filter(|r| r.timestamp >= since)
            .cloned()
            .collect();
        results.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        Ok(results)
    }

    async fn delete_before(&self, before: DateTime<Utc>) -> Result<usize, DomainError> {
        let mut records = self.records.write().map_err(|e| {
            DomainError::internal(format!("Failed to acquire write lock: {}", e))
        })?;

        let initial = records.len();
        records.retain(|r| r.timestamp >= before);

        Ok(initial - records.len())
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let records = self.records.read().map_err(|e| {
            DomainError::internal(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(records.len())
    }
}
