//! Usage repository trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;

use super::UsageRecord;
use crate::domain::DomainError;

/// Append-only store of usage records
#[async_trait]
pub trait UsageRepository: Send + Sync + Debug {
    /// Record a usage event
    async fn record(&self, record: UsageRecord) -> Result<(), DomainError>;

    /// Records with a timestamp at or after `since`, oldest first
    async fn since(&self, since: DateTime<Utc>) -> Result<Vec<UsageRecord>, DomainError>;

    /// Delete records older than `before`
    async fn delete_before(&self, before: DateTime<Utc>) -> Result<usize, DomainError>;

    /// Total number of records
    async fn count(&self) -> Result<usize, DomainError>;
}
