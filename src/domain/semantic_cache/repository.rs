//! Cache storage trait

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::CacheEntry;
use crate::domain::DomainError;

/// Persistence for cache entries
///
/// Implementations store metadata only; artifact files are owned by the
/// caller.
#[async_trait]
pub trait CacheRepository: Send + Sync + Debug {
    /// Get an entry by fingerprint
    async fn get(&self, fingerprint: &str) -> Result<Option<CacheEntry>, DomainError>;

    /// Insert or replace the entry with the same fingerprint
    async fn upsert(&self, entry: CacheEntry) -> Result<(), DomainError>;

    /// Entries of a category with at least `min_quality`, ordered by access
    /// count then quality score, both descending
    async fn candidates(
        &self,
        category: &str,
        min_quality: f64,
        limit: usize,
    ) -> Result<Vec<CacheEntry>, DomainError>;

    /// Increment the access count and set the last access time
    async fn touch(&self, fingerprint: &str, at: DateTime<Utc>) -> Result<bool, DomainError>;

    /// Delete an entry, returning it when it existed
    async fn delete(&self, fingerprint: &str) -> Result<Option<CacheEntry>, DomainError>;

    /// All entries ordered by access count, last access, creation time and
    /// fingerprint, all ascending
    async fn eviction_order(&self) -> Result<Vec<CacheEntry>, DomainError>;

    /// Sum of artifact sizes
    async fn total_size(&self) -> Result<u64, DomainError>;

    /// Number of entries
    async fn count(&self) -> Result<usize, DomainError>;
}
