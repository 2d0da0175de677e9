//! In-memory cache repository

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::domain::semantic_cache::{CacheEntry, CacheRepository};
use crate::domain::DomainError;

/// Cache metadata held in a sharded map keyed by fingerprint
///
/// Suitable for development and tests; entries are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryCacheRepository {
    entries: DashMap<String, CacheEntry>,
}

impl InMemoryCacheRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn by_popularity(a: &CacheEntry, b: &CacheEntry) -> Ordering {
    b.access_count().cmp(&a.access_count()).then_with(|| {
        b.quality_score()
            .partial_cmp(&a.quality_score())
            .unwrap_or(Ordering::Equal)
    })
}

fn by_eviction_priority(a: &CacheEntry, b: &CacheEntry) -> Ordering {
    a.access_count()
        .cmp(&b.access_count())
        .then_with(|| a.last_access().cmp(&b.last_access()))
        .then_with(|| a.created_at().cmp(&b.created_at()))
        .then_with(|| a.fingerprint().cmp(b.fingerprint()))
}

#[async_trait]
impl CacheRepository for InMemoryCacheRepository {
    async fn get(&self, fingerprint: &str) -> Result<Option<CacheEntry>, DomainError> {
        Ok(self.entries.get(fingerprint).map(|e| e.clone()))
    }

    async fn upsert(&self, entry: CacheEntry) -> Result<(), DomainError> {
        self.entries.insert(entry.fingerprint().to_string(), entry);
        Ok(())
    }

    async fn candidates(
        &self,
        category: &str,
        min_quality: f64,
        limit: usize,
    ) -> Result<Vec<CacheEntry>, DomainError> {
        let mut candidates: Vec<CacheEntry> = self
            .entries
            .iter()
            .filter(|e| e.category() == category && e.quality_score() >= min_quality)
            .map(|e| e.clone())
            .collect();

        candidates.sort_by(by_popularity);
        candidates.truncate(limit);

        Ok(candidates)
    }

    async fn touch(&self, fingerprint: &str, at: DateTime<Utc>) -> Result<bool, DomainError> {
        match self.entries.get_mut(fingerprint) {
            Some(mut entry) => {
                entry.touch(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, fingerprint: &str) -> Result<Option<CacheEntry>, DomainError> {
        Ok(self.entries.remove(fingerprint).map(|(_, entry)| entry))
    }

    async fn eviction_order(&self) -> Result<Vec<CacheEntry>, DomainError> {
        let mut entries: Vec<CacheEntry> = self.entries.iter().map(|e| e.clone()).collect();
        entries.sort_by(by_eviction_priority);
        Ok(entries)
    }

    async fn total_size(&self) -> Result<u64, DomainError> {
        Ok(self.entries.iter().map(|e| e.artifact_size()).sum())
    }

    async fn count(&self) -> Result<usize, DomainError> {
        Ok(self.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(fingerprint: &str, category: &str, quality: f64) -> CacheEntry {
        CacheEntry::new(
            fingerprint,
            format!("text {}", fingerprint),
            category,
            format!("/tmp/{}.png", fingerprint),
            100,
            quality,
        )
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let repo = InMemoryCacheRepository::new();

        repo.upsert(entry("a", "myth", 0.7)).await.unwrap();
        repo.upsert(entry("a", "myth", 0.9)).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
        let stored = repo.get("a").await.unwrap().unwrap();
        assert!((stored.quality_score() - 0.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_candidates_filtered_and_ranked() {
        let repo = InMemoryCacheRepository::new();
        let now = Utc::now();

        repo.upsert(entry("low", "myth", 0.5)).await.unwrap();
        repo.upsert(entry("other", "nature", 0.9)).await.unwrap();
        repo.upsert(entry("good", "myth", 0.95)).await.unwrap();
        repo.upsert(entry("popular", "myth", 0.7).with_access(4, now)).await.unwrap();
        repo.upsert(entry("fair", "myth", 0.8)).await.unwrap();

        let candidates = repo.candidates("myth", 0.6, 20).await.unwrap();
        let order: Vec<&str> = candidates.iter().map(|e| e.fingerprint()).collect();
        assert_eq!(order, vec!["popular", "good", "fair"]);

        let limited = repo.candidates("myth", 0.6, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_touch_and_delete() {
        let repo = InMemoryCacheRepository::new();
        repo.upsert(entry("a", "myth", 0.7)).await.unwrap();

        let at = Utc::now() + Duration::seconds(10);
        assert!(repo.touch("a", at).await.unwrap());
        assert!(!repo.touch("missing", at).await.unwrap());

        let stored = repo.get("a").await.unwrap().unwrap();
        assert_eq!(stored.access_count(), 1);
        assert_eq!(stored.last_access(), at);

        assert!(repo.delete("a").await.unwrap().is_some());
        assert!(repo.delete("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_eviction_order_and_size() {
        let repo = InMemoryCacheRepository::new();
        let now = Utc::now();

        repo.upsert(entry("busy", "myth", 0.7).with_access(5, now)).await.unwrap();
        repo.upsert(entry("stale", "myth", 0.7).with_access(1, now - Duration::hours(2))).await.unwrap();
        repo.upsert(entry("fresh", "myth", 0.7).with_access(1, now)).await.unwrap();

        let order: Vec<String> = repo
            .eviction_order()
            .await
            .unwrap()
            .iter()
            .map(|e| e.fingerprint().to_string())
            .collect();
        assert_eq!(order, vec!["stale", "fresh", "busy"]);
        assert_eq!(repo.total_size().await.unwrap(), 300);
    }

    #[tokio::test]
    async fn test_eviction_ties_break_on_creation_then_fingerprint() {
        let repo = InMemoryCacheRepository::new();
        let now = Utc::now();

        repo.upsert(entry("b", "myth", 0.7).with_created_at(now).with_access(0, now)).await.unwrap();
        repo.upsert(entry("a", "myth", 0.7).with_created_at(now).with_access(0, now)).await.unwrap();
        repo.upsert(
            entry("z", "myth", 0.7)
                .with_created_at(now - Duration::minutes(5))
                .with_access(0, now),
        )
        .await
        .unwrap();

        let order: Vec<String> = repo
            .eviction_order()
            .await
            .unwrap()
            .iter()
            .map(|e| e.fingerprint().to_string())
            .collect();
        assert_eq!(order, vec!["z", "a", "b"]);
    }
}
