//! Semantic artifact cache service
//!
//! Answers lookups by exact fingerprint first, then by word-overlap
//! similarity among the most used entries of the same category. Storage
//! failures never reach the caller: they are logged and treated as misses.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::domain::semantic_cache::{
    fingerprint, CacheEntry, CacheHit, CacheRepository, CacheStats, ReclaimReport,
    SemanticCacheConfig, SimilarityScorer,
};
use crate::domain::DomainError;
use crate::infrastructure::artifacts::ArtifactStore;
use crate::infrastructure::observability::record_cache_lookup;

/// An artifact offered for caching
#[derive(Debug, Clone)]
pub struct CacheAdmission<'a> {
    pub request_text: &'a str,
    pub transformed_text: &'a str,
    pub category: &'a str,
    pub keywords: &'a [String],
    pub artifact_path: &'a Path,
    pub artifact_size: u64,
    pub quality_score: f64,
}

/// Quality-gated cache of generated artifacts
#[derive(Debug)]
pub struct SemanticCacheService {
    repository: Arc<dyn CacheRepository>,
    artifacts: ArtifactStore,
    config: SemanticCacheConfig,
    scorer: SimilarityScorer,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SemanticCacheService {
    pub fn new(
        repository: Arc<dyn CacheRepository>,
        artifacts: ArtifactStore,
        config: SemanticCacheConfig,
    ) -> Self {
        let scorer = SimilarityScorer::new(config.keyword_boost, config.max_keyword_boost);

        Self {
            repository,
            artifacts,
            config,
            scorer,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &SemanticCacheConfig {
        &self.config
    }

    /// Find a cached artifact for the request
    pub async fn lookup(&self, text: &str, category: &str, keywords: &[String]) -> Option<CacheHit> {
        if !self.config.enabled {
            return None;
        }

        match self.try_lookup(text, category, keywords).await {
            Ok(Some(hit)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                record_cache_lookup(if hit.is_exact() { "exact" } else { "similar" });
                debug!(
                    fingerprint = %hit.entry.fingerprint(),
                    similarity = hit.similarity,
                    "Cache hit"
                );
                Some(hit)
            }
            Ok(None) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                record_cache_lookup("miss");
                None
            }
            Err(e) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                record_cache_lookup("miss");
                warn!(error = %e, "Cache lookup failed, treating as miss");
                None
            }
        }
    }

    async fn try_lookup(
        &self,
        text: &str,
        category: &str,
        keywords: &[String],
    ) -> Result<Option<CacheHit>, DomainError> {
        let key = fingerprint(text);

        if let Some(entry) = self.repository.get(&key).await? {
            if entry.quality_score() >= self.config.min_quality {
                if let Some(entry) = self.confirm(entry).await? {
                    return Ok(Some(CacheHit::new(entry, 1.0)));
                }
            }
        }

        let candidates = self
            .repository
            .candidates(category, self.config.min_quality, self.config.candidate_limit)
            .await?;

        for candidate in candidates {
            if candidate.fingerprint() == key {
                continue;
            }

            let similarity =
                self.scorer
                    .score(text, keywords, candidate.request_text(), candidate.keywords());

            if similarity < self.config.similarity_threshold {
                continue;
            }

            if let Some(entry) = self.confirm(candidate).await? {
                return Ok(Some(CacheHit::new(entry, similarity)));
            }
        }

        Ok(None)
    }

    /// Register a hit, or drop the entry when its artifact is gone
    async fn confirm(&self, mut entry: CacheEntry) -> Result<Option<CacheEntry>, DomainError> {
        if !self.artifacts.exists(entry.artifact_path()).await {
            warn!(
                fingerprint = %entry.fingerprint(),
                path = %entry.artifact_path().display(),
                "Cached artifact missing, dropping entry"
            );
            record_cache_lookup("stale");
            self.repository.delete(entry.fingerprint()).await?;
            return Ok(None);
        }

        let now = Utc::now();
        self.repository.touch(entry.fingerprint(), now).await?;
        entry.touch(now);

        Ok(Some(entry))
    }

    /// Store an artifact; returns whether it was admitted
    pub async fn store(&self, admission: CacheAdmission<'_>) -> bool {
        if !self.config.enabled {
            return false;
        }

        if admission.quality_score < self.config.min_quality {
            debug!(
                quality = admission.quality_score,
                min_quality = self.config.min_quality,
                "Artifact below cache admission bar"
            );
            return false;
        }

        if let Some(max_bytes) = self.config.max_bytes {
            if admission.artifact_size > max_bytes {
                debug!(
                    size = admission.artifact_size,
                    max_bytes, "Artifact larger than the cache budget"
                );
                return false;
            }
        }

        let key = fingerprint(admission.request_text);

        if let Err(e) = self.try_store(&key, &admission).await {
            warn!(error = %e, "Cache store failed");
            return false;
        }

        // Never evict the entry just admitted
        if let Some(max_bytes) = self.config.max_bytes {
            if let Err(e) = self.evict_until(max_bytes, Some(&key)).await {
                warn!(error = %e, "Cache reclaim after store failed");
            }
        }

        true
    }

    async fn try_store(&self, key: &str, admission: &CacheAdmission<'_>) -> Result<(), DomainError> {
        let entry = CacheEntry::new(
            key,
            admission.request_text,
            admission.category,
            admission.artifact_path,
            admission.artifact_size,
            admission.quality_score,
        )
        .with_transformed_text(admission.transformed_text)
        .with_keywords(admission.keywords.iter().cloned());

        let previous = self.repository.get(key).await?;
        self.repository.upsert(entry).await?;

        if let Some(previous) = previous {
            if previous.artifact_path() != admission.artifact_path {
                self.artifacts.remove(previous.artifact_path()).await?;
            }
        }

        debug!(fingerprint = %key, category = %admission.category, "Artifact cached");
        Ok(())
    }

    /// Evict least used entries until the artifacts fit in `max_bytes`
    pub async fn reclaim(&self, max_bytes: u64) -> Result<ReclaimReport, DomainError> {
        self.evict_until(max_bytes, None).await
    }

    async fn evict_until(
        &self,
        max_bytes: u64,
        keep: Option<&str>,
    ) -> Result<ReclaimReport, DomainError> {
        let mut total = self.repository.total_size().await?;
        let mut report = ReclaimReport::default();

        if total <= max_bytes {
            report.remaining_bytes = total;
            return Ok(report);
        }

        for entry in self.repository.eviction_order().await? {
            if total <= max_bytes {
                break;
            }

            if keep == Some(entry.fingerprint()) {
                continue;
            }

            if self.repository.delete(entry.fingerprint()).await?.is_none() {
                continue;
            }

            if let Err(e) = self.artifacts.remove(entry.artifact_path()).await {
                warn!(error = %e, "Failed to delete evicted artifact");
            }

            total = total.saturating_sub(entry.artifact_size());
            report.removed_entries += 1;
            report.freed_bytes += entry.artifact_size();
        }

        report.remaining_bytes = total;

        info!(
            removed = report.removed_entries,
            freed_bytes = report.freed_bytes,
            remaining_bytes = report.remaining_bytes,
            "Cache reclaimed"
        );

        Ok(report)
    }

    /// Reclaim against the configured budget, when one is set
    pub async fn reclaim_to_budget(&self) -> Result<Option<ReclaimReport>, DomainError> {
        match self.config.max_bytes {
            Some(max_bytes) => self.reclaim(max_bytes).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn stats(&self) -> Result<CacheStats, DomainError> {
        let entries = self.repository.count().await?;
        let size_bytes = self.repository.total_size().await?;

        Ok(CacheStats::new(
            entries,
            size_bytes,
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        ))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use crate::domain::semantic_cache::{CacheEntry, CacheRepository};
    use crate::domain::DomainError;

    /// Cache storage that fails every call
    #[derive(Debug)]
    pub(crate) struct FailingRepository;

    fn unavailable<T>() -> Result<T, DomainError> {
        Err(DomainError::cache("database is locked"))
    }

    #[async_trait]
    impl CacheRepository for FailingRepository {
        async fn get(&self, _fingerprint: &str) -> Result<Option<CacheEntry>, DomainError> {
            unavailable()
        }

        async fn upsert(&self, _entry: CacheEntry) -> Result<(), DomainError> {
            unavailable()
        }

        async fn candidates(
            &self,
            _category: &str,
            _min_quality: f64,
            _limit: usize,
        ) -> Result<Vec<CacheEntry>, DomainError> {
            unavailable()
        }

        async fn touch(&self, _fingerprint: &str, _at: DateTime<Utc>) -> Result<bool, DomainError> {
            unavailable()
        }

        async fn delete(&self, _fingerprint: &str) -> Result<Option<CacheEntry>, DomainError> {
            unavailable()
        }

        async fn eviction_order(&self) -> Result<Vec<CacheEntry>, DomainError> {
            unavailable()
        }

        async fn total_size(&self) -> Result<u64, DomainError> {
            unavailable()
        }

        async fn count(&self) -> Result<usize, DomainError> {
            unavailable()
        }
    }
}
