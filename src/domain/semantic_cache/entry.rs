//! Cache entry and reporting types

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A cached artifact keyed by the fingerprint of its request text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    fingerprint: String,
    request_text: String,
    transformed_text: String,
    category: String,
    keywords: Vec<String>,
    artifact_path: PathBuf,
    artifact_size: u64,
    created_at: DateTime<Utc>,
    access_count: u64,
    last_access: DateTime<Utc>,
    quality_score: f64,
}

impl CacheEntry {
    /// Create a new entry with zero accesses
    pub fn new(
        fingerprint: impl Into<String>,
        request_text: impl Into<String>,
        category: impl Into<String>,
        artifact_path: impl Into<PathBuf>,
        artifact_size: u64,
        quality_score: f64,
    ) -> Self {
        let request_text = request_text.into();
        let now = Utc::now();

        Self {
            fingerprint: fingerprint.into(),
            transformed_text: request_text.clone(),
            request_text,
            category: category.into(),
            keywords: Vec::new(),
            artifact_path: artifact_path.into(),
            artifact_size,
            created_at: now,
            access_count: 0,
            last_access: now,
            quality_score,
        }
    }

    pub fn with_transformed_text(mut self, text: impl Into<String>) -> Self {
        self.transformed_text = text.into();
        self
    }

    /// Set keywords, sorted and deduplicated
    pub fn with_keywords(mut self, keywords: impl IntoIterator<Item = String>) -> Self {
        let mut keywords: Vec<String> = keywords.into_iter().collect();
        keywords.sort();
        keywords.dedup();
        self.keywords = keywords;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_access(mut self, access_count: u64, last_access: DateTime<Utc>) -> Self {
        self.access_count = access_count;
        self.last_access = last_access;
        self
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn request_text(&self) -> &str {
        &self.request_text
    }

    pub fn transformed_text(&self) -> &str {
        &self.transformed_text
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    pub fn artifact_size(&self) -> u64 {
        self.artifact_size
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn access_count(&self) -> u64 {
        self.access_count
    }

    pub fn last_access(&self) -> DateTime<Utc> {
        self.last_access
    }

    pub fn quality_score(&self) -> f64 {
        self.quality_score
    }

    /// Register a hit
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.access_count += 1;
        self.last_access = at;
    }
}

/// A lookup result
#[derive(Debug, Clone)]
pub struct CacheHit {
    pub entry: CacheEntry,
    /// 1.0 for an exact fingerprint match
    pub similarity: f64,
}

impl CacheHit {
    pub fn new(entry: CacheEntry, similarity: f64) -> Self {
        Self { entry, similarity }
    }

    pub fn is_exact(&self) -> bool {
        self.similarity >= 1.0
    }
}

/// Statistics for the semantic cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub size_bytes: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate_estimate: f64,
}

impl CacheStats {
    pub fn new(entries: usize, size_bytes: u64, hits: u64, misses: u64) -> Self {
        let total = hits + misses;
        let hit_rate_estimate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };

        Self {
            entries,
            size_bytes,
            hits,
            misses,
            hit_rate_estimate,
        }
    }
}

/// Outcome of a reclaim pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReclaimReport {
    pub removed_entries: usize,
    pub freed_bytes: u64,
    pub remaining_bytes: u64,
}
