//! Semantic cache configuration

use serde::{Deserialize, Serialize};

/// Configuration for the semantic artifact cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticCacheConfig {
    /// Whether lookups and stores happen at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Similarity required for a non-exact hit (0.0 to 1.0)
    /// Higher values make hits more conservative
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Minimum quality score for an artifact to be stored or served
    #[serde(default = "default_min_quality")]
    pub min_quality: f64,

    /// Number of same-category entries scored per lookup
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,

    /// Boost added per keyword shared with a candidate
    #[serde(default = "default_keyword_boost")]
    pub keyword_boost: f64,

    /// Ceiling of the total keyword boost
    #[serde(default = "default_max_keyword_boost")]
    pub max_keyword_boost: f64,

    /// Artifact size budget in bytes; reclaim runs after each store when set
    #[serde(default)]
    pub max_bytes: Option<u64>,
}

fn default_enabled() -> bool {
    true
}

fn default_similarity_threshold() -> f64 {
    0.85
}

fn default_min_quality() -> f64 {
    0.6
}

fn default_candidate_limit() -> usize {
    20
}

fn default_keyword_boost() -> f64 {
    0.1
}

fn default_max_keyword_boost() -> f64 {
    0.3
}

impl Default for SemanticCacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            similarity_threshold: default_similarity_threshold(),
            min_quality: default_min_quality(),
            candidate_limit: default_candidate_limit(),
            keyword_boost: default_keyword_boost(),
            max_keyword_boost: default_max_keyword_boost(),
            max_bytes: None,
        }
    }
}

impl SemanticCacheConfig {
    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err("cache.similarity_threshold must be within [0, 1]".to_string());
        }
        if !(0.0..=1.0).contains(&self.min_quality) {
            return Err("cache.min_quality must be within [0, 1]".to_string());
        }
        if self.candidate_limit == 0 {
            return Err("cache.candidate_limit must be positive".to_string());
        }
        if self.keyword_boost < 0.0 || self.max_keyword_boost < 0.0 {
            return Err("cache keyword boosts must not be negative".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SemanticCacheConfig::default();
        assert!(config.enabled);
        assert!((config.similarity_threshold - 0.85).abs() < f64::EPSILON);
        assert!((config.min_quality - 0.6).abs() < f64::EPSILON);
        assert_eq!(config.candidate_limit, 20);
        assert!(config.max_bytes.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_threshold() {
        let config = SemanticCacheConfig::default().with_similarity_threshold(1.5);
        assert!(config.validate().is_err());
    }
}
