//! Text normalization, fingerprints and word-overlap similarity

use std::collections::BTreeSet;

use sha2::{Digest, Sha256};
use unicode_segmentation::UnicodeSegmentation;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "into", "is", "it",
    "of", "on", "or", "the", "this", "that", "to", "with", "without", "its", "their", "his",
    "her", "was", "were", "over", "under", "very",
];

/// Lowercase, trim and collapse runs of whitespace to a single space
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// SHA-256 hex digest of the normalized text
pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_text(text).as_bytes());
    hex::encode(hasher.finalize())
}

/// Lowercased words of the text with stop words removed
pub fn word_set(text: &str) -> BTreeSet<String> {
    text.unicode_words()
        .map(str::to_lowercase)
        .filter(|word| !STOP_WORDS.contains(&word.as_str()))
        .collect()
}

/// Jaccard index of two word sets; 0.0 when both are empty
pub fn jaccard(left: &BTreeSet<String>, right: &BTreeSet<String>) -> f64 {
    let union = left.union(right).count();
    if union == 0 {
        return 0.0;
    }

    left.intersection(right).count() as f64 / union as f64
}

/// Scores request texts against each other
#[derive(Debug, Clone, Copy)]
pub struct SimilarityScorer {
    keyword_boost: f64,
    max_keyword_boost: f64,
}

impl SimilarityScorer {
    pub fn new(keyword_boost: f64, max_keyword_boost: f64) -> Self {
        Self {
            keyword_boost,
            max_keyword_boost,
        }
    }

    /// Jaccard similarity of the texts plus a boost for each shared
    /// category keyword, capped at 1.0
    pub fn score(
        &self,
        text: &str,
        keywords: &[String],
        candidate_text: &str,
        candidate_keywords: &[String],
    ) -> f64 {
        let base = jaccard(&word_set(text), &word_set(candidate_text));

        let shared = keywords
            .iter()
            .filter(|keyword| candidate_keywords.contains(keyword))
            .count();
        let boost = (shared as f64 * self.keyword_boost).min(self.max_keyword_boost);

        (base + boost).min(1.0)
    }
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self::new(0.1, 0.3)
    }
}
