//! Semantic cache domain models and traits
//!
//! Matches new requests against previously generated artifacts, first by
//! fingerprint and then by word-overlap similarity within a category.

mod config;
mod entry;
mod repository;
mod similarity;
mod vocabulary;

pub use config::SemanticCacheConfig;
pub use entry::{CacheEntry, CacheHit, CacheStats, ReclaimReport};
pub use repository::CacheRepository;
pub use similarity::{fingerprint, jaccard, normalize_text, word_set, SimilarityScorer};
pub use vocabulary::{KeywordVocabulary, DEFAULT_CATEGORY};
