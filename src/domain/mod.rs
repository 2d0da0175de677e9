//! Domain layer - Core entities, policies and traits

pub mod error;
pub mod generation;
pub mod image;
pub mod quality;
pub mod resilience;
pub mod semantic_cache;
pub mod usage;

pub use error::DomainError;
pub use generation::{
    AttemptRecord, GenerationRequest, GenerationResult, OrchestratorConfig, ResultSource,
};
pub use image::{
    ErrorKind, GeneratedImage, ImageProvider, ImageRequest, ImageSize, ModelVariant,
    ProviderError, ProviderKind,
};
pub use quality::{QualityConfig, QualityMetrics, QualityReport};
pub use resilience::{
    BreakerDecision, CircuitBreakerConfig, CircuitState, HealthSnapshot, ProviderTelemetry,
    RateDecision, RateLimiterConfig, RequestOutcome, TelemetryConfig,
};
pub use semantic_cache::{
    CacheEntry, CacheHit, CacheRepository, CacheStats, KeywordVocabulary, ReclaimReport,
    SemanticCacheConfig,
};
pub use usage::{CostSummary, CostTable, PriceEntry, UsageEvent, UsageRecord, UsageRepository};
