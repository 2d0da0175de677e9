//! PMP Image Gateway
//!
//! A resilient client for multiple image generation providers with support for:
//! - Per-provider telemetry, adaptive rate limiting and circuit breaking
//! - Fallback across providers with classified failures
//! - A semantic cache of previously generated artifacts
//! - Cost accounting and artifact quality checks

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use domain::semantic_cache::KeywordVocabulary;
use infrastructure::artifacts::ArtifactStore;
use infrastructure::providers::ProviderFactory;
use infrastructure::quality::QualityValidator;
use infrastructure::resilience::{AdaptiveRateLimiter, CircuitBreaker, TelemetryStore};
use infrastructure::semantic_cache::SemanticCacheService;
use infrastructure::services::{GenerationOrchestrator, OrchestratorComponents};
use infrastructure::storage::StorageFactory;
use infrastructure::usage::CostLedger;
use tracing::info;

/// Build every component from configuration and wire the orchestrator
pub async fn create_gateway(config: &AppConfig) -> anyhow::Result<GenerationOrchestrator> {
    config.validate()?;

    let storage = config.storage.to_storage_config()?;
    info!("Storage backend: {:?}", storage.storage_type());
    let repositories = StorageFactory::create(&storage).await?;

    let artifacts = ArtifactStore::new(&config.artifacts.directory);
    artifacts.ensure_root().await?;
    info!(path = %artifacts.root().display(), "Artifact directory ready");

    let telemetry = Arc::new(TelemetryStore::new(config.telemetry.clone()));
    let breaker = Arc::new(CircuitBreaker::new(
        telemetry.clone(),
        config.circuit_breaker.clone(),
    ));
    let limiter = Arc::new(AdaptiveRateLimiter::new(
        telemetry.clone(),
        config.rate_limit.clone(),
    ));

    let cache = Arc::new(SemanticCacheService::new(
        repositories.cache,
        artifacts.clone(),
        config.cache.clone(),
    ));
    let ledger = CostLedger::new(repositories.usage, config.cost_table()?);

    let providers = ProviderFactory::create_all(&config.providers.0, config.request_timeout())?;
    info!(count = providers.len(), "Image providers ready");

    let components = OrchestratorComponents {
        providers,
        telemetry,
        breaker,
        limiter,
        cache,
        ledger,
        validator: QualityValidator::new(config.quality.clone()),
        artifacts,
        vocabulary: KeywordVocabulary::new(config.categories.0.clone()),
    };

    Ok(GenerationOrchestrator::new(
        components,
        config.orchestrator.clone(),
    ))
}
