//! Fallback-aware generation orchestrator
//!
//! Ties the resilience components together for one request: cache lookup,
//! then for each candidate provider the breaker gate, the rate limiter wait,
//! the call itself and the bookkeeping, and finally artifact validation and
//! cache admission.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::domain::generation::{AttemptRecord, GenerationRequest, GenerationResult, OrchestratorConfig};
use crate::domain::image::{
    attempt_order, ErrorKind, GeneratedImage, ImageProvider, ImageRequest, ModelVariant,
    ProviderError, ProviderKind,
};
use crate::domain::resilience::{HealthSnapshot, OutcomeClass, RequestOutcome};
use crate::domain::semantic_cache::{CacheStats, KeywordVocabulary, ReclaimReport};
use crate::domain::usage::{CostSummary, UsageEvent};
use crate::domain::DomainError;
use crate::infrastructure::artifacts::ArtifactStore;
use crate::infrastructure::observability::{record_attempt, record_rate_limit_wait};
use crate::infrastructure::quality::QualityValidator;
use crate::infrastructure::resilience::{AdaptiveRateLimiter, CircuitBreaker, TelemetryStore};
use crate::infrastructure::semantic_cache::{CacheAdmission, SemanticCacheService};
use crate::infrastructure::usage::CostLedger;

/// Everything the orchestrator is wired with
#[derive(Debug)]
pub struct OrchestratorComponents {
    pub providers: Vec<Arc<dyn ImageProvider>>,
    pub telemetry: Arc<TelemetryStore>,
    pub breaker: Arc<CircuitBreaker>,
    pub limiter: Arc<AdaptiveRateLimiter>,
    pub cache: Arc<SemanticCacheService>,
    pub ledger: CostLedger,
    pub validator: QualityValidator,
    pub artifacts: ArtifactStore,
    pub vocabulary: KeywordVocabulary,
}

/// Root component serving generation requests
#[derive(Debug)]
pub struct GenerationOrchestrator {
    providers: HashMap<ProviderKind, Arc<dyn ImageProvider>>,
    telemetry: Arc<TelemetryStore>,
    breaker: Arc<CircuitBreaker>,
    limiter: Arc<AdaptiveRateLimiter>,
    cache: Arc<SemanticCacheService>,
    ledger: CostLedger,
    validator: QualityValidator,
    artifacts: ArtifactStore,
    vocabulary: KeywordVocabulary,
    config: OrchestratorConfig,
}

/// Where the attempt loop stopped
enum AttemptFlow {
    Continue,
    Stop(GenerationResult),
}

impl GenerationOrchestrator {
    pub fn new(components: OrchestratorComponents, config: OrchestratorConfig) -> Self {
        let mut providers = HashMap::new();
        for provider in components.providers {
            if providers.insert(provider.kind(), provider).is_some() {
                warn!("Duplicate provider registration; keeping the last one");
            }
        }

        Self {
            providers,
            telemetry: components.telemetry,
            breaker: components.breaker,
            limiter: components.limiter,
            cache: components.cache,
            ledger: components.ledger,
            validator: components.validator,
            artifacts: components.artifacts,
            vocabulary: components.vocabulary,
            config,
        }
    }

    /// Serve a request without external cancellation
    pub async fn generate(&self, request: GenerationRequest) -> GenerationResult {
        self.generate_with_cancel(request, CancellationToken::new()).await
    }

    /// Serve a request; cancelling `cancel` aborts the in-flight call and
    /// every remaining attempt
    #[instrument(skip_all, fields(preferred = ?request.preferred))]
    pub async fn generate_with_cancel(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> GenerationResult {
        let started = Instant::now();

        let request = match request.sanitized() {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Rejected generation request");
                return GenerationResult::failure(e.to_string(), Some(ErrorKind::ClientError), Vec::new());
            }
        };

        let order = self.attempt_order(request.preferred);
        let Some(&primary) = order.first() else {
            return GenerationResult::failure("no image providers configured", None, Vec::new());
        };

        if cancel.is_cancelled() {
            return Self::cancelled(Vec::new());
        }

        let (category, keywords) = self
            .vocabulary
            .resolve(request.category.as_deref(), &request.text);
        let prompt_length = request.text.chars().count();

        if let Some(hit) = self.cache.lookup(&request.text, &category, &keywords).await {
            let variant = self.variant_of(primary);
            self.ledger
                .record(UsageEvent::cache_hit(
                    primary,
                    variant.model,
                    variant.size,
                    started.elapsed(),
                    prompt_length,
                ))
                .await;

            info!(
                category = %category,
                similarity = hit.similarity,
                "Served from cache"
            );

            return GenerationResult::from_cache(
                hit.entry.artifact_path().to_path_buf(),
                primary,
                hit.similarity,
            );
        }

        let mut attempts = Vec::new();
        let mut last_error: Option<ProviderError> = None;
        let mut last_skip: Option<String> = None;

        for kind in order {
            let Some(provider) = self.providers.get(&kind).cloned() else {
                continue;
            };

            if cancel.is_cancelled() {
                return Self::cancelled(attempts);
            }

            let decision = self.breaker.allow_request(kind);
            if !decision.allowed {
                let reason = decision
                    .reason
                    .unwrap_or_else(|| format!("circuit {} for {}", decision.state, kind));
                warn!(provider = %kind, reason = %reason, "Skipping provider");
                attempts.push(AttemptRecord::skipped(kind, reason.clone()));
                last_skip = Some(reason);
                continue;
            }

            if !self.wait_for_rate_limit(kind, &cancel).await {
                self.breaker.record_cancelled(kind);
                return Self::cancelled(attempts);
            }

            let variant = provider.variant();
            let image_request = ImageRequest::new(request.text.clone(), &variant);
            let call_started = Instant::now();
            let outcome = self.call(provider.as_ref(), &image_request, &cancel).await;
            let latency = call_started.elapsed();

            match outcome {
                Ok(image) => {
                    let cost = self.record_success(kind, &variant, latency, prompt_length).await;
                    attempts.push(AttemptRecord::succeeded(kind, latency, cost));
                    info!(provider = %kind, ?latency, cost, "Image generated");

                    return self
                        .finish(kind, image, &request.text, &category, &keywords, attempts)
                        .await;
                }
                Err(error) => {
                    self.record_failure(kind, &variant, latency, &error, prompt_length)
                        .await;
                    attempts.push(AttemptRecord::failed(kind, latency, &error));

                    match Self::after_failure(&error, &mut attempts) {
                        AttemptFlow::Stop(result) => return result,
                        AttemptFlow::Continue => {
                            warn!(provider = %kind, error = %error, "Provider failed; falling back");
                            last_error = Some(error);
                        }
                    }
                }
            }
        }

        let (message, kind) = match last_error {
            Some(error) => (error.to_string(), Some(error.kind)),
            None => (
                last_skip.unwrap_or_else(|| "no provider available".to_string()),
                None,
            ),
        };

        warn!(error = %message, "All providers failed");
        GenerationResult::failure(format!("all providers failed: {}", message), kind, attempts)
    }

    /// Decide whether a failed attempt ends the request
    fn after_failure(error: &ProviderError, attempts: &mut Vec<AttemptRecord>) -> AttemptFlow {
        match error.kind {
            ErrorKind::Cancelled => AttemptFlow::Stop(Self::cancelled(std::mem::take(attempts))),
            kind if !kind.allows_fallback() => AttemptFlow::Stop(GenerationResult::failure(
                error.to_string(),
                Some(kind),
                std::mem::take(attempts),
            )),
            _ => AttemptFlow::Continue,
        }
    }

    fn cancelled(attempts: Vec<AttemptRecord>) -> GenerationResult {
        GenerationResult::failure("request cancelled", Some(ErrorKind::Cancelled), attempts)
    }

    fn attempt_order(&self, preferred: Option<ProviderKind>) -> Vec<ProviderKind> {
        let order = match preferred {
            Some(preferred) => attempt_order(preferred, &self.config.fallback_order),
            None => self.config.fallback_order.clone(),
        };

        order
            .into_iter()
            .filter(|kind| self.providers.contains_key(kind))
            .collect()
    }

    fn variant_of(&self, kind: ProviderKind) -> ModelVariant {
        self.providers
            .get(&kind)
            .map(|provider| provider.variant())
            .unwrap_or_else(|| ModelVariant::new("unknown", Default::default()))
    }

    /// Honor the limiter's recommended delay, capped; false when cancelled
    async fn wait_for_rate_limit(&self, kind: ProviderKind, cancel: &CancellationToken) -> bool {
        let decision = self.limiter.should_proceed(kind);
        if decision.allowed {
            return true;
        }

        let wait = decision
            .recommended_delay
            .min(self.config.max_rate_limit_wait());
        if wait.is_zero() {
            return true;
        }

        debug!(
            provider = %kind,
            ?wait,
            reason = decision.reason.as_deref().unwrap_or(""),
            "Waiting on rate limiter"
        );
        record_rate_limit_wait(kind, wait);

        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(wait) => true,
        }
    }

    /// One provider call bounded by the timeout and the cancellation token
    async fn call(
        &self,
        provider: &dyn ImageProvider,
        request: &ImageRequest,
        cancel: &CancellationToken,
    ) -> Result<GeneratedImage, ProviderError> {
        let timeout = self.config.request_timeout();

        tokio::select! {
            _ = cancel.cancelled() => Err(ProviderError::cancelled()),
            result = tokio::time::timeout(timeout, provider.generate(request)) => match result {
                Ok(result) => result,
                Err(_) => Err(ProviderError::network(format!(
                    "request timed out after {:?}",
                    timeout
                ))),
            },
        }
    }

    async fn record_success(
        &self,
        kind: ProviderKind,
        variant: &ModelVariant,
        latency: Duration,
        prompt_length: usize,
    ) -> f64 {
        self.telemetry.record(RequestOutcome::success(kind, latency));
        self.breaker.record_result(kind, true, latency);
        self.limiter.record_outcome(kind, OutcomeClass::Success);
        record_attempt(kind, "success", latency);

        self.ledger
            .record(UsageEvent::generated(
                kind,
                variant.model.clone(),
                variant.size,
                latency,
                prompt_length,
            ))
            .await
    }

    async fn record_failure(
        &self,
        kind: ProviderKind,
        variant: &ModelVariant,
        latency: Duration,
        error: &ProviderError,
        prompt_length: usize,
    ) {
        let outcome = RequestOutcome::failure(kind, latency, error);
        let class = outcome.class();
        self.telemetry.record(outcome);

        if error.kind.is_provider_fault() {
            self.breaker.record_result(kind, false, latency);
        } else {
            self.breaker.record_cancelled(kind);
        }
        self.limiter.record_outcome(kind, class);
        record_attempt(kind, error.kind.as_str(), latency);

        self.ledger
            .record(UsageEvent::failed(
                kind,
                variant.model.clone(),
                variant.size,
                latency,
                prompt_length,
                error.kind,
            ))
            .await;
    }

    /// Persist, validate and possibly cache a generated image
    async fn finish(
        &self,
        provider: ProviderKind,
        image: GeneratedImage,
        text: &str,
        category: &str,
        keywords: &[String],
        attempts: Vec<AttemptRecord>,
    ) -> GenerationResult {
        let (path, size) = match self.artifacts.write(&image).await {
            Ok(written) => written,
            Err(e) => {
                warn!(provider = %provider, error = %e, "Failed to persist artifact");
                return GenerationResult::failure(
                    format!("failed to store artifact: {}", e),
                    None,
                    attempts,
                );
            }
        };

        let quality = self.validator.validate(&path).await;

        if quality.admits(self.cache.config().min_quality) {
            self.cache
                .store(CacheAdmission {
                    request_text: text,
                    transformed_text: image.revised_prompt.as_deref().unwrap_or(text),
                    category,
                    keywords,
                    artifact_path: &path,
                    artifact_size: size,
                    quality_score: quality.score,
                })
                .await;
        } else {
            info!(
                provider = %provider,
                score = quality.score,
                reason = quality.reason.as_deref().unwrap_or("below minimum quality"),
                "Artifact not cached"
            );
        }

        GenerationResult::generated(path, provider, quality, attempts)
    }

    /// Health of every configured provider, including ones never called
    pub fn provider_status(&self) -> BTreeMap<ProviderKind, HealthSnapshot> {
        self.providers
            .keys()
            .copied()
            .chain(self.telemetry.providers())
            .map(|provider| (provider, self.snapshot(provider)))
            .collect()
    }

    fn snapshot(&self, provider: ProviderKind) -> HealthSnapshot {
        let telemetry = self.telemetry.health(provider);

        HealthSnapshot {
            provider,
            success_rate: telemetry.success_rate,
            avg_latency_ms: telemetry.avg_latency_ms,
            last_check: telemetry.last_check,
            last_success: telemetry.last_success,
            circuit_state: self.breaker.state(provider),
            consecutive_failures: telemetry.consecutive_failures,
            breaker_failures: self.breaker.failure_count(provider),
            adaptive_delay_ms: u64::try_from(self.limiter.current_delay(provider).as_millis())
                .unwrap_or(u64::MAX),
            health_score: self.breaker.health_score(provider),
            window_size: telemetry.window_size,
        }
    }

    pub async fn cost_summary(&self, days: u32) -> Result<CostSummary, DomainError> {
        self.ledger.summary(days).await
    }

    pub async fn cache_stats(&self) -> Result<CacheStats, DomainError> {
        self.cache.stats().await
    }

    /// Evict down to the configured byte budget, when one is set
    pub async fn reclaim_cache(&self) -> Result<Option<ReclaimReport>, DomainError> {
        self.cache.reclaim_to_budget().await
    }

    pub async fn prune_usage(&self, older_than_days: u32) -> Result<usize, DomainError> {
        self.ledger.prune(older_than_days).await
    }
}
