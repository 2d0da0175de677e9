//! Structured outcome of a generation call

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use std::time::Duration;

use crate::domain::image::{ErrorKind, ProviderError, ProviderKind};
use crate::domain::quality::QualityReport;

/// Where an artifact came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    Cache,
    Generated,
}

/// One provider attempt made while serving a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub provider: ProviderKind,
    /// Whether the provider was actually called
    pub called: bool,
    pub success: bool,
    pub error_kind: Option<ErrorKind>,
    pub message: Option<String>,
    pub latency_ms: u64,
    pub cost: f64,
}

impl AttemptRecord {
    /// Provider skipped without a call
    pub fn skipped(provider: ProviderKind, reason: impl Into<String>) -> Self {
        Self {
            provider,
            called: false,
            success: false,
            error_kind: None,
            message: Some(reason.into()),
            latency_ms: 0,
            cost: 0.0,
        }
    }

    pub fn succeeded(provider: ProviderKind, latency: Duration, cost: f64) -> Self {
        Self {
            provider,
            called: true,
            success: true,
            error_kind: None,
            message: None,
            latency_ms: millis(latency),
            cost,
        }
    }

    pub fn failed(provider: ProviderKind, latency: Duration, error: &ProviderError) -> Self {
        Self {
            provider,
            called: true,
            success: false,
            error_kind: Some(error.kind),
            message: Some(error.message.clone()),
            latency_ms: millis(latency),
            cost: 0.0,
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Result returned to the caller; never carries a raw transport error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub success: bool,
    pub artifact: Option<PathBuf>,
    pub source: Option<ResultSource>,
    pub provider: Option<ProviderKind>,
    pub quality: Option<QualityReport>,
    pub similarity: Option<f64>,
    pub attempts: Vec<AttemptRecord>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl GenerationResult {
    pub fn from_cache(artifact: PathBuf, provider: ProviderKind, similarity: f64) -> Self {
        Self {
            success: true,
            artifact: Some(artifact),
            source: Some(ResultSource::Cache),
            provider: Some(provider),
            quality: None,
            similarity: Some(similarity),
            attempts: Vec::new(),
            error: None,
            error_kind: None,
        }
    }

    pub fn generated(
        artifact: PathBuf,
        provider: ProviderKind,
        quality: QualityReport,
        attempts: Vec<AttemptRecord>,
    ) -> Self {
        Self {
            success: true,
            artifact: Some(artifact),
            source: Some(ResultSource::Generated),
            provider: Some(provider),
            quality: Some(quality),
            similarity: None,
            attempts,
            error: None,
            error_kind: None,
        }
    }

    pub fn failure(
        error: impl Into<String>,
        error_kind: Option<ErrorKind>,
        attempts: Vec<AttemptRecord>,
    ) -> Self {
        Self {
            success: false,
            artifact: None,
            source: None,
            provider: None,
            quality: None,
            similarity: None,
            attempts,
            error: Some(error.into()),
            error_kind,
        }
    }

    /// Number of attempts that actually called a provider
    pub fn calls_made(&self) -> usize {
        self.attempts.iter().filter(|a| a.called).count()
    }
}
