//! Orchestrator configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::image::ProviderKind;

/// Fallback loop tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Per-call provider timeout in ms
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Longest a request waits on the rate limiter before proceeding, in ms
    #[serde(default = "default_max_rate_limit_wait_ms")]
    pub max_rate_limit_wait_ms: u64,

    /// Providers tried after the preferred one, in order
    #[serde(default = "default_fallback_order")]
    pub fallback_order: Vec<ProviderKind>,
}

fn default_request_timeout_ms() -> u64 {
    90_000
}

fn default_max_rate_limit_wait_ms() -> u64 {
    30_000
}

fn default_fallback_order() -> Vec<ProviderKind> {
    ProviderKind::ALL.to_vec()
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            max_rate_limit_wait_ms: default_max_rate_limit_wait_ms(),
            fallback_order: default_fallback_order(),
        }
    }
}

impl OrchestratorConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn max_rate_limit_wait(&self) -> Duration {
        Duration::from_millis(self.max_rate_limit_wait_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.request_timeout_ms == 0 {
            return Err("orchestrator.request_timeout_ms must be positive".to_string());
        }
        if self.fallback_order.is_empty() {
            return Err("orchestrator.fallback_order must name at least one provider".to_string());
        }
        Ok(())
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_max_rate_limit_wait(mut self, wait: Duration) -> Self {
        self.max_rate_limit_wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX);
        self
    }
}
