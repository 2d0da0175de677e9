use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use super::http_client::HttpClient;
use super::image_api::HttpImageProvider;
use crate::domain::image::{ImageProvider, ImageSize, ModelVariant, ProviderKind};
use crate::domain::DomainError;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_STABILITY_BASE_URL: &str = "https://api.stability.ai";

/// Per-provider connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub base_url: Option<String>,

    /// Falls back to the provider's API key environment variable
    #[serde(default)]
    pub api_key: Option<String>,

    pub model: String,

    #[serde(default)]
    pub size: ImageSize,
}

fn default_enabled() -> bool {
    true
}

impl ProviderSettings {
    pub fn new(model: impl Into<String>, size: ImageSize) -> Self {
        Self {
            enabled: true,
            base_url: None,
            api_key: None,
            model: model.into(),
            size,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn variant(&self) -> ModelVariant {
        ModelVariant::new(self.model.clone(), self.size)
    }

    /// Configured key, else the provider's environment variable
    pub fn resolve_api_key(&self, kind: ProviderKind) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var(kind.api_key_env()).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

pub fn default_base_url(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::OpenAi => DEFAULT_OPENAI_BASE_URL,
        ProviderKind::Stability => DEFAULT_STABILITY_BASE_URL,
    }
}

/// Factory for creating image providers
#[derive(Debug)]
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create one provider; a missing API key is a configuration error
    pub fn create(
        kind: ProviderKind,
        settings: &ProviderSettings,
        timeout: Duration,
    ) -> Result<Arc<dyn ImageProvider>, DomainError> {
        let api_key = settings.resolve_api_key(kind).ok_or_else(|| {
            DomainError::configuration(format!(
                "No API key for provider '{}'; set providers.{}.api_key or {}",
                kind,
                kind,
                kind.api_key_env()
            ))
        })?;

        let base_url = settings
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(kind).to_string());

        let provider = HttpImageProvider::new(
            HttpClient::with_timeout(timeout)?,
            kind,
            settings.variant(),
            api_key,
            base_url,
        );

        Ok(Arc::new(provider))
    }

    /// Create every enabled provider
    pub fn create_all(
        settings: &BTreeMap<ProviderKind, ProviderSettings>,
        timeout: Duration,
    ) -> Result<Vec<Arc<dyn ImageProvider>>, DomainError> {
        let mut providers = Vec::new();

        for (kind, provider_settings) in settings.iter().filter(|(_, s)| s.enabled) {
            let provider = Self::create(*kind, provider_settings, timeout)?;
            info!(
                provider = %kind,
                model = %provider_settings.model,
                size = %provider_settings.size,
                "Image provider configured"
            );
            providers.push(provider);
        }

        if providers.is_empty() {
            return Err(DomainError::configuration("No image providers enabled"));
        }

        Ok(providers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_with_explicit_key() {
        let settings = ProviderSettings::new("sd3-medium", ImageSize::square(1024))
            .with_api_key("sk-test")
            .with_base_url("http://localhost:9000");

        let provider =
            ProviderFactory::create(ProviderKind::Stability, &settings, Duration::from_secs(10))
                .unwrap();

        assert_eq!(provider.kind(), ProviderKind::Stability);
        assert_eq!(provider.variant().model, "sd3-medium");
    }

    #[test]
    fn test_create_all_skips_disabled() {
        let mut settings = BTreeMap::new();
        settings.insert(
            ProviderKind::OpenAi,
            ProviderSettings::new("dall-e-3", ImageSize::default()).with_api_key("sk-a"),
        );
        let mut disabled =
            ProviderSettings::new("sd3-medium", ImageSize::default()).with_api_key("sk-b");
        disabled.enabled = false;
        settings.insert(ProviderKind::Stability, disabled);

        let providers = ProviderFactory::create_all(&settings, Duration::from_secs(10)).unwrap();

        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].kind(), ProviderKind::OpenAi);
    }

    #[test]
    fn test_create_all_requires_one_provider() {
        let settings = BTreeMap::new();
        assert!(ProviderFactory::create_all(&settings, Duration::from_secs(10)).is_err());
    }

    #[test]
    fn test_settings_deserialize_defaults() {
        let settings: ProviderSettings =
            serde_json::from_str(r#"{"model": "dall-e-3", "size": "1792x1024"}"#).unwrap();

        assert!(settings.enabled);
        assert_eq!(settings.size, ImageSize::new(1792, 1024));
        assert!(settings.base_url.is_none());
    }
}
