use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::generation::OrchestratorConfig;
use crate::domain::image::{ImageSize, ProviderKind};
use crate::domain::quality::QualityConfig;
use crate::domain::resilience::{CircuitBreakerConfig, RateLimiterConfig, TelemetryConfig};
use crate::domain::semantic_cache::SemanticCacheConfig;
use crate::domain::usage::{default_price_entries, CostTable, PriceEntry};
use crate::domain::DomainError;
use crate::infrastructure::logging::LoggingConfig;
use crate::infrastructure::observability::MetricsConfig;
use crate::infrastructure::providers::ProviderSettings;
use crate::infrastructure::storage::{SqliteConfig, StorageConfig, StorageType};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub artifacts: ArtifactSettings,
    #[serde(default)]
    pub cache: SemanticCacheConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub rate_limit: RateLimiterConfig,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
    #[serde(default)]
    pub quality: QualityConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub categories: CategoriesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// `memory` or `sqlite`
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_backend() -> String {
    "sqlite".to_string()
}

fn default_database_url() -> String {
    "sqlite://data/image_gateway.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

impl StorageSettings {
    pub fn to_storage_config(&self) -> Result<StorageConfig, DomainError> {
        match StorageType::parse(&self.backend) {
            Some(StorageType::InMemory) => Ok(StorageConfig::in_memory()),
            Some(StorageType::Sqlite) => Ok(StorageConfig::sqlite(
                SqliteConfig::new(self.url.clone()).with_max_connections(self.max_connections),
            )),
            None => Err(DomainError::configuration(format!(
                "Unknown storage backend '{}'",
                self.backend
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactSettings {
    #[serde(default = "default_artifact_directory")]
    pub directory: PathBuf,
}

fn default_artifact_directory() -> PathBuf {
    PathBuf::from("data/artifacts")
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            directory: default_artifact_directory(),
        }
    }
}

/// Provider settings keyed by provider
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct ProvidersConfig(pub BTreeMap<ProviderKind, ProviderSettings>);

impl Default for ProvidersConfig {
    fn default() -> Self {
        let mut providers = BTreeMap::new();
        providers.insert(
            ProviderKind::OpenAi,
            ProviderSettings::new("dall-e-3", ImageSize::square(1024)),
        );
        providers.insert(
            ProviderKind::Stability,
            ProviderSettings::new("sd3-medium", ImageSize::square(1024)),
        );
        Self(providers)
    }
}

impl ProvidersConfig {
    pub fn enabled(&self) -> impl Iterator<Item = (ProviderKind, &ProviderSettings)> {
        self.0
            .iter()
            .filter(|(_, settings)| settings.enabled)
            .map(|(kind, settings)| (*kind, settings))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_price_entries")]
    pub entries: Vec<PriceEntry>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            entries: default_price_entries(),
        }
    }
}

/// Category name to the keywords that identify it
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct CategoriesConfig(pub BTreeMap<String, Vec<String>>);

impl Default for CategoriesConfig {
    fn default() -> Self {
        let categories = [
            ("myth", &["krishna", "rama", "shiva", "ganesha", "flute", "temple", "deity"][..]),
            ("nature", &["forest", "river", "mountain", "lotus", "tree", "ocean", "flower"][..]),
            ("science", &["atom", "cell", "planet", "molecule", "circuit", "telescope"][..]),
            ("history", &["empire", "fort", "king", "battle", "ancient", "dynasty"][..]),
        ];

        Self(
            categories
                .into_iter()
                .map(|(name, words)| {
                    (name.to_string(), words.iter().map(|w| w.to_string()).collect())
                })
                .collect(),
        )
    }
}

impl AppConfig {
    /// Layered load: `config/default`, `config/local`, then `APP__*` variables
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Typed cost table built from the pricing entries
    pub fn cost_table(&self) -> Result<CostTable, DomainError> {
        CostTable::from_entries(&self.pricing.entries)
    }

    pub fn request_timeout(&self) -> Duration {
        self.orchestrator.request_timeout()
    }

    /// Check thresholds and that every enabled provider variant has a price
    pub fn validate(&self) -> Result<(), DomainError> {
        self.rate_limit
            .validate()
            .and_then(|_| self.cache.validate())
            .and_then(|_| self.quality.validate())
            .and_then(|_| self.orchestrator.validate())
            .map_err(DomainError::configuration)?;

        if self.circuit_breaker.failure_threshold == 0 {
            return Err(DomainError::configuration(
                "circuit_breaker.failure_threshold must be positive",
            ));
        }

        if !(0.0..=1.0).contains(&self.telemetry.latency_alpha) || self.telemetry.latency_alpha == 0.0 {
            return Err(DomainError::configuration(
                "telemetry.latency_alpha must be within (0, 1]",
            ));
        }

        let table = self.cost_table()?;
        for (kind, settings) in self.providers.enabled() {
            table.ensure_covers(kind, &settings.model, settings.size)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml: &str) -> AppConfig {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.providers.enabled().count(), 2);
        assert_eq!(config.cache.similarity_threshold, 0.85);
        assert_eq!(config.orchestrator.request_timeout(), Duration::from_secs(90));
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = from_toml("");
        assert_eq!(config.storage.backend, "sqlite");
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
        assert!(config.categories.0.contains_key("myth"));
    }

    #[test]
    fn test_sections_override() {
        let config = from_toml(
            r#"
            [storage]
            backend = "memory"

            [cache]
            similarity_threshold = 0.7
            max_bytes = 1048576

            [providers.openai]
            model = "dall-e-2"
            size = "512x512"

            [providers.stability]
            enabled = false
            model = "sd3-large"

            [categories]
            space = ["nebula", "galaxy"]
            "#,
        );

        assert!(matches!(
            config.storage.to_storage_config().unwrap(),
            StorageConfig::InMemory
        ));
        assert_eq!(config.cache.max_bytes, Some(1_048_576));

        let enabled: Vec<_> = config.providers.enabled().collect();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].1.size, ImageSize::square(512));
        assert_eq!(config.categories.0.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unpriced_provider_variant_rejected() {
        let config = from_toml(
            r#"
            [pricing]
            entries = [{ provider = "openai", variant = "dall-e-3", cost = 0.04 }]

            [providers.openai]
            model = "dall-e-3"

            [providers.stability]
            model = "sd3-medium"
            "#,
        );

        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("stability"));
    }

    #[test]
    fn test_unknown_storage_backend_rejected() {
        let settings = StorageSettings {
            backend: "postgres".to_string(),
            ..Default::default()
        };
        assert!(settings.to_storage_config().is_err());
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let mut config = AppConfig::default();
        config.cache.similarity_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_infinite_backoff_factor_rejected() {
        let mut config = AppConfig::default();
        config.rate_limit.failure_factor = f64::INFINITY;

        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("failure_factor"));
    }
}
