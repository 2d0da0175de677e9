//! Storage factory for runtime backend selection

use std::sync::Arc;

use tracing::info;

use crate::domain::semantic_cache::CacheRepository;
use crate::domain::usage::UsageRepository;
use crate::domain::DomainError;
use crate::infrastructure::semantic_cache::{InMemoryCacheRepository, SqliteCacheRepository};
use crate::infrastructure::usage::{InMemoryUsageRepository, SqliteUsageRepository};

use super::migrations::run_storage_migrations;
use super::sqlite::{connect_sqlite, SqliteConfig};

/// Supported storage backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    /// In-memory storage (for testing/development)
    InMemory,
    /// SQLite database file
    Sqlite,
}

impl StorageType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Some(Self::InMemory),
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// In-memory storage configuration
    InMemory,
    /// SQLite storage configuration
    Sqlite(SqliteConfig),
}

impl StorageConfig {
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    pub fn sqlite(config: SqliteConfig) -> Self {
        Self::Sqlite(config)
    }

    /// Creates a SQLite configuration from a URL
    pub fn sqlite_url(url: impl Into<String>) -> Self {
        Self::Sqlite(SqliteConfig::new(url))
    }

    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::InMemory => StorageType::InMemory,
            Self::Sqlite(_) => StorageType::Sqlite,
        }
    }
}

/// Repositories sharing one backend
#[derive(Debug, Clone)]
pub struct Repositories {
    pub cache: Arc<dyn CacheRepository>,
    pub usage: Arc<dyn UsageRepository>,
}

/// Factory for creating repository instances
#[derive(Debug)]
pub struct StorageFactory;

impl StorageFactory {
    /// Creates the cache and usage repositories, migrating SQLite first
    pub async fn create(config: &StorageConfig) -> Result<Repositories, DomainError> {
        match config {
            StorageConfig::InMemory => {
                info!("Using in-memory storage");
                Ok(Self::create_in_memory())
            }
            StorageConfig::Sqlite(sqlite_config) => {
                info!(url = %sqlite_config.url, "Using SQLite storage");
                let pool = connect_sqlite(sqlite_config).await?;
                run_storage_migrations(&pool).await?;

                Ok(Repositories {
                    cache: Arc::new(SqliteCacheRepository::new(pool.clone())),
                    usage: Arc::new(SqliteUsageRepository::new(pool)),
                })
            }
        }
    }

    pub fn create_in_memory() -> Repositories {
        Repositories {
            cache: Arc::new(InMemoryCacheRepository::new()),
            usage: Arc::new(InMemoryUsageRepository::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_type_parse() {
        assert_eq!(StorageType::parse("memory"), Some(StorageType::InMemory));
        assert_eq!(StorageType::parse("in-memory"), Some(StorageType::InMemory));
        assert_eq!(StorageType::parse("SQLite"), Some(StorageType::Sqlite));
        assert_eq!(StorageType::parse("postgres"), None);
    }

    #[test]
    fn test_storage_config_types() {
        assert_eq!(StorageConfig::in_memory().storage_type(), StorageType::InMemory);

        let sqlite = StorageConfig::sqlite_url("sqlite://data/test.db");
        assert_eq!(sqlite.storage_type(), StorageType::Sqlite);
        if let StorageConfig::Sqlite(config) = sqlite {
            assert_eq!(config.url, "sqlite://data/test.db");
        }
    }

    #[tokio::test]
    async fn test_create_sqlite_runs_migrations() {
        let repos = StorageFactory::create(&StorageConfig::sqlite(SqliteConfig::in_memory()))
            .await
            .unwrap();

        assert_eq!(repos.cache.count().await.unwrap(), 0);
        assert_eq!(repos.usage.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_in_memory() {
        let repos = StorageFactory::create(&StorageConfig::in_memory()).await.unwrap();
        assert_eq!(repos.usage.count().await.unwrap(), 0);
    }
}
