//! Database migrations infrastructure

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;

use crate::domain::DomainError;

/// Trait for running database migrations
#[async_trait]
pub trait Migrator: Send + Sync {
    /// Runs all pending migrations
    async fn run(&self) -> Result<(), DomainError>;

    /// Returns the current migration version
    async fn version(&self) -> Result<Option<i64>, DomainError>;
}

/// SQLite migrator tracking applied versions in `_migrations`
#[derive(Debug)]
pub struct SqliteMigrator {
    pool: SqlitePool,
    migrations: Vec<Migration>,
}

impl SqliteMigrator {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            migrations: storage_migrations(),
        }
    }

    /// Creates the migrations table if it doesn't exist
    async fn ensure_migrations_table(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                installed_on TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create migrations table: {}", e)))?;

        Ok(())
    }

    /// Runs a single migration unless already applied
    pub async fn run_migration(&self, migration: &Migration) -> Result<bool, DomainError> {
        self.ensure_migrations_table().await?;

        let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _migrations WHERE version = ?")
            .bind(migration.version)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to check migration status: {}", e)))?;

        if applied > 0 {
            return Ok(false);
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(&migration.up)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to run migration {}: {}",
                    migration.version, e
                ))
            })?;

        sqlx::query("INSERT INTO _migrations (version, description) VALUES (?, ?)")
            .bind(migration.version)
            .bind(&migration.description)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to record migration {}: {}",
                    migration.version, e
                ))
            })?;

        tx.commit().await?;

        tracing::info!(
            version = migration.version,
            description = %migration.description,
            "Applied migration"
        );

        Ok(true)
    }

    /// Returns all applied migration versions
    pub async fn applied_versions(&self) -> Result<Vec<i64>, DomainError> {
        self.ensure_migrations_table().await?;

        let versions: Vec<i64> =
            sqlx::query_scalar("SELECT version FROM _migrations ORDER BY version")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::storage(format!("Failed to get applied migrations: {}", e))
                })?;

        Ok(versions)
    }
}

#[async_trait]
impl Migrator for SqliteMigrator {
    async fn run(&self) -> Result<(), DomainError> {
        for migration in &self.migrations {
            self.run_migration(migration).await?;
        }
        Ok(())
    }

    async fn version(&self) -> Result<Option<i64>, DomainError> {
        Ok(self.applied_versions().await?.into_iter().max())
    }
}

/// Represents a database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version, strictly increasing
    pub version: i64,
    /// Human-readable description
    pub description: String,
    /// SQL to run when applying the migration
    pub up: String,
}

impl Migration {
    pub fn new(version: i64, description: impl Into<String>, up: impl Into<String>) -> Self {
        Self {
            version,
            description: description.into(),
            up: up.into(),
        }
    }
}

/// Collection of migrations for the storage layer
pub fn storage_migrations() -> Vec<Migration> {
    vec![
        Migration::new(
            1,
            "Create cache_entries table",
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                fingerprint TEXT PRIMARY KEY,
                request_text TEXT NOT NULL,
                transformed_text TEXT NOT NULL,
                category TEXT NOT NULL,
                keywords TEXT NOT NULL DEFAULT '[]',
                artifact_path TEXT NOT NULL,
                artifact_size INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                access_count INTEGER NOT NULL DEFAULT 0,
                last_access INTEGER NOT NULL,
                quality_score REAL NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_cache_entries_category
                ON cache_entries(category, access_count DESC, quality_score DESC);
            CREATE INDEX IF NOT EXISTS idx_cache_entries_eviction
                ON cache_entries(access_count, last_access);
            "#,
        ),
        Migration::new(
            2,
            "Create api_usage table",
            r#"
            CREATE TABLE IF NOT EXISTS api_usage (
                id TEXT PRIMARY KEY,
                timestamp INTEGER NOT NULL,
                provider TEXT NOT NULL,
                operation TEXT NOT NULL,
                model TEXT NOT NULL,
                size TEXT NOT NULL,
                success INTEGER NOT NULL,
                cost_micros INTEGER NOT NULL,
                prompt_length INTEGER NOT NULL,
                latency_ms INTEGER NOT NULL,
                cached INTEGER NOT NULL,
                error_kind TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_api_usage_timestamp ON api_usage(timestamp);
            "#,
        ),
    ]
}

/// Runs all pending storage migrations
pub async fn run_storage_migrations(pool: &SqlitePool) -> Result<(), DomainError> {
    SqliteMigrator::new(pool.clone()).run().await
}
