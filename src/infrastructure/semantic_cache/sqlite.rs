//! SQLite-backed cache repository (`cache_entries`)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

use crate::domain::semantic_cache::{CacheEntry, CacheRepository};
use crate::domain::DomainError;

const COLUMNS: &str = "fingerprint, request_text, transformed_text, category, keywords, \
    artifact_path, artifact_size, created_at, access_count, last_access, quality_score";

/// Cache metadata persisted in SQLite
#[derive(Debug, Clone)]
pub struct SqliteCacheRepository {
    pool: SqlitePool,
}

impl SqliteCacheRepository {
    /// Expects the `cache_entries` migration to have run
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_entry(row: &SqliteRow) -> Result<CacheEntry, DomainError> {
        let keywords: String = row.try_get("keywords")?;
        let keywords: Vec<String> = serde_json::from_str(&keywords)
            .map_err(|e| DomainError::cache(format!("Invalid keywords column: {}", e)))?;

        let artifact_path: String = row.try_get("artifact_path")?;
        let artifact_size: i64 = row.try_get("artifact_size")?;
        let access_count: i64 = row.try_get("access_count")?;

        Ok(CacheEntry::new(
            row.try_get::<String, _>("fingerprint")?,
            row.try_get::<String, _>("request_text")?,
            row.try_get::<String, _>("category")?,
            artifact_path,
            artifact_size.max(0) as u64,
            row.try_get("quality_score")?,
        )
        .with_transformed_text(row.try_get::<String, _>("transformed_text")?)
        .with_keywords(keywords)
        .with_created_at(from_millis(row.try_get("created_at")?)?)
        .with_access(access_count.max(0) as u64, from_millis(row.try_get("last_access")?)?))
    }

    fn rows_to_entries(rows: &[SqliteRow]) -> Result<Vec<CacheEntry>, DomainError> {
        rows.iter().map(Self::row_to_entry).collect()
    }
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, DomainError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| DomainError::cache(format!("Invalid timestamp {}", ms)))
}

#[async_trait]
impl CacheRepository for SqliteCacheRepository {
    async fn get(&self, fingerprint: &str) -> Result<Option<CacheEntry>, DomainError> {
        let query = format!("SELECT {} FROM cache_entries WHERE fingerprint = ?", COLUMNS);

        let row = sqlx::query(&query)
            .bind(fingerprint)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to get cache entry: {}", e)))?;

        row.as_ref().map(Self::row_to_entry).transpose()
    }

    async fn upsert(&self, entry: CacheEntry) -> Result<(), DomainError> {
        let keywords = serde_json::to_string(entry.keywords())
            .map_err(|e| DomainError::cache(format!("Failed to encode keywords: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO cache_entries (
                fingerprint, request_text, transformed_text, category, keywords,
                artifact_path, artifact_size, created_at, access_count, last_access, quality_score
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(fingerprint) DO UPDATE SET
                request_text = excluded.request_text,
                transformed_text = excluded.transformed_text,
                category = excluded.category,
                keywords = excluded.keywords,
                artifact_path = excluded.artifact_path,
                artifact_size = excluded.artifact_size,
                created_at = excluded.created_at,
                access_count = excluded.access_count,
                last_access = excluded.last_access,
                quality_score = excluded.quality_score
            "#,
        )
        .bind(entry.fingerprint())
        .bind(entry.request_text())
        .bind(entry.transformed_text())
        .bind(entry.category())
        .bind(keywords)
        .bind(entry.artifact_path().to_string_lossy().to_string())
        .bind(entry.artifact_size() as i64)
        .bind(entry.created_at().timestamp_millis())
        .bind(entry.access_count() as i64)
        .bind(entry.last_access().timestamp_millis())
        .bind(entry.quality_score())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::cache(format!("Failed to store cache entry: {}", e)))?;

        Ok(())
    }

    async fn candidates(
        &self,
        category: &str,
        min_quality: f64,
        limit: usize,
    ) -> Result<Vec<CacheEntry>, DomainError> {
        let query = format!(
            "SELECT {} FROM cache_entries WHERE category = ? AND quality_score >= ? \
             ORDER BY access_count DESC, quality_score DESC LIMIT ?",
            COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(category)
            .bind(min_quality)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to list cache candidates: {}", e)))?;

        Self::rows_to_entries(&rows)
    }

    async fn touch(&self, fingerprint: &str, at: DateTime<Utc>) -> Result<bool, DomainError> {
        let result = sqlx::query(
            "UPDATE cache_entries SET access_count = access_count + 1, last_access = ? \
             WHERE fingerprint = ?",
        )
        .bind(at.timestamp_millis())
        .bind(fingerprint)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::cache(format!("Failed to update cache entry: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, fingerprint: &str) -> Result<Option<CacheEntry>, DomainError> {
        let Some(entry) = self.get(fingerprint).await? else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM cache_entries WHERE fingerprint = ?")
            .bind(fingerprint)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to delete cache entry: {}", e)))?;

        Ok(Some(entry))
    }

    async fn eviction_order(&self) -> Result<Vec<CacheEntry>, DomainError> {
        let query = format!(
            "SELECT {} FROM cache_entries ORDER BY access_count ASC, last_access ASC, created_at ASC, fingerprint ASC",
            COLUMNS
        );

        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to list cache entries: {}", e)))?;

        Self::rows_to_entries(&rows)
    }

    async fn total_size(&self) -> Result<u64, DomainError> {
        let total: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(artifact_size), 0) FROM cache_entries")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to sum cache size: {}", e)))?;

        Ok(total.max(0) as u64)
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cache_entries")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to count cache entries: {}", e)))?;

        Ok(count.max(0) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::{connect_sqlite, run_storage_migrations, SqliteConfig};
    use chrono::Duration;

    async fn repository() -> SqliteCacheRepository {
        let pool = connect_sqlite(&SqliteConfig::in_memory()).await.unwrap();
        run_storage_migrations(&pool).await.unwrap();
        SqliteCacheRepository::new(pool)
    }

    fn entry(fingerprint: &str, category: &str, quality: f64) -> CacheEntry {
        CacheEntry::new(
            fingerprint,
            format!("text {}", fingerprint),
            category,
            format!("/tmp/{}.png", fingerprint),
            100,
            quality,
        )
        .with_keywords(vec!["krishna".to_string()])
    }

    #[tokio::test]
    async fn test_round_trip_and_upsert() {
        let repo = repository().await;

        repo.upsert(entry("a", "myth", 0.7)).await.unwrap();
        repo.upsert(entry("a", "myth", 0.9).with_transformed_text("enhanced")).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);

        let stored = repo.get("a").await.unwrap().unwrap();
        assert_eq!(stored.transformed_text(), "enhanced");
        assert_eq!(stored.keywords(), &["krishna".to_string()]);
        assert!((stored.quality_score() - 0.9).abs() < 1e-9);
        assert_eq!(stored.artifact_path().to_str(), Some("/tmp/a.png"));
    }

    #[tokio::test]
    async fn test_candidates_ranked() {
        let repo = repository().await;
        let now = Utc::now();

        repo.upsert(entry("low", "myth", 0.5)).await.unwrap();
        repo.upsert(entry("good", "myth", 0.95)).await.unwrap();
        repo.upsert(entry("popular", "myth", 0.7).with_access(3, now)).await.unwrap();
        repo.upsert(entry("elsewhere", "nature", 0.9)).await.unwrap();

        let candidates = repo.candidates("myth", 0.6, 20).await.unwrap();
        let order: Vec<&str> = candidates.iter().map(|e| e.fingerprint()).collect();
        assert_eq!(order, vec!["popular", "good"]);
    }

    #[tokio::test]
    async fn test_touch_delete_and_eviction_order() {
        let repo = repository().await;
        let now = Utc::now();

        repo.upsert(entry("old", "myth", 0.7).with_access(1, now - Duration::hours(1))).await.unwrap();
        repo.upsert(entry("new", "myth", 0.7).with_access(1, now)).await.unwrap();
        repo.upsert(entry("hot", "myth", 0.7).with_access(9, now)).await.unwrap();

        assert!(repo.touch("new", now).await.unwrap());
        assert!(!repo.touch("missing", now).await.unwrap());

        let order: Vec<String> = repo
            .eviction_order()
            .await
            .unwrap()
            .iter()
            .map(|e| e.fingerprint().to_string())
            .collect();
        assert_eq!(order, vec!["old", "new", "hot"]);
        assert_eq!(repo.total_size().await.unwrap(), 300);

        let removed = repo.delete("old").await.unwrap().unwrap();
        assert_eq!(removed.fingerprint(), "old");
        assert!(repo.delete("old").await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_eviction_ties_break_on_creation_then_fingerprint() {
        let repo = repository().await;
        let now = Utc::now();

        repo.upsert(entry("b", "myth", 0.7).with_created_at(now).with_access(0, now)).await.unwrap();
        repo.upsert(entry("a", "myth", 0.7).with_created_at(now).with_access(0, now)).await.unwrap();
        repo.upsert(
            entry("z", "myth", 0.7)
                .with_created_at(now - Duration::minutes(5))
                .with_access(0, now),
        )
        .await
        .unwrap();

        let order: Vec<String> = repo
            .eviction_order()
            .await
            .unwrap()
            .iter()
            .map(|e| e.fingerprint().to_string())
            .collect();
        assert_eq!(order, vec!["z", "a", "b"]);
    }

    #[tokio::test]
    async fn test_missing_table_is_a_cache_error() {
        let pool = connect_sqlite(&SqliteConfig::in_memory()).await.unwrap();
        let repo = SqliteCacheRepository::new(pool);

        let error = repo.get("a").await.unwrap_err();
        assert!(matches!(error, DomainError::Cache { .. }));
    }
}
