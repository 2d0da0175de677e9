//! SQLite-backed usage repository (`api_usage`)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

use crate::domain::image::{ErrorKind, ProviderKind};
use crate::domain::usage::{UsageRecord, UsageRecordId, UsageRepository};
use crate::domain::DomainError;

/// Usage ledger persisted in SQLite; timestamps are epoch milliseconds
#[derive(Debug, Clone)]
pub struct SqliteUsageRepository {
    pool: SqlitePool,
}

impl SqliteUsageRepository {
    /// Expects the `api_usage` migration to have run
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_record(row: &SqliteRow) -> Result<UsageRecord, DomainError> {
        let timestamp: i64 = row.try_get("timestamp")?;
        let timestamp = DateTime::from_timestamp_millis(timestamp)
            .ok_or_else(|| DomainError::storage(format!("Invalid timestamp {}", timestamp)))?;

        let provider: String = row.try_get("provider")?;
        let provider: ProviderKind = provider.parse()?;

        let error_kind: Option<String> = row.try_get("error_kind")?;
        let error_kind = error_kind
            .map(|kind| kind.parse::<ErrorKind>())
            .transpose()
            .map_err(DomainError::storage)?;

        let prompt_length: i64 = row.try_get("prompt_length")?;
        let latency_ms: i64 = row.try_get("latency_ms")?;

        Ok(UsageRecord::restore(
            UsageRecordId::new(row.try_get::<String, _>("id")?),
            timestamp,
            provider,
            row.try_get("operation")?,
            row.try_get("model")?,
            row.try_get("size")?,
            row.try_get("success")?,
            row.try_get("cost_micros")?,
            u32::try_from(prompt_length.max(0)).unwrap_or(u32::MAX),
            latency_ms.max(0) as u64,
            row.try_get("cached")?,
            error_kind,
        ))
    }
}

#[async_trait]
impl UsageRepository for SqliteUsageRepository {
    async fn record(&self, record: UsageRecord) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO api_usage (
                id, timestamp, provider, operation, model, size,
                success, cost_micros, prompt_length, latency_ms, cached, error_kind
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id().as_str())
        .bind(record.timestamp.timestamp_millis())
        .bind(record.provider.as_str())
        .bind(&record.operation)
        .bind(&record.model)
        .bind(&record.size)
        .bind(record.success)
        .bind(record.cost_micros)
        .bind(i64::from(record.prompt_length))
        .bind(record.latency_ms as i64)
        .bind(record.cached)
        .bind(record.error_kind.map(|kind| kind.as_str()))
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to record usage: {}", e)))?;

        Ok(())
    }

    async fn since(&self, since: DateTime<Utc>) -> Result<Vec<UsageRecord>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, timestamp, provider, operation, model, size,
                   success, cost_micros, prompt_length, latency_ms, cached, error_kind
            FROM api_usage
            WHERE timestamp >= ?
            ORDER BY timestamp ASC
            "#,
        )
        .bind(since.timestamp_millis())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to query usage: {}", e)))?;

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn delete_before(&self, before: DateTime<Utc>) -> Result<usize, DomainError> {
        let result = sqlx::query("DELETE FROM api_usage WHERE timestamp < ?")
            .bind(before.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to prune usage: {}", e)))?;

        Ok(result.rows_affected() as usize)
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM api_usage")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to count usage: {}", e)))?;

        Ok(count.max(0) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::image::ImageSize;
    use crate::domain::usage::UsageEvent;
    use crate::infrastructure::storage::{connect_sqlite, run_storage_migrations, SqliteConfig};
    use chrono::Duration as ChronoDuration;
    use std::time::Duration;

    async fn repository() -> SqliteUsageRepository {
        let pool = connect_sqlite(&SqliteConfig::in_memory()).await.unwrap();
        run_storage_migrations(&pool).await.unwrap();
        SqliteUsageRepository::new(pool)
    }

    #[tokio::test]
    async fn test_record_round_trips_fields() {
        let repo = repository().await;
        let event = UsageEvent::failed(
            ProviderKind::Stability,
            "sd3-medium",
            ImageSize::square(512),
            Duration::from_millis(850),
            31,
            ErrorKind::RateLimit,
        );
        let record = UsageRecord::from_event(&event, 0);
        repo.record(record.clone()).await.unwrap();

        let stored = repo.since(Utc::now() - ChronoDuration::hours(1)).await.unwrap();
        assert_eq!(stored.len(), 1);
        let stored = &stored[0];
        assert_eq!(stored.id(), record.id());
        assert_eq!(stored.provider, ProviderKind::Stability);
        assert_eq!(stored.size, "512x512");
        assert!(!stored.success);
        assert_eq!(stored.error_kind, Some(ErrorKind::RateLimit));
        assert_eq!(stored.latency_ms, 850);
        assert_eq!(stored.prompt_length, 31);
        assert_eq!(
            stored.timestamp.timestamp_millis(),
            record.timestamp.timestamp_millis()
        );
    }

    #[tokio::test]
    async fn test_since_and_delete_before() {
        let repo = repository().await;
        let now = Utc::now();
        let event = UsageEvent::cache_hit(
            ProviderKind::OpenAi,
            "dall-e-3",
            ImageSize::default(),
            Duration::from_millis(3),
            12,
        );

        for days in [0, 5, 45] {
            let record = UsageRecord::from_event(&event, 0)
                .with_timestamp(now - ChronoDuration::days(days));
            repo.record(record).await.unwrap();
        }

        let week = repo.since(now - ChronoDuration::days(7)).await.unwrap();
        assert_eq!(week.len(), 2);
        assert!(week.iter().all(|r| r.cached));

        let removed = repo.delete_before(now - ChronoDuration::days(30)).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(repo.count().await.unwrap(), 2);
    }
}
