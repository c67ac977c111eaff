//! Progress Repository
//!
//! Postgres implementation of the tracker's progress store. Each record is
//! written with a single upsert, so a reader sees either the previous record
//! or the new one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::time::Duration;
use waypoint_core::domain::progress::ProgressRecord;
use waypoint_tracker::store::{ProgressStore, StoreError, StoreResult};

/// Progress store backed by the `progress_records` table
#[derive(Debug, Clone)]
pub struct PgProgressStore {
    pool: PgPool,
    retention: Option<Duration>,
}

impl PgProgressStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            retention: None,
        }
    }

    /// Expires records whose last write is older than `retention`
    pub fn with_retention(mut self, retention: Option<Duration>) -> Self {
        self.retention = retention;
        self
    }

    /// Oldest `updated_at` still considered live
    fn cutoff(&self) -> Option<DateTime<Utc>> {
        let retention = chrono::Duration::from_std(self.retention?).ok()?;
        Utc::now().checked_sub_signed(retention)
    }
}

#[async_trait]
impl ProgressStore for PgProgressStore {
    async fn get(&self, job_id: &str) -> StoreResult<Option<ProgressRecord>> {
        let row = sqlx::query_as::<_, ProgressRow>(
            r#"
            SELECT record
            FROM progress_records
            WHERE job_id = $1
              AND ($2::TIMESTAMPTZ IS NULL OR updated_at >= $2)
            "#,
        )
        .bind(job_id)
        .bind(self.cutoff())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(ProgressRow::into_record).transpose()
    }

    async fn set(&self, record: &ProgressRecord) -> StoreResult<()> {
        let document = serde_json::to_value(record)?;

        sqlx::query(
            r#"
            INSERT INTO progress_records (job_id, status, record, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (job_id) DO UPDATE
            SET status = EXCLUDED.status,
                record = EXCLUDED.record,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&record.job_id)
        .bind(record.status.as_str())
        .bind(document)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn remove(&self, job_id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM progress_records WHERE job_id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> StoreResult<Vec<ProgressRecord>> {
        let rows = sqlx::query_as::<_, ProgressRow>(
            r#"
            SELECT record
            FROM progress_records
            WHERE $1::TIMESTAMPTZ IS NULL OR updated_at >= $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(self.cutoff())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(ProgressRow::into_record).collect()
    }

    async fn purge_expired(&self) -> StoreResult<usize> {
        let Some(cutoff) = self.cutoff() else {
            return Ok(0);
        };

        let result = sqlx::query("DELETE FROM progress_records WHERE updated_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        Ok(result.rows_affected() as usize)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn backend(err: sqlx::Error) -> StoreError {
    tracing::error!("Database error: {:?}", err);
    StoreError::Backend(err.to_string())
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct ProgressRow {
    record: serde_json::Value,
}

impl ProgressRow {
    fn into_record(self) -> StoreResult<ProgressRecord> {
        Ok(serde_json::from_value(self.record)?)
    }
}
