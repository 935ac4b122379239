use super::queries;
use crate::application::ports::RemoteStore;
use crate::domain::entities::{
    RecordUpsert, RemoteRecord, SyncStatus, SyncStatusUpdate, UpsertOutcome,
};
use crate::domain::value_objects::{ExternalId, IntegrationKind};
use crate::infrastructure::database::{ConnectionPool, millis_to_datetime};
use crate::shared::clock::Clock;
use crate::shared::error::AppError;
use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use std::sync::Arc;
use uuid::Uuid;

/// SQLite-backed mirror. One transaction per upsert batch.
pub struct SqliteMirrorStore {
    pool: ConnectionPool,
    clock: Arc<dyn Clock>,
}

impl SqliteMirrorStore {
    pub fn new(pool: ConnectionPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    fn map_record(row: &SqliteRow) -> Result<RemoteRecord, AppError> {
        let integration: String = row.try_get("integration")?;
        let external_id: String = row.try_get("external_id")?;
        let payload: String = row.try_get("payload")?;
        let source_created_at: i64 = row.try_get("source_created_at")?;
        let source_updated_at: Option<i64> = row.try_get("source_updated_at")?;
        let created_at: i64 = row.try_get("created_at")?;
        let updated_at: i64 = row.try_get("updated_at")?;

        Ok(RemoteRecord {
            id: row.try_get("id")?,
            integration: integration
                .parse()
                .map_err(AppError::DeserializationError)?,
            external_id: ExternalId::new(external_id).map_err(AppError::DeserializationError)?,
            display_name: row.try_get("display_name")?,
            payload: serde_json::from_str(&payload)?,
            source_created_at: millis_to_datetime(source_created_at, "source_created_at")?,
            source_updated_at: source_updated_at
                .map(|value| millis_to_datetime(value, "source_updated_at"))
                .transpose()?,
            content_hash: row.try_get("content_hash")?,
            created_at: millis_to_datetime(created_at, "created_at")?,
            updated_at: millis_to_datetime(updated_at, "updated_at")?,
        })
    }

    fn map_status(row: &SqliteRow) -> Result<SyncStatus, AppError> {
        let integration: String = row.try_get("integration")?;
        let last_sync_at: Option<i64> = row.try_get("last_sync_at")?;
        let is_syncing: i64 = row.try_get("is_syncing")?;
        let last_record_count: Option<i64> = row.try_get("last_record_count")?;
        let updated_at: i64 = row.try_get("updated_at")?;

        Ok(SyncStatus {
            integration: integration
                .parse()
                .map_err(AppError::DeserializationError)?,
            last_sync_at: last_sync_at
                .map(|value| millis_to_datetime(value, "last_sync_at"))
                .transpose()?,
            last_sync_error: row.try_get("last_sync_error")?,
            is_syncing: is_syncing != 0,
            last_record_count: last_record_count.map(|count| count.max(0) as u64),
            updated_at: millis_to_datetime(updated_at, "updated_at")?,
        })
    }
}

#[async_trait]
impl RemoteStore for SqliteMirrorStore {
    async fn list_records(
        &self,
        integration: IntegrationKind,
    ) -> Result<Vec<RemoteRecord>, AppError> {
        let rows = sqlx::query(queries::SELECT_RECORDS_BY_INTEGRATION)
            .bind(integration.as_str())
            .fetch_all(self.pool.get_pool())
            .await?;

        rows.iter().map(Self::map_record).collect()
    }

    async fn upsert_batch(
        &self,
        integration: IntegrationKind,
        batch: &[RecordUpsert],
    ) -> Result<UpsertOutcome, AppError> {
        let now = self.clock.now().timestamp_millis();
        let mut outcome = UpsertOutcome::default();
        let mut tx = self.pool.get_pool().begin().await?;

        for record in batch {
            let payload = serde_json::to_string(&record.payload)?;
            let source_created_at = record.source_created_at.timestamp_millis();
            let source_updated_at = record.source_updated_at.map(|at| at.timestamp_millis());

            let existing: Option<String> = sqlx::query_scalar(queries::SELECT_RECORD_HASH)
                .bind(integration.as_str())
                .bind(record.external_id.as_str())
                .fetch_optional(&mut *tx)
                .await?;

            match existing {
                None => {
                    sqlx::query(queries::INSERT_RECORD)
                        .bind(Uuid::new_v4().to_string())
                        .bind(integration.as_str())
                        .bind(record.external_id.as_str())
                        .bind(&record.display_name)
                        .bind(&payload)
                        .bind(source_created_at)
                        .bind(source_updated_at)
                        .bind(&record.content_hash)
                        .bind(now)
                        .execute(&mut *tx)
                        .await?;
                    outcome.inserted_count += 1;
                }
                Some(hash) if hash == record.content_hash => {}
                Some(_) => {
                    sqlx::query(queries::UPDATE_RECORD)
                        .bind(integration.as_str())
                        .bind(record.external_id.as_str())
                        .bind(&record.display_name)
                        .bind(&payload)
                        .bind(source_created_at)
                        .bind(source_updated_at)
                        .bind(&record.content_hash)
                        .bind(now)
                        .execute(&mut *tx)
                        .await?;
                    outcome.updated_count += 1;
                }
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }

    async fn get_status(
        &self,
        integration: IntegrationKind,
    ) -> Result<Option<SyncStatus>, AppError> {
        let row = sqlx::query(queries::SELECT_STATUS)
            .bind(integration.as_str())
            .fetch_optional(self.pool.get_pool())
            .await?;

        row.as_ref().map(Self::map_status).transpose()
    }

    async fn update_status(
        &self,
        integration: IntegrationKind,
        update: SyncStatusUpdate,
    ) -> Result<SyncStatus, AppError> {
        let now = self.clock.now();
        let mut tx = self.pool.get_pool().begin().await?;

        let row = sqlx::query(queries::SELECT_STATUS)
            .bind(integration.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        let mut status = match row {
            Some(row) => Self::map_status(&row)?,
            None => SyncStatus::new(integration, now),
        };
        status.apply(&update, now);

        sqlx::query(queries::UPSERT_STATUS)
            .bind(integration.as_str())
            .bind(status.last_sync_at.map(|at| at.timestamp_millis()))
            .bind(status.last_sync_error.as_deref())
            .bind(i64::from(status.is_syncing))
            .bind(status.last_record_count.map(|count| count as i64))
            .bind(status.updated_at.timestamp_millis())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(status)
    }

    async fn reset_stale_sync_flags(&self, keep: &[IntegrationKind]) -> Result<u64, AppError> {
        let now = self.clock.now().timestamp_millis();
        let mut tx = self.pool.get_pool().begin().await?;
        let mut reset = 0;

        for integration in IntegrationKind::ALL {
            if keep.contains(&integration) {
                continue;
            }
            let result = sqlx::query(queries::RESET_STALE_SYNC_FLAG)
                .bind(now)
                .bind(integration.as_str())
                .execute(&mut *tx)
                .await?;
            reset += result.rows_affected();
        }

        tx.commit().await?;
        Ok(reset)
    }
}
