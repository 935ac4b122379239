use crate::domain::entities::{RecordUpsert, RemoteRecord, SyncStatus, SyncStatusUpdate, UpsertOutcome};
use crate::domain::value_objects::IntegrationKind;
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Durable mirror of external records plus the per-integration status row.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn list_records(&self, integration: IntegrationKind)
    -> Result<Vec<RemoteRecord>, AppError>;

    /// Insert-or-update keyed by `(integration, external_id)`. Not transactional
    /// across calls; a failure may leave earlier batches applied.
    async fn upsert_batch(
        &self,
        integration: IntegrationKind,
        batch: &[RecordUpsert],
    ) -> Result<UpsertOutcome, AppError>;

    async fn get_status(&self, integration: IntegrationKind)
    -> Result<Option<SyncStatus>, AppError>;

    /// Applies a partial update, creating the row on first write.
    async fn update_status(
        &self,
        integration: IntegrationKind,
        update: SyncStatusUpdate,
    ) -> Result<SyncStatus, AppError>;

    /// Clears persisted `is_syncing` flags, except for the integrations in `keep`.
    /// Returns the number of rows touched.
    async fn reset_stale_sync_flags(&self, keep: &[IntegrationKind]) -> Result<u64, AppError>;
}
