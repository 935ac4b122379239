use crate::domain::entities::ExternalRecord;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Records created or modified at or after `since`.
    async fn fetch_since(&self, since: DateTime<Utc>) -> Result<Vec<ExternalRecord>, AppError>;
}
