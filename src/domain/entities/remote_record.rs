use crate::domain::value_objects::{ExternalId, IntegrationKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Mirror of an [`ExternalRecord`](super::ExternalRecord) held by the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    pub id: String,
    pub integration: IntegrationKind,
    pub external_id: ExternalId,
    pub display_name: String,
    pub payload: Value,
    pub source_created_at: DateTime<Utc>,
    pub source_updated_at: Option<DateTime<Utc>>,
    /// Fingerprint of the normalized projection the row was last written with.
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Proposed insert-or-update for one external record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordUpsert {
    pub external_id: ExternalId,
    pub display_name: String,
    pub payload: Value,
    pub source_created_at: DateTime<Utc>,
    pub source_updated_at: Option<DateTime<Utc>>,
    pub content_hash: String,
}

/// What the store actually did with a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertOutcome {
    pub inserted_count: u64,
    pub updated_count: u64,
}

impl UpsertOutcome {
    pub fn absorb(&mut self, other: UpsertOutcome) {
        self.inserted_count += other.inserted_count;
        self.updated_count += other.updated_count;
    }
}
