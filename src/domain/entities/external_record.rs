use crate::domain::value_objects::ExternalId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A record as produced by an external source. Never mutated locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalRecord {
    pub external_id: ExternalId,
    pub display_name: String,
    pub payload: Value,
    pub source_created_at: DateTime<Utc>,
    pub source_updated_at: Option<DateTime<Utc>>,
}

impl ExternalRecord {
    pub fn new(
        external_id: ExternalId,
        display_name: impl Into<String>,
        payload: Value,
        source_created_at: DateTime<Utc>,
        source_updated_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            external_id,
            display_name: display_name.into(),
            payload,
            source_created_at,
            source_updated_at,
        }
    }

    /// Latest source-side modification, falling back to creation time.
    pub fn last_modified(&self) -> DateTime<Utc> {
        self.source_updated_at.unwrap_or(self.source_created_at)
    }
}
