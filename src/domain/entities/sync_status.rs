use crate::domain::value_objects::IntegrationKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable per-integration sync state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub integration: IntegrationKind,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_sync_error: Option<String>,
    pub is_syncing: bool,
    pub last_record_count: Option<u64>,
    pub updated_at: DateTime<Utc>,
}

impl SyncStatus {
    pub fn new(integration: IntegrationKind, now: DateTime<Utc>) -> Self {
        Self {
            integration,
            last_sync_at: None,
            last_sync_error: None,
            is_syncing: false,
            last_record_count: None,
            updated_at: now,
        }
    }

    /// Merge a partial update. `last_sync_at` never moves backwards.
    pub fn apply(&mut self, update: &SyncStatusUpdate, now: DateTime<Utc>) {
        if let Some(at) = update.last_sync_at {
            self.last_sync_at = Some(match self.last_sync_at {
                Some(current) if current > at => current,
                _ => at,
            });
        }
        if let Some(error) = &update.last_sync_error {
            self.last_sync_error = error.clone();
        }
        if let Some(flag) = update.is_syncing {
            self.is_syncing = flag;
        }
        if let Some(count) = update.last_record_count {
            self.last_record_count = Some(count);
        }
        self.updated_at = now;
    }
}

/// Partial [`SyncStatus`] write. `None` leaves the field untouched;
/// `last_sync_error: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncStatusUpdate {
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_sync_error: Option<Option<String>>,
    pub is_syncing: Option<bool>,
    pub last_record_count: Option<u64>,
}

impl SyncStatusUpdate {
    pub fn started() -> Self {
        Self {
            is_syncing: Some(true),
            ..Self::default()
        }
    }

    pub fn succeeded(at: DateTime<Utc>, record_count: u64) -> Self {
        Self {
            last_sync_at: Some(at),
            last_sync_error: Some(None),
            is_syncing: Some(false),
            last_record_count: Some(record_count),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            last_sync_error: Some(Some(message.into())),
            is_syncing: Some(false),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
