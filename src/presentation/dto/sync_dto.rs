use super::Validate;
use crate::application::services::{SkipReason, TriggerOutcome};
use crate::domain::entities::{
    AuthTokenStatus, ReconcileSummary, RemoteRecord, SyncErrorKind, SyncProgress, SyncStatus,
};
use crate::domain::value_objects::IntegrationKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct IntegrationRequest {
    pub integration: String,
}

impl Validate for IntegrationRequest {
    fn validate(&self) -> Result<(), String> {
        self.integration.parse::<IntegrationKind>().map(|_| ())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetAutoSyncEnabledRequest {
    pub integration: String,
    pub enabled: bool,
}

impl Validate for SetAutoSyncEnabledRequest {
    fn validate(&self) -> Result<(), String> {
        self.integration.parse::<IntegrationKind>().map(|_| ())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetSyncIntervalRequest {
    pub integration: String,
    pub minutes: u32,
}

impl Validate for SetSyncIntervalRequest {
    fn validate(&self) -> Result<(), String> {
        self.integration.parse::<IntegrationKind>()?;
        if self.minutes == 0 {
            return Err("Interval must be at least 1 minute".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetSyncWindowRequest {
    pub integration: String,
    pub window_key: String,
}

impl Validate for SetSyncWindowRequest {
    fn validate(&self) -> Result<(), String> {
        self.integration.parse::<IntegrationKind>()?;
        if self.window_key.trim().is_empty() {
            return Err("Window key is required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerStatus {
    Completed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct TriggerSyncResponse {
    pub status: TriggerStatus,
    pub summary: Option<ReconcileSummary>,
    pub error: Option<String>,
    pub error_kind: Option<SyncErrorKind>,
    pub skip_reason: Option<SkipReason>,
}

impl From<TriggerOutcome> for TriggerSyncResponse {
    fn from(outcome: TriggerOutcome) -> Self {
        match outcome {
            TriggerOutcome::Completed(summary) => Self {
                status: TriggerStatus::Completed,
                summary: Some(summary),
                error: None,
                error_kind: None,
                skip_reason: None,
            },
            TriggerOutcome::Failed(err) => Self {
                status: TriggerStatus::Failed,
                summary: None,
                error_kind: Some(err.kind()),
                error: Some(err.to_string()),
                skip_reason: None,
            },
            TriggerOutcome::Skipped(reason) => Self {
                status: TriggerStatus::Skipped,
                summary: None,
                error: None,
                error_kind: None,
                skip_reason: Some(reason),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthStatusResponse {
    pub integration: IntegrationKind,
    pub needs_auth: bool,
    pub is_valid: bool,
    pub has_token: bool,
    pub expires_at: Option<i64>,
    pub minutes_remaining: Option<i64>,
}

impl AuthStatusResponse {
    pub fn new(integration: IntegrationKind, status: &AuthTokenStatus, needs_auth: bool) -> Self {
        Self {
            integration,
            needs_auth,
            is_valid: status.is_valid(),
            has_token: status.has_token(),
            expires_at: status.expires_at().map(|at| at.timestamp_millis()),
            minutes_remaining: status.minutes_remaining(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncedRecordResponse {
    pub id: String,
    pub external_id: String,
    pub display_name: String,
    pub payload: serde_json::Value,
    pub source_created_at: i64,
    pub source_updated_at: Option<i64>,
    pub updated_at: i64,
}

impl From<RemoteRecord> for SyncedRecordResponse {
    fn from(record: RemoteRecord) -> Self {
        Self {
            id: record.id,
            external_id: record.external_id.into(),
            display_name: record.display_name,
            payload: record.payload,
            source_created_at: record.source_created_at.timestamp_millis(),
            source_updated_at: record.source_updated_at.map(|at| at.timestamp_millis()),
            updated_at: record.updated_at.timestamp_millis(),
        }
    }
}

/// `sync://progress` payload.
#[derive(Debug, Clone, Serialize)]
pub struct SyncProgressEvent {
    pub integration: IntegrationKind,
    pub progress: SyncProgress,
    pub emitted_at: i64,
}

/// `sync://status` payload.
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatusEvent {
    pub status: SyncStatus,
    pub emitted_at: i64,
}

pub fn emitted_at(now: DateTime<Utc>) -> i64 {
    now.timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::SyncError;
    use serde_json::json;

    #[test]
    fn interval_request_rejects_zero_and_unknown_integration() {
        let request = SetSyncIntervalRequest {
            integration: "granola".to_string(),
            minutes: 0,
        };
        assert!(request.validate().is_err());

        let request = SetSyncIntervalRequest {
            integration: "notion".to_string(),
            minutes: 5,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn failed_trigger_exposes_kind() {
        let response = TriggerSyncResponse::from(TriggerOutcome::Failed(SyncError::Auth(
            "token expired".to_string(),
        )));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], json!("failed"));
        assert_eq!(value["error_kind"], json!("auth"));
    }

    #[test]
    fn skipped_trigger_exposes_reason() {
        let response =
            TriggerSyncResponse::from(TriggerOutcome::Skipped(SkipReason::AlreadyRunning));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["skip_reason"], json!("already_running"));
        assert!(value["summary"].is_null());
    }
}
