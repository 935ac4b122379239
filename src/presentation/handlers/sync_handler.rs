use crate::application::services::{IntegrationOverview, SyncService};
use crate::domain::entities::{SyncProgress, SyncStatus};
use crate::domain::value_objects::{IntegrationKind, SyncWindowOption};
use crate::presentation::dto::Validate;
use crate::presentation::dto::sync_dto::{
    AuthStatusResponse, IntegrationRequest, SetAutoSyncEnabledRequest, SetSyncIntervalRequest,
    SetSyncWindowRequest, SyncedRecordResponse, TriggerSyncResponse,
};
use crate::shared::AppError;
use std::sync::Arc;

/// Request validation and DTO mapping in front of [`SyncService`].
pub struct SyncHandler {
    sync_service: Arc<SyncService>,
}

impl SyncHandler {
    pub fn new(sync_service: Arc<SyncService>) -> Self {
        Self { sync_service }
    }

    pub async fn get_overview(&self) -> Result<Vec<IntegrationOverview>, AppError> {
        self.sync_service.overview().await
    }

    pub async fn get_status(
        &self,
        request: IntegrationRequest,
    ) -> Result<Option<SyncStatus>, AppError> {
        let integration = parse_integration(&request, &request.integration)?;
        self.sync_service.status(integration).await
    }

    pub async fn trigger_sync(
        &self,
        request: IntegrationRequest,
    ) -> Result<TriggerSyncResponse, AppError> {
        let integration = parse_integration(&request, &request.integration)?;
        let outcome = self.sync_service.trigger_manual(integration).await?;
        Ok(outcome.into())
    }

    /// Returns a finished run's progress to idle.
    pub fn dismiss_sync_result(&self, request: IntegrationRequest) -> Result<SyncProgress, AppError> {
        let integration = parse_integration(&request, &request.integration)?;
        self.sync_service.dismiss_progress(integration)
    }

    pub async fn set_auto_sync_enabled(
        &self,
        request: SetAutoSyncEnabledRequest,
    ) -> Result<(), AppError> {
        let integration = parse_integration(&request, &request.integration)?;
        self.sync_service
            .set_auto_sync_enabled(integration, request.enabled)
            .await
    }

    pub async fn set_sync_interval_minutes(
        &self,
        request: SetSyncIntervalRequest,
    ) -> Result<u32, AppError> {
        let integration = parse_integration(&request, &request.integration)?;
        self.sync_service
            .set_interval_minutes(integration, request.minutes)
            .await
    }

    pub async fn set_sync_window(&self, request: SetSyncWindowRequest) -> Result<String, AppError> {
        let integration = parse_integration(&request, &request.integration)?;
        let window = self
            .sync_service
            .set_sync_window(integration, request.window_key.trim())
            .await?;
        Ok(window.key().to_string())
    }

    pub fn get_sync_windows(&self) -> Vec<SyncWindowOption> {
        self.sync_service.sync_windows()
    }

    pub async fn get_auth_status(
        &self,
        request: IntegrationRequest,
    ) -> Result<AuthStatusResponse, AppError> {
        let integration = parse_integration(&request, &request.integration)?;
        let status = self.sync_service.auth_status(integration).await?;
        let needs_auth = self.sync_service.needs_auth(integration)?;
        Ok(AuthStatusResponse::new(integration, &status, needs_auth))
    }

    pub async fn reauthenticate(
        &self,
        request: IntegrationRequest,
    ) -> Result<AuthStatusResponse, AppError> {
        let integration = parse_integration(&request, &request.integration)?;
        let status = self.sync_service.reauthenticate(integration).await?;
        let needs_auth = self.sync_service.needs_auth(integration)?;
        Ok(AuthStatusResponse::new(integration, &status, needs_auth))
    }

    pub async fn acknowledge_reauthentication(
        &self,
        request: IntegrationRequest,
    ) -> Result<AuthStatusResponse, AppError> {
        let integration = parse_integration(&request, &request.integration)?;
        let status = self
            .sync_service
            .acknowledge_reauthentication(integration)
            .await?;
        let needs_auth = self.sync_service.needs_auth(integration)?;
        Ok(AuthStatusResponse::new(integration, &status, needs_auth))
    }

    pub async fn list_synced_records(
        &self,
        request: IntegrationRequest,
    ) -> Result<Vec<SyncedRecordResponse>, AppError> {
        let integration = parse_integration(&request, &request.integration)?;
        let records = self.sync_service.list_records(integration).await?;
        Ok(records.into_iter().map(SyncedRecordResponse::from).collect())
    }
}

fn parse_integration<R: Validate>(request: &R, raw: &str) -> Result<IntegrationKind, AppError> {
    request.validate().map_err(AppError::InvalidInput)?;
    raw.parse().map_err(AppError::InvalidInput)
}
