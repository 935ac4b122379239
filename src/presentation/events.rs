use crate::application::ports::SyncEventEmitter;
use crate::domain::entities::{SyncProgress, SyncStatus};
use crate::domain::value_objects::IntegrationKind;
use crate::presentation::dto::sync_dto::{SyncProgressEvent, SyncStatusEvent, emitted_at};
use chrono::Utc;
use tauri::{AppHandle, Emitter, Runtime};

pub const PROGRESS_EVENT: &str = "sync://progress";
pub const STATUS_EVENT: &str = "sync://status";

pub struct TauriSyncEventEmitter<R: Runtime> {
    handle: AppHandle<R>,
}

impl<R: Runtime> TauriSyncEventEmitter<R> {
    pub fn new(handle: AppHandle<R>) -> Self {
        Self { handle }
    }
}

impl<R: Runtime> SyncEventEmitter for TauriSyncEventEmitter<R> {
    fn emit_progress(
        &self,
        integration: IntegrationKind,
        progress: &SyncProgress,
    ) -> Result<(), String> {
        let payload = SyncProgressEvent {
            integration,
            progress: progress.clone(),
            emitted_at: emitted_at(Utc::now()),
        };
        self.handle
            .emit(PROGRESS_EVENT, payload)
            .map_err(|err| err.to_string())
    }

    fn emit_status(&self, status: &SyncStatus) -> Result<(), String> {
        let payload = SyncStatusEvent {
            status: status.clone(),
            emitted_at: emitted_at(Utc::now()),
        };
        self.handle
            .emit(STATUS_EVENT, payload)
            .map_err(|err| err.to_string())
    }
}
