use crate::domain::entities::{SyncProgress, SyncStatus};
use crate::domain::value_objects::IntegrationKind;

/// Push channel towards the UI. Delivery failures are logged, never fatal.
pub trait SyncEventEmitter: Send + Sync {
    fn emit_progress(&self, integration: IntegrationKind, progress: &SyncProgress)
    -> Result<(), String>;
    fn emit_status(&self, status: &SyncStatus) -> Result<(), String>;
}
