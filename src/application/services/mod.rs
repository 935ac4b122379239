pub mod auth_health;
pub mod reconciler;
pub mod sync_pipeline;
pub mod sync_scheduler;
pub mod sync_service;
pub mod sync_settings;

pub use auth_health::{AuthHealthMonitor, classify_error};
pub use reconciler::Reconciler;
pub use sync_pipeline::{SourcePorts, SyncError, SyncPipeline};
pub use sync_scheduler::{SkipReason, SyncScheduler, TriggerOutcome};
pub use sync_service::{IntegrationOverview, SyncService};
pub use sync_settings::SyncSettingsService;
