pub mod auth_token_status;
pub mod external_record;
pub mod reconcile_summary;
pub mod remote_record;
pub mod sync_progress;
pub mod sync_settings;
pub mod sync_status;

pub use auth_token_status::AuthTokenStatus;
pub use external_record::ExternalRecord;
pub use reconcile_summary::ReconcileSummary;
pub use remote_record::{RecordUpsert, RemoteRecord, UpsertOutcome};
pub use sync_progress::{SyncErrorKind, SyncProgress};
pub use sync_settings::SyncSettings;
pub use sync_status::{SyncStatus, SyncStatusUpdate};
