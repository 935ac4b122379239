pub mod external_id;
pub mod integration;
pub mod sync_window;

pub use external_id::ExternalId;
pub use integration::IntegrationKind;
pub use sync_window::{SyncWindowOption, SyncWindowPreset};
