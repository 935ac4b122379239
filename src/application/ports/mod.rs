pub mod availability;
pub mod credentials;
pub mod record_source;
pub mod remote_store;
pub mod settings_store;
pub mod sync_events;

pub use availability::AvailabilityProbe;
pub use credentials::CredentialProvider;
pub use record_source::RecordSource;
pub use remote_store::RemoteStore;
pub use settings_store::SettingsStore;
pub use sync_events::SyncEventEmitter;
