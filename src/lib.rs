// モジュール定義
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
pub mod shared;
pub mod state;

pub use shared::{AppConfig, AppError, Result};
pub use state::AppState;

/// Installs the global tracing subscriber. Safe to call more than once.
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lifeos_sync=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[doc(hidden)]
pub mod test_support {
    pub mod application {
        pub use crate::application::ports::{
            AvailabilityProbe, CredentialProvider, RecordSource, RemoteStore, SettingsStore,
            SyncEventEmitter,
        };
        pub use crate::application::services::{
            AuthHealthMonitor, SkipReason, SourcePorts, SyncError, SyncPipeline, SyncScheduler,
            SyncService, SyncSettingsService, TriggerOutcome, classify_error,
        };
    }

    pub mod domain {
        pub use crate::domain::entities::{
            AuthTokenStatus, ExternalRecord, ReconcileSummary, RemoteRecord, SyncErrorKind,
            SyncProgress, SyncSettings, SyncStatus, SyncStatusUpdate,
        };
        pub use crate::domain::value_objects::{ExternalId, IntegrationKind, SyncWindowPreset};
    }

    pub mod infrastructure {
        pub use crate::infrastructure::database::ConnectionPool;
        pub use crate::infrastructure::remote::SqliteMirrorStore;
        pub use crate::infrastructure::settings::SqliteSettingsStore;
    }

    pub mod shared {
        pub use crate::shared::clock::{Clock, ManualClock, SystemClock};
        pub use crate::shared::error::AppError;
    }
}

/// Tauri plugin exposing the sync commands and `sync://` events.
#[cfg(feature = "desktop")]
pub fn plugin<R: tauri::Runtime>() -> tauri::plugin::TauriPlugin<R> {
    use presentation::commands::sync_commands;
    use presentation::events::TauriSyncEventEmitter;
    use std::sync::Arc;
    use tauri::Manager;

    tauri::plugin::Builder::new("lifeos-sync")
        .invoke_handler(tauri::generate_handler![
            sync_commands::get_sync_overview,
            sync_commands::get_sync_status,
            sync_commands::dismiss_sync_result,
            sync_commands::trigger_sync,
            sync_commands::set_auto_sync_enabled,
            sync_commands::set_sync_interval_minutes,
            sync_commands::set_sync_window,
            sync_commands::get_sync_windows,
            sync_commands::get_auth_status,
            sync_commands::reauthenticate_source,
            sync_commands::acknowledge_reauthentication,
            sync_commands::list_synced_records,
        ])
        .setup(|app, _api| {
            let emitter: Arc<dyn application::ports::SyncEventEmitter> =
                Arc::new(TauriSyncEventEmitter::new(app.clone()));
            let config = AppConfig::from_env();

            // コマンドを受け付ける前にisSyncingを戻してスケジューラを開始
            let app_state = tauri::async_runtime::block_on(async {
                let state = AppState::new(config, Some(emitter)).await?;
                state.sync_service.initialize().await?;
                Ok::<_, AppError>(state)
            })?;
            app.manage(app_state);

            tracing::info!(target: "sync::plugin", "lifeos-sync plugin ready");
            Ok(())
        })
        .on_event(|app, event| {
            if let tauri::RunEvent::Exit = event {
                if let Some(state) = app.try_state::<AppState>() {
                    state.sync_service.shutdown();
                    let service = state.sync_service.clone();
                    tauri::async_runtime::block_on(async move {
                        service.wait_for_idle(std::time::Duration::from_secs(10)).await;
                    });
                }
            }
        })
        .build()
}
