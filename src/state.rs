use crate::application::ports::{RemoteStore, SettingsStore, SyncEventEmitter};
use crate::application::services::{
    SourcePorts, SyncPipeline, SyncScheduler, SyncService, SyncSettingsService,
};
use crate::domain::entities::SyncSettings;
use crate::domain::value_objects::{IntegrationKind, SyncWindowPreset};
use crate::infrastructure::database::ConnectionPool;
use crate::infrastructure::remote::SqliteMirrorStore;
use crate::infrastructure::settings::SqliteSettingsStore;
use crate::infrastructure::sources::{BeeperSource, CommandRunner, GranolaSource};
use crate::presentation::handlers::SyncHandler;
use crate::shared::clock::{Clock, SystemClock};
use crate::shared::config::AppConfig;
use crate::shared::error::AppError;
use std::sync::Arc;
use std::time::Duration;

/// アプリケーション全体の状態を管理する構造体
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db_pool: ConnectionPool,
    pub sync_service: Arc<SyncService>,
    pub sync_handler: Arc<SyncHandler>,
}

impl AppState {
    pub async fn new(
        config: AppConfig,
        emitter: Option<Arc<dyn SyncEventEmitter>>,
    ) -> Result<Self, AppError> {
        config.validate().map_err(AppError::ConfigurationError)?;

        // データディレクトリを作成
        std::fs::create_dir_all(&config.storage.data_dir)?;

        let db_pool = ConnectionPool::from_config(&config.database).await?;
        db_pool.migrate().await?;
        tracing::info!(target: "sync::state", url = %config.database.url, "database ready");

        Ok(Self::assemble(config, db_pool, Arc::new(SystemClock), emitter))
    }

    /// Wires every service on top of an already migrated pool.
    pub fn assemble(
        config: AppConfig,
        db_pool: ConnectionPool,
        clock: Arc<dyn Clock>,
        emitter: Option<Arc<dyn SyncEventEmitter>>,
    ) -> Self {
        let store: Arc<dyn RemoteStore> =
            Arc::new(SqliteMirrorStore::new(db_pool.clone(), clock.clone()));
        let settings_store: Arc<dyn SettingsStore> =
            Arc::new(SqliteSettingsStore::new(db_pool.clone(), clock.clone()));
        let settings = Arc::new(SyncSettingsService::new(
            settings_store,
            SyncSettings {
                auto_sync_enabled: config.sync.auto_sync,
                interval_minutes: config.sync.interval_minutes,
                window: SyncWindowPreset::DEFAULT,
            },
        ));

        let runner = CommandRunner::new(Duration::from_secs(config.sync.fetch_timeout_secs));
        let mut sources: Vec<(IntegrationKind, SourcePorts)> = Vec::new();
        if config.beeper.enabled {
            let beeper = Arc::new(BeeperSource::new(config.beeper.clone(), runner.clone()));
            sources.push((IntegrationKind::Beeper, SourcePorts::from_adapter(beeper)));
        }
        if config.granola.enabled {
            let granola = Arc::new(GranolaSource::new(
                config.granola.clone(),
                runner.clone(),
                clock.clone(),
            ));
            sources.push((IntegrationKind::Granola, SourcePorts::from_adapter(granola)));
        }

        let schedulers = sources
            .into_iter()
            .map(|(integration, ports)| {
                let pipeline = SyncPipeline::new(
                    integration,
                    ports,
                    store.clone(),
                    settings.clone(),
                    clock.clone(),
                )
                .with_emitter(emitter.clone())
                // Beeperはfetch内で最大3コマンドを順に実行する
                .with_fetch_timeout(runner.timeout() * 3)
                .with_batch_size(config.sync.batch_size as usize);
                SyncScheduler::new(
                    Arc::new(pipeline),
                    settings.clone(),
                    store.clone(),
                    clock.clone(),
                )
            })
            .collect();

        let sync_service = Arc::new(SyncService::new(store, settings, schedulers));
        let sync_handler = Arc::new(SyncHandler::new(sync_service.clone()));

        Self {
            config: Arc::new(config),
            db_pool,
            sync_service,
            sync_handler,
        }
    }
}
