use crate::application::ports::RemoteStore;
use crate::application::services::sync_scheduler::{SyncScheduler, TriggerOutcome};
use crate::application::services::sync_settings::SyncSettingsService;
use crate::domain::entities::{
    AuthTokenStatus, RemoteRecord, SyncProgress, SyncSettings, SyncStatus,
};
use crate::domain::value_objects::sync_window::{SyncWindowOption, window_options};
use crate::domain::value_objects::{IntegrationKind, SyncWindowPreset};
use crate::shared::error::AppError;
use crate::shared::metrics::SyncRunSnapshot;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

const IDLE_POLL_PERIOD: Duration = Duration::from_millis(100);

/// Everything the UI needs to render one integration's sync card.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationOverview {
    pub integration: IntegrationKind,
    pub display_name: String,
    pub available: bool,
    pub status: Option<SyncStatus>,
    pub progress: SyncProgress,
    pub settings: SyncSettings,
    pub is_running: bool,
    pub seconds_until_next_run: u64,
    pub needs_auth: bool,
    pub metrics: SyncRunSnapshot,
}

/// Entry point for the presentation layer. Owns one scheduler per integration.
pub struct SyncService {
    store: Arc<dyn RemoteStore>,
    settings: Arc<SyncSettingsService>,
    schedulers: BTreeMap<IntegrationKind, Arc<SyncScheduler>>,
}

impl SyncService {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        settings: Arc<SyncSettingsService>,
        schedulers: Vec<Arc<SyncScheduler>>,
    ) -> Self {
        Self {
            store,
            settings,
            schedulers: schedulers
                .into_iter()
                .map(|scheduler| (scheduler.integration(), scheduler))
                .collect(),
        }
    }

    pub fn integrations(&self) -> Vec<IntegrationKind> {
        self.schedulers.keys().copied().collect()
    }

    pub fn scheduler(&self, integration: IntegrationKind) -> Result<&Arc<SyncScheduler>, AppError> {
        self.schedulers.get(&integration).ok_or_else(|| {
            AppError::NotFound(format!("{} sync is not enabled", integration.display_name()))
        })
    }

    /// Clears stranded `isSyncing` flags, then resumes every scheduler.
    ///
    /// Runs that are already in flight keep their flag.
    pub async fn initialize(&self) -> Result<(), AppError> {
        self.reset_stale_flags().await?;

        for scheduler in self.schedulers.values() {
            let settings = scheduler.resume().await;
            tracing::info!(
                target: "sync::service",
                integration = %scheduler.integration(),
                auto_sync = settings.auto_sync_enabled,
                interval_minutes = settings.interval_minutes,
                window = %settings.window,
                "integration ready"
            );
        }
        Ok(())
    }

    /// Releases `isSyncing` flags left behind by a crashed process.
    pub async fn reset_stale_flags(&self) -> Result<u64, AppError> {
        let running: Vec<IntegrationKind> = self
            .schedulers
            .values()
            .filter(|scheduler| scheduler.is_running())
            .map(|scheduler| scheduler.integration())
            .collect();
        let reset = self.store.reset_stale_sync_flags(&running).await?;
        if reset > 0 {
            tracing::warn!(target: "sync::service", reset, "cleared stale isSyncing flags");
        }
        Ok(reset)
    }

    pub fn shutdown(&self) {
        for scheduler in self.schedulers.values() {
            scheduler.stop();
        }
    }

    pub fn is_any_running(&self) -> bool {
        self.schedulers.values().any(|scheduler| scheduler.is_running())
    }

    /// Waits up to `limit` for in-flight runs to finish. Returns false on timeout.
    pub async fn wait_for_idle(&self, limit: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + limit;
        while self.is_any_running() {
            if tokio::time::Instant::now() >= deadline {
                tracing::warn!(
                    target: "sync::service",
                    waited_secs = limit.as_secs(),
                    "sync runs still in flight"
                );
                return false;
            }
            tokio::time::sleep(IDLE_POLL_PERIOD).await;
        }
        true
    }

    pub async fn overview(&self) -> Result<Vec<IntegrationOverview>, AppError> {
        let mut result = Vec::with_capacity(self.schedulers.len());
        for (integration, scheduler) in &self.schedulers {
            let pipeline = scheduler.pipeline();
            result.push(IntegrationOverview {
                integration: *integration,
                display_name: integration.display_name().to_string(),
                available: pipeline.is_available().await,
                status: self.store.get_status(*integration).await?,
                progress: pipeline.progress(),
                settings: self.settings.load(*integration).await,
                is_running: scheduler.is_running(),
                seconds_until_next_run: scheduler.seconds_until_next_run(),
                needs_auth: pipeline.auth().needs_auth(),
                metrics: pipeline.metrics().snapshot(),
            });
        }
        Ok(result)
    }

    pub async fn status(&self, integration: IntegrationKind) -> Result<Option<SyncStatus>, AppError> {
        self.scheduler(integration)?;
        self.store.get_status(integration).await
    }

    pub fn progress(&self, integration: IntegrationKind) -> Result<SyncProgress, AppError> {
        Ok(self.scheduler(integration)?.pipeline().progress())
    }

    pub fn dismiss_progress(&self, integration: IntegrationKind) -> Result<SyncProgress, AppError> {
        Ok(self.scheduler(integration)?.pipeline().dismiss_result())
    }

    pub fn subscribe_progress(
        &self,
        integration: IntegrationKind,
    ) -> Result<watch::Receiver<SyncProgress>, AppError> {
        Ok(self.scheduler(integration)?.pipeline().subscribe_progress())
    }

    pub fn subscribe_countdown(
        &self,
        integration: IntegrationKind,
    ) -> Result<watch::Receiver<u64>, AppError> {
        Ok(self.scheduler(integration)?.subscribe_countdown())
    }

    pub fn seconds_until_next_run(&self, integration: IntegrationKind) -> Result<u64, AppError> {
        Ok(self.scheduler(integration)?.seconds_until_next_run())
    }

    pub fn needs_auth(&self, integration: IntegrationKind) -> Result<bool, AppError> {
        Ok(self.scheduler(integration)?.pipeline().auth().needs_auth())
    }

    pub async fn trigger_manual(&self, integration: IntegrationKind) -> Result<TriggerOutcome, AppError> {
        Ok(self.scheduler(integration)?.trigger_manual().await)
    }

    pub async fn set_auto_sync_enabled(
        &self,
        integration: IntegrationKind,
        enabled: bool,
    ) -> Result<(), AppError> {
        self.scheduler(integration)?
            .set_auto_sync_enabled(enabled)
            .await
    }

    pub async fn set_interval_minutes(
        &self,
        integration: IntegrationKind,
        minutes: u32,
    ) -> Result<u32, AppError> {
        self.scheduler(integration)?
            .set_interval_minutes(minutes)
            .await
    }

    pub async fn set_sync_window(
        &self,
        integration: IntegrationKind,
        window_key: &str,
    ) -> Result<SyncWindowPreset, AppError> {
        let window = SyncWindowPreset::from_key(window_key)
            .ok_or_else(|| AppError::InvalidInput(format!("Unknown sync window: {window_key}")))?;
        self.scheduler(integration)?.set_sync_window(window).await?;
        Ok(window)
    }

    pub fn sync_windows(&self) -> Vec<SyncWindowOption> {
        window_options()
    }

    pub async fn auth_status(&self, integration: IntegrationKind) -> Result<AuthTokenStatus, AppError> {
        self.scheduler(integration)?
            .pipeline()
            .auth()
            .check_status()
            .await
    }

    pub async fn reauthenticate(&self, integration: IntegrationKind) -> Result<AuthTokenStatus, AppError> {
        self.scheduler(integration)?
            .pipeline()
            .auth()
            .reauthenticate()
            .await
    }

    pub async fn acknowledge_reauthentication(
        &self,
        integration: IntegrationKind,
    ) -> Result<AuthTokenStatus, AppError> {
        self.scheduler(integration)?
            .pipeline()
            .auth()
            .acknowledge_reauthentication()
            .await
    }

    pub async fn list_records(&self, integration: IntegrationKind) -> Result<Vec<RemoteRecord>, AppError> {
        self.scheduler(integration)?;
        self.store.list_records(integration).await
    }
}
