use crate::application::ports::SettingsStore;
use crate::domain::entities::SyncSettings;
use crate::domain::value_objects::{IntegrationKind, SyncWindowPreset};
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use std::sync::Arc;

const AUTO_SYNC_ENABLED: &str = "autoSyncEnabled";
const INTERVAL_MINUTES: &str = "intervalMinutes";
const SYNC_WINDOW: &str = "syncWindowPresetKey";
const LAST_SYNC_AT: &str = "lastSyncAt";

pub fn settings_key(integration: IntegrationKind, name: &str) -> String {
    format!("{}.{}", integration.as_str(), name)
}

/// Typed view over the flat settings store.
///
/// Reads never fail: a missing, corrupt or unreadable value yields the default.
pub struct SyncSettingsService {
    store: Arc<dyn SettingsStore>,
    defaults: SyncSettings,
}

impl SyncSettingsService {
    pub fn new(store: Arc<dyn SettingsStore>, defaults: SyncSettings) -> Self {
        Self {
            store,
            defaults: SyncSettings {
                interval_minutes: SyncSettings::clamp_interval(defaults.interval_minutes),
                ..defaults
            },
        }
    }

    pub fn defaults(&self) -> SyncSettings {
        self.defaults
    }

    async fn read(&self, integration: IntegrationKind, name: &str) -> Option<String> {
        let key = settings_key(integration, name);
        match self.store.get(&key).await {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(target: "sync::settings", key = %key, error = %err, "failed to read setting");
                None
            }
        }
    }

    pub async fn load(&self, integration: IntegrationKind) -> SyncSettings {
        let auto_sync_enabled = self
            .read(integration, AUTO_SYNC_ENABLED)
            .await
            .and_then(|v| v.trim().parse::<bool>().ok())
            .unwrap_or(self.defaults.auto_sync_enabled);
        let interval_minutes = self
            .read(integration, INTERVAL_MINUTES)
            .await
            .and_then(|v| v.trim().parse::<u32>().ok())
            .map(SyncSettings::clamp_interval)
            .unwrap_or(self.defaults.interval_minutes);
        let window = self
            .read(integration, SYNC_WINDOW)
            .await
            .and_then(|v| SyncWindowPreset::from_key(&v))
            .unwrap_or(self.defaults.window);

        SyncSettings {
            auto_sync_enabled,
            interval_minutes,
            window,
        }
    }

    pub async fn set_auto_sync_enabled(
        &self,
        integration: IntegrationKind,
        enabled: bool,
    ) -> Result<(), AppError> {
        self.store
            .set(&settings_key(integration, AUTO_SYNC_ENABLED), &enabled.to_string())
            .await
    }

    /// Returns the clamped value that was stored.
    pub async fn set_interval_minutes(
        &self,
        integration: IntegrationKind,
        minutes: u32,
    ) -> Result<u32, AppError> {
        let clamped = SyncSettings::clamp_interval(minutes);
        self.store
            .set(&settings_key(integration, INTERVAL_MINUTES), &clamped.to_string())
            .await?;
        Ok(clamped)
    }

    pub async fn set_window(
        &self,
        integration: IntegrationKind,
        window: SyncWindowPreset,
    ) -> Result<(), AppError> {
        self.store
            .set(&settings_key(integration, SYNC_WINDOW), window.key())
            .await
    }

    pub async fn last_sync_at(&self, integration: IntegrationKind) -> Option<DateTime<Utc>> {
        self.read(integration, LAST_SYNC_AT)
            .await
            .and_then(|v| DateTime::parse_from_rfc3339(v.trim()).ok())
            .map(|at| at.with_timezone(&Utc))
    }

    /// Stores `at` unless a later value is already recorded.
    pub async fn record_last_sync_at(
        &self,
        integration: IntegrationKind,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        if let Some(current) = self.last_sync_at(integration).await {
            if current >= at {
                return Ok(());
            }
        }
        self.store
            .set(&settings_key(integration, LAST_SYNC_AT), &at.to_rfc3339())
            .await
    }
}
