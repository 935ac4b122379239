#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use lifeos_sync_lib::test_support::application::{
    AvailabilityProbe, CredentialProvider, RecordSource, RemoteStore, SettingsStore,
    SourcePorts, SyncPipeline, SyncScheduler, SyncSettingsService,
};
use lifeos_sync_lib::test_support::domain::{
    AuthTokenStatus, ExternalId, ExternalRecord, IntegrationKind, SyncSettings, SyncWindowPreset,
};
use lifeos_sync_lib::test_support::infrastructure::{
    ConnectionPool, SqliteMirrorStore, SqliteSettingsStore,
};
use lifeos_sync_lib::test_support::shared::{AppError, Clock, ManualClock};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 15, 9, 0, 0).unwrap()
}

pub fn meeting(id: &str, title: &str, created: DateTime<Utc>) -> ExternalRecord {
    ExternalRecord::new(
        ExternalId::new(id.to_string()).expect("external id"),
        title,
        json!({ "title": title, "attendees": ["a@example.com"] }),
        created,
        None,
    )
}

/// In-process source whose records, availability and failures are set by the test.
pub struct FakeSource {
    available: AtomicBool,
    records: Mutex<Vec<ExternalRecord>>,
    fetch_error: Mutex<Option<String>>,
    token: Mutex<AuthTokenStatus>,
    fetch_calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl FakeSource {
    pub fn new(records: Vec<ExternalRecord>) -> Self {
        Self {
            available: AtomicBool::new(true),
            records: Mutex::new(records),
            fetch_error: Mutex::new(None),
            token: Mutex::new(AuthTokenStatus::from_expiry(None, base_time())),
            fetch_calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    /// Every fetch waits for one `notify_one` on the returned handle.
    pub fn gated(records: Vec<ExternalRecord>) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let mut source = Self::new(records);
        source.gate = Some(Arc::clone(&gate));
        (source, gate)
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_records(&self, records: Vec<ExternalRecord>) {
        *self.records.lock().unwrap() = records;
    }

    pub fn fail_fetch_with(&self, message: Option<&str>) {
        *self.fetch_error.lock().unwrap() = message.map(str::to_string);
    }

    pub fn set_token(&self, status: AuthTokenStatus) {
        *self.token.lock().unwrap() = status;
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AvailabilityProbe for FakeSource {
    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn unavailable_message(&self) -> String {
        "Granola CLI not installed".to_string()
    }
}

#[async_trait]
impl CredentialProvider for FakeSource {
    async fn token_status(&self) -> Result<AuthTokenStatus, AppError> {
        Ok(self.token.lock().unwrap().clone())
    }

    async fn reauthenticate(&self) -> Result<(), AppError> {
        self.set_token(AuthTokenStatus::from_expiry(None, base_time()));
        Ok(())
    }
}

#[async_trait]
impl RecordSource for FakeSource {
    async fn fetch_since(&self, since: DateTime<Utc>) -> Result<Vec<ExternalRecord>, AppError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(message) = self.fetch_error.lock().unwrap().clone() {
            return Err(AppError::ExternalCommand {
                command: "granola sync".to_string(),
                message,
            });
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|record| record.last_modified() >= since)
            .cloned()
            .collect())
    }
}

pub struct SyncHarness {
    pub pool: ConnectionPool,
    pub clock: Arc<ManualClock>,
    pub store: Arc<dyn RemoteStore>,
    pub settings_store: Arc<dyn SettingsStore>,
    pub settings: Arc<SyncSettingsService>,
    pub source: Arc<FakeSource>,
    pub pipeline: Arc<SyncPipeline>,
}

impl SyncHarness {
    pub async fn new(source: FakeSource) -> Self {
        Self::with_defaults(source, default_settings()).await
    }

    pub async fn with_defaults(source: FakeSource, defaults: SyncSettings) -> Self {
        let pool = ConnectionPool::from_memory().await.expect("in-memory sqlite");
        pool.migrate().await.expect("migrations");

        let clock = Arc::new(ManualClock::new(base_time()));
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let store: Arc<dyn RemoteStore> =
            Arc::new(SqliteMirrorStore::new(pool.clone(), dyn_clock.clone()));
        let settings_store: Arc<dyn SettingsStore> =
            Arc::new(SqliteSettingsStore::new(pool.clone(), dyn_clock.clone()));
        let settings = Arc::new(SyncSettingsService::new(settings_store.clone(), defaults));
        let source = Arc::new(source);

        let pipeline = Arc::new(
            SyncPipeline::new(
                IntegrationKind::Granola,
                SourcePorts::from_adapter(source.clone()),
                store.clone(),
                settings.clone(),
                dyn_clock,
            )
            .with_batch_size(4)
            // 一時停止した時計の自動前進でタイムアウトさせない
            .with_fetch_timeout(std::time::Duration::from_secs(24 * 60 * 60)),
        );

        Self {
            pool,
            clock,
            store,
            settings_store,
            settings,
            source,
            pipeline,
        }
    }

    pub fn scheduler(&self) -> Arc<SyncScheduler> {
        let clock: Arc<dyn Clock> = self.clock.clone();
        SyncScheduler::new(
            self.pipeline.clone(),
            self.settings.clone(),
            self.store.clone(),
            clock,
        )
    }

    pub fn advance(&self, delta: Duration) {
        self.clock.advance(delta);
    }
}

/// Yields until `condition` holds. Never parks the runtime, so paused tokio
/// time does not auto-advance while SQLite work completes on its own thread.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
    while !condition() {
        assert!(
            std::time::Instant::now() < deadline,
            "condition not reached within 10s"
        );
        tokio::task::yield_now().await;
    }
}

pub fn default_settings() -> SyncSettings {
    SyncSettings {
        auto_sync_enabled: true,
        interval_minutes: 10,
        window: SyncWindowPreset::AllTime,
    }
}
