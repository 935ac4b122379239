use crate::application::ports::RemoteStore;
use crate::application::services::sync_pipeline::{SyncError, SyncPipeline};
use crate::application::services::sync_settings::SyncSettingsService;
use crate::domain::entities::{ReconcileSummary, SyncSettings};
use crate::domain::value_objects::{IntegrationKind, SyncWindowPreset};
use crate::shared::clock::Clock;
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Upper bound between due checks, so a short wait after a late start is not
/// stretched to a full interval.
const MAX_DUE_CHECK_PERIOD: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyRunning,
    NotDue,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    Completed(ReconcileSummary),
    Failed(SyncError),
    Skipped(SkipReason),
}

/// Releases the single-flight slot when the run task ends, panics included.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Decides when an integration syncs. One instance per integration.
pub struct SyncScheduler {
    integration: IntegrationKind,
    pipeline: Arc<SyncPipeline>,
    settings: Arc<SyncSettingsService>,
    store: Arc<dyn RemoteStore>,
    clock: Arc<dyn Clock>,
    in_flight: Arc<AtomicBool>,
    auto_sync_enabled: AtomicBool,
    interval_minutes: AtomicU32,
    last_sync_at: Mutex<Option<DateTime<Utc>>>,
    /// Accepted run start, successful or not. Not persisted.
    last_attempt_at: Mutex<Option<DateTime<Utc>>>,
    countdown: watch::Sender<u64>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl SyncScheduler {
    pub fn new(
        pipeline: Arc<SyncPipeline>,
        settings: Arc<SyncSettingsService>,
        store: Arc<dyn RemoteStore>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let defaults = settings.defaults();
        let (countdown, _) = watch::channel(0);
        Arc::new(Self {
            integration: pipeline.integration(),
            pipeline,
            settings,
            store,
            clock,
            in_flight: Arc::new(AtomicBool::new(false)),
            auto_sync_enabled: AtomicBool::new(defaults.auto_sync_enabled),
            interval_minutes: AtomicU32::new(defaults.interval_minutes),
            last_sync_at: Mutex::new(None),
            last_attempt_at: Mutex::new(None),
            countdown,
            timer: Mutex::new(None),
        })
    }

    pub fn integration(&self) -> IntegrationKind {
        self.integration
    }

    pub fn pipeline(&self) -> &Arc<SyncPipeline> {
        &self.pipeline
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn is_started(&self) -> bool {
        self.timer_slot()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn interval_minutes(&self) -> u32 {
        self.interval_minutes.load(Ordering::Acquire)
    }

    pub fn auto_sync_enabled(&self) -> bool {
        self.auto_sync_enabled.load(Ordering::Acquire)
    }

    pub fn last_sync_at(&self) -> Option<DateTime<Utc>> {
        *self.last_sync_slot()
    }

    pub fn subscribe_countdown(&self) -> watch::Receiver<u64> {
        self.countdown.subscribe()
    }

    pub fn last_attempt_at(&self) -> Option<DateTime<Utc>> {
        *lock_slot(&self.last_attempt_at)
    }

    /// Start of the current interval: the later of `lastSyncAt` and the last
    /// accepted run, so a failing source is retried once per interval.
    fn interval_anchor(&self) -> Option<DateTime<Utc>> {
        self.last_sync_at().max(self.last_attempt_at())
    }

    /// `max(0, interval - (now - anchor))`, or 0 when nothing has run yet.
    pub fn seconds_until_next_run(&self) -> u64 {
        let Some(last) = self.interval_anchor() else {
            return 0;
        };
        let interval_secs = i64::from(self.interval_minutes()) * 60;
        let elapsed = (self.clock.now() - last).num_seconds();
        (interval_secs - elapsed).max(0) as u64
    }

    fn is_due(&self) -> bool {
        match self.interval_anchor() {
            None => true,
            Some(last) => {
                let interval = chrono::Duration::minutes(i64::from(self.interval_minutes()));
                self.clock.now() - last >= interval
            }
        }
    }

    fn publish_countdown(&self) {
        self.countdown.send_replace(self.seconds_until_next_run());
    }

    /// Reloads `lastSyncAt` as the later of the local setting and the remote status.
    pub async fn refresh_last_sync_at(&self) {
        let local = self.settings.last_sync_at(self.integration).await;
        let remote = match self.store.get_status(self.integration).await {
            Ok(status) => status.and_then(|status| status.last_sync_at),
            Err(err) => {
                tracing::warn!(
                    target: "sync::scheduler",
                    integration = %self.integration,
                    error = %err,
                    "failed to read remote sync status"
                );
                None
            }
        };
        let latest = local.max(remote);
        {
            let mut slot = self.last_sync_slot();
            if latest > *slot {
                *slot = latest;
            }
        }
        self.publish_countdown();
    }

    /// Applies persisted settings and starts the timers when auto-sync is on.
    pub async fn resume(self: &Arc<Self>) -> SyncSettings {
        let settings = self.settings.load(self.integration).await;
        self.interval_minutes
            .store(settings.interval_minutes, Ordering::Release);
        self.auto_sync_enabled
            .store(settings.auto_sync_enabled, Ordering::Release);
        self.refresh_last_sync_at().await;

        if settings.auto_sync_enabled {
            self.start(settings.interval_minutes);
        }
        settings
    }

    pub fn start(self: &Arc<Self>, interval_minutes: u32) {
        let interval_minutes = SyncSettings::clamp_interval(interval_minutes);
        self.interval_minutes
            .store(interval_minutes, Ordering::Release);
        self.stop();

        let due_period = Duration::from_secs(u64::from(interval_minutes) * 60).min(MAX_DUE_CHECK_PERIOD);
        let scheduler = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut display = tokio::time::interval(Duration::from_secs(1));
            display.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut due_check = tokio::time::interval(due_period);
            due_check.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = display.tick() => scheduler.publish_countdown(),
                    _ = due_check.tick() => {
                        if scheduler.is_due() {
                            // 実行は別タスク。タイマーは止めない
                            let _ = scheduler.try_spawn_run("scheduled");
                        }
                    }
                }
            }
        });

        *self.timer_slot() = Some(handle);
        tracing::info!(
            target: "sync::scheduler",
            integration = %self.integration,
            interval_minutes,
            "auto-sync timers started"
        );
    }

    /// Stops the timers. An in-flight run is left alone.
    pub fn stop(&self) {
        if let Some(handle) = self.timer_slot().take() {
            handle.abort();
            tracing::info!(
                target: "sync::scheduler",
                integration = %self.integration,
                "auto-sync timers stopped"
            );
        }
    }

    /// Runs now regardless of the countdown, unless a run is already in flight.
    pub async fn trigger_manual(self: &Arc<Self>) -> TriggerOutcome {
        match self.try_spawn_run("manual") {
            Some(handle) => Self::await_run(handle).await,
            None => TriggerOutcome::Skipped(SkipReason::AlreadyRunning),
        }
    }

    /// One due check, awaiting the run it starts.
    pub async fn tick(self: &Arc<Self>) -> TriggerOutcome {
        if !self.auto_sync_enabled() {
            return TriggerOutcome::Skipped(SkipReason::Disabled);
        }
        if !self.is_due() {
            return TriggerOutcome::Skipped(SkipReason::NotDue);
        }
        match self.try_spawn_run("scheduled") {
            Some(handle) => Self::await_run(handle).await,
            None => TriggerOutcome::Skipped(SkipReason::AlreadyRunning),
        }
    }

    async fn await_run(
        handle: JoinHandle<Result<ReconcileSummary, SyncError>>,
    ) -> TriggerOutcome {
        match handle.await {
            Ok(Ok(summary)) => TriggerOutcome::Completed(summary),
            Ok(Err(err)) => TriggerOutcome::Failed(err),
            Err(join_err) => TriggerOutcome::Failed(SyncError::Fetch(format!(
                "sync task aborted: {join_err}"
            ))),
        }
    }

    fn try_spawn_run(
        self: &Arc<Self>,
        trigger: &'static str,
    ) -> Option<JoinHandle<Result<ReconcileSummary, SyncError>>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.pipeline.metrics().record_skipped();
            tracing::debug!(
                target: "sync::scheduler",
                integration = %self.integration,
                trigger,
                "sync already in flight, skipping"
            );
            return None;
        }

        let guard = InFlightGuard(Arc::clone(&self.in_flight));
        *lock_slot(&self.last_attempt_at) = Some(self.clock.now());
        let scheduler = Arc::clone(self);
        Some(tokio::spawn(async move {
            let _guard = guard;
            tracing::debug!(
                target: "sync::scheduler",
                integration = %scheduler.integration,
                trigger,
                "sync run accepted"
            );
            let result = scheduler.pipeline.run().await;
            scheduler.refresh_last_sync_at().await;
            result
        }))
    }

    pub async fn set_auto_sync_enabled(self: &Arc<Self>, enabled: bool) -> Result<(), AppError> {
        self.settings
            .set_auto_sync_enabled(self.integration, enabled)
            .await?;
        self.auto_sync_enabled.store(enabled, Ordering::Release);

        if enabled {
            self.refresh_last_sync_at().await;
            self.start(self.interval_minutes());
        } else {
            self.stop();
        }
        Ok(())
    }

    /// Persists the clamped interval and restarts the timers if they are running.
    pub async fn set_interval_minutes(self: &Arc<Self>, minutes: u32) -> Result<u32, AppError> {
        let stored = self
            .settings
            .set_interval_minutes(self.integration, minutes)
            .await?;
        self.interval_minutes.store(stored, Ordering::Release);

        if self.auto_sync_enabled() && self.is_started() {
            self.start(stored);
        } else {
            self.publish_countdown();
        }
        Ok(stored)
    }

    /// Takes effect on the next run.
    pub async fn set_sync_window(&self, window: SyncWindowPreset) -> Result<(), AppError> {
        self.settings.set_window(self.integration, window).await
    }

    fn timer_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        lock_slot(&self.timer)
    }

    fn last_sync_slot(&self) -> MutexGuard<'_, Option<DateTime<Utc>>> {
        lock_slot(&self.last_sync_at)
    }
}

fn lock_slot<T>(slot: &Mutex<T>) -> MutexGuard<'_, T> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
