use crate::application::ports::{
    AvailabilityProbe, CredentialProvider, RecordSource, RemoteStore, SyncEventEmitter,
};
use crate::application::services::auth_health::{AuthGate, AuthHealthMonitor};
use crate::application::services::reconciler::Reconciler;
use crate::application::services::sync_settings::SyncSettingsService;
use crate::domain::entities::{
    ReconcileSummary, SyncErrorKind, SyncProgress, SyncStatus, SyncStatusUpdate,
};
use crate::domain::value_objects::IntegrationKind;
use crate::shared::clock::Clock;
use crate::shared::metrics::SyncRunMetrics;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("{0}")]
    Availability(String),
    #[error("Authentication required: {0}")]
    Auth(String),
    #[error("Fetch failed: {0}")]
    Fetch(String),
    #[error("Reconcile failed after {applied} records: {message}")]
    Reconcile { message: String, applied: u64 },
    #[error("Status update failed: {0}")]
    Store(String),
}

impl SyncError {
    pub fn kind(&self) -> SyncErrorKind {
        match self {
            SyncError::Availability(_) => SyncErrorKind::Availability,
            SyncError::Auth(_) => SyncErrorKind::Auth,
            SyncError::Fetch(_) => SyncErrorKind::Fetch,
            SyncError::Reconcile { .. } => SyncErrorKind::Reconcile,
            SyncError::Store(_) => SyncErrorKind::Store,
        }
    }
}

/// Source-side collaborators of one integration.
#[derive(Clone)]
pub struct SourcePorts {
    pub probe: Arc<dyn AvailabilityProbe>,
    pub credentials: Arc<dyn CredentialProvider>,
    pub records: Arc<dyn RecordSource>,
}

impl SourcePorts {
    /// All three ports served by one adapter.
    pub fn from_adapter<T>(adapter: Arc<T>) -> Self
    where
        T: AvailabilityProbe + CredentialProvider + RecordSource + 'static,
    {
        Self {
            probe: adapter.clone(),
            credentials: adapter.clone(),
            records: adapter,
        }
    }
}

/// One end-to-end run: probe, auth check, fetch, reconcile, status report.
///
/// The pipeline has no concurrency control of its own; the scheduler owns the
/// single-flight guard.
pub struct SyncPipeline {
    integration: IntegrationKind,
    probe: Arc<dyn AvailabilityProbe>,
    records: Arc<dyn RecordSource>,
    auth: Arc<AuthHealthMonitor>,
    reconciler: Reconciler,
    store: Arc<dyn RemoteStore>,
    settings: Arc<SyncSettingsService>,
    clock: Arc<dyn Clock>,
    emitter: Option<Arc<dyn SyncEventEmitter>>,
    progress: watch::Sender<SyncProgress>,
    metrics: SyncRunMetrics,
    fetch_timeout: Duration,
}

impl SyncPipeline {
    pub fn new(
        integration: IntegrationKind,
        ports: SourcePorts,
        store: Arc<dyn RemoteStore>,
        settings: Arc<SyncSettingsService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (progress, _) = watch::channel(SyncProgress::Idle);
        Self {
            integration,
            probe: ports.probe,
            records: ports.records,
            auth: Arc::new(AuthHealthMonitor::new(integration, ports.credentials)),
            reconciler: Reconciler::new(store.clone(), DEFAULT_BATCH_SIZE),
            store,
            settings,
            clock,
            emitter: None,
            progress,
            metrics: SyncRunMetrics::new(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_emitter(mut self, emitter: Option<Arc<dyn SyncEventEmitter>>) -> Self {
        self.emitter = emitter;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.reconciler = Reconciler::new(self.store.clone(), batch_size);
        self
    }

    pub fn integration(&self) -> IntegrationKind {
        self.integration
    }

    pub fn auth(&self) -> &Arc<AuthHealthMonitor> {
        &self.auth
    }

    pub fn metrics(&self) -> &SyncRunMetrics {
        &self.metrics
    }

    pub fn progress(&self) -> SyncProgress {
        self.progress.borrow().clone()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<SyncProgress> {
        self.progress.subscribe()
    }

    /// Returns a finished run's progress to `Idle` once the UI has shown it.
    /// A run in progress is left untouched.
    pub fn dismiss_result(&self) -> SyncProgress {
        let dismissed = self.progress.send_if_modified(|progress| {
            if progress.is_terminal() {
                *progress = SyncProgress::Idle;
                true
            } else {
                false
            }
        });
        if dismissed {
            self.emit_progress(&SyncProgress::Idle);
        }
        self.progress()
    }

    pub async fn is_available(&self) -> bool {
        self.probe.is_available().await
    }

    pub async fn run(&self) -> Result<ReconcileSummary, SyncError> {
        tracing::info!(target: "sync::pipeline", integration = %self.integration, "sync run started");
        let result = self.execute().await;

        match &result {
            Ok(summary) => {
                self.metrics.record_success();
                tracing::info!(
                    target: "sync::pipeline",
                    integration = %self.integration,
                    inserted = summary.inserted_count,
                    updated = summary.updated_count,
                    unchanged = summary.unchanged_count,
                    "sync run completed"
                );
                self.publish(SyncProgress::complete(*summary));
            }
            Err(err) => {
                self.metrics.record_failure();
                tracing::warn!(
                    target: "sync::pipeline",
                    integration = %self.integration,
                    kind = %err.kind(),
                    error = %err,
                    "sync run failed"
                );
                self.publish(SyncProgress::error(err.kind(), err.to_string()));
            }
        }
        result
    }

    async fn execute(&self) -> Result<ReconcileSummary, SyncError> {
        let name = self.integration.display_name();
        self.publish(SyncProgress::checking(format!("Checking {name} availability")));

        if !self.probe.is_available().await {
            let err = SyncError::Availability(self.probe.unavailable_message());
            self.record_unavailable(&err).await;
            return Err(err);
        }

        let status = self
            .store
            .update_status(self.integration, SyncStatusUpdate::started())
            .await
            .map_err(|err| SyncError::Store(err.to_string()))?;
        self.emit_status(&status);

        // ここから先はどの経路でもis_syncingを戻す
        let outcome = self.run_started().await;
        self.finish(outcome).await
    }

    async fn run_started(&self) -> Result<ReconcileSummary, SyncError> {
        let name = self.integration.display_name();
        self.publish(SyncProgress::checking(format!("Checking {name} credentials")));
        if let AuthGate::Blocked(reason) = self.auth.gate().await {
            return Err(SyncError::Auth(reason));
        }

        let settings = self.settings.load(self.integration).await;
        let since = settings.window.resolve(self.clock.now());
        self.publish(SyncProgress::syncing(format!(
            "Fetching {name} records ({})",
            settings.window.label()
        )));

        let fetched = match tokio::time::timeout(self.fetch_timeout, self.records.fetch_since(since))
            .await
        {
            Ok(Ok(records)) => records,
            Ok(Err(err)) => {
                let detail = err.detail();
                if self.auth.observe_failure(&detail) {
                    return Err(SyncError::Auth(detail));
                }
                return Err(SyncError::Fetch(detail));
            }
            Err(_) => {
                return Err(SyncError::Fetch(format!(
                    "timed out after {}s",
                    self.fetch_timeout.as_secs()
                )));
            }
        };

        tracing::debug!(
            target: "sync::pipeline",
            integration = %self.integration,
            since = %since,
            fetched = fetched.len(),
            "records fetched"
        );
        self.publish(SyncProgress::syncing(format!(
            "Saving {} {name} records",
            fetched.len()
        )));

        self.reconciler
            .merge(self.integration, fetched)
            .await
            .map_err(|failure| SyncError::Reconcile {
                message: failure.error.to_string(),
                applied: failure.applied,
            })
    }

    async fn finish(
        &self,
        outcome: Result<ReconcileSummary, SyncError>,
    ) -> Result<ReconcileSummary, SyncError> {
        match outcome {
            Ok(summary) => {
                let now = self.clock.now();
                match self
                    .store
                    .update_status(self.integration, SyncStatusUpdate::succeeded(now, summary.total()))
                    .await
                {
                    Ok(status) => self.emit_status(&status),
                    Err(err) => {
                        let err = SyncError::Store(err.to_string());
                        self.persist_failure(&err).await;
                        return Err(err);
                    }
                }
                if let Err(err) = self.settings.record_last_sync_at(self.integration, now).await {
                    tracing::warn!(
                        target: "sync::pipeline",
                        integration = %self.integration,
                        error = %err,
                        "failed to record local lastSyncAt"
                    );
                }
                Ok(summary)
            }
            Err(err) => {
                self.persist_failure(&err).await;
                Err(err)
            }
        }
    }

    async fn persist_failure(&self, err: &SyncError) {
        match self
            .store
            .update_status(self.integration, SyncStatusUpdate::failed(err.to_string()))
            .await
        {
            Ok(status) => self.emit_status(&status),
            Err(store_err) => {
                tracing::error!(
                    target: "sync::pipeline",
                    integration = %self.integration,
                    error = %store_err,
                    "failed to persist sync failure"
                );
            }
        }
    }

    /// The status row is only written once it exists.
    async fn record_unavailable(&self, err: &SyncError) {
        match self.store.get_status(self.integration).await {
            Ok(Some(_)) => self.persist_failure(err).await,
            Ok(None) => {}
            Err(store_err) => {
                tracing::warn!(
                    target: "sync::pipeline",
                    integration = %self.integration,
                    error = %store_err,
                    "failed to read sync status"
                );
            }
        }
    }

    fn publish(&self, progress: SyncProgress) {
        self.emit_progress(&progress);
        self.progress.send_replace(progress);
    }

    fn emit_progress(&self, progress: &SyncProgress) {
        if let Some(emitter) = &self.emitter {
            if let Err(err) = emitter.emit_progress(self.integration, progress) {
                tracing::warn!(
                    target: "sync::pipeline",
                    error = %err,
                    "failed to emit sync progress"
                );
            }
        }
    }

    fn emit_status(&self, status: &SyncStatus) {
        if let Some(emitter) = &self.emitter {
            if let Err(err) = emitter.emit_status(status) {
                tracing::warn!(
                    target: "sync::pipeline",
                    error = %err,
                    "failed to emit sync status"
                );
            }
        }
    }
}
