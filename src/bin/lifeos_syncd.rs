use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lifeos_sync_lib::domain::value_objects::IntegrationKind;
use lifeos_sync_lib::presentation::dto::sync_dto::TriggerSyncResponse;
use lifeos_sync_lib::{AppConfig, AppState, init_logging};
use serde::Serialize;
use tracing::{info, warn};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct DaemonConfig {
    once: bool,
    only: Vec<IntegrationKind>,
    summary_path: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    integration: IntegrationKind,
    outcome: TriggerSyncResponse,
}

#[derive(Debug, Serialize)]
struct OnceSummary {
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    runs: Vec<RunSummary>,
}

fn parse_flag(raw: Option<String>) -> bool {
    matches!(
        raw.as_deref().map(|value| value.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

fn parse_integrations(raw: Option<String>) -> Vec<IntegrationKind> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .filter_map(|value| match value.parse::<IntegrationKind>() {
            Ok(kind) => Some(kind),
            Err(err) => {
                warn!(value, error = %err, "ignoring unknown integration");
                None
            }
        })
        .collect()
}

fn build_config() -> DaemonConfig {
    DaemonConfig {
        once: parse_flag(std::env::var("LIFEOS_SYNC_ONCE").ok()),
        only: parse_integrations(std::env::var("LIFEOS_SYNC_ONLY").ok()),
        summary_path: std::env::var("LIFEOS_SYNC_SUMMARY_PATH")
            .ok()
            .map(|path| path.trim().to_string())
            .filter(|path| !path.is_empty())
            .map(PathBuf::from),
    }
}

fn write_summary(path: &PathBuf, summary: &OnceSummary) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, serde_json::to_vec_pretty(summary)?)?;
    Ok(())
}

async fn run_once(state: &AppState, cfg: &DaemonConfig) -> anyhow::Result<()> {
    let started_at = Utc::now();
    let service = &state.sync_service;
    // 1回実行ではタイマーを起動しない
    service.reset_stale_flags().await?;

    let targets: Vec<IntegrationKind> = service
        .integrations()
        .into_iter()
        .filter(|kind| cfg.only.is_empty() || cfg.only.contains(kind))
        .collect();

    let mut runs = Vec::with_capacity(targets.len());
    for integration in targets {
        let outcome = service.trigger_manual(integration).await?;
        info!(integration = %integration, outcome = ?outcome, "one-shot sync finished");
        runs.push(RunSummary {
            integration,
            outcome: outcome.into(),
        });
    }

    let summary = OnceSummary {
        started_at,
        finished_at: Utc::now(),
        runs,
    };
    match &cfg.summary_path {
        Some(path) => write_summary(path, &summary)?,
        None => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cfg = build_config();
    let app_config = AppConfig::from_env();

    info!(
        data_dir = %app_config.storage.data_dir.display(),
        once = cfg.once,
        "lifeos-syncd starting"
    );

    let state = AppState::new(app_config, None).await?;

    if cfg.once {
        run_once(&state, &cfg).await?;
        state.db_pool.close().await;
        return Ok(());
    }

    state.sync_service.initialize().await?;
    info!(integrations = ?state.sync_service.integrations(), "schedulers running");

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    state.sync_service.shutdown();
    // 実行中の同期がisSyncingを戻すまで待つ
    if !state.sync_service.wait_for_idle(SHUTDOWN_GRACE).await {
        warn!("closing database with sync runs still in flight");
    }
    state.db_pool.close().await;
    Ok(())
}
