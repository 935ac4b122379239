use super::parse_timestamp;
use super::process::CommandRunner;
use crate::application::ports::{AvailabilityProbe, CredentialProvider, RecordSource};
use crate::domain::entities::{AuthTokenStatus, ExternalRecord};
use crate::domain::value_objects::ExternalId;
use crate::shared::config::BeeperConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row of `bun query.ts threads`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeeperThread {
    #[serde(default)]
    pub thread_id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub thread_type: String,
    pub participant_count: i64,
    pub message_count: i64,
    pub last_message_at: String,
}

impl BeeperThread {
    fn into_record(self) -> Option<ExternalRecord> {
        let last_message_at = parse_timestamp(&self.last_message_at)?;
        let key = self
            .thread_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| self.name.clone());
        let external_id = ExternalId::new(key).ok()?;
        let name = self.name.clone();
        let payload = serde_json::to_value(&self).ok()?;
        Some(ExternalRecord::new(
            external_id,
            name,
            payload,
            last_message_at,
            None,
        ))
    }
}

/// Threads with activity at or after `since`.
pub fn parse_threads(stdout: &str, since: DateTime<Utc>) -> Result<Vec<ExternalRecord>, AppError> {
    let threads: Vec<BeeperThread> = serde_json::from_str(stdout.trim())
        .map_err(|err| AppError::ExternalSource(format!("Failed to parse threads JSON: {err}")))?;

    let mut records = Vec::with_capacity(threads.len());
    for thread in threads {
        let name = thread.name.clone();
        match thread.into_record() {
            Some(record) if record.last_modified() >= since => records.push(record),
            Some(_) => {}
            None => {
                tracing::debug!(
                    target: "sync::source::beeper",
                    thread = %name,
                    "skipping thread with unusable id or timestamp"
                );
            }
        }
    }
    Ok(records)
}

/// Message threads exported by the local beeperdb package.
pub struct BeeperSource {
    config: BeeperConfig,
    runner: CommandRunner,
}

impl BeeperSource {
    pub fn new(config: BeeperConfig, runner: CommandRunner) -> Self {
        Self { config, runner }
    }
}

#[async_trait]
impl AvailabilityProbe for BeeperSource {
    async fn is_available(&self) -> bool {
        tokio::fs::metadata(&self.config.app_support_dir).await.is_ok()
            && tokio::fs::metadata(&self.config.package_dir).await.is_ok()
    }

    fn unavailable_message(&self) -> String {
        format!(
            "Beeper not found (expected {} and {})",
            self.config.app_support_dir.display(),
            self.config.package_dir.display()
        )
    }
}

#[async_trait]
impl CredentialProvider for BeeperSource {
    async fn token_status(&self) -> Result<AuthTokenStatus, AppError> {
        Ok(AuthTokenStatus::missing())
    }

    async fn reauthenticate(&self) -> Result<(), AppError> {
        Err(AppError::InvalidInput(
            "Beeper does not use sign-in credentials".to_string(),
        ))
    }
}

#[async_trait]
impl RecordSource for BeeperSource {
    async fn fetch_since(&self, since: DateTime<Utc>) -> Result<Vec<ExternalRecord>, AppError> {
        let cwd = self.config.package_dir.as_path();

        // DBの複製 -> clean.duckdb の再構築 -> スレッド一覧
        self.runner.run("pnpm", &["sync"], cwd).await?;
        self.runner.run("pnpm", &["clean"], cwd).await?;
        let stdout = self.runner.run("bun", &["query.ts", "threads"], cwd).await?;

        let records = parse_threads(&stdout, since)?;
        tracing::debug!(
            target: "sync::source::beeper",
            selected = records.len(),
            since = %since,
            "beeper threads read"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use std::path::PathBuf;
    use std::time::Duration;

    fn since() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn threads_are_filtered_by_last_message() {
        let stdout = json!([
            {"thread_id": "!abc:beeper.com", "name": "Family", "type": "group",
             "participant_count": 4, "message_count": 120, "last_message_at": "2026-01-03 18:22:01"},
            {"name": "Old friend", "type": "dm",
             "participant_count": 2, "message_count": 3, "last_message_at": "2025-06-01T08:00:00Z"},
            {"name": "Alice", "type": "dm",
             "participant_count": 2, "message_count": 9, "last_message_at": "2026-02-10T08:00:00Z"},
            {"name": "Broken", "type": "dm",
             "participant_count": 2, "message_count": 1, "last_message_at": "sometime"}
        ])
        .to_string();

        let records = parse_threads(&stdout, since()).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.external_id.as_str()).collect();
        assert_eq!(ids, vec!["!abc:beeper.com", "Alice"]);
        assert_eq!(records[0].payload["type"], json!("group"));
        assert_eq!(
            records[0].source_created_at,
            Utc.with_ymd_and_hms(2026, 1, 3, 18, 22, 1).unwrap()
        );
    }

    #[test]
    fn invalid_json_is_a_source_error() {
        let err = parse_threads("error: database locked", since()).unwrap_err();
        assert_eq!(err.code(), "EXTERNAL_SOURCE_ERROR");
    }

    #[tokio::test]
    async fn never_reports_credentials() {
        let source = BeeperSource::new(
            BeeperConfig {
                enabled: true,
                app_support_dir: PathBuf::from("/nonexistent/BeeperTexts"),
                package_dir: PathBuf::from("/nonexistent/beeperdb"),
            },
            CommandRunner::new(Duration::from_secs(1)),
        );

        let status = source.token_status().await.unwrap();
        assert!(!status.has_token());
        assert!(!status.is_valid());
        assert!(source.reauthenticate().await.is_err());
        assert!(!source.is_available().await);
    }
}
