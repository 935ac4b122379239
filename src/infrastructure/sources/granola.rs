use super::process::CommandRunner;
use super::parse_timestamp;
use crate::application::ports::{AvailabilityProbe, CredentialProvider, RecordSource};
use crate::domain::entities::{AuthTokenStatus, ExternalRecord};
use crate::domain::value_objects::ExternalId;
use crate::shared::clock::Clock;
use crate::shared::config::GranolaConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GranolaUtterance {
    pub source: String,
    pub text: String,
    #[serde(default)]
    pub start_timestamp: Option<String>,
    #[serde(default)]
    pub end_timestamp: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GranolaFolder {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct MeetingMetadata {
    document_id: String,
    title: String,
    created_at: String,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    workspace_id: Option<String>,
    #[serde(default)]
    workspace_name: Option<String>,
    #[serde(default)]
    folders: Option<Vec<GranolaFolder>>,
}

#[derive(Debug, Deserialize)]
struct Workspace {
    id: String,
    name: String,
}

/// One exported meeting directory, flattened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GranolaMeeting {
    pub id: String,
    pub title: String,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub workspace_id: Option<String>,
    pub workspace_name: Option<String>,
    pub folders: Option<Vec<GranolaFolder>>,
    pub resume_markdown: Option<String>,
    pub transcript: Option<Vec<GranolaUtterance>>,
    pub transcript_markdown: Option<String>,
}

impl GranolaMeeting {
    fn into_record(self) -> Option<ExternalRecord> {
        let created_at = parse_timestamp(&self.created_at)?;
        let updated_at = self.updated_at.as_deref().and_then(parse_timestamp);
        let external_id = ExternalId::new(self.id.clone()).ok()?;
        let title = self.title.clone();
        let payload = serde_json::to_value(&self).ok()?;
        Some(ExternalRecord::new(
            external_id,
            title,
            payload,
            created_at,
            updated_at,
        ))
    }
}

/// Reads every meeting under the CLI's output directory.
///
/// Hidden directories, directories without `metadata.json` and unreadable
/// files are skipped. Newest first.
pub fn read_meetings(output_dir: &Path) -> Result<Vec<GranolaMeeting>, AppError> {
    if !output_dir.exists() {
        return Ok(Vec::new());
    }

    let workspaces: HashMap<String, String> = fs::read_to_string(output_dir.join("workspaces.json"))
        .ok()
        .and_then(|content| serde_json::from_str::<Vec<Workspace>>(&content).ok())
        .map(|list| list.into_iter().map(|ws| (ws.id, ws.name)).collect())
        .unwrap_or_default();

    let mut meetings = Vec::new();
    for entry in fs::read_dir(output_dir)?.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let hidden = path
            .file_name()
            .map(|name| name.to_string_lossy().starts_with('.'))
            .unwrap_or(true);
        if hidden {
            continue;
        }

        let metadata: MeetingMetadata = match fs::read_to_string(path.join("metadata.json"))
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
        {
            Some(metadata) => metadata,
            None => {
                tracing::debug!(
                    target: "sync::source::granola",
                    dir = %path.display(),
                    "skipping directory without readable metadata"
                );
                continue;
            }
        };

        let workspace_name = metadata.workspace_name.or_else(|| {
            metadata
                .workspace_id
                .as_ref()
                .and_then(|id| workspaces.get(id).cloned())
        });

        meetings.push(GranolaMeeting {
            id: metadata.document_id,
            title: metadata.title,
            created_at: metadata.created_at,
            updated_at: metadata.updated_at,
            workspace_id: metadata.workspace_id,
            workspace_name,
            folders: metadata.folders,
            resume_markdown: fs::read_to_string(path.join("resume.md")).ok(),
            transcript: fs::read_to_string(path.join("transcript.json"))
                .ok()
                .and_then(|content| serde_json::from_str(&content).ok()),
            transcript_markdown: fs::read_to_string(path.join("transcript.md")).ok(),
        });
    }

    meetings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(meetings)
}

/// Extracts the WorkOS token from the CLI's config.json.
///
/// `workos_tokens` is either an object or a JSON-encoded string of one.
pub fn token_status_from_config(config: &Value, now: DateTime<Utc>) -> AuthTokenStatus {
    let tokens = match config.get("workos_tokens") {
        Some(Value::String(raw)) => serde_json::from_str::<Value>(raw).ok(),
        Some(value @ Value::Object(_)) => Some(value.clone()),
        _ => None,
    };
    let Some(tokens) = tokens else {
        return AuthTokenStatus::missing();
    };

    let has_access_token = tokens
        .get("access_token")
        .and_then(Value::as_str)
        .is_some_and(|token| !token.trim().is_empty());
    if !has_access_token {
        return AuthTokenStatus::missing();
    }

    let expires_in = tokens.get("expires_in").and_then(Value::as_i64);
    let obtained_at = tokens
        .get("obtained_at")
        .and_then(Value::as_i64)
        .and_then(DateTime::<Utc>::from_timestamp_millis);
    let expires_at = match (obtained_at, expires_in) {
        (Some(obtained), Some(seconds)) => Some(obtained + Duration::seconds(seconds)),
        _ => None,
    };

    AuthTokenStatus::from_expiry(expires_at, now)
}

/// Meeting notes pulled through the Granola CLI.
pub struct GranolaSource {
    config: GranolaConfig,
    runner: CommandRunner,
    clock: Arc<dyn Clock>,
}

impl GranolaSource {
    pub fn new(config: GranolaConfig, runner: CommandRunner, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            runner,
            clock,
        }
    }

    fn working_dir(&self) -> PathBuf {
        self.config
            .cli_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[async_trait]
impl AvailabilityProbe for GranolaSource {
    async fn is_available(&self) -> bool {
        path_exists(&self.config.cli_path).await && path_exists(&self.config.config_path).await
    }

    fn unavailable_message(&self) -> String {
        "Granola CLI not found or config.json missing".to_string()
    }
}

#[async_trait]
impl CredentialProvider for GranolaSource {
    async fn token_status(&self) -> Result<AuthTokenStatus, AppError> {
        let content = match tokio::fs::read_to_string(&self.config.config_path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(AuthTokenStatus::missing());
            }
            Err(err) => return Err(err.into()),
        };
        let config: Value = serde_json::from_str(&content)?;
        Ok(token_status_from_config(&config, self.clock.now()))
    }

    async fn reauthenticate(&self) -> Result<(), AppError> {
        if !path_exists(&self.config.cli_path).await {
            return Err(AppError::NotFound("Granola CLI not found".to_string()));
        }
        tracing::info!(target: "sync::source::granola", "starting granola auth");
        self.runner
            .run(&self.config.cli_path, &["auth"], &self.working_dir())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RecordSource for GranolaSource {
    async fn fetch_since(&self, since: DateTime<Utc>) -> Result<Vec<ExternalRecord>, AppError> {
        let output_dir = self.config.output_dir.to_string_lossy().into_owned();
        self.runner
            .run(
                &self.config.cli_path,
                &["sync", "-o", output_dir.as_str()],
                &self.working_dir(),
            )
            .await?;

        let dir = self.config.output_dir.clone();
        let meetings = tokio::task::spawn_blocking(move || read_meetings(&dir))
            .await
            .map_err(|err| AppError::Internal(format!("meeting reader panicked: {err}")))??;

        let total = meetings.len();
        let records: Vec<ExternalRecord> = meetings
            .into_iter()
            .filter_map(GranolaMeeting::into_record)
            .filter(|record| record.last_modified() >= since)
            .collect();

        tracing::debug!(
            target: "sync::source::granola",
            total,
            selected = records.len(),
            since = %since,
            "granola meetings read"
        );
        Ok(records)
    }
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_meeting(root: &Path, dir: &str, metadata: Value) {
        let meeting_dir = root.join(dir);
        fs::create_dir_all(&meeting_dir).unwrap();
        fs::write(meeting_dir.join("metadata.json"), metadata.to_string()).unwrap();
    }

    #[test]
    fn reads_meetings_and_resolves_workspace_names() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(
            root.join("workspaces.json"),
            json!([{"id": "ws-1", "name": "Acme"}]).to_string(),
        )
        .unwrap();
        write_meeting(
            root,
            "standup",
            json!({
                "document_id": "doc-1",
                "title": "Standup",
                "created_at": "2026-01-05T09:00:00Z",
                "workspace_id": "ws-1"
            }),
        );
        fs::write(root.join("standup").join("resume.md"), "# Notes").unwrap();
        fs::write(
            root.join("standup").join("transcript.json"),
            json!([{"source": "microphone", "text": "hello"}]).to_string(),
        )
        .unwrap();
        write_meeting(
            root,
            ".cache",
            json!({"document_id": "hidden", "title": "x", "created_at": "2026-01-01T00:00:00Z"}),
        );
        fs::create_dir_all(root.join("broken")).unwrap();
        fs::write(root.join("broken").join("metadata.json"), "{not json").unwrap();

        let meetings = read_meetings(root).unwrap();
        assert_eq!(meetings.len(), 1);
        let meeting = &meetings[0];
        assert_eq!(meeting.workspace_name.as_deref(), Some("Acme"));
        assert_eq!(meeting.resume_markdown.as_deref(), Some("# Notes"));
        assert_eq!(meeting.transcript.as_ref().map(Vec::len), Some(1));
        assert!(meeting.transcript_markdown.is_none());
    }

    #[test]
    fn missing_output_dir_yields_nothing() {
        let temp = TempDir::new().unwrap();
        assert!(read_meetings(&temp.path().join("output")).unwrap().is_empty());
    }

    #[test]
    fn meeting_becomes_record_keyed_by_document_id() {
        let meeting = GranolaMeeting {
            id: "doc-9".to_string(),
            title: "Design review".to_string(),
            created_at: "2026-02-01T10:00:00Z".to_string(),
            updated_at: Some("2026-02-02T10:00:00+00:00".to_string()),
            workspace_id: None,
            workspace_name: None,
            folders: None,
            resume_markdown: None,
            transcript: None,
            transcript_markdown: None,
        };
        let record = meeting.into_record().unwrap();
        assert_eq!(record.external_id.as_str(), "doc-9");
        assert_eq!(record.display_name, "Design review");
        assert_eq!(
            record.last_modified(),
            Utc.with_ymd_and_hms(2026, 2, 2, 10, 0, 0).unwrap()
        );
        assert_eq!(record.payload["title"], json!("Design review"));
    }

    #[test]
    fn token_status_accepts_object_and_string_forms() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let obtained = (now - Duration::minutes(30)).timestamp_millis();
        let tokens = json!({"access_token": "abc", "expires_in": 3600, "obtained_at": obtained});

        let from_object = token_status_from_config(&json!({"workos_tokens": tokens}), now);
        assert!(from_object.is_valid());
        assert_eq!(from_object.minutes_remaining(), Some(30));

        let from_string =
            token_status_from_config(&json!({"workos_tokens": tokens.to_string()}), now);
        assert_eq!(from_string, from_object);
    }

    #[test]
    fn token_status_without_tokens_is_missing() {
        let now = Utc::now();
        assert!(!token_status_from_config(&json!({}), now).has_token());
        assert!(
            !token_status_from_config(&json!({"workos_tokens": {"access_token": ""}}), now)
                .has_token()
        );
    }

    #[test]
    fn expired_token_is_reported() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let obtained = (now - Duration::hours(2)).timestamp_millis();
        let config = json!({"workos_tokens": {"access_token": "abc", "expires_in": 3600, "obtained_at": obtained}});

        let status = token_status_from_config(&config, now);
        assert!(status.is_expired());
        assert_eq!(status.minutes_remaining(), Some(0));
    }

    #[tokio::test]
    async fn availability_requires_cli_and_config() {
        let temp = TempDir::new().unwrap();
        let config = GranolaConfig {
            enabled: true,
            cli_path: temp.path().join("granola"),
            config_path: temp.path().join("config.json"),
            output_dir: temp.path().join("output"),
        };
        let source = GranolaSource::new(
            config.clone(),
            CommandRunner::new(std::time::Duration::from_secs(5)),
            Arc::new(crate::shared::clock::SystemClock),
        );
        assert!(!source.is_available().await);
        assert!(!source.token_status().await.unwrap().has_token());

        fs::write(&config.cli_path, "#!/bin/sh\n").unwrap();
        fs::write(&config.config_path, "{}").unwrap();
        assert!(source.is_available().await);
    }
}
