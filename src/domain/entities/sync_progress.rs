use super::ReconcileSummary;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure category carried by [`SyncProgress::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncErrorKind {
    Availability,
    Auth,
    Fetch,
    Reconcile,
    Store,
}

impl SyncErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncErrorKind::Availability => "availability",
            SyncErrorKind::Auth => "auth",
            SyncErrorKind::Fetch => "fetch",
            SyncErrorKind::Reconcile => "reconcile",
            SyncErrorKind::Store => "store",
        }
    }
}

impl fmt::Display for SyncErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transient state of the current (or last) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncProgress {
    #[default]
    Idle,
    Checking {
        step: String,
    },
    Syncing {
        step: String,
    },
    Complete {
        step: String,
        summary: ReconcileSummary,
    },
    Error {
        step: String,
        kind: SyncErrorKind,
        message: String,
    },
}

impl SyncProgress {
    pub fn checking(step: impl Into<String>) -> Self {
        SyncProgress::Checking { step: step.into() }
    }

    pub fn syncing(step: impl Into<String>) -> Self {
        SyncProgress::Syncing { step: step.into() }
    }

    pub fn complete(summary: ReconcileSummary) -> Self {
        SyncProgress::Complete {
            step: format!("Sync complete: {}", summary.describe()),
            summary,
        }
    }

    pub fn error(kind: SyncErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        SyncProgress::Error {
            step: format!("Sync failed ({kind})"),
            kind,
            message,
        }
    }

    pub fn step(&self) -> Option<&str> {
        match self {
            SyncProgress::Idle => None,
            SyncProgress::Checking { step }
            | SyncProgress::Syncing { step }
            | SyncProgress::Complete { step, .. }
            | SyncProgress::Error { step, .. } => Some(step),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, SyncProgress::Checking { .. } | SyncProgress::Syncing { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncProgress::Complete { .. } | SyncProgress::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_as_tagged_union() {
        let progress = SyncProgress::error(SyncErrorKind::Auth, "token expired");
        let value = serde_json::to_value(&progress).unwrap();
        assert_eq!(value["status"], json!("error"));
        assert_eq!(value["kind"], json!("auth"));
        assert_eq!(value["message"], json!("token expired"));

        let idle = serde_json::to_value(SyncProgress::Idle).unwrap();
        assert_eq!(idle, json!({"status": "idle"}));
    }

    #[test]
    fn complete_step_carries_counts() {
        let progress = SyncProgress::complete(ReconcileSummary {
            inserted_count: 10,
            updated_count: 2,
            unchanged_count: 0,
        });
        assert_eq!(progress.step(), Some("Sync complete: 10 new, 2 updated, 0 unchanged"));
        assert!(progress.is_terminal());
        assert!(!progress.is_running());
    }
}
