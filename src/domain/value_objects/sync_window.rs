use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named lower bounds for incremental fetches.
///
/// Resolution is a pure function of `now`. Calendar-anchored presets ignore
/// `now` entirely, so their boundary never drifts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncWindowPreset {
    #[serde(rename = "since_2025")]
    Since2025,
    #[serde(rename = "last_7_days")]
    Last7Days,
    #[serde(rename = "last_30_days")]
    Last30Days,
    #[serde(rename = "last_90_days")]
    Last90Days,
    AllTime,
}

impl SyncWindowPreset {
    pub const ALL: [SyncWindowPreset; 5] = [
        SyncWindowPreset::Since2025,
        SyncWindowPreset::Last7Days,
        SyncWindowPreset::Last30Days,
        SyncWindowPreset::Last90Days,
        SyncWindowPreset::AllTime,
    ];

    /// Applied when nothing (or garbage) has been persisted.
    pub const DEFAULT: SyncWindowPreset = SyncWindowPreset::Last30Days;

    pub fn key(&self) -> &'static str {
        match self {
            SyncWindowPreset::Since2025 => "since_2025",
            SyncWindowPreset::Last7Days => "last_7_days",
            SyncWindowPreset::Last30Days => "last_30_days",
            SyncWindowPreset::Last90Days => "last_90_days",
            SyncWindowPreset::AllTime => "all_time",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SyncWindowPreset::Since2025 => "Since 2025",
            SyncWindowPreset::Last7Days => "Last 7 days",
            SyncWindowPreset::Last30Days => "Last 30 days",
            SyncWindowPreset::Last90Days => "Last 90 days",
            SyncWindowPreset::AllTime => "All time",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let normalized = key.trim();
        Self::ALL
            .into_iter()
            .find(|preset| preset.key() == normalized)
    }

    /// Like [`from_key`](Self::from_key) but never fails.
    pub fn from_key_or_default(key: Option<&str>) -> Self {
        key.and_then(Self::from_key).unwrap_or(Self::DEFAULT)
    }

    pub fn resolve(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            SyncWindowPreset::Since2025 => Utc
                .with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
                .single()
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            SyncWindowPreset::Last7Days => now - Duration::days(7),
            SyncWindowPreset::Last30Days => now - Duration::days(30),
            SyncWindowPreset::Last90Days => now - Duration::days(90),
            SyncWindowPreset::AllTime => DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl Default for SyncWindowPreset {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for SyncWindowPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Resolve a persisted preset key. Unknown keys resolve through the default preset.
pub fn resolve(preset_key: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    SyncWindowPreset::from_key_or_default(Some(preset_key)).resolve(now)
}

/// `{key, label}` pair for preset pickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncWindowOption {
    pub key: &'static str,
    pub label: &'static str,
}

pub fn window_options() -> Vec<SyncWindowOption> {
    SyncWindowPreset::ALL
        .into_iter()
        .map(|preset| SyncWindowOption {
            key: preset.key(),
            label: preset.label(),
        })
        .collect()
}
