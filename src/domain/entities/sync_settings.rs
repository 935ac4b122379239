use crate::domain::value_objects::SyncWindowPreset;
use serde::{Deserialize, Serialize};

pub const MIN_INTERVAL_MINUTES: u32 = 1;
pub const MAX_INTERVAL_MINUTES: u32 = 24 * 60;

/// Persisted per-integration scheduling preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSettings {
    pub auto_sync_enabled: bool,
    pub interval_minutes: u32,
    pub window: SyncWindowPreset,
}

impl SyncSettings {
    pub fn clamp_interval(minutes: u32) -> u32 {
        minutes.clamp(MIN_INTERVAL_MINUTES, MAX_INTERVAL_MINUTES)
    }
}
