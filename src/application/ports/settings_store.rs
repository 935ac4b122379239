use crate::shared::error::AppError;
use async_trait::async_trait;

/// Flat string key-value store for local preferences.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
}
