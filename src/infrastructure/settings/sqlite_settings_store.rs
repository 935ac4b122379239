use crate::application::ports::SettingsStore;
use crate::infrastructure::database::ConnectionPool;
use crate::shared::clock::Clock;
use crate::shared::error::AppError;
use async_trait::async_trait;
use std::sync::Arc;

pub struct SqliteSettingsStore {
    pool: ConnectionPool,
    clock: Arc<dyn Clock>,
}

impl SqliteSettingsStore {
    pub fn new(pool: ConnectionPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM sync_settings WHERE key = ?1")
            .bind(key)
            .fetch_optional(self.pool.get_pool())
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        if key.trim().is_empty() {
            return Err(AppError::InvalidInput("Setting key cannot be empty".to_string()));
        }

        sqlx::query(
            r#"
            INSERT INTO sync_settings (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(self.clock.now().timestamp_millis())
        .execute(self.pool.get_pool())
        .await?;

        Ok(())
    }
}
