use crate::domain::entities::AuthTokenStatus;
use crate::shared::error::AppError;
use async_trait::async_trait;

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Reads the current credential without refreshing it.
    async fn token_status(&self) -> Result<AuthTokenStatus, AppError>;

    /// Runs the source's own login flow.
    async fn reauthenticate(&self) -> Result<(), AppError>;
}
