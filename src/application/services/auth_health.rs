use crate::application::ports::CredentialProvider;
use crate::domain::entities::AuthTokenStatus;
use crate::domain::value_objects::IntegrationKind;
use crate::shared::error::AppError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Phrases that sources print when their login is gone or expired.
///
/// Matched case-insensitively against the raw failure text. Keep entries
/// specific: generic words like "error" or "refused" belong to transport failures.
pub const AUTH_FAILURE_PHRASES: &[&str] = &[
    "token expired",
    "access token expired",
    "not logged in",
    "unauthorized",
    "please log in",
    "please login",
    "no workos tokens",
    "invalid_grant",
    "authentication required",
    "login required",
    "refresh token",
];

/// True when a fetch failure means the user has to sign in again.
pub fn classify_error(message: &str) -> bool {
    let lowered = message.to_lowercase();
    AUTH_FAILURE_PHRASES
        .iter()
        .any(|phrase| lowered.contains(phrase))
}

/// Outcome of the pre-fetch credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthGate {
    Open,
    Blocked(String),
}

pub struct AuthHealthMonitor {
    integration: IntegrationKind,
    credentials: Arc<dyn CredentialProvider>,
    needs_auth: AtomicBool,
}

impl AuthHealthMonitor {
    pub fn new(integration: IntegrationKind, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            integration,
            credentials,
            needs_auth: AtomicBool::new(false),
        }
    }

    pub async fn check_status(&self) -> Result<AuthTokenStatus, AppError> {
        self.credentials.token_status().await
    }

    pub fn needs_auth(&self) -> bool {
        self.needs_auth.load(Ordering::Acquire)
    }

    pub fn mark_needs_auth(&self, reason: &str) {
        if !self.needs_auth.swap(true, Ordering::AcqRel) {
            tracing::warn!(
                target: "sync::auth",
                integration = %self.integration,
                reason,
                "re-authentication required"
            );
        }
    }

    fn clear_needs_auth(&self) {
        if self.needs_auth.swap(false, Ordering::AcqRel) {
            tracing::info!(
                target: "sync::auth",
                integration = %self.integration,
                "re-authentication cleared"
            );
        }
    }

    /// Classifies a failure message and flags the integration when it is auth related.
    pub fn observe_failure(&self, message: &str) -> bool {
        let is_auth = classify_error(message);
        if is_auth {
            self.mark_needs_auth(message);
        }
        is_auth
    }

    /// Decides whether a run may proceed to the fetch stage.
    pub async fn gate(&self) -> AuthGate {
        if self.needs_auth() {
            return AuthGate::Blocked(format!(
                "{} needs to be signed in again",
                self.integration.display_name()
            ));
        }

        match self.check_status().await {
            Ok(status) if status.is_expired() => {
                let message = format!("{} token expired", self.integration.display_name());
                self.mark_needs_auth(&message);
                AuthGate::Blocked(message)
            }
            Ok(_) => AuthGate::Open,
            Err(err) => {
                let detail = err.detail();
                if self.observe_failure(&detail) {
                    AuthGate::Blocked(detail)
                } else {
                    // 読めないだけならfetch側で判定する
                    tracing::warn!(
                        target: "sync::auth",
                        integration = %self.integration,
                        error = %err,
                        "token status unavailable, continuing"
                    );
                    AuthGate::Open
                }
            }
        }
    }

    /// Runs the source's login flow, then re-checks the credential.
    pub async fn reauthenticate(&self) -> Result<AuthTokenStatus, AppError> {
        self.credentials.reauthenticate().await?;
        self.acknowledge_reauthentication().await
    }

    /// Re-checks after an out-of-band login.
    pub async fn acknowledge_reauthentication(&self) -> Result<AuthTokenStatus, AppError> {
        let status = self.check_status().await?;
        if status.is_valid() {
            self.clear_needs_auth();
        }
        Ok(status)
    }
}
