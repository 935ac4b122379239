use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Auth error: {0}")]
    Auth(String),
    #[error("External source error: {0}")]
    ExternalSource(String),
    #[error("Command `{command}` failed: {message}")]
    ExternalCommand { command: String, message: String },
    #[error("Command `{command}` timed out after {timeout_secs}s")]
    Timeout { command: String, timeout_secs: u64 },
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
    #[error("Not implemented: {0}")]
    NotImplemented(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine readable code surfaced to the UI alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::ConfigurationError(_) => "CONFIGURATION_ERROR",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Auth(_) => "AUTH_ERROR",
            AppError::ExternalSource(_) => "EXTERNAL_SOURCE_ERROR",
            AppError::ExternalCommand { .. } => "EXTERNAL_COMMAND_FAILED",
            AppError::Timeout { .. } => "TIMEOUT",
            AppError::SerializationError(_) => "SERIALIZATION_ERROR",
            AppError::DeserializationError(_) => "DESERIALIZATION_ERROR",
            AppError::NotImplemented(_) => "NOT_IMPLEMENTED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Internal(_) => {
                "An internal error occurred. Please try again.".to_string()
            }
            AppError::ExternalCommand { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Raw text of the failure without the category prefix.
    ///
    /// Auth classification runs against this, so the source's own wording
    /// must survive untouched.
    pub fn detail(&self) -> String {
        match self {
            AppError::Database(msg)
            | AppError::Storage(msg)
            | AppError::ConfigurationError(msg)
            | AppError::InvalidInput(msg)
            | AppError::NotFound(msg)
            | AppError::Auth(msg)
            | AppError::ExternalSource(msg)
            | AppError::SerializationError(msg)
            | AppError::DeserializationError(msg)
            | AppError::NotImplemented(msg)
            | AppError::Internal(msg) => msg.clone(),
            AppError::ExternalCommand { message, .. } => message.clone(),
            AppError::Timeout { .. } => self.to_string(),
        }
    }
}

// コマンド層へはユーザー向けメッセージだけ渡す
impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.user_message())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            AppError::DeserializationError(err.to_string())
        } else {
            AppError::SerializationError(err.to_string())
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        AppError::Internal(err)
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        AppError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_display() {
        let err = AppError::ExternalCommand {
            command: "granola sync".to_string(),
            message: "exit status 1".to_string(),
        };
        assert_eq!(err.to_string(), "Command `granola sync` failed: exit status 1");

        let err = AppError::Timeout {
            command: "pnpm sync".to_string(),
            timeout_secs: 30,
        };
        assert_eq!(err.to_string(), "Command `pnpm sync` timed out after 30s");
    }

    #[test]
    fn test_detail_keeps_source_wording() {
        let err = AppError::ExternalCommand {
            command: "granola sync".to_string(),
            message: "No WorkOS tokens found, please log in".to_string(),
        };
        assert_eq!(err.detail(), "No WorkOS tokens found, please log in");
        assert_eq!(err.user_message(), "No WorkOS tokens found, please log in");
    }

    #[test]
    fn test_internal_errors_are_masked_for_users() {
        let err = AppError::Database("disk I/O error".to_string());
        assert_eq!(err.code(), "DATABASE_ERROR");
        assert!(!err.user_message().contains("disk"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let err: AppError = io_err.into();

        match err {
            AppError::Storage(msg) => assert!(msg.contains("File not found")),
            _ => panic!("Expected Storage error"),
        }
    }

    #[test]
    fn test_error_from_invalid_json() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: AppError = parse_err.into();
        assert_eq!(err.code(), "DESERIALIZATION_ERROR");
    }
}
