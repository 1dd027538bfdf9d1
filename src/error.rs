//! Error types for the benchmark service.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Messaging error: {0}")]
    MessagingError(#[from] crate::messaging::MessagingError),
    #[error("Authentication error: {0}")]
    AuthError(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for BenchError {
    fn from(error: serde_json::Error) -> Self {
        BenchError::ValidationError(format!("JSON serialization error: {error}"))
    }
}

impl From<config::ConfigError> for BenchError {
    fn from(error: config::ConfigError) -> Self {
        BenchError::ConfigurationError(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BenchError::ValidationError("email too long".to_string());
        assert_eq!(err.to_string(), "Validation error: email too long");

        let err = BenchError::ConfigurationError("missing url".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing url");
    }

    #[test]
    fn test_from_serde_json() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: BenchError = parse_err.into();
        assert!(matches!(err, BenchError::ValidationError(_)));
    }

    #[test]
    fn test_from_sqlx() {
        let err: BenchError = sqlx::Error::RowNotFound.into();
        assert!(err.to_string().starts_with("Database error"));
    }
}
