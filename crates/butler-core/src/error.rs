//! Error types for Redis Butler

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ButlerError>;

#[derive(Error, Debug)]
pub enum ButlerError {
    #[error("Environment not found: {0}")]
    EnvironmentNotFound(String),

    #[error("Failed to connect to environment {environment}: {message}")]
    ConnectionFailed {
        environment: String,
        message: String,
    },

    #[error("Redis command failed: {0}")]
    CommandFailed(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl ButlerError {
    pub fn connection_failed(environment: impl Into<String>, message: impl ToString) -> Self {
        ButlerError::ConnectionFailed {
            environment: environment.into(),
            message: message.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ButlerError::EnvironmentNotFound(_))
    }
}
