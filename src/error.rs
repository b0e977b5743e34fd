//! Domain-specific error types for satisfaction-survey

use thiserror::Error;

use crate::clients::traits::AgentError;

/// Main error type for survey conversions and runs
#[derive(Error, Debug)]
pub enum SurveyError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unsupported content type: {kind}")]
    UnsupportedContent { kind: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Prompt error: {message}")]
    Prompt { message: String },

    #[error("Model runner error: {0}")]
    Agent(#[from] AgentError),

    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<anyhow::Error> for SurveyError {
    fn from(err: anyhow::Error) -> Self {
        SurveyError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for SurveyError {
    fn from(err: serde_json::Error) -> Self {
        SurveyError::Validation {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for SurveyError {
    fn from(err: std::io::Error) -> Self {
        SurveyError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type alias for survey operations
pub type Result<T> = std::result::Result<T, SurveyError>;
