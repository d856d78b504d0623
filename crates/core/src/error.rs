//! Error types for the Virtual TA.
//!
//! A single error enum covers every failure category in the workspace:
//! configuration, storage, forum ingestion, LLM synthesis, prompts and
//! malformed client input.

use thiserror::Error;

/// Unified error type for the Virtual TA.
///
/// Every fallible function in the workspace returns `Result<T, AppError>`.
/// The HTTP layer maps each variant to a status code.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record store errors (SQLite)
    #[error("Store error: {0}")]
    Store(String),

    /// Lookup of a record id that is not in the store
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Network, authentication or payload errors while scraping the forum
    #[error("Ingest failure: {0}")]
    Ingest(String),

    /// Empty or otherwise unusable client input
    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether the error was caused by the caller rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, AppError::MalformedQuery(_) | AppError::NotFound(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
