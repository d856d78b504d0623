//! Errors raised while talking to the forum.

use thiserror::Error;
use vta_core::AppError;

/// A failed forum request.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The forum rejected our credentials (HTTP 401/403)
    #[error("authentication rejected with HTTP {status} for {url}")]
    Auth { status: u16, url: String },

    /// Non-success HTTP status
    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// Connection, timeout or other transport failure
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// Response body did not match the expected shape
    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl FetchError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Auth { .. } | Self::Decode { .. } => false,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Transport { .. } => true,
        }
    }
}

impl From<FetchError> for AppError {
    fn from(e: FetchError) -> Self {
        AppError::Ingest(e.to_string())
    }
}
