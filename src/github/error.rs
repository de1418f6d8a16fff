//! GitHub REST API error types.

use thiserror::Error;

/// Definitive failure of one logical request, after any retries.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("GitHub API returned {status}: {message}")]
    Http { status: u16, message: String },

    #[error("failed to decode response body: {0}")]
    Decode(String),

    #[error("max retries exceeded after {attempts} attempts")]
    MaxRetries { attempts: u32 },
}

impl FetchError {
    /// HTTP status of the failed response, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
