//! Dialogue engine error types

use thiserror::Error;

/// Errors that can occur while advancing the dialogue
#[derive(Debug, Error)]
pub enum DialogueError {
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Missing credentials: set the {0} environment variable")]
    MissingCredentials(String),
}

impl DialogueError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            DialogueError::Api { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            DialogueError::Network(_) => true,
            DialogueError::InvalidResponse(_) => false,
            DialogueError::MissingCredentials(_) => false,
        }
    }
}
