//! Store error types

use thiserror::Error;

/// Errors from session store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid phone number: '{0}'")]
    InvalidPhoneNumber(String),

    #[error("Invalid disaster zone '{name}': {reason}")]
    InvalidZone { name: String, reason: String },
}
