//! Geo collaborator error types

use thiserror::Error;

/// Errors from geocoding, location tracking and map previews
#[derive(Debug, Error)]
pub enum GeoError {
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Lookup failed with status {status}: {message}")]
    Lookup { status: String, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid URL: {0}")]
    Url(String),

    #[error("Missing credentials: set the {0} environment variable")]
    MissingCredentials(String),
}
