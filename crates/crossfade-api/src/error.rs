//! Error types for the backend client.

use thiserror::Error;

/// Backend client error type.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend refused the request.
    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// Credential store I/O failure.
    #[error("Credential store error: {0}")]
    Io(#[from] std::io::Error),

    /// Credential store contents could not be parsed.
    #[error("Credential format error: {0}")]
    Json(#[from] serde_json::Error),

    /// No per-user configuration directory is available.
    #[error("Failed to resolve the per-user config directory")]
    NoConfigDir,
}

/// Result type for backend operations.
pub type Result<T> = std::result::Result<T, ApiError>;
