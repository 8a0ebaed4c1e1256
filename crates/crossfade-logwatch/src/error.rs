//! Error types for the log tailer.

use thiserror::Error;

/// Tailer error type.
#[derive(Debug, Error)]
pub enum TailerError {
    /// The log file could not be opened or read.
    #[error("Log file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The filesystem watch could not be registered.
    #[error("Log watch error: {0}")]
    Watch(#[from] notify::Error),
}

/// Result type for tailer operations.
pub type Result<T> = std::result::Result<T, TailerError>;
