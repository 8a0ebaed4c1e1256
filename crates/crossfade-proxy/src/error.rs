//! Error types for the proxy.

use thiserror::Error;

/// Proxy error type.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// CA certificate error.
    #[error("CA error: {0}")]
    Ca(#[from] CaError),

    /// Proxy server error.
    #[error("Proxy error: {0}")]
    Proxy(String),
}

/// CA material error type.
#[derive(Debug, Error)]
pub enum CaError {
    /// Failed to generate CA material.
    #[error("Failed to generate CA: {0}")]
    Generation(String),

    /// Failed to read CA material.
    #[error("Failed to read CA: {0}")]
    Read(#[from] std::io::Error),

    /// Failed to parse CA material.
    #[error("Failed to parse CA: {0}")]
    Parse(String),

    /// Failed to write CA material.
    #[error("Failed to write CA: {0}")]
    Write(String),
}

/// Host system integration error type.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Registry access failed.
    #[error("Registry error: {0}")]
    Registry(String),

    /// Trust store update failed.
    #[error("Certificate install error: {0}")]
    CertInstall(String),

    /// This platform has no trust-store or proxy integration.
    #[error("System integration is not supported on this platform")]
    Unsupported,
}

/// Result type for proxy operations.
pub type Result<T> = std::result::Result<T, ProxyError>;
