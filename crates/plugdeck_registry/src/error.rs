//! Error types for fetch operations.

use crate::http_client::SecureFetchError;
use plugdeck_manifest::ManifestError;
use thiserror::Error;

/// Error type for `fetch_text` / `fetch_bytes` and manifest loading.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP transport failed.
    #[error("{0}")]
    SecureFetchError(#[from] SecureFetchError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response body was not valid UTF-8.
    #[error("Response is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// Manifest parsing or validation failed.
    #[error("Invalid manifest: {0}")]
    InvalidManifest(#[from] ManifestError),

    /// File system I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Free-form transport failure reported by a non-HTTP fetcher.
    #[error("{0}")]
    Transport(String),
}
