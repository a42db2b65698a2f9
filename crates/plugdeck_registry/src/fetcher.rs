//! The fetch capability consumed by the engine, and manifest loading.

use std::future::Future;
use std::path::{Path, PathBuf};

use plugdeck_manifest::Manifest;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::error::FetchError;
use crate::http_client::SecureHttpClient;

/// Maximum size for a manifest file (10MB).
pub const MAX_MANIFEST_SIZE: u64 = 10 * 1024 * 1024;

/// Turns a URL into text or bytes.
///
/// Implementations must be cheap to share between concurrently running
/// plugin operations.
pub trait Fetcher: Send + Sync {
    fn fetch_text(&self, url: &str) -> impl Future<Output = Result<String, FetchError>> + Send;

    fn fetch_bytes(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// [`Fetcher`] backed by [`SecureHttpClient`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: SecureHttpClient,
}

impl HttpFetcher {
    pub fn new(client: SecureHttpClient) -> Self {
        Self { client }
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let bytes = self
            .client
            .fetch_with_size_limit(url, MAX_MANIFEST_SIZE)
            .await?;
        Ok(String::from_utf8(bytes)?)
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        Ok(self.client.fetch(url).await?)
    }
}

/// Where the remote catalog comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    /// Fetched through the [`Fetcher`].
    Url(String),
    /// Read from the local filesystem, for offline catalogs.
    Path(PathBuf),
}

impl ManifestSource {
    /// Anything with an `http://` or `https://` prefix is a URL, everything
    /// else is a path.
    pub fn parse(value: &str) -> Self {
        if value.starts_with("http://") || value.starts_with("https://") {
            Self::Url(value.to_string())
        } else {
            Self::Path(PathBuf::from(value))
        }
    }

    /// Load and validate the manifest.
    pub async fn load<F: Fetcher>(&self, fetcher: &F) -> Result<Manifest, FetchError> {
        let text = match self {
            Self::Url(url) => {
                debug!("Fetching manifest from {}", url);
                fetcher.fetch_text(url).await?
            }
            Self::Path(path) => read_manifest_file(path).await?,
        };
        Ok(Manifest::from_json(&text)?)
    }
}

impl std::fmt::Display for ManifestSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

async fn read_manifest_file(path: &Path) -> Result<String, FetchError> {
    if !path.exists() {
        return Err(FetchError::NotFound(format!(
            "Manifest file not found: {}",
            path.display()
        )));
    }

    let file = tokio::fs::File::open(path).await?;
    let mut content = String::new();
    let read = file
        .take(MAX_MANIFEST_SIZE + 1)
        .read_to_string(&mut content)
        .await?;
    if read as u64 > MAX_MANIFEST_SIZE {
        return Err(FetchError::IoError(std::io::Error::new(
            std::io::ErrorKind::FileTooLarge,
            format!(
                "Manifest file too large: {} bytes (max {} bytes)",
                read, MAX_MANIFEST_SIZE
            ),
        )));
    }
    Ok(content)
}
