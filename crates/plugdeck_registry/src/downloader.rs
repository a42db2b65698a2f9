//! Fetches every download item of a plugin into memory.
//!
//! Nothing is written here: the caller commits the returned buffers only
//! after every item has been fetched successfully.

use plugdeck_manifest::DownloadItem;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::FetchError;
use crate::fetcher::Fetcher;

/// Error type for artifact downloads.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// One of the items could not be fetched.
    #[error("Failed to download {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },

    /// The cancellation token fired while a fetch was pending.
    #[error("Download cancelled")]
    Cancelled,
}

/// A fetched item that has not been written yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    pub relative_path: String,
    pub bytes: Vec<u8>,
}

/// Downloads a plugin's items strictly in manifest order.
pub struct ArtifactDownloader<'a, F> {
    fetcher: &'a F,
}

impl<'a, F: Fetcher> ArtifactDownloader<'a, F> {
    pub fn new(fetcher: &'a F) -> Self {
        Self { fetcher }
    }

    /// Fetches each item in order, calling `on_progress(item, completed / total)`
    /// after every completed fetch.
    ///
    /// The first failure aborts the whole download and drops anything fetched
    /// so far. Cancellation is checked while each fetch is pending.
    pub async fn download_all(
        &self,
        items: &[DownloadItem],
        cancel: &CancellationToken,
        mut on_progress: impl FnMut(&DownloadItem, f32),
    ) -> Result<Vec<FetchedFile>, DownloadError> {
        let total = items.len();
        let mut fetched = Vec::with_capacity(total);

        for (index, item) in items.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(DownloadError::Cancelled);
            }

            let bytes = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
                result = self.fetcher.fetch_bytes(&item.url) => {
                    result.map_err(|source| DownloadError::Fetch {
                        url: item.url.clone(),
                        source,
                    })?
                }
            };

            debug!("Fetched {} ({} bytes)", item.url, bytes.len());
            fetched.push(FetchedFile {
                relative_path: item.relative_path.clone(),
                bytes,
            });

            on_progress(item, (index + 1) as f32 / total as f32);
        }

        Ok(fetched)
    }
}
