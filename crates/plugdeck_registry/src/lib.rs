//! Transport layer for plugin catalogs and artifacts.
//!
//! The engine in `plugdeck_core` only talks to the [`Fetcher`] trait. This
//! crate provides the production implementation on top of an SSRF-guarded
//! HTTP client, plus helpers to load a manifest from a URL or a local path
//! and to fetch every download item of a plugin into memory.

pub mod downloader;
pub mod error;
pub mod fetcher;
pub mod http_client;
pub mod security;

pub use downloader::{ArtifactDownloader, DownloadError, FetchedFile};
pub use error::FetchError;
pub use fetcher::{Fetcher, HttpFetcher, ManifestSource};
pub use http_client::{SecureFetchError, SecureHttpClient};
pub use plugdeck_manifest as manifest;
pub use security::{SecurityError, validate_relative_path, validate_url};
