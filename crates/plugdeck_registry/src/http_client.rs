//! HTTP client with SSRF protection, manual redirects and body size limits.

use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::LOCATION;
use reqwest::{StatusCode, redirect};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::security::{SecurityError, validate_url};

/// Error type for secure HTTP fetch operations.
#[derive(Debug, Error)]
pub enum SecureFetchError {
    /// Too many redirects.
    #[error("Too many redirects")]
    RedirectLimitExceeded,

    /// The URL could not be parsed.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Invalid redirect URL.
    #[error("Invalid redirect URL: {0}")]
    InvalidRedirectUrl(String),

    /// Network request failed.
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Security error (SSRF protection).
    #[error("Security error: {0}")]
    SecurityError(#[from] SecurityError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// HTTP error status.
    #[error("HTTP error: {0}")]
    HttpError(StatusCode),

    /// Response body exceeds the configured limit.
    #[error("Response too large: {size} bytes exceeds maximum of {max} bytes")]
    ResponseTooLarge { size: u64, max: u64 },

    /// Failed to build HTTP client.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuildError(String),
}

/// Default timeout for HTTP requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default maximum number of redirects.
pub const DEFAULT_MAX_REDIRECTS: u32 = 10;

/// Default maximum body size (50 MB).
pub const DEFAULT_MAX_SIZE: u64 = 50 * 1024 * 1024;

/// HTTP client that validates every hop (including redirects) before
/// connecting.
#[derive(Debug, Clone)]
pub struct SecureHttpClient {
    client: reqwest::Client,
    timeout: Duration,
    allow_local: bool,
    max_redirects: u32,
    max_size: u64,
}

/// Builder for SecureHttpClient.
#[derive(Debug)]
pub struct SecureHttpClientBuilder {
    timeout: Duration,
    allow_local: bool,
    max_redirects: u32,
    max_size: u64,
}

impl SecureHttpClient {
    /// Create a new builder for SecureHttpClient.
    pub fn builder() -> SecureHttpClientBuilder {
        SecureHttpClientBuilder {
            timeout: DEFAULT_TIMEOUT,
            allow_local: false,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            max_size: DEFAULT_MAX_SIZE,
        }
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch a URL with the client's default size limit.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, SecureFetchError> {
        self.fetch_with_size_limit(url, self.max_size).await
    }

    /// Fetch a URL, failing once the body grows past `max_size` bytes.
    pub async fn fetch_with_size_limit(
        &self,
        url: &str,
        max_size: u64,
    ) -> Result<Vec<u8>, SecureFetchError> {
        let mut current = Url::parse(url).map_err(|e| SecureFetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        for _ in 0..=self.max_redirects {
            validate_url(&current, self.allow_local)?;

            let response = self.client.get(current.clone()).send().await?;
            let status = response.status();

            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .ok_or_else(|| {
                        SecureFetchError::InvalidRedirectUrl(format!(
                            "missing Location header from {current}"
                        ))
                    })?;
                let next = current
                    .join(location)
                    .map_err(|e| SecureFetchError::InvalidRedirectUrl(e.to_string()))?;
                debug!("Following redirect {} -> {}", current, next);
                current = next;
                continue;
            }

            if status == StatusCode::NOT_FOUND {
                return Err(SecureFetchError::NotFound(current.to_string()));
            }
            if !status.is_success() {
                return Err(SecureFetchError::HttpError(status));
            }

            if let Some(length) = response.content_length()
                && length > max_size
            {
                return Err(SecureFetchError::ResponseTooLarge {
                    size: length,
                    max: max_size,
                });
            }

            let mut body = Vec::new();
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                let size = (body.len() + chunk.len()) as u64;
                if size > max_size {
                    return Err(SecureFetchError::ResponseTooLarge {
                        size,
                        max: max_size,
                    });
                }
                body.extend_from_slice(&chunk);
            }
            return Ok(body);
        }

        Err(SecureFetchError::RedirectLimitExceeded)
    }
}

impl SecureHttpClientBuilder {
    /// Set timeout for HTTP requests.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Allow fetching from local network addresses.
    pub fn allow_local(mut self, allow: bool) -> Self {
        self.allow_local = allow;
        self
    }

    /// Set maximum number of redirects.
    pub fn max_redirects(mut self, max: u32) -> Self {
        self.max_redirects = max;
        self
    }

    /// Set the default body size limit.
    pub fn max_size(mut self, max: u64) -> Self {
        self.max_size = max;
        self
    }

    /// Build the SecureHttpClient.
    pub fn build(self) -> Result<SecureHttpClient, SecureFetchError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .redirect(redirect::Policy::none())
            .user_agent(concat!("plugdeck/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SecureFetchError::ClientBuildError(e.to_string()))?;

        Ok(SecureHttpClient {
            client,
            timeout: self.timeout,
            allow_local: self.allow_local,
            max_redirects: self.max_redirects,
            max_size: self.max_size,
        })
    }
}
