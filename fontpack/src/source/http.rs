//! HTTP-based remote source.
//!
//! Resolves manifest and part URLs under a base URL and streams response
//! bodies without buffering them in memory:
//!
//! ```text
//! <base>/scripts/script_<target>.json       manifest
//! <base>/fonts/<target>/<target>-<n>.zip    part n
//! ```

use std::io;
use std::time::Duration;

use futures::TryStreamExt;
use reqwest::{Client, StatusCode};
use tokio_util::io::StreamReader;

use super::{BoxFuture, RemoteBody, RemoteSource, TransportError};
use crate::target::{DownloadTarget, PartIndex};

/// Default timeout for HTTP requests in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// HTTP-based [`RemoteSource`].
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpSource {
    /// Create a source with the default timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a source with a custom request timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request {
                url: base_url.clone(),
                source: e,
            })?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// The base URL all resources are resolved against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// URL of the manifest for `target`.
    pub fn manifest_url(&self, target: &DownloadTarget) -> String {
        format!("{}/scripts/script_{}.json", self.base_url, target)
    }

    /// URL of the container for one part of `target`.
    pub fn part_url(&self, target: &DownloadTarget, part: PartIndex) -> String {
        format!("{}/fonts/{}/{}-{}.zip", self.base_url, target, target, part)
    }

    /// Issue a GET and expose the body as an async reader.
    async fn open(&self, url: String) -> Result<RemoteBody, TransportError> {
        tracing::debug!(url = %url, "opening remote stream");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout {
                    url: url.clone(),
                    timeout_secs: self.timeout.as_secs(),
                }
            } else {
                TransportError::Request {
                    url: url.clone(),
                    source: e,
                }
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TransportError::NotFound { url });
        }
        if !status.is_success() {
            return Err(TransportError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let total_bytes = response.content_length().unwrap_or(0);
        let stream = response.bytes_stream().map_err(io::Error::other);

        Ok(RemoteBody::new(StreamReader::new(stream), total_bytes))
    }
}

impl RemoteSource for HttpSource {
    fn fetch_manifest<'a>(
        &'a self,
        target: &'a DownloadTarget,
    ) -> BoxFuture<'a, Result<RemoteBody, TransportError>> {
        Box::pin(self.open(self.manifest_url(target)))
    }

    fn fetch_part<'a>(
        &'a self,
        target: &'a DownloadTarget,
        part: PartIndex,
    ) -> BoxFuture<'a, Result<RemoteBody, TransportError>> {
        Box::pin(self.open(self.part_url(target, part)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> DownloadTarget {
        DownloadTarget::new("kfqpc_v1").unwrap()
    }

    #[test]
    fn test_http_source_default_timeout() {
        let source = HttpSource::new("https://example.com").unwrap();
        assert_eq!(source.timeout().as_secs(), DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_http_source_with_timeout() {
        let source =
            HttpSource::with_timeout("https://example.com", Duration::from_secs(60)).unwrap();
        assert_eq!(source.timeout().as_secs(), 60);
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let source = HttpSource::new("https://example.com/assets/").unwrap();
        assert_eq!(source.base_url(), "https://example.com/assets");
    }

    #[test]
    fn test_manifest_url() {
        let source = HttpSource::new("https://example.com").unwrap();
        assert_eq!(
            source.manifest_url(&target()),
            "https://example.com/scripts/script_kfqpc_v1.json"
        );
    }

    #[test]
    fn test_part_url() {
        let source = HttpSource::new("https://example.com").unwrap();
        let part = PartIndex::new(3).unwrap();
        assert_eq!(
            source.part_url(&target(), part),
            "https://example.com/fonts/kfqpc_v1/kfqpc_v1-3.zip"
        );
    }
}
