//! Error types for remote fetches.

use thiserror::Error;

/// Errors raised while opening a remote byte stream.
///
/// `NotFound` is kept separate from other failures so callers can react to
/// a missing resource specifically (e.g. by invalidating a cached manifest).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote resource does not exist.
    #[error("resource not found: {url}")]
    NotFound { url: String },

    /// The server answered with an unexpected status.
    #[error("request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    /// The request could not be sent or its body could not be read.
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The request timed out.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// Any other transport failure (used by non-HTTP sources).
    #[error("transport failure: {0}")]
    Other(String),
}

impl TransportError {
    /// Whether the remote resource is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
