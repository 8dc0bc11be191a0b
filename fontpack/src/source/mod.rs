//! Remote byte-stream sources for manifests and parts.
//!
//! The pipeline only needs two things from the network: a readable body and
//! its declared length. [`RemoteSource`] captures that contract, and
//! [`HttpSource`] is the production implementation.
//!
//! # Dyn Compatibility
//!
//! Methods return [`BoxFuture`] so sources can be shared as
//! `Arc<dyn RemoteSource>` between the service and its run tasks.

mod error;
mod http;

pub use error::TransportError;
pub use http::{HttpSource, DEFAULT_TIMEOUT_SECS};

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tokio::io::AsyncRead;

use crate::target::{DownloadTarget, PartIndex};

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An open response body and its declared size.
pub struct RemoteBody {
    /// Body bytes.
    pub reader: Pin<Box<dyn AsyncRead + Send>>,
    /// Declared length in bytes; 0 when unknown.
    pub total_bytes: u64,
}

impl RemoteBody {
    /// Wrap a reader with a declared length.
    pub fn new(reader: impl AsyncRead + Send + 'static, total_bytes: u64) -> Self {
        Self {
            reader: Box::pin(reader),
            total_bytes,
        }
    }
}

impl fmt::Debug for RemoteBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteBody")
            .field("total_bytes", &self.total_bytes)
            .finish_non_exhaustive()
    }
}

/// Source of manifest and part streams for a download target.
pub trait RemoteSource: Send + Sync {
    /// Open the manifest stream for `target`.
    fn fetch_manifest<'a>(
        &'a self,
        target: &'a DownloadTarget,
    ) -> BoxFuture<'a, Result<RemoteBody, TransportError>>;

    /// Open the container stream for one part of `target`.
    fn fetch_part<'a>(
        &'a self,
        target: &'a DownloadTarget,
        part: PartIndex,
    ) -> BoxFuture<'a, Result<RemoteBody, TransportError>>;
}
