//! Error types for pipeline phases.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::extractor::ExtractionError;
use crate::source::TransportError;
use crate::transfer::TransferError;

/// Result type for pipeline phases.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Failure of a single pipeline phase (the manifest or one part).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Opening the remote stream failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Streaming the body to disk failed or was cancelled.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// Expanding the part failed.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// A scratch file could not be created.
    #[error("failed to create temporary file in {}: {source}", dir.display())]
    TempFile { dir: PathBuf, source: io::Error },

    /// A finished download could not be moved into place.
    #[error("failed to move download into {}: {source}", path.display())]
    Promote { path: PathBuf, source: io::Error },

    /// The run was cancelled.
    #[error("run cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Whether this error is the result of cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Cancelled | Self::Transfer(TransferError::Cancelled)
        )
    }

    /// Whether the remote resource was missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_not_found())
    }
}
