//! CLI error type.

use thiserror::Error;

use fontpack::config::ConfigError;
use fontpack::logging::LoggingError;
use fontpack::source::TransportError;
use fontpack::target::TargetError;

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Missing or conflicting settings.
    #[error("{0}")]
    Config(String),

    /// The configuration file could not be loaded or saved.
    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    /// Logging could not be set up.
    #[error(transparent)]
    Logging(#[from] LoggingError),

    /// The target argument is not valid.
    #[error("invalid target: {0}")]
    Target(#[from] TargetError),

    /// The HTTP client could not be built.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The tokio runtime could not be started.
    #[error("failed to start async runtime: {0}")]
    Runtime(std::io::Error),

    /// The manifest could not be fetched; no parts were tried.
    #[error("manifest download failed: {0}")]
    ManifestFailed(String),

    /// The run finished but some parts failed.
    #[error("{count} part(s) failed: {parts}")]
    PartsFailed { count: usize, parts: String },

    /// The user interrupted the run.
    #[error("download cancelled")]
    Cancelled,

    /// The run stopped without reporting an outcome.
    #[error("download task ended unexpectedly")]
    Aborted,
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Cancelled => 130,
            CliError::ManifestFailed(_) | CliError::PartsFailed { .. } | CliError::Aborted => 2,
            _ => 1,
        }
    }
}
