//! Tracing subscriber setup.
//!
//! Logs go to stderr, and optionally to a daily-rolling file through a
//! non-blocking writer. `RUST_LOG` overrides the configured level.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Prefix of rolling log file names.
pub const LOG_FILE_PREFIX: &str = "fontpack.log";

/// Errors installing the global subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The level is not a valid `EnvFilter` directive.
    #[error("invalid log level '{level}': {message}")]
    InvalidLevel { level: String, message: String },

    /// The log directory could not be created.
    #[error("failed to create log directory {}: {source}", path.display())]
    Directory { path: PathBuf, source: io::Error },

    /// Another subscriber was installed first.
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Keeps the file writer alive. Buffered lines are flushed when dropped.
#[must_use = "dropping the guard stops file logging"]
#[derive(Debug)]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber.
///
/// `level` is any `EnvFilter` directive (`info`, `fontpack=debug`, ...).
/// With `log_dir` set, lines are also appended to
/// `<log_dir>/fontpack.log.<date>`.
pub fn init_logging(level: &str, log_dir: Option<&Path>) -> Result<LoggingGuard, LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).map_err(|e| LoggingError::InvalidLevel {
            level: level.to_string(),
            message: e.to_string(),
        })?,
    };

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_timer(LocalTime::new(Rfc3339))
        .with_target(false);

    let (file_layer, file_guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| LoggingError::Directory {
                path: dir.to_path_buf(),
                source: e,
            })?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(LocalTime::new(Rfc3339));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)?;

    Ok(LoggingGuard { _file: file_guard })
}
