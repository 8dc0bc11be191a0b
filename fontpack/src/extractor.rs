//! Zip extraction for downloaded parts.
//!
//! This module handles:
//! - Expanding every entry of a part container into the output directory
//! - Rejecting entries whose names would escape that directory
//! - Removing the container once all entries are on disk
//!
//! Extraction is not transactional. If an entry fails, entries written so far
//! stay in place; the resume scan picks up whatever is still missing on the
//! next run.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

/// Errors that can occur while expanding a part.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The container could not be opened.
    #[error("failed to open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },

    /// The container is not a readable zip archive.
    #[error("malformed archive {}: {source}", path.display())]
    Archive { path: PathBuf, source: ZipError },

    /// An entry name points outside the destination directory.
    #[error("archive entry {name:?} escapes the destination directory")]
    UnsafeEntry { name: String },

    /// A directory could not be created.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    /// An entry could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    /// The container could not be removed after extraction.
    #[error("failed to remove {}: {source}", path.display())]
    Remove { path: PathBuf, source: io::Error },

    /// The blocking extraction task did not complete.
    #[error("extraction task failed: {0}")]
    Task(String),
}

/// Expands a downloaded part into a directory.
pub trait PartExtractor: Send + Sync {
    /// Extract `container` into `dest_dir` and delete `container` afterwards.
    ///
    /// Returns the number of files written.
    fn extract(&self, container: &Path, dest_dir: &Path) -> Result<usize, ExtractionError>;
}

/// [`PartExtractor`] for zip containers.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipExtractor;

impl ZipExtractor {
    /// Create a new zip extractor.
    pub fn new() -> Self {
        Self
    }

    fn expand(&self, container: &Path, dest_dir: &Path) -> Result<usize, ExtractionError> {
        create_dir(dest_dir)?;

        let file = File::open(container).map_err(|e| ExtractionError::Open {
            path: container.to_path_buf(),
            source: e,
        })?;
        let mut archive =
            ZipArchive::new(BufReader::new(file)).map_err(|e| ExtractionError::Archive {
                path: container.to_path_buf(),
                source: e,
            })?;

        let mut written = 0;
        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| ExtractionError::Archive {
                    path: container.to_path_buf(),
                    source: e,
                })?;

            let relative = entry
                .enclosed_name()
                .ok_or_else(|| ExtractionError::UnsafeEntry {
                    name: entry.name().to_string(),
                })?;
            let out_path = dest_dir.join(relative);

            if entry.is_dir() {
                create_dir(&out_path)?;
                continue;
            }

            if let Some(parent) = out_path.parent() {
                create_dir(parent)?;
            }

            let out_file = File::create(&out_path).map_err(|e| ExtractionError::Write {
                path: out_path.clone(),
                source: e,
            })?;
            let mut writer = BufWriter::new(out_file);
            io::copy(&mut entry, &mut writer)
                .and_then(|_| writer.flush())
                .map_err(|e| ExtractionError::Write {
                    path: out_path.clone(),
                    source: e,
                })?;
            written += 1;
        }

        Ok(written)
    }
}

impl PartExtractor for ZipExtractor {
    fn extract(&self, container: &Path, dest_dir: &Path) -> Result<usize, ExtractionError> {
        // The archive handle is dropped when `expand` returns.
        let written = self.expand(container, dest_dir)?;

        match fs::remove_file(container) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ExtractionError::Remove {
                    path: container.to_path_buf(),
                    source: e,
                })
            }
        }

        tracing::debug!(
            container = %container.display(),
            dest = %dest_dir.display(),
            written,
            "part extracted"
        );
        Ok(written)
    }
}

fn create_dir(path: &Path) -> Result<(), ExtractionError> {
    fs::create_dir_all(path).map_err(|e| ExtractionError::CreateDir {
        path: path.to_path_buf(),
        source: e,
    })
}
