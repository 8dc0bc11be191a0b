//! On-disk layout of manifests, scratch files and extracted fonts.
//!
//! The pipeline never builds paths itself; everything goes through a
//! [`StorageLayout`], so hosts with their own directory conventions can plug
//! them in.

use std::path::{Path, PathBuf};

use crate::target::DownloadTarget;

/// Default extension of extracted sub-item files.
pub const DEFAULT_FONT_EXTENSION: &str = "ttf";

/// Resolves every path the pipeline reads or writes.
pub trait StorageLayout: Send + Sync {
    /// Path of the manifest file for `target`.
    fn manifest_path(&self, target: &DownloadTarget) -> PathBuf;

    /// Directory the parts of `target` are extracted into.
    fn output_dir(&self, target: &DownloadTarget) -> PathBuf;

    /// Directory for temporary files (partial manifests and part containers).
    fn scratch_dir(&self) -> PathBuf;

    /// File name of sub-item `index` (1-based) inside the output directory.
    fn item_file_name(&self, index: u32) -> String;
}

/// [`StorageLayout`] rooted at a single data directory.
///
/// ```text
/// <root>/
/// ├── scripts/script_<target>.json
/// ├── fonts/<target>/p1.ttf … pN.ttf
/// └── tmp/
/// ```
#[derive(Debug, Clone)]
pub struct DirectoryLayout {
    root: PathBuf,
    font_extension: String,
}

impl DirectoryLayout {
    /// Create a layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            font_extension: DEFAULT_FONT_EXTENSION.to_string(),
        }
    }

    /// Set the extension of extracted sub-item files.
    pub fn with_font_extension(mut self, extension: impl Into<String>) -> Self {
        self.font_extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    /// The data directory root.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl StorageLayout for DirectoryLayout {
    fn manifest_path(&self, target: &DownloadTarget) -> PathBuf {
        self.root
            .join("scripts")
            .join(format!("script_{}.json", target))
    }

    fn output_dir(&self, target: &DownloadTarget) -> PathBuf {
        self.root.join("fonts").join(target.key())
    }

    fn scratch_dir(&self) -> PathBuf {
        self.root.join("tmp")
    }

    fn item_file_name(&self, index: u32) -> String {
        format!("p{}.{}", index, self.font_extension)
    }
}

/// Whether `path` is a regular file with at least one byte.
///
/// A truncated download leaves an empty file behind, so emptiness counts as absent.
pub fn is_non_empty_file(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_layout_paths() {
        let layout = DirectoryLayout::new("/data");
        let target = DownloadTarget::new("kfqpc_v2").unwrap();

        assert_eq!(
            layout.manifest_path(&target),
            PathBuf::from("/data/scripts/script_kfqpc_v2.json")
        );
        assert_eq!(
            layout.output_dir(&target),
            PathBuf::from("/data/fonts/kfqpc_v2")
        );
        assert_eq!(layout.scratch_dir(), PathBuf::from("/data/tmp"));
        assert_eq!(layout.item_file_name(12), "p12.ttf");
    }

    #[test]
    fn test_font_extension_override() {
        let layout = DirectoryLayout::new("/data").with_font_extension(".woff");
        assert_eq!(layout.item_file_name(1), "p1.woff");
    }

    #[test]
    fn test_is_non_empty_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let full = temp.path().join("full.json");
        let empty = temp.path().join("empty.json");
        std::fs::write(&full, b"{}").unwrap();
        std::fs::write(&empty, b"").unwrap();

        assert!(is_non_empty_file(&full));
        assert!(!is_non_empty_file(&empty));
        assert!(!is_non_empty_file(temp.path()));
        assert!(!is_non_empty_file(&temp.path().join("absent.json")));
    }
}
