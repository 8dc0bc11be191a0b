//! Identifiers for the asset family being fetched and the parts it is split into.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use thiserror::Error;

/// Errors produced when parsing identifiers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    /// Target key was empty.
    #[error("download target must not be empty")]
    Empty,

    /// Target key contains a character that cannot be embedded in paths and URLs.
    #[error("invalid character {ch:?} in download target {key:?}")]
    InvalidChar { key: String, ch: char },

    /// Part indices are 1-based.
    #[error("part index must be at least 1")]
    ZeroPart,
}

/// Opaque key identifying the asset family being fetched (e.g. a script variant).
///
/// The key is embedded verbatim in file names and request URLs, so only ASCII
/// alphanumerics, `-`, `_` and `.` are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DownloadTarget(String);

impl DownloadTarget {
    /// Create a target from a key, validating its characters.
    pub fn new(key: impl Into<String>) -> Result<Self, TargetError> {
        let key = key.into();
        if key.is_empty() {
            return Err(TargetError::Empty);
        }
        if let Some(ch) = key
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(TargetError::InvalidChar { key, ch });
        }
        if key.chars().all(|c| c == '.') {
            return Err(TargetError::InvalidChar { key, ch: '.' });
        }
        Ok(Self(key))
    }

    /// The raw key.
    pub fn key(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DownloadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DownloadTarget {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// 1-based index of a part within a fixed total part count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartIndex(NonZeroU32);

impl PartIndex {
    /// The first part.
    pub const FIRST: PartIndex = PartIndex(NonZeroU32::MIN);

    /// Create a part index, rejecting zero.
    pub fn new(index: u32) -> Result<Self, TargetError> {
        NonZeroU32::new(index)
            .map(PartIndex)
            .ok_or(TargetError::ZeroPart)
    }

    /// The 1-based numeric value.
    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// Iterate over `1..=total` as part indices.
    pub fn range(total: u32) -> impl Iterator<Item = PartIndex> {
        (1..=total).filter_map(NonZeroU32::new).map(PartIndex)
    }

    /// The index after this one, saturating at `u32::MAX`.
    pub fn next(self) -> PartIndex {
        PartIndex(self.0.saturating_add(1))
    }
}

impl fmt::Display for PartIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
