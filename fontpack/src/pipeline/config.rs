//! Configuration for the download pipeline.

use std::time::Duration;

use crate::transfer::{normalize_buffer_size, DEFAULT_BUFFER_SIZE};

/// Default number of parts a font set is split into.
pub const DEFAULT_TOTAL_PARTS: u32 = 4;

/// Default number of sub-items (pages) in a complete font set.
pub const DEFAULT_TOTAL_ITEMS: u32 = 604;

/// Default number of sub-items packed into one part.
pub const DEFAULT_ITEMS_PER_PART: u32 = 200;

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Configuration for pipeline runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Number of parts fetched per run (indices `1..=total_parts`).
    pub total_parts: u32,

    /// Number of sub-items in a complete set.
    pub total_items: u32,

    /// Number of consecutive sub-items packed per part.
    pub items_per_part: u32,

    /// Chunk size used by the transfer reader.
    pub buffer_size: usize,

    /// Timeout for remote requests.
    pub request_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            total_parts: DEFAULT_TOTAL_PARTS,
            total_items: DEFAULT_TOTAL_ITEMS,
            items_per_part: DEFAULT_ITEMS_PER_PART,
            buffer_size: DEFAULT_BUFFER_SIZE,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl PipelineConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of parts.
    pub fn with_total_parts(mut self, parts: u32) -> Self {
        self.total_parts = parts;
        self
    }

    /// Set the number of sub-items in a complete set.
    pub fn with_total_items(mut self, items: u32) -> Self {
        self.total_items = items;
        self
    }

    /// Set the number of sub-items per part (at least 1).
    pub fn with_items_per_part(mut self, items: u32) -> Self {
        self.items_per_part = items.max(1);
        self
    }

    /// Set the transfer chunk size; rounded up to a power of two of at least 4 KiB.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = normalize_buffer_size(size);
        self
    }

    /// Set the remote request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
