//! Resume point computation from on-disk evidence.
//!
//! The output directory holds one file per sub-item (a page's font). Parts
//! pack a fixed number of consecutive sub-items, so the length of the
//! contiguous run of finished sub-items starting at 1 tells which part
//! downloading has to resume from. Gaps are never skipped: a missing or empty
//! file ends the run even if later sub-items exist.

use std::path::Path;

use crate::layout::{is_non_empty_file, StorageLayout};
use crate::target::{DownloadTarget, PartIndex};

/// What is already on disk for a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetStatus {
    /// A non-empty manifest is present.
    pub manifest_present: bool,
    /// Length of the contiguous run of extracted sub-items starting at 1.
    pub contiguous_items: u32,
    /// Part the next run starts from.
    pub resume_part: PartIndex,
    /// Every sub-item is present; a run would fetch no part.
    pub complete: bool,
}

/// Computes the part index a run resumes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumeLocator {
    total_items: u32,
    items_per_part: u32,
    total_parts: u32,
}

impl ResumeLocator {
    /// Create a locator.
    ///
    /// `items_per_part` is clamped to at least 1.
    pub fn new(total_items: u32, items_per_part: u32, total_parts: u32) -> Self {
        Self {
            total_items,
            items_per_part: items_per_part.max(1),
            total_parts,
        }
    }

    /// Count sub-items `1..` whose file exists and is non-empty, stopping at the first gap.
    pub fn contiguous_items<F>(&self, output_dir: &Path, item_name: F) -> u32
    where
        F: Fn(u32) -> String,
    {
        (1..=self.total_items)
            .take_while(|&index| is_non_empty_file(&output_dir.join(item_name(index))))
            .count() as u32
    }

    /// The part index to resume from.
    ///
    /// Returns part 1 when nothing is present and `total_parts + 1` when every
    /// sub-item is present, which callers treat as "nothing left to fetch".
    pub fn locate<F>(&self, output_dir: &Path, item_name: F) -> PartIndex
    where
        F: Fn(u32) -> String,
    {
        let contiguous = self.contiguous_items(output_dir, item_name);
        let part = self.part_for(contiguous);

        tracing::debug!(
            dir = %output_dir.display(),
            contiguous,
            resume_part = part,
            "computed resume point"
        );

        PartIndex::new(part).unwrap_or(PartIndex::FIRST)
    }

    /// Manifest presence and resume point of `target` under `layout`.
    pub fn inspect(&self, layout: &dyn StorageLayout, target: &DownloadTarget) -> SetStatus {
        let output_dir = layout.output_dir(target);
        let naming = |index| layout.item_file_name(index);
        let contiguous_items = self.contiguous_items(&output_dir, naming);

        SetStatus {
            manifest_present: is_non_empty_file(&layout.manifest_path(target)),
            contiguous_items,
            resume_part: self.locate(&output_dir, naming),
            complete: self.is_complete(contiguous_items),
        }
    }

    fn is_complete(&self, contiguous: u32) -> bool {
        self.total_items > 0 && contiguous >= self.total_items
    }

    fn part_for(&self, contiguous: u32) -> u32 {
        if self.is_complete(contiguous) {
            self.total_parts.saturating_add(1)
        } else {
            contiguous / self.items_per_part + 1
        }
    }
}
