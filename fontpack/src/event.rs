//! Events emitted by a pipeline run.
//!
//! Each run is a sequence of phases: the manifest phase (`part == None`)
//! followed by one phase per fetched part. Every phase produces exactly one
//! `Started`, zero or more non-decreasing `Progress` values and exactly one
//! terminal `Completed` or `Failed`. A run that gets past the manifest phase
//! ends with a final `Completed(None)` sentinel.
//!
//! ```text
//! Started(None) Progress(None, 0..100) Completed(None)
//! Started(1)    Progress(1, 0..100)    Completed(1)
//! Started(2)    Progress(2, 0..)       Failed(2)
//! Completed(None)                      <- run finished
//! ```

use std::fmt;

use crate::target::PartIndex;

/// A phase transition or progress update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEvent {
    /// A phase began.
    Started(Option<PartIndex>),
    /// Percentage of the phase's bytes transferred (0..=100).
    Progress(Option<PartIndex>, u8),
    /// A phase finished successfully, or (with `None` after the manifest
    /// phase has closed) the whole run finished.
    Completed(Option<PartIndex>),
    /// A phase failed.
    Failed(Option<PartIndex>),
}

impl TransferEvent {
    /// The part this event refers to; `None` for the manifest phase or the sentinel.
    pub fn part(&self) -> Option<PartIndex> {
        match *self {
            Self::Started(p) | Self::Progress(p, _) | Self::Completed(p) | Self::Failed(p) => p,
        }
    }

    /// Whether this event closes its phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_))
    }
}

impl fmt::Display for TransferEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = |p: Option<PartIndex>| match p {
            Some(p) => format!("part {}", p),
            None => "manifest".to_string(),
        };
        match *self {
            Self::Started(p) => write!(f, "{} started", label(p)),
            Self::Progress(p, pct) => write!(f, "{} {}%", label(p), pct),
            Self::Completed(p) => write!(f, "{} completed", label(p)),
            Self::Failed(p) => write!(f, "{} failed", label(p)),
        }
    }
}

/// Tracks which phase an event stream is in.
///
/// `Completed(None)` means "manifest done" while the manifest phase is open
/// and "run finished" otherwise; consumers feed every event through
/// [`PhaseTracker::observe`] to tell the two apart.
#[derive(Debug, Default, Clone)]
pub struct PhaseTracker {
    open: Option<Option<PartIndex>>,
    finished: bool,
}

impl PhaseTracker {
    /// Create a tracker with no open phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event. Returns `true` when it is the run-finished sentinel.
    pub fn observe(&mut self, event: &TransferEvent) -> bool {
        match *event {
            TransferEvent::Started(p) => {
                self.open = Some(p);
                false
            }
            TransferEvent::Progress(..) => false,
            TransferEvent::Completed(None) if self.open != Some(None) => {
                self.open = None;
                self.finished = true;
                true
            }
            TransferEvent::Completed(_) | TransferEvent::Failed(_) => {
                self.open = None;
                false
            }
        }
    }

    /// The currently open phase, if any.
    pub fn open_phase(&self) -> Option<Option<PartIndex>> {
        self.open
    }

    /// Whether the run-finished sentinel has been observed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(n: u32) -> Option<PartIndex> {
        Some(PartIndex::new(n).unwrap())
    }

    #[test]
    fn test_event_part_and_terminal() {
        assert_eq!(TransferEvent::Progress(part(2), 40).part(), part(2));
        assert!(TransferEvent::Failed(None).is_terminal());
        assert!(!TransferEvent::Started(part(1)).is_terminal());
    }

    #[test]
    fn test_event_display() {
        assert_eq!(TransferEvent::Progress(None, 5).to_string(), "manifest 5%");
        assert_eq!(TransferEvent::Completed(part(3)).to_string(), "part 3 completed");
    }

    #[test]
    fn test_tracker_distinguishes_manifest_completion_from_sentinel() {
        let mut tracker = PhaseTracker::new();
        assert!(!tracker.observe(&TransferEvent::Started(None)));
        assert_eq!(tracker.open_phase(), Some(None));
        assert!(!tracker.observe(&TransferEvent::Completed(None)));
        assert!(!tracker.observe(&TransferEvent::Started(part(1))));
        assert!(!tracker.observe(&TransferEvent::Completed(part(1))));
        assert!(!tracker.is_finished());
        assert!(tracker.observe(&TransferEvent::Completed(None)));
        assert!(tracker.is_finished());
    }

    #[test]
    fn test_tracker_sentinel_without_manifest_phase() {
        let mut tracker = PhaseTracker::new();
        assert!(tracker.observe(&TransferEvent::Completed(None)));
    }
}
