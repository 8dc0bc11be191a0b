//! Per-phase progress bars for a download run.
//!
//! Each phase (manifest, then one per part) gets its own bar. A finished bar
//! stays on screen with a ✓ or ✗ so the run reads as a log once it is done.

use std::io::IsTerminal;

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use fontpack::event::PhaseTracker;
use fontpack::{PartIndex, TransferEvent};

const BAR_TEMPLATE: &str = "{prefix:>14.bold} [{bar:40.cyan/blue}] {pos:>3}% {msg}";

/// Renders [`TransferEvent`]s as progress bars.
pub struct ProgressView {
    multi: MultiProgress,
    current: Option<ProgressBar>,
    tracker: PhaseTracker,
    total_parts: u32,
}

impl ProgressView {
    /// Create a view for a run of `total_parts` parts.
    ///
    /// Bars are hidden when `hidden` is set or stderr is not a TTY.
    pub fn new(hidden: bool, total_parts: u32) -> Self {
        let target = if hidden || !std::io::stderr().is_terminal() {
            ProgressDrawTarget::hidden()
        } else {
            ProgressDrawTarget::stderr()
        };
        Self {
            multi: MultiProgress::with_draw_target(target),
            current: None,
            tracker: PhaseTracker::new(),
            total_parts,
        }
    }

    /// Apply one event. Returns `true` once the run-finished sentinel arrives.
    pub fn handle(&mut self, event: TransferEvent) -> bool {
        let finished = self.tracker.observe(&event);
        match event {
            TransferEvent::Started(part) => {
                let bar = self.multi.add(ProgressBar::new(100));
                bar.set_style(bar_style());
                bar.set_prefix(phase_label(part, self.total_parts));
                self.current = Some(bar);
            }
            TransferEvent::Progress(_, pct) => {
                if let Some(bar) = &self.current {
                    bar.set_position(u64::from(pct));
                }
            }
            TransferEvent::Completed(_) if finished => {}
            TransferEvent::Completed(_) => {
                if let Some(bar) = self.current.take() {
                    bar.set_position(100);
                    bar.finish_with_message(style("✓").green().to_string());
                }
            }
            TransferEvent::Failed(_) => {
                if let Some(bar) = self.current.take() {
                    bar.abandon_with_message(style("✗ failed").red().to_string());
                }
            }
        }
        finished
    }

    /// Leave the open bar, if any, marked as interrupted.
    pub fn interrupt(&mut self) {
        if let Some(bar) = self.current.take() {
            bar.abandon_with_message(style("interrupted").yellow().to_string());
        }
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

fn phase_label(part: Option<PartIndex>, total_parts: u32) -> String {
    match part {
        Some(part) => format!("part {} of {}", part, total_parts),
        None => "manifest".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(n: u32) -> Option<PartIndex> {
        Some(PartIndex::new(n).unwrap())
    }

    #[test]
    fn test_sentinel_is_detected() {
        let mut view = ProgressView::new(true, 1);
        assert!(!view.handle(TransferEvent::Started(None)));
        assert!(!view.handle(TransferEvent::Progress(None, 50)));
        assert!(!view.handle(TransferEvent::Completed(None)));
        assert!(!view.handle(TransferEvent::Started(part(1))));
        assert!(!view.handle(TransferEvent::Failed(part(1))));
        assert!(view.handle(TransferEvent::Completed(None)));
    }

    #[test]
    fn test_phase_label() {
        assert_eq!(phase_label(None, 4), "manifest");
        assert_eq!(phase_label(part(3), 4), "part 3 of 4");
    }
}
