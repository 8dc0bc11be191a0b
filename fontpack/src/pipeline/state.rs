//! Run state for a single pipeline run.
//!
//! `PipelineState` is owned by the run task and never shared. It records the
//! current phase, the outcome of each attempted part, and every scratch file
//! that has been opened for writing but not yet promoted, so that one
//! cleanup routine can remove them on completion, failure or cancellation.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::target::{DownloadTarget, PartIndex};

/// Phase of the run state machine.
///
/// ```text
/// Idle → FetchingManifest → ComputingResumePoint → FetchingPart(n) → ExtractingPart(n)
///                                                        ↑                  │
///                                                        └──── n + 1 ───────┤
///                                                                           ↓
///                                                                  AllPartsComplete → Idle
/// (any) ── cancellation / manifest failure ──► Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunPhase {
    /// Not yet started, or finished normally.
    Idle,
    /// Downloading the manifest.
    FetchingManifest,
    /// Scanning the output directory for the resume point.
    ComputingResumePoint,
    /// Streaming a part container to scratch.
    FetchingPart(PartIndex),
    /// Expanding a part container.
    ExtractingPart(PartIndex),
    /// Every part index has been processed.
    AllPartsComplete,
    /// Terminated by cancellation or an unrecoverable failure.
    Stopped,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::FetchingManifest => write!(f, "fetching manifest"),
            Self::ComputingResumePoint => write!(f, "computing resume point"),
            Self::FetchingPart(p) => write!(f, "fetching part {}", p),
            Self::ExtractingPart(p) => write!(f, "extracting part {}", p),
            Self::AllPartsComplete => write!(f, "all parts complete"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Mutable state of one run.
#[derive(Debug)]
pub(crate) struct PipelineState {
    target: DownloadTarget,
    phase: RunPhase,
    running: bool,
    pending_temp_files: BTreeSet<PathBuf>,
    completed: Vec<PartIndex>,
    failed: Vec<PartIndex>,
}

impl PipelineState {
    /// Create the state for a run that is starting now.
    pub fn new(target: DownloadTarget) -> Self {
        Self {
            target,
            phase: RunPhase::Idle,
            running: true,
            pending_temp_files: BTreeSet::new(),
            completed: Vec::new(),
            failed: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    #[cfg(test)]
    pub fn current_part(&self) -> Option<PartIndex> {
        match self.phase {
            RunPhase::FetchingPart(p) | RunPhase::ExtractingPart(p) => Some(p),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Move to a new phase.
    pub fn transition(&mut self, phase: RunPhase) {
        tracing::debug!(target_key = %self.target, from = %self.phase, to = %phase, "phase transition");
        self.phase = phase;
    }

    /// Track a scratch file before anything is written to it.
    pub fn register_temp(&mut self, path: PathBuf) {
        self.pending_temp_files.insert(path);
    }

    /// Stop tracking a scratch file that has been moved into place or consumed.
    pub fn promote(&mut self, path: &Path) {
        self.pending_temp_files.remove(path);
    }

    /// Delete a tracked scratch file and stop tracking it.
    pub fn discard(&mut self, path: &Path) {
        if self.pending_temp_files.remove(path) {
            remove_quietly(path);
        }
    }

    #[cfg(test)]
    pub fn pending_temp_files(&self) -> impl Iterator<Item = &Path> {
        self.pending_temp_files.iter().map(PathBuf::as_path)
    }

    /// Record a part that was fetched and extracted.
    pub fn record_success(&mut self, part: PartIndex) {
        self.completed.push(part);
    }

    /// Record a part that failed.
    pub fn record_failure(&mut self, part: PartIndex) {
        self.failed.push(part);
    }

    /// Parts completed during this run.
    pub fn completed(&self) -> &[PartIndex] {
        &self.completed
    }

    /// Parts that failed during this run.
    pub fn failed(&self) -> &[PartIndex] {
        &self.failed
    }

    /// Tear the run down: delete every tracked scratch file, clear the
    /// running flag and settle in `final_phase`.
    ///
    /// Deletion is best effort; errors are logged and ignored.
    pub fn finish(&mut self, final_phase: RunPhase) {
        for path in std::mem::take(&mut self.pending_temp_files) {
            remove_quietly(&path);
        }
        self.running = false;
        self.transition(final_phase);
    }
}

impl Drop for PipelineState {
    fn drop(&mut self) {
        // Task aborted or runtime shut down before `finish` ran.
        if self.running || !self.pending_temp_files.is_empty() {
            self.finish(RunPhase::Stopped);
        }
    }
}

fn remove_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed temporary file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "failed to remove temporary file")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn state() -> PipelineState {
        PipelineState::new(DownloadTarget::new("kfqpc").unwrap())
    }

    #[test]
    fn test_pipeline_state_new() {
        let state = state();
        assert!(state.is_running());
        assert_eq!(state.phase(), RunPhase::Idle);
        assert_eq!(state.current_part(), None);
        assert_eq!(state.pending_temp_files().count(), 0);
    }

    #[test]
    fn test_transition_tracks_current_part() {
        let mut state = state();
        let part = PartIndex::new(2).unwrap();

        state.transition(RunPhase::FetchingPart(part));
        assert_eq!(state.current_part(), Some(part));

        state.transition(RunPhase::ExtractingPart(part));
        assert_eq!(state.current_part(), Some(part));

        state.transition(RunPhase::AllPartsComplete);
        assert_eq!(state.current_part(), None);
    }

    #[test]
    fn test_promote_keeps_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.zip");
        fs::write(&file, b"x").unwrap();

        let mut state = state();
        state.register_temp(file.clone());
        state.promote(&file);
        state.finish(RunPhase::Idle);

        assert!(file.exists());
    }

    #[test]
    fn test_discard_removes_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.zip");
        fs::write(&file, b"x").unwrap();

        let mut state = state();
        state.register_temp(file.clone());
        state.discard(&file);

        assert!(!file.exists());
        assert_eq!(state.pending_temp_files().count(), 0);
    }

    #[test]
    fn test_finish_removes_pending_files() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join("a.zip");
        let second = temp.path().join("b.zip");
        fs::write(&first, b"x").unwrap();
        fs::write(&second, b"y").unwrap();

        let mut state = state();
        state.register_temp(first.clone());
        state.register_temp(second.clone());
        // Registered but never created.
        state.register_temp(temp.path().join("c.zip"));
        state.finish(RunPhase::Stopped);

        assert!(!first.exists());
        assert!(!second.exists());
        assert!(!state.is_running());
        assert_eq!(state.phase(), RunPhase::Stopped);
        assert_eq!(state.pending_temp_files().count(), 0);
    }

    #[test]
    fn test_drop_cleans_up() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.zip");
        fs::write(&file, b"x").unwrap();

        {
            let mut state = state();
            state.register_temp(file.clone());
        }

        assert!(!file.exists());
    }

    #[test]
    fn test_record_outcomes() {
        let mut state = state();
        state.record_success(PartIndex::new(1).unwrap());
        state.record_failure(PartIndex::new(2).unwrap());

        assert_eq!(state.completed(), &[PartIndex::new(1).unwrap()]);
        assert_eq!(state.failed(), &[PartIndex::new(2).unwrap()]);
    }
}
