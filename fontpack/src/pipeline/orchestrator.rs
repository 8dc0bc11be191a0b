//! Run orchestration: manifest, resume point, then parts in order.
//!
//! One [`Orchestrator`] drives one run from start to teardown inside a single
//! task. It is the only producer of the run's events and the only owner of
//! its [`PipelineState`].
//!
//! # Failure policy
//!
//! - A manifest failure aborts the run (`Failed(None)`, no parts attempted).
//! - A part failure is contained: `Failed(n)` is emitted, the part's scratch
//!   file is removed and the loop moves on to part `n + 1`.
//! - Cancellation stops the in-flight phase at the next chunk boundary,
//!   suppresses every further event and removes all scratch files.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::BufWriter;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::PipelineConfig;
use super::error::{PipelineError, PipelineResult};
use super::state::{PipelineState, RunPhase};
use crate::event::TransferEvent;
use crate::extractor::{ExtractionError, PartExtractor};
use crate::layout::{is_non_empty_file, StorageLayout};
use crate::resume::{ResumeLocator, SetStatus};
use crate::source::{BoxFuture, RemoteBody, RemoteSource, TransportError};
use crate::target::{DownloadTarget, PartIndex};
use crate::transfer::transfer;

/// Write buffer in front of scratch files.
const SCRATCH_WRITE_BUFFER: usize = 64 * 1024;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every part index was processed; some parts may have failed.
    Finished {
        /// Parts fetched and extracted during this run.
        completed: Vec<PartIndex>,
        /// Parts that failed during this run.
        failed: Vec<PartIndex>,
    },
    /// The manifest could not be fetched; no part was attempted.
    ManifestFailed {
        /// The manifest does not exist remotely.
        not_found: bool,
        /// Human-readable cause.
        reason: String,
    },
    /// The run was cancelled.
    Cancelled,
    /// The run task ended without reporting an outcome.
    Aborted,
}

impl RunOutcome {
    /// Whether the run finished with no failed part.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Finished { failed, .. } if failed.is_empty())
    }
}

/// Collaborators shared by every run of a service.
pub(crate) struct PipelineDeps {
    pub source: Arc<dyn RemoteSource>,
    pub layout: Arc<dyn StorageLayout>,
    pub extractor: Arc<dyn PartExtractor>,
    pub config: PipelineConfig,
}

impl PipelineDeps {
    /// Inspect what is on disk for `target` off the async executor.
    pub async fn status(&self, target: &DownloadTarget, total_parts: u32) -> SetStatus {
        let layout = Arc::clone(&self.layout);
        let locator = ResumeLocator::new(
            self.config.total_items,
            self.config.items_per_part,
            total_parts,
        );
        let owned = target.clone();

        match tokio::task::spawn_blocking(move || locator.inspect(layout.as_ref(), &owned)).await {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, "resume scan failed, restarting from part 1");
                SetStatus {
                    manifest_present: is_non_empty_file(&self.layout.manifest_path(target)),
                    contiguous_items: 0,
                    resume_part: PartIndex::FIRST,
                    complete: false,
                }
            }
        }
    }

    /// The part a run over `1..=total_parts` resumes from.
    pub async fn resume_point(&self, target: &DownloadTarget, total_parts: u32) -> PartIndex {
        self.status(target, total_parts).await.resume_part
    }
}

/// Sends events unless the run has been cancelled.
#[derive(Clone)]
struct EventEmitter {
    tx: mpsc::UnboundedSender<TransferEvent>,
    cancel: CancellationToken,
}

impl EventEmitter {
    fn emit(&self, event: TransferEvent) {
        if self.cancel.is_cancelled() {
            return;
        }
        // A dropped receiver only means nobody is listening.
        let _ = self.tx.send(event);
    }
}

/// Drives a single run.
pub(crate) struct Orchestrator {
    deps: Arc<PipelineDeps>,
    target: DownloadTarget,
    total_parts: u32,
    cancel: CancellationToken,
    emitter: EventEmitter,
    state: PipelineState,
}

impl Orchestrator {
    pub fn new(
        deps: Arc<PipelineDeps>,
        target: DownloadTarget,
        total_parts: u32,
        events: mpsc::UnboundedSender<TransferEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            deps,
            state: PipelineState::new(target.clone()),
            target,
            total_parts,
            emitter: EventEmitter {
                tx: events,
                cancel: cancel.clone(),
            },
            cancel,
        }
    }

    /// Run to completion and tear down. Dropping `self` closes the event stream.
    pub async fn run(mut self) -> RunOutcome {
        info!(target_key = %self.target, total_parts = self.total_parts, "download run started");

        let outcome = self.drive().await;
        let final_phase = match outcome {
            RunOutcome::Finished { .. } => RunPhase::Idle,
            _ => RunPhase::Stopped,
        };
        self.state.finish(final_phase);

        match &outcome {
            RunOutcome::Finished { completed, failed } => info!(
                target_key = %self.target,
                completed = completed.len(),
                failed = failed.len(),
                "download run finished"
            ),
            RunOutcome::ManifestFailed { reason, .. } => {
                warn!(target_key = %self.target, reason = %reason, "download run aborted")
            }
            RunOutcome::Cancelled | RunOutcome::Aborted => {
                info!(target_key = %self.target, "download run cancelled")
            }
        }
        outcome
    }

    async fn drive(&mut self) -> RunOutcome {
        if let Err(e) = self.ensure_manifest().await {
            if e.is_cancelled() || self.cancel.is_cancelled() {
                return RunOutcome::Cancelled;
            }
            warn!(target_key = %self.target, error = %e, "manifest fetch failed");
            self.emitter.emit(TransferEvent::Failed(None));
            return RunOutcome::ManifestFailed {
                not_found: e.is_not_found(),
                reason: e.to_string(),
            };
        }

        self.state.transition(RunPhase::ComputingResumePoint);
        let resume = self
            .deps
            .resume_point(&self.target, self.total_parts)
            .await;
        info!(target_key = %self.target, resume_part = resume.get(), "resuming download");

        for part in PartIndex::range(self.total_parts) {
            if self.cancel.is_cancelled() {
                return RunOutcome::Cancelled;
            }
            if part < resume {
                debug!(part = part.get(), "part already extracted, skipping");
                continue;
            }

            match self.fetch_part(part).await {
                Ok(()) => {
                    self.state.record_success(part);
                    self.emitter.emit(TransferEvent::Completed(Some(part)));
                }
                Err(e) if e.is_cancelled() || self.cancel.is_cancelled() => {
                    return RunOutcome::Cancelled;
                }
                Err(e) => {
                    warn!(part = part.get(), error = %e, "part failed, continuing with next part");
                    self.state.record_failure(part);
                    self.emitter.emit(TransferEvent::Failed(Some(part)));
                }
            }
        }

        self.state.transition(RunPhase::AllPartsComplete);
        self.emitter.emit(TransferEvent::Completed(None));

        RunOutcome::Finished {
            completed: self.state.completed().to_vec(),
            failed: self.state.failed().to_vec(),
        }
    }

    /// Fetch the manifest unless a non-empty copy is already on disk.
    async fn ensure_manifest(&mut self) -> PipelineResult<()> {
        let manifest_path = self.deps.layout.manifest_path(&self.target);
        if is_non_empty_file(&manifest_path) {
            debug!(path = %manifest_path.display(), "manifest present, skipping fetch");
            return Ok(());
        }

        self.state.transition(RunPhase::FetchingManifest);
        self.emitter.emit(TransferEvent::Started(None));

        let (scratch, file) = self.create_scratch(&format!("script_{}.json", self.target))?;
        let result = self.download_manifest(&scratch, file, &manifest_path).await;
        if result.is_err() {
            self.state.discard(&scratch);
        } else {
            self.state.promote(&scratch);
        }
        result?;

        self.emitter.emit(TransferEvent::Completed(None));
        Ok(())
    }

    async fn download_manifest(
        &self,
        scratch: &Path,
        file: std::fs::File,
        manifest_path: &Path,
    ) -> PipelineResult<()> {
        let body = self
            .open(self.deps.source.fetch_manifest(&self.target))
            .await?;
        self.emitter.emit(TransferEvent::Progress(None, 0));
        self.stream(None, body, file).await?;

        move_into_place(scratch, manifest_path)
            .await
            .map_err(|e| PipelineError::Promote {
                path: manifest_path.to_path_buf(),
                source: e,
            })
    }

    /// Fetch and extract one part, cleaning up its scratch file either way.
    async fn fetch_part(&mut self, part: PartIndex) -> PipelineResult<()> {
        self.state.transition(RunPhase::FetchingPart(part));
        self.emitter.emit(TransferEvent::Started(Some(part)));

        let (scratch, file) = self.create_scratch(&format!("{}-{}.zip", self.target, part))?;
        let result = self.download_part(part, &scratch, file).await;
        match &result {
            // The extractor consumed the container.
            Ok(()) => self.state.promote(&scratch),
            Err(_) => self.state.discard(&scratch),
        }
        result
    }

    async fn download_part(
        &mut self,
        part: PartIndex,
        scratch: &Path,
        file: std::fs::File,
    ) -> PipelineResult<()> {
        let body = self
            .open(self.deps.source.fetch_part(&self.target, part))
            .await?;
        self.emitter.emit(TransferEvent::Progress(Some(part), 0));
        let bytes = self.stream(Some(part), body, file).await?;
        debug!(part = part.get(), bytes, "part downloaded");

        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        self.state.transition(RunPhase::ExtractingPart(part));
        let extractor = Arc::clone(&self.deps.extractor);
        let container = scratch.to_path_buf();
        let dest = self.deps.layout.output_dir(&self.target);
        let files = tokio::task::spawn_blocking(move || extractor.extract(&container, &dest))
            .await
            .map_err(|e| ExtractionError::Task(e.to_string()))??;
        debug!(part = part.get(), files, "part extracted");

        Ok(())
    }

    /// Await a remote open, giving up as soon as the run is cancelled.
    async fn open(
        &self,
        request: BoxFuture<'_, Result<RemoteBody, TransportError>>,
    ) -> PipelineResult<RemoteBody> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(PipelineError::Cancelled),
            body = request => Ok(body?),
        }
    }

    /// Stream a body into a scratch file, emitting de-duplicated progress.
    async fn stream(
        &self,
        part: Option<PartIndex>,
        body: RemoteBody,
        file: std::fs::File,
    ) -> PipelineResult<u64> {
        let sink = BufWriter::with_capacity(SCRATCH_WRITE_BUFFER, tokio::fs::File::from_std(file));
        let emitter = &self.emitter;
        let mut last = 0u8;

        let bytes = transfer(
            body.reader,
            sink,
            body.total_bytes,
            self.deps.config.buffer_size,
            &self.cancel,
            |pct| {
                if pct > last {
                    last = pct;
                    emitter.emit(TransferEvent::Progress(part, pct));
                }
            },
        )
        .await?;

        Ok(bytes)
    }

    /// Create a uniquely named scratch file and register it before any write.
    fn create_scratch(&mut self, suffix: &str) -> PipelineResult<(PathBuf, std::fs::File)> {
        let dir = self.deps.layout.scratch_dir();
        let to_err = |e: io::Error| PipelineError::TempFile {
            dir: dir.clone(),
            source: e,
        };

        std::fs::create_dir_all(&dir).map_err(to_err)?;
        let (file, path) = tempfile::Builder::new()
            .prefix("tmp")
            .suffix(suffix)
            .tempfile_in(&dir)
            .map_err(to_err)?
            .keep()
            .map_err(|e| to_err(e.error))?;

        self.state.register_temp(path.clone());
        Ok((path, file))
    }
}

/// Rename `from` onto `to`, copying when they live on different filesystems.
async fn move_into_place(from: &Path, to: &Path) -> io::Result<()> {
    if let Some(parent) = to.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to).await?;
    tokio::fs::remove_file(from).await
}
