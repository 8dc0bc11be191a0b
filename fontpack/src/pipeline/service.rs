//! Start/cancel control surface for pipeline runs.
//!
//! The [`DownloadService`] keeps a registry of active runs keyed by
//! [`DownloadTarget`]. Each target has at most one active run; targets are
//! independent of each other. Starting a target that is already running is a
//! no-op, as is cancelling a target that is idle.
//!
//! # Architecture
//!
//! ```text
//! caller ── start(target) ──► DownloadService ── spawn ──► Orchestrator task
//!   │                              │ registry                  │
//!   │◄──────── RunHandle ──────────┘ (token, outcome)          │
//!   │                                                          │
//!   │◄═════════════ TransferEvent (mpsc, unbounded) ═══════════╡
//!   │◄───────────── RunOutcome (watch) ────────────────────────┘
//! ```
//!
//! Callers only signal the run (through its `CancellationToken`); all run
//! state lives inside the task.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::config::PipelineConfig;
use super::orchestrator::{Orchestrator, PipelineDeps, RunOutcome};
use crate::event::TransferEvent;
use crate::extractor::{PartExtractor, ZipExtractor};
use crate::layout::{is_non_empty_file, StorageLayout};
use crate::resume::SetStatus;
use crate::source::RemoteSource;
use crate::target::{DownloadTarget, PartIndex};

type OutcomeReceiver = watch::Receiver<Option<RunOutcome>>;
type Registry = Arc<Mutex<HashMap<DownloadTarget, ActiveRun>>>;

/// Registry entry for a running target.
struct ActiveRun {
    id: u64,
    cancel: CancellationToken,
    outcome: OutcomeReceiver,
}

/// Removes a run's registry entry when its task ends, including by panic.
struct RegistryGuard {
    registry: Registry,
    target: DownloadTarget,
    id: u64,
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        let mut active = self.registry.lock();
        if active.get(&self.target).map(|run| run.id) == Some(self.id) {
            active.remove(&self.target);
        }
    }
}

/// Owns the collaborators and the registry of active runs.
pub struct DownloadService {
    deps: Arc<PipelineDeps>,
    active: Registry,
    next_id: AtomicU64,
}

impl DownloadService {
    /// Create a service that extracts parts with [`ZipExtractor`].
    pub fn new(
        source: Arc<dyn RemoteSource>,
        layout: Arc<dyn StorageLayout>,
        config: PipelineConfig,
    ) -> Self {
        Self::with_extractor(source, layout, Arc::new(ZipExtractor::new()), config)
    }

    /// Create a service with a custom part extractor.
    pub fn with_extractor(
        source: Arc<dyn RemoteSource>,
        layout: Arc<dyn StorageLayout>,
        extractor: Arc<dyn PartExtractor>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            deps: Arc::new(PipelineDeps {
                source,
                layout,
                extractor,
                config,
            }),
            active: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// The pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.deps.config
    }

    /// The storage layout runs write into.
    pub fn layout(&self) -> &dyn StorageLayout {
        self.deps.layout.as_ref()
    }

    /// Start a run with the configured part count.
    ///
    /// See [`start_with_parts`](Self::start_with_parts).
    pub fn start(&self, target: DownloadTarget) -> Option<RunHandle> {
        let total_parts = self.deps.config.total_parts;
        self.start_with_parts(target, total_parts)
    }

    /// Start a run fetching parts `1..=total_parts`.
    ///
    /// Returns `None` without side effects if a run for `target` is already
    /// active. Must be called from within a Tokio runtime.
    pub fn start_with_parts(&self, target: DownloadTarget, total_parts: u32) -> Option<RunHandle> {
        let mut active = self.active.lock();
        if active.contains_key(&target) {
            debug!(target_key = %target, "run already active, ignoring start request");
            return None;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = watch::channel(None);

        active.insert(
            target.clone(),
            ActiveRun {
                id,
                cancel: cancel.clone(),
                outcome: outcome_rx.clone(),
            },
        );
        drop(active);

        let orchestrator = Orchestrator::new(
            Arc::clone(&self.deps),
            target.clone(),
            total_parts,
            events_tx,
            cancel.clone(),
        );
        let guard = RegistryGuard {
            registry: Arc::clone(&self.active),
            target: target.clone(),
            id,
        };

        tokio::spawn(async move {
            let outcome = orchestrator.run().await;
            // Free the target before publishing, so a waiter can restart it.
            drop(guard);
            let _ = outcome_tx.send(Some(outcome));
        });

        Some(RunHandle {
            target,
            events: events_rx,
            cancel,
            outcome: outcome_rx,
        })
    }

    /// Cancel the active run for `target` and wait until its cleanup finished.
    ///
    /// Returns `false` if no run was active.
    pub async fn cancel(&self, target: &DownloadTarget) -> bool {
        let run = self
            .active
            .lock()
            .get(target)
            .map(|run| (run.cancel.clone(), run.outcome.clone()));

        match run {
            Some((cancel, mut outcome)) => {
                cancel.cancel();
                wait_for_outcome(&mut outcome).await;
                true
            }
            None => {
                debug!(target_key = %target, "no active run to cancel");
                false
            }
        }
    }

    /// Whether a run is active for `target`.
    pub fn is_running(&self, target: &DownloadTarget) -> bool {
        self.active.lock().contains_key(target)
    }

    /// The part a run for `target` would resume from, with the configured part count.
    pub async fn resume_point(&self, target: &DownloadTarget) -> PartIndex {
        self.deps
            .resume_point(target, self.deps.config.total_parts)
            .await
    }

    /// Whether a non-empty manifest for `target` is on disk.
    pub fn manifest_present(&self, target: &DownloadTarget) -> bool {
        is_non_empty_file(&self.deps.layout.manifest_path(target))
    }

    /// Manifest presence, extracted fonts and resume part for `target`.
    pub async fn status(&self, target: &DownloadTarget) -> SetStatus {
        self.deps
            .status(target, self.deps.config.total_parts)
            .await
    }
}

/// Handle to one run: its event stream, cancellation and outcome.
pub struct RunHandle {
    target: DownloadTarget,
    events: mpsc::UnboundedReceiver<TransferEvent>,
    cancel: CancellationToken,
    outcome: OutcomeReceiver,
}

impl RunHandle {
    /// The target being downloaded.
    pub fn target(&self) -> &DownloadTarget {
        &self.target
    }

    /// Next event of the run; `None` once the run has ended.
    pub async fn next_event(&mut self) -> Option<TransferEvent> {
        self.events.recv().await
    }

    /// A token that cancels this run when triggered.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the run and wait for its cleanup to finish.
    pub async fn cancel(mut self) -> RunOutcome {
        self.cancel.cancel();
        wait_for_outcome(&mut self.outcome).await
    }

    /// Wait for the run to end without consuming its events.
    pub async fn wait(mut self) -> RunOutcome {
        wait_for_outcome(&mut self.outcome).await
    }

    /// Drain every event until the stream closes, then return them with the outcome.
    pub async fn collect(mut self) -> (Vec<TransferEvent>, RunOutcome) {
        let mut events = Vec::new();
        while let Some(event) = self.events.recv().await {
            events.push(event);
        }
        let outcome = wait_for_outcome(&mut self.outcome).await;
        (events, outcome)
    }
}

async fn wait_for_outcome(outcome: &mut OutcomeReceiver) -> RunOutcome {
    match outcome.wait_for(Option::is_some).await {
        Ok(value) => (*value).clone().unwrap_or(RunOutcome::Aborted),
        Err(_) => RunOutcome::Aborted,
    }
}
