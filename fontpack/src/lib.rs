//! fontpack - resumable download of multi-part font sets.
//!
//! A font set is a JSON manifest plus a fixed number of zip parts, each
//! holding a contiguous range of font files. This library fetches the
//! manifest, works out which parts are already extracted, and streams and
//! expands the rest while reporting per-phase progress.
//!
//! # Modules
//!
//! - [`pipeline`]: run orchestration and the start/cancel service
//! - [`source`]: remote byte streams (HTTP)
//! - [`transfer`]: chunked copy with progress and cancellation
//! - [`extractor`]: zip expansion
//! - [`resume`]: resume point from files on disk
//! - [`layout`]: where manifests, fonts and scratch files live
//! - [`event`]: progress events and their phase contract
//! - [`config`]: INI configuration file
//! - [`logging`]: tracing subscriber setup

pub mod config;
pub mod event;
pub mod extractor;
pub mod layout;
pub mod logging;
pub mod pipeline;
pub mod resume;
pub mod source;
pub mod target;
pub mod transfer;

pub use event::TransferEvent;
pub use pipeline::{DownloadService, PipelineConfig, RunHandle, RunOutcome};
pub use target::{DownloadTarget, PartIndex};
