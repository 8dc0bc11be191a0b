//! Download pipeline for multi-part font sets.
//!
//! A run fetches the target's manifest, computes where to resume from the
//! files already extracted, then fetches and extracts every remaining part in
//! ascending order, one at a time.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       DownloadService                        │
//! │   registry: DownloadTarget → { CancellationToken, outcome }  │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │ spawn (one task per target)
//!                                ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Orchestrator                         │
//! │                                                              │
//! │  manifest ──► resume point ──► part 1 ──► part 2 ──► ... N   │
//! │     │              │             │                           │
//! │     ▼              ▼             ▼                           │
//! │ RemoteSource  ResumeLocator  RemoteSource ─► transfer ─►     │
//! │ + transfer                   scratch file ─► PartExtractor   │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │ TransferEvent
//!                                ▼
//!                        caller (RunHandle)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use fontpack::layout::DirectoryLayout;
//! use fontpack::pipeline::{DownloadService, PipelineConfig};
//! use fontpack::source::HttpSource;
//! use fontpack::target::DownloadTarget;
//!
//! let source = Arc::new(HttpSource::new("https://fonts.example.org")?);
//! let layout = Arc::new(DirectoryLayout::new("/var/lib/fontpack"));
//! let service = DownloadService::new(source, layout, PipelineConfig::default());
//!
//! if let Some(mut run) = service.start(DownloadTarget::new("v2")?) {
//!     while let Some(event) = run.next_event().await {
//!         println!("{event}");
//!     }
//!     println!("{:?}", run.wait().await);
//! }
//! ```

mod config;
mod error;
mod orchestrator;
mod service;
mod state;

pub use config::{
    PipelineConfig, DEFAULT_ITEMS_PER_PART, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_TOTAL_ITEMS,
    DEFAULT_TOTAL_PARTS,
};
pub use error::{PipelineError, PipelineResult};
pub use orchestrator::RunOutcome;
pub use service::{DownloadService, RunHandle};
