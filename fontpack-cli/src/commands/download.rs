//! Download command - fetch a font set, resuming where a previous run stopped.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use console::style;
use fontpack::config::ConfigFile;
use fontpack::layout::DirectoryLayout;
use fontpack::source::HttpSource;
use fontpack::{DownloadService, DownloadTarget, PartIndex, RunOutcome};
use tracing::{debug, info};

use super::common::{require_base_url, resolve_data_dir};
use crate::error::CliError;
use crate::ui::ProgressView;

/// Arguments for the download command.
pub struct DownloadArgs {
    pub target: String,
    pub parts: Option<u32>,
    pub base_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub timeout: Option<u64>,
    pub no_progress: bool,
}

/// Run the download command.
pub fn run(args: DownloadArgs, config: &ConfigFile) -> Result<(), CliError> {
    let target: DownloadTarget = args.target.parse()?;
    let base_url = require_base_url(args.base_url, config)?;
    let data_dir = resolve_data_dir(args.data_dir, config);

    let mut pipeline = config.pipeline_config();
    if let Some(parts) = args.parts {
        pipeline = pipeline.with_total_parts(parts);
    }
    if let Some(secs) = args.timeout {
        pipeline = pipeline.with_request_timeout(Duration::from_secs(secs));
    }

    let source = HttpSource::with_timeout(&base_url, pipeline.request_timeout)?;
    let layout = DirectoryLayout::new(&data_dir);
    let no_progress = args.no_progress;
    let total_parts = pipeline.total_parts;

    println!("Target:     {}", target);
    println!("Server:     {}", base_url);
    println!("Data dir:   {}", data_dir.display());
    println!("Parts:      {}", pipeline.total_parts);
    println!();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    let outcome = runtime.block_on(async {
        let service = DownloadService::new(Arc::new(source), Arc::new(layout), pipeline);
        let mut handle = service
            .start(target.clone())
            .ok_or_else(|| {
                CliError::Config(format!("a download of {} is already running", target))
            })?;

        let cancel = handle.cancel_token();
        ctrlc::set_handler(move || {
            eprintln!();
            eprintln!("Received interrupt, cancelling download...");
            cancel.cancel();
        })
        .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

        let mut view = ProgressView::new(no_progress, total_parts);
        while let Some(event) = handle.next_event().await {
            debug!(event = %event, "transfer event");
            view.handle(event);
        }
        let outcome = handle.wait().await;
        if matches!(outcome, RunOutcome::Cancelled | RunOutcome::Aborted) {
            view.interrupt();
        }
        Ok::<_, CliError>(outcome)
    })?;

    info!(target_key = %target, outcome = ?outcome, "download finished");
    report(outcome)
}

/// Print the summary and map the outcome to the exit status.
fn report(outcome: RunOutcome) -> Result<(), CliError> {
    println!();
    match outcome {
        RunOutcome::Finished { completed, failed } if failed.is_empty() => {
            if completed.is_empty() {
                println!("{} Font set already complete", style("✓").green());
            } else {
                println!(
                    "{} Downloaded {} part(s)",
                    style("✓").green(),
                    completed.len()
                );
            }
            Ok(())
        }
        RunOutcome::Finished { completed, failed } => {
            println!(
                "{} Downloaded {} part(s), {} failed",
                style("✗").red(),
                completed.len(),
                failed.len()
            );
            println!("  Run the command again to retry the missing parts.");
            Err(CliError::PartsFailed {
                count: failed.len(),
                parts: join_parts(&failed),
            })
        }
        RunOutcome::ManifestFailed { not_found, reason } => {
            if not_found {
                println!("{} Font set not found on the server", style("✗").red());
            }
            Err(CliError::ManifestFailed(reason))
        }
        RunOutcome::Cancelled => Err(CliError::Cancelled),
        RunOutcome::Aborted => Err(CliError::Aborted),
    }
}

fn join_parts(parts: &[PartIndex]) -> String {
    parts
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
