//! Status command - report what a download would resume from.

use std::path::PathBuf;

use fontpack::config::ConfigFile;
use fontpack::layout::{DirectoryLayout, StorageLayout};
use fontpack::resume::ResumeLocator;
use fontpack::DownloadTarget;

use super::common::resolve_data_dir;
use crate::error::CliError;

/// Arguments for the status command.
pub struct StatusArgs {
    pub target: String,
    pub data_dir: Option<PathBuf>,
}

/// Run the status command.
pub fn run(args: StatusArgs, config: &ConfigFile) -> Result<(), CliError> {
    let target: DownloadTarget = args.target.parse()?;
    let layout = DirectoryLayout::new(resolve_data_dir(args.data_dir, config));
    let locator = ResumeLocator::new(
        config.total_items,
        config.items_per_part,
        config.total_parts,
    );

    let status = locator.inspect(&layout, &target);
    let manifest = layout.manifest_path(&target);

    println!("Target:      {}", target);
    println!(
        "Manifest:    {} ({})",
        if status.manifest_present {
            "present"
        } else {
            "missing"
        },
        manifest.display()
    );
    println!(
        "Fonts:       {}/{} contiguous",
        status.contiguous_items, config.total_items
    );
    if status.complete {
        println!("Resume from: nothing to fetch");
    } else {
        println!(
            "Resume from: part {} of {}",
            status.resume_part, config.total_parts
        );
    }

    Ok(())
}
