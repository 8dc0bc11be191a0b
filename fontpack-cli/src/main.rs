//! fontpack CLI - download and inspect multi-part font sets.

mod commands;
mod error;
mod ui;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use fontpack::config::ConfigFile;
use fontpack::logging::{init_logging, LoggingGuard};

use commands::config::ConfigCommands;
use commands::download::DownloadArgs;
use commands::status::StatusArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "fontpack")]
#[command(version, about = "Resumable multi-part font-set downloader", long_about = None)]
struct Cli {
    /// Path to config.ini (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a font set, resuming from the parts already extracted
    Download {
        /// Font set key (e.g. "v2")
        target: String,

        /// Number of parts the set is split into
        #[arg(long)]
        parts: Option<u32>,

        /// Font server base URL
        #[arg(long)]
        base_url: Option<String>,

        /// Data directory for manifests and fonts
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Do not draw progress bars
        #[arg(long)]
        no_progress: bool,
    },

    /// Show the resume point of a font set
    Status {
        /// Font set key
        target: String,

        /// Data directory for manifests and fonts
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Download {
            target,
            parts,
            base_url,
            data_dir,
            timeout,
            no_progress,
        } => {
            let (config, _logging) = setup(config_path, cli.verbose)?;
            commands::download::run(
                DownloadArgs {
                    target,
                    parts,
                    base_url,
                    data_dir,
                    timeout,
                    no_progress,
                },
                &config,
            )
        }
        Commands::Status { target, data_dir } => {
            let (config, _logging) = setup(config_path, cli.verbose)?;
            commands::status::run(StatusArgs { target, data_dir }, &config)
        }
        // Works even when the config file itself does not load.
        Commands::Config(command) => commands::config::run(command, config_path),
    }
}

/// Load the config file and install logging.
fn setup(config_path: Option<&Path>, verbose: bool) -> Result<(ConfigFile, LoggingGuard), CliError> {
    let config = commands::common::load_config(config_path)?;
    let level = if verbose {
        "fontpack=debug"
    } else {
        config.log_level.as_str()
    };
    let guard = init_logging(level, config.log_directory.as_deref())?;
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "fontpack starting");
    Ok((config, guard))
}
