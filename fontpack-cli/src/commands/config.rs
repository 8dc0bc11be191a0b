//! Configuration CLI commands.
//!
//! Provides `config path` and `config show`.

use std::path::Path;

use clap::Subcommand;
use fontpack::config::{config_file_path, ConfigFile};

use super::common::load_config;
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Show the effective configuration
    Show,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config_path: Option<&Path>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => run_path(config_path),
        ConfigCommands::Show => run_show(config_path),
    }
}

fn run_path(config_path: Option<&Path>) -> Result<(), CliError> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path);
    println!("{}", path.display());
    Ok(())
}

fn run_show(config_path: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    for line in render(&config) {
        println!("{}", line);
    }
    Ok(())
}

fn render(config: &ConfigFile) -> Vec<String> {
    let or_unset = |value: Option<String>| value.unwrap_or_else(|| "(not set)".to_string());

    vec![
        "[download]".to_string(),
        format!("  base_url = {}", or_unset(config.base_url.clone())),
        format!("  data_dir = {}", config.data_dir.display()),
        format!("  total_parts = {}", config.total_parts),
        format!("  total_items = {}", config.total_items),
        format!("  items_per_part = {}", config.items_per_part),
        format!("  timeout_secs = {}", config.timeout_secs),
        String::new(),
        "[logging]".to_string(),
        format!("  level = {}", config.log_level),
        format!(
            "  directory = {}",
            or_unset(
                config
                    .log_directory
                    .as_ref()
                    .map(|d| d.display().to_string())
            )
        ),
    ]
}
