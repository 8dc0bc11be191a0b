//! Settings resolution shared across CLI commands.
//!
//! Command-line flags take precedence over `config.ini`, which takes
//! precedence over built-in defaults.

use std::path::{Path, PathBuf};

use fontpack::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Load the config file at `path`, or at the default location.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_file_path);
    Ok(ConfigFile::load_from(&path)?)
}

/// Resolve the font server URL. Fails if neither the flag nor the config sets it.
pub fn require_base_url(cli_url: Option<String>, config: &ConfigFile) -> Result<String, CliError> {
    cli_url.or_else(|| config.base_url.clone()).ok_or_else(|| {
        CliError::Config(
            "No base URL specified. Use --base-url or set base_url in config.ini [download] section."
                .to_string(),
        )
    })
}

/// Resolve the data directory.
pub fn resolve_data_dir(cli_dir: Option<PathBuf>, config: &ConfigFile) -> PathBuf {
    cli_dir.unwrap_or_else(|| config.data_dir.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_url_takes_precedence() {
        let config = ConfigFile {
            base_url: Some("https://config.example".to_string()),
            ..Default::default()
        };
        let url = require_base_url(Some("https://flag.example".to_string()), &config).unwrap();
        assert_eq!(url, "https://flag.example");
        assert_eq!(
            require_base_url(None, &config).unwrap(),
            "https://config.example"
        );
    }

    #[test]
    fn test_missing_url_is_config_error() {
        let err = require_base_url(None, &ConfigFile::default()).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn test_missing_config_file_loads_defaults() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = load_config(Some(&temp.path().join("absent.ini"))).unwrap();
        assert_eq!(config, ConfigFile::default());
    }
}
