//! INI configuration file.
//!
//! ```ini
//! [download]
//! base_url = https://fonts.example.org
//! data_dir = /home/user/.local/share/fontpack
//! total_parts = 4
//! total_items = 604
//! items_per_part = 200
//! timeout_secs = 300
//!
//! [logging]
//! level = info
//! directory = /home/user/.local/share/fontpack/logs
//! ```
//!
//! Every key is optional. A missing file yields the defaults.

use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::pipeline::{
    PipelineConfig, DEFAULT_ITEMS_PER_PART, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_TOTAL_ITEMS,
    DEFAULT_TOTAL_PARTS,
};

/// Name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

const DOWNLOAD_SECTION: &str = "download";
const LOGGING_SECTION: &str = "logging";

/// Errors reading or writing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    /// The file is not valid INI.
    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// A key holds a value of the wrong type.
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: String, value: String },

    /// The file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// Settings loaded from `config.ini`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    /// Base URL of the font server; required to download.
    pub base_url: Option<String>,
    /// Data directory holding manifests, fonts and scratch files.
    pub data_dir: PathBuf,
    pub total_parts: u32,
    pub total_items: u32,
    pub items_per_part: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Log level filter (`RUST_LOG` still takes precedence).
    pub log_level: String,
    /// Directory for rolling log files; stderr only when unset.
    pub log_directory: Option<PathBuf>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            base_url: None,
            data_dir: default_data_dir(),
            total_parts: DEFAULT_TOTAL_PARTS,
            total_items: DEFAULT_TOTAL_ITEMS,
            items_per_part: DEFAULT_ITEMS_PER_PART,
            timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_directory: None,
        }
    }
}

impl ConfigFile {
    /// Load from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`, falling back to defaults if the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| match e {
            ini::Error::Io(source) => ConfigError::Read {
                path: path.to_path_buf(),
                source,
            },
            ini::Error::Parse(e) => ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            },
        })?;

        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some(DOWNLOAD_SECTION)) {
            if let Some(url) = section.get("base_url").map(str::trim) {
                if !url.is_empty() {
                    config.base_url = Some(url.to_string());
                }
            }
            if let Some(dir) = section.get("data_dir").map(str::trim) {
                if !dir.is_empty() {
                    config.data_dir = expand_home(dir);
                }
            }
            parse_into(section.get("total_parts"), "download.total_parts", &mut config.total_parts)?;
            parse_into(section.get("total_items"), "download.total_items", &mut config.total_items)?;
            parse_into(
                section.get("items_per_part"),
                "download.items_per_part",
                &mut config.items_per_part,
            )?;
            parse_into(
                section.get("timeout_secs"),
                "download.timeout_secs",
                &mut config.timeout_secs,
            )?;
        }

        if config.items_per_part == 0 {
            return Err(ConfigError::Invalid {
                key: "download.items_per_part".to_string(),
                value: "0".to_string(),
            });
        }

        if let Some(section) = ini.section(Some(LOGGING_SECTION)) {
            if let Some(level) = section.get("level").map(str::trim) {
                if !level.is_empty() {
                    config.log_level = level.to_string();
                }
            }
            if let Some(dir) = section.get("directory").map(str::trim) {
                if !dir.is_empty() {
                    config.log_directory = Some(expand_home(dir));
                }
            }
        }

        Ok(config)
    }

    /// Write to `path`, creating its parent directory.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let to_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(to_err)?;
        }

        let mut ini = Ini::new();
        {
            let mut download = ini.with_section(Some(DOWNLOAD_SECTION));
            if let Some(url) = &self.base_url {
                download.set("base_url", url.as_str());
            }
            download
                .set("data_dir", self.data_dir.to_string_lossy())
                .set("total_parts", self.total_parts.to_string())
                .set("total_items", self.total_items.to_string())
                .set("items_per_part", self.items_per_part.to_string())
                .set("timeout_secs", self.timeout_secs.to_string());
        }
        {
            let mut logging = ini.with_section(Some(LOGGING_SECTION));
            logging.set("level", self.log_level.as_str());
            if let Some(dir) = &self.log_directory {
                logging.set("directory", dir.to_string_lossy());
            }
        }

        ini.write_to_file(path).map_err(to_err)
    }

    /// Pipeline settings derived from this file.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::new()
            .with_total_parts(self.total_parts)
            .with_total_items(self.total_items)
            .with_items_per_part(self.items_per_part)
            .with_request_timeout(Duration::from_secs(self.timeout_secs))
    }
}

/// Default location of the configuration file.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fontpack")
        .join(CONFIG_FILE_NAME)
}

/// Default data directory.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fontpack")
}

fn parse_into<T: FromStr>(raw: Option<&str>, key: &str, slot: &mut T) -> Result<(), ConfigError> {
    let Some(raw) = raw.map(str::trim) else {
        return Ok(());
    };
    if raw.is_empty() {
        return Ok(());
    }
    *slot = raw.parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value: raw.to_string(),
    })?;
    Ok(())
}

/// Expand a leading `~` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
