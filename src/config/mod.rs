//! Configuration management for LazyTable.
//!
//! Settings live in a TOML file at `<config_dir>/lazytable/config.toml`.
//! Every field has a default, so a missing file or a partial file is fine.

mod settings;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub use settings::{CsvSettings, ImageSettings};

/// Default storage quota, mirroring the browser's per-origin limit.
pub const DEFAULT_STORAGE_QUOTA_BYTES: u64 = 5 * 1024 * 1024;

/// Default number of rows generated on first launch.
pub const DEFAULT_SAMPLE_ROWS: usize = 50;

/// Errors that can occur while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform has no configuration directory.
    #[error("Could not determine configuration directory")]
    NoConfigDir,

    /// The configuration directory could not be created.
    #[error("Failed to create configuration directory: {0}")]
    CreateDirError(#[source] std::io::Error),

    /// The configuration file could not be read.
    #[error("Failed to read configuration file: {0}")]
    ReadError(#[source] std::io::Error),

    /// The configuration file could not be written.
    #[error("Failed to write configuration file: {0}")]
    WriteError(#[source] std::io::Error),

    /// The configuration file is not valid TOML for [`Config`].
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    /// The configuration could not be serialized.
    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// A value is out of range.
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Overrides the directory holding `tableData.json` and `appState.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Whether `h`/`j`/`k`/`l` move the cursor.
    pub vim_mode: bool,
    /// Largest document the storage layer will write.
    pub storage_quota_bytes: u64,
    /// Rows generated when there is no saved table.
    pub sample_rows: usize,
    /// Persist after every mutation instead of only on Ctrl+S.
    pub autosave: bool,
    pub image: ImageSettings,
    pub csv: CsvSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            vim_mode: true,
            storage_quota_bytes: DEFAULT_STORAGE_QUOTA_BYTES,
            sample_rows: DEFAULT_SAMPLE_ROWS,
            autosave: true,
            image: ImageSettings::default(),
            csv: CsvSettings::default(),
        }
    }
}

impl Config {
    /// The default configuration file path.
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("lazytable").join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load from the default path.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load from a file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Write to a file, creating its directory.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::CreateDirError)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(ConfigError::WriteError)?;
        debug!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        self.image.validate()?;
        if self.storage_quota_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "storage_quota_bytes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// The storage directory: the override, or `<data_local_dir>/lazytable`.
    pub fn resolved_data_dir(&self) -> Option<PathBuf> {
        self.data_dir
            .clone()
            .or_else(|| dirs::data_local_dir().map(|dir| dir.join("lazytable")))
    }
}
