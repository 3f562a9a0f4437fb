//! Configuration file support for timelog.
//!
//! Loads configuration from TOML files:
//!
//! ```toml
//! recent_limit = 20
//!
//! [store]
//! data_dir = "/home/me/.config/timelog"
//! delimiter = ","
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flatrel_store::StoreConfig;
use serde::{Deserialize, Serialize};

/// timelog configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ConfigFile")]
pub struct TimelogConfig {
    /// Store settings. The data directory defaults to
    /// `$HOME/.config/timelog` unless `[store]` sets `data_dir`.
    pub store: StoreConfig,

    /// Number of tasks listed by `recent` when no limit is given.
    pub recent_limit: usize,
}

/// On-disk form; every key is optional.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    store: StoreSection,
    #[serde(default = "default_recent_limit")]
    recent_limit: usize,
}

#[derive(Debug, Default, Deserialize)]
struct StoreSection {
    data_dir: Option<PathBuf>,
    delimiter: Option<char>,
    extension: Option<String>,
}

impl From<ConfigFile> for TimelogConfig {
    fn from(file: ConfigFile) -> Self {
        let section = file.store;
        let mut store = StoreConfig::with_data_dir(section.data_dir.unwrap_or_else(default_data_dir));
        if let Some(delimiter) = section.delimiter {
            store = store.delimiter(delimiter);
        }
        if let Some(extension) = section.extension {
            store = store.extension(extension);
        }
        Self {
            store,
            recent_limit: file.recent_limit,
        }
    }
}

fn default_store() -> StoreConfig {
    StoreConfig::with_data_dir(default_data_dir())
}

fn default_recent_limit() -> usize {
    20
}

/// `$HOME/.config/timelog`, or `./timelog` when there is no home directory.
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".config").join("timelog"))
        .unwrap_or_else(|| PathBuf::from("timelog"))
}

impl Default for TimelogConfig {
    fn default() -> Self {
        Self {
            store: default_store(),
            recent_limit: default_recent_limit(),
        }
    }
}

impl TimelogConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.store.validate()?;
        Ok(config)
    }

    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Loads the default configuration file.
    ///
    /// Looks in the following locations:
    /// 1. ~/.config/timelog/config.toml (platform config dir)
    /// 2. Returns default if not found
    pub fn load_default() -> Result<Self> {
        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("timelog").join("config.toml");
            if path.exists() {
                return Self::from_file(&path);
            }
        }
        Ok(Self::default())
    }
}
