//! Store configuration.
//!
//! The store consumes one directory and a couple of encoding knobs. The
//! configuration can be built in code or loaded from a TOML document:
//!
//! ```toml
//! data_dir = "/home/me/.config/timelog"
//! delimiter = ","
//! extension = "csv"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Configuration for a [`Catalog`](crate::Catalog).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding one backing file per schema.
    pub data_dir: PathBuf,

    /// Field delimiter used in backing files.
    /// Default: `,`
    pub delimiter: char,

    /// File extension of backing files, without the dot.
    /// Default: `csv`
    pub extension: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            delimiter: ',',
            extension: "csv".to_string(),
        }
    }
}

impl StoreConfig {
    /// Creates a configuration for the given data directory.
    #[must_use]
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Sets the field delimiter.
    #[must_use]
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Sets the backing file extension.
    #[must_use]
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Parses a configuration from a TOML document.
    pub fn from_toml_str(content: &str) -> StoreResult<Self> {
        let config: StoreConfig =
            toml::from_str(content).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> StoreResult<()> {
        if matches!(self.delimiter, '"' | '\n' | '\r') {
            return Err(StoreError::Config(format!(
                "delimiter {:?} conflicts with record framing",
                self.delimiter
            )));
        }
        if self.extension.is_empty() || self.extension.contains(['/', '.']) {
            return Err(StoreError::Config(format!(
                "invalid file extension {:?}",
                self.extension
            )));
        }
        Ok(())
    }

    /// Returns the backing file path for a schema name.
    pub fn table_path(&self, schema_name: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}.{}", schema_name.to_lowercase(), self.extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.delimiter, ',');
        assert_eq!(config.extension, "csv");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_table_path_lowercases_schema() {
        let config = StoreConfig::with_data_dir("/tmp/store");
        assert_eq!(
            config.table_path("Parent"),
            PathBuf::from("/tmp/store/parent.csv")
        );
    }

    #[test]
    fn test_from_toml() {
        let config = StoreConfig::from_toml_str(
            r#"
            data_dir = "/var/lib/flatrel"
            delimiter = ";"
            "#,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/flatrel"));
        assert_eq!(config.delimiter, ';');
        assert_eq!(config.extension, "csv");
    }

    #[test]
    fn test_rejects_quote_delimiter() {
        let config = StoreConfig::default().delimiter('"');
        assert!(matches!(config.validate(), Err(StoreError::Config(_))));

        let config = StoreConfig::default().extension("");
        assert!(config.validate().is_err());
    }
}
