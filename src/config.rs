//! Configuration file for sampledb
//!
//! Loaded from `.sampledb.yaml` in the working directory when present:
//!
//! ```yaml
//! database: /data/lab/samples.json
//! schema: /data/lab/patient_centric.schema.json
//! delete_files: true
//! pretty: true
//! ```
//!
//! Command-line flags and `SAMPLEDB_PATH` take precedence over the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = ".sampledb.yaml";

/// Database file used when nothing else names one
pub const DEFAULT_DATABASE_FILE: &str = "samples.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Path of the JSON database
    pub database: PathBuf,
    /// JSON Schema used by `validate-db` instead of the bundled one
    pub schema: Option<PathBuf>,
    /// Delete BAM files from disk when they are removed from the database
    pub delete_files: bool,
    /// Pretty-print the database on write
    pub pretty: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE_FILE),
            schema: None,
            delete_files: true,
            pretty: true,
        }
    }
}

impl Config {
    /// Load the config.
    ///
    /// An explicitly given path must exist; the default file is optional.
    /// Relative paths inside the file resolve against the file's directory.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = std::fs::read_to_string(&path).map_err(|source| Error::FileReadError {
            path: path.clone(),
            source,
        })?;
        let mut config = Self::parse(&content).map_err(|err| Error::ConfigError {
            path: path.clone(),
            message: err.to_string(),
        })?;

        if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            config.database = base.join(&config.database);
            config.schema = config.schema.map(|schema| base.join(schema));
        }

        tracing::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.database, PathBuf::from("samples.json"));
        assert!(config.delete_files);
    }

    #[test]
    fn test_partial_file() {
        let config = Config::parse("delete_files: false\n").unwrap();
        assert!(!config.delete_files);
        assert!(config.pretty);
        assert_eq!(config.database, PathBuf::from(DEFAULT_DATABASE_FILE));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Config::parse("databse: x.json\n").is_err());
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("lab.yaml");
        std::fs::write(&path, "database: db/samples.json\nschema: schema.json\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.database, tmp.path().join("db/samples.json"));
        assert_eq!(config.schema, Some(tmp.path().join("schema.json")));
    }

    #[test]
    fn test_explicit_missing_file_fails() {
        let tmp = TempDir::new().unwrap();
        let result = Config::load(Some(&tmp.path().join("nope.yaml")));
        assert!(matches!(result, Err(Error::FileReadError { .. })));
    }
}
