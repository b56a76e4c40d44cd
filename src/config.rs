//! Application configuration management.
//!
//! Engine settings that rarely change between runs are read from a JSON file
//! in the platform configuration directory. Every field is optional in the
//! file; command-line flags override whatever is loaded.
//!
//! ```json
//! {
//!   "heap_threshold": 1048576,
//!   "hash_algorithm": "sha1",
//!   "legacy_walker": false,
//!   "threads": 0
//! }
//! ```

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::file::{HashAlgorithm, HEAP_THRESHOLD};
use crate::scanner::ListerKind;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Files larger than this many bytes are memory-mapped.
    pub heap_threshold: u64,
    /// Digest algorithm.
    pub hash_algorithm: HashAlgorithm,
    /// Use the compatibility directory lister.
    pub legacy_walker: bool,
    /// I/O threads; 0 lets rayon decide.
    pub threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            heap_threshold: HEAP_THRESHOLD,
            hash_algorithm: HashAlgorithm::default(),
            legacy_walker: false,
            threads: 0,
        }
    }
}

impl Config {
    /// Load the configuration from the default platform-specific path.
    #[must_use]
    pub fn load() -> Self {
        match Self::config_path() {
            Ok(path) => Self::load_from(&path),
            Err(e) => {
                log::debug!("No config directory, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Load the configuration from `path`, falling back to defaults when the
    /// file is missing or unreadable.
    #[must_use]
    pub fn load_from(path: &Path) -> Self {
        match Self::read(path) {
            Ok(Some(config)) => {
                log::debug!("Loaded config from {}", path.display());
                config
            }
            Ok(None) => Self::default(),
            Err(e) => {
                log::debug!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content =
            fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(Some(config))
    }

    /// Save the configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file cannot
    /// be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Directory lister selected by this configuration.
    #[must_use]
    pub fn lister(&self) -> ListerKind {
        if self.legacy_walker {
            ListerKind::Compatibility
        } else {
            ListerKind::Standard
        }
    }

    /// Get the default platform-specific configuration path.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform has no home directory.
    pub fn config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("com", "dupfind", "dupfind")
            .ok_or_else(|| anyhow::anyhow!("Failed to determine project directories"))?;
        Ok(project_dirs.config_dir().join("config.json"))
    }
}
