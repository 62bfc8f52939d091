//! core::config
//!
//! Configuration schema and loading.
//!
//! # Locations
//!
//! Searched in order, first existing file wins:
//! 1. An explicit path (the `--config` flag)
//! 2. `$GZR_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/gzr/config.toml`
//! 4. `~/.gzr/config.toml` (canonical location)
//!
//! An explicit path that does not exist is an error. When nothing is found
//! the defaults are used, and commands that need a datastore or repository
//! report what is missing.
//!
//! # Example
//!
//! ```no_run
//! use gozer::core::config::Config;
//!
//! let config = Config::load(None).unwrap();
//! let datastore = config.datastore().unwrap();
//! println!("backend: {}", datastore.backend_kind().unwrap().name());
//! ```

pub mod schema;

pub use schema::{BuilderConfig, ConfigFile, DatastoreConfig};

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "GZR_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("missing configuration: {0}")]
    Missing(&'static str),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed file contents
    pub file: ConfigFile,
    /// Path the file was loaded from (if any)
    path: Option<PathBuf>,
}

impl Config {
    /// Load configuration, preferring `explicit` over the default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if `explicit` is missing, or if a found file cannot
    /// be read, parsed, or validated. Missing default files are not an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::find_default(),
        };

        let Some(path) = path else {
            tracing::debug!("no config file found, using defaults");
            return Ok(Self::default());
        };

        let file = Self::read_config(&path)?;
        file.validate()?;
        tracing::debug!(path = %path.display(), "loaded config");

        Ok(Self {
            file,
            path: Some(path),
        })
    }

    /// Build a configuration from already-parsed contents.
    pub fn from_file(file: ConfigFile) -> Result<Self, ConfigError> {
        file.validate()?;
        Ok(Self { file, path: None })
    }

    fn find_default() -> Option<PathBuf> {
        // 1. Check $GZR_CONFIG
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check $XDG_CONFIG_HOME/gzr/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("gzr/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 3. Check ~/.gzr/config.toml
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".gzr/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        None
    }

    fn read_config(path: &Path) -> Result<ConfigFile, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get the canonical config path.
    ///
    /// Returns `~/.gzr/config.toml`.
    pub fn canonical_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".gzr/config.toml"))
    }

    /// The datastore section.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if no `[datastore]` is configured.
    pub fn datastore(&self) -> Result<&DatastoreConfig, ConfigError> {
        self.file
            .datastore
            .as_ref()
            .ok_or(ConfigError::Missing("[datastore] section"))
    }

    /// The registry namespace images are published under.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `repository` is not set.
    pub fn repository(&self) -> Result<&str, ConfigError> {
        self.file
            .repository
            .as_deref()
            .ok_or(ConfigError::Missing("repository"))
    }

    /// Builder settings, defaulted when absent.
    pub fn builder(&self) -> BuilderConfig {
        self.file.builder.clone().unwrap_or_default()
    }

    /// Get the path the configuration was loaded from.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
