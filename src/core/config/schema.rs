//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Example
//!
//! ```toml
//! repository = "registry.example.com/team"
//!
//! [datastore]
//! type = "embedded"
//! db_path = "/var/lib/gzr/images.redb"
//!
//! [builder]
//! program = "docker"
//! timeout_secs = 1800
//! ```
//!
//! # Validation
//!
//! Values are validated after parsing: the backend kind must be known, the
//! fields that kind needs must be present, and `repository` must not carry a
//! `:` (it would collide with the key separator once composed into a tag).

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::store::BackendKind;

/// Default deadline for a single backend call.
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 5;

/// Default deadline for a single builder process.
pub const DEFAULT_BUILD_TIMEOUT_SECS: u64 = 1800;

/// Default builder program.
pub const DEFAULT_BUILDER_PROGRAM: &str = "docker";

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Registry namespace images are published under
    pub repository: Option<String>,

    /// Metadata backend selection
    pub datastore: Option<DatastoreConfig>,

    /// Builder process settings
    pub builder: Option<BuilderConfig>,
}

impl ConfigFile {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(repository) = &self.repository {
            if repository.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "repository cannot be empty".to_string(),
                ));
            }
            if repository.contains(':') {
                return Err(ConfigError::InvalidValue(format!(
                    "repository '{}' must not contain ':'",
                    repository
                )));
            }
        }

        if let Some(datastore) = &self.datastore {
            datastore.validate()?;
        }

        if let Some(builder) = &self.builder {
            builder.validate()?;
        }

        Ok(())
    }
}

/// Metadata backend configuration.
///
/// ```toml
/// [datastore]
/// type = "distributed"
/// host = "127.0.0.1"
/// port = 2379
/// timeout_secs = 5
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DatastoreConfig {
    /// Backend kind ("embedded" or "distributed"; "bolt" and "etcd" accepted)
    #[serde(rename = "type")]
    pub kind: Option<String>,

    /// Database file for the embedded backend
    pub db_path: Option<PathBuf>,

    /// Host for the distributed backend
    pub host: Option<String>,

    /// Port for the distributed backend
    pub port: Option<u16>,

    /// Per-call deadline in seconds
    pub timeout_secs: Option<u64>,
}

impl DatastoreConfig {
    /// Embedded configuration rooted at `db_path`.
    pub fn embedded(db_path: impl Into<PathBuf>) -> Self {
        Self {
            kind: Some(BackendKind::Embedded.name().to_string()),
            db_path: Some(db_path.into()),
            ..Default::default()
        }
    }

    /// Distributed configuration for `host:port`.
    pub fn distributed(host: impl Into<String>, port: u16) -> Self {
        Self {
            kind: Some(BackendKind::Distributed.name().to_string()),
            host: Some(host.into()),
            port: Some(port),
            ..Default::default()
        }
    }

    /// The configured backend kind.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the type is missing or unknown.
    pub fn backend_kind(&self) -> Result<BackendKind, ConfigError> {
        let kind = self.kind.as_deref().ok_or_else(|| {
            ConfigError::InvalidValue("datastore.type must be set".to_string())
        })?;
        BackendKind::parse(kind).ok_or_else(|| {
            ConfigError::InvalidValue(format!(
                "invalid datastore type '{}', must be one of: {}",
                kind,
                BackendKind::all()
                    .iter()
                    .map(|k| k.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
    }

    /// Per-call deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_STORE_TIMEOUT_SECS))
    }

    /// `host:port` endpoint for the distributed backend.
    pub fn endpoint(&self) -> Option<String> {
        match (&self.host, self.port) {
            (Some(host), Some(port)) => Some(format!("{}:{}", host, port)),
            _ => None,
        }
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.backend_kind()? {
            BackendKind::Embedded => {
                if self.db_path.as_ref().map_or(true, |p| p.as_os_str().is_empty()) {
                    return Err(ConfigError::InvalidValue(
                        "datastore.db_path is required for the embedded backend".to_string(),
                    ));
                }
            }
            BackendKind::Distributed => {
                if self.host.as_deref().map_or(true, str::is_empty) {
                    return Err(ConfigError::InvalidValue(
                        "datastore.host is required for the distributed backend".to_string(),
                    ));
                }
                if self.port.map_or(true, |p| p == 0) {
                    return Err(ConfigError::InvalidValue(
                        "datastore.port is required for the distributed backend".to_string(),
                    ));
                }
            }
        }

        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "datastore.timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder process configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BuilderConfig {
    /// Program used to build, tag, and push (default: "docker")
    pub program: Option<String>,

    /// Per-process deadline in seconds
    pub timeout_secs: Option<u64>,
}

impl BuilderConfig {
    /// Builder program name.
    pub fn program(&self) -> &str {
        self.program.as_deref().unwrap_or(DEFAULT_BUILDER_PROGRAM)
    }

    /// Per-process deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_BUILD_TIMEOUT_SECS))
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(program) = &self.program {
            if program.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "builder.program cannot be empty".to_string(),
                ));
            }
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "builder.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod config_file {
        use super::*;

        #[test]
        fn parses_full_document() {
            let toml = r#"
                repository = "registry.local/team"

                [datastore]
                type = "embedded"
                db_path = "/tmp/images.redb"

                [builder]
                program = "podman"
                timeout_secs = 60
            "#;
            let config: ConfigFile = toml::from_str(toml).unwrap();
            config.validate().unwrap();
            assert_eq!(config.repository.as_deref(), Some("registry.local/team"));
            let builder = config.builder.unwrap();
            assert_eq!(builder.program(), "podman");
            assert_eq!(builder.timeout(), Duration::from_secs(60));
        }

        #[test]
        fn rejects_unknown_fields() {
            let result: Result<ConfigFile, _> = toml::from_str("registry = \"x\"");
            assert!(result.is_err());
        }

        #[test]
        fn rejects_repository_with_colon() {
            let config = ConfigFile {
                repository: Some("registry.local:5000/team".to_string()),
                ..Default::default()
            };
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("must not contain ':'"));
        }

        #[test]
        fn empty_file_is_valid() {
            let config: ConfigFile = toml::from_str("").unwrap();
            config.validate().unwrap();
            assert!(config.datastore.is_none());
        }
    }

    mod datastore {
        use super::*;

        #[test]
        fn accepts_legacy_aliases() {
            let bolt = DatastoreConfig {
                kind: Some("bolt".to_string()),
                db_path: Some(PathBuf::from("/tmp/x.redb")),
                ..Default::default()
            };
            assert_eq!(bolt.backend_kind().unwrap(), BackendKind::Embedded);

            let etcd = DatastoreConfig {
                kind: Some("etcd".to_string()),
                ..DatastoreConfig::distributed("127.0.0.1", 2379)
            };
            assert_eq!(etcd.backend_kind().unwrap(), BackendKind::Distributed);
            assert_eq!(etcd.endpoint().as_deref(), Some("127.0.0.1:2379"));
        }

        #[test]
        fn rejects_unknown_kind() {
            let config = DatastoreConfig {
                kind: Some("sqlite".to_string()),
                ..Default::default()
            };
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("embedded, distributed"));
        }

        #[test]
        fn missing_kind_is_invalid() {
            assert!(DatastoreConfig::default().validate().is_err());
        }

        #[test]
        fn embedded_requires_path() {
            let config = DatastoreConfig {
                kind: Some("embedded".to_string()),
                ..Default::default()
            };
            assert!(config.validate().is_err());
            assert!(DatastoreConfig::embedded("/tmp/x.redb").validate().is_ok());
        }

        #[test]
        fn distributed_requires_host_and_port() {
            let mut config = DatastoreConfig::distributed("localhost", 2379);
            assert!(config.validate().is_ok());
            config.port = None;
            assert!(config.validate().is_err());
        }

        #[test]
        fn timeout_defaults_and_rejects_zero() {
            let mut config = DatastoreConfig::embedded("/tmp/x.redb");
            assert_eq!(
                config.timeout(),
                Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECS)
            );
            config.timeout_secs = Some(0);
            assert!(config.validate().is_err());
        }
    }
}
