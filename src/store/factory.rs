//! store::factory
//!
//! Backend selection and creation.
//!
//! # Design
//!
//! Commands call [`create_store`] instead of constructing backends directly.
//! The backend is chosen from the `[datastore]` configuration section; the
//! legacy names `bolt` and `etcd` map onto the embedded and distributed
//! backends.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use gozer::core::clock::SystemClock;
//! use gozer::core::config::DatastoreConfig;
//! use gozer::store::create_store;
//!
//! # tokio_test::block_on(async {
//! let config = DatastoreConfig::embedded("/tmp/images.redb");
//! let store = create_store(&config, Arc::new(SystemClock)).await.unwrap();
//! println!("using {}", store.name());
//! # });
//! ```

use std::sync::Arc;

use super::distributed::DistributedStore;
use super::embedded::EmbeddedStore;
use super::traits::{MetadataStore, StoreError};
use crate::core::clock::Clock;
use crate::core::config::DatastoreConfig;

/// Supported metadata backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Single-file embedded database
    Embedded,
    /// Remote etcd cluster
    Distributed,
}

impl BackendKind {
    /// Get all backends.
    ///
    /// # Example
    ///
    /// ```
    /// use gozer::store::BackendKind;
    ///
    /// assert_eq!(BackendKind::all().len(), 2);
    /// ```
    pub fn all() -> &'static [BackendKind] {
        &[BackendKind::Embedded, BackendKind::Distributed]
    }

    /// Get the backend name as used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Embedded => "embedded",
            BackendKind::Distributed => "distributed",
        }
    }

    /// Parse a backend from a string.
    ///
    /// # Example
    ///
    /// ```
    /// use gozer::store::BackendKind;
    ///
    /// assert_eq!(BackendKind::parse("bolt"), Some(BackendKind::Embedded));
    /// assert_eq!(BackendKind::parse("ETCD"), Some(BackendKind::Distributed));
    /// assert_eq!(BackendKind::parse("sqlite"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "embedded" | "bolt" => Some(BackendKind::Embedded),
            "distributed" | "etcd" => Some(BackendKind::Distributed),
            _ => None,
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Create the backend described by `config`.
///
/// # Errors
///
/// - `NotConfigured` if the section is incomplete or names an unknown kind
/// - `BackendUnavailable` if the backend cannot be opened or reached
pub async fn create_store(
    config: &DatastoreConfig,
    clock: Arc<dyn Clock>,
) -> Result<Box<dyn MetadataStore>, StoreError> {
    config
        .validate()
        .map_err(|e| StoreError::NotConfigured(e.to_string()))?;

    match config.backend_kind() {
        Ok(BackendKind::Embedded) => {
            let path = config
                .db_path
                .as_deref()
                .ok_or_else(|| StoreError::NotConfigured("datastore.db_path".to_string()))?;
            tracing::debug!(path = %path.display(), "opening embedded store");
            Ok(Box::new(EmbeddedStore::open(path, clock)?))
        }
        Ok(BackendKind::Distributed) => {
            let endpoint = config.endpoint().ok_or_else(|| {
                StoreError::NotConfigured("datastore.host and datastore.port".to_string())
            })?;
            tracing::debug!(%endpoint, "connecting to distributed store");
            let store = DistributedStore::connect(&endpoint, config.timeout(), clock).await?;
            Ok(Box::new(store))
        }
        Err(e) => Err(StoreError::NotConfigured(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::SystemClock;

    #[test]
    fn names_roundtrip_through_parse() {
        for kind in BackendKind::all() {
            assert_eq!(BackendKind::parse(kind.name()), Some(*kind));
        }
    }

    #[tokio::test]
    async fn incomplete_config_is_not_configured() {
        let config = DatastoreConfig {
            kind: Some("embedded".to_string()),
            ..Default::default()
        };
        let result = create_store(&config, Arc::new(SystemClock)).await;
        assert!(matches!(result, Err(StoreError::NotConfigured(_))));
    }

    #[tokio::test]
    async fn embedded_config_opens_embedded_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = DatastoreConfig::embedded(dir.path().join("images.redb"));
        let store = create_store(&config, Arc::new(SystemClock)).await.unwrap();
        assert_eq!(store.name(), "embedded");
        store.cleanup().await.unwrap();
    }
}
