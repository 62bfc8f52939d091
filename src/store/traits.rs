//! store::traits
//!
//! Metadata store trait definitions.
//!
//! # Design
//!
//! Writes go through an owned transaction handle returned by
//! [`MetadataStore::begin`]. The handle is bound to the store that created it
//! and ends in exactly one of `commit` or `rollback`; both consume it, so a
//! finished transaction cannot be reused. Dropping an unfinished handle rolls
//! it back.
//!
//! Reads go straight to the store and never observe uncommitted writes.
//!
//! # Example
//!
//! ```ignore
//! use gozer::store::{MetadataStore, StoreError};
//! use gozer::core::metadata::ArtifactMetadata;
//!
//! async fn record(store: &dyn MetadataStore, meta: &ArtifactMetadata) -> Result<(), StoreError> {
//!     let mut txn = store.begin().await?;
//!     txn.store("web:20240101.abc1234", meta).await?;
//!     txn.commit().await
//! }
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::core::key::{decode_prefix, ImageName, KeyError};
use crate::core::metadata::{ArtifactMetadata, ImageRecord, ImageRecordList};

/// Errors from metadata store operations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The identifier is not a valid image name.
    #[error("{0}")]
    InvalidName(String),

    /// A facade write was attempted with no open transaction.
    #[error("no active transaction; call start_transaction first")]
    NoActiveTransaction,

    /// A facade transaction was started while another is open.
    #[error("a transaction is already in progress on this store")]
    TransactionInProgress,

    /// A name:version lookup matched more than one record.
    #[error("'{prefix}' matched {count} records; use --latest or list them")]
    AmbiguousKey { prefix: String, count: usize },

    /// No record matched.
    #[error("no images found matching '{0}'")]
    NotFound(String),

    /// A record could not be encoded or decoded.
    #[error("serialization failure: {0}")]
    SerializationFailure(String),

    /// The backend could not be reached or refused the operation.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The configured backend is not usable.
    #[error("backend not configured: {0}")]
    NotConfigured(String),
}

impl From<KeyError> for StoreError {
    fn from(err: KeyError) -> Self {
        match err {
            KeyError::InvalidName(_) => StoreError::InvalidName(err.to_string()),
            KeyError::InvalidKey(_) => StoreError::SerializationFailure(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::SerializationFailure(err.to_string())
    }
}

/// A metadata backend.
///
/// Implementations provide `begin`, `list`, and `cleanup`; `get` and
/// `get_latest` are defined in terms of `list`.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Backend name for diagnostics.
    fn name(&self) -> &'static str;

    /// Open a write transaction.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError>;

    /// Every record whose key starts with `prefix`, in key order.
    ///
    /// Returns an empty list when nothing matches.
    async fn list(&self, prefix: &str) -> Result<ImageRecordList, StoreError>;

    /// The single record stored for `name:version`.
    ///
    /// # Errors
    ///
    /// - `InvalidName` if `full_name` is not `NAME:VERSION`
    /// - `AmbiguousKey` if records from more than one day match
    async fn get(&self, full_name: &str) -> Result<Option<ImageRecord>, StoreError> {
        let prefix = ImageName::parse(full_name)?.prefix();
        let mut records = self.list(&prefix).await?.into_records();
        match records.len() {
            0 => Ok(None),
            1 => Ok(records.pop()),
            count => Err(StoreError::AmbiguousKey { prefix, count }),
        }
    }

    /// The most recently created record selected by `identifier`.
    ///
    /// `identifier` is a bare name or `name:version`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when nothing matches.
    async fn get_latest(&self, identifier: &str) -> Result<ImageRecord, StoreError> {
        let prefix = decode_prefix(identifier)?;
        self.list(&prefix)
            .await?
            .into_latest()
            .ok_or_else(|| StoreError::NotFound(identifier.to_string()))
    }

    /// Release connections and handles. Safe to call more than once.
    async fn cleanup(&self) -> Result<(), StoreError>;
}

/// An open write transaction.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Stage `meta` under `full_name` dated by the store's clock.
    async fn store(&mut self, full_name: &str, meta: &ArtifactMetadata) -> Result<(), StoreError>;

    /// Stage removal of every record matching `prefix`.
    ///
    /// Returns the number of records the commit will remove.
    async fn delete(&mut self, prefix: &str) -> Result<usize, StoreError>;

    /// Make all staged writes durable and visible at once.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discard all staged writes.
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
