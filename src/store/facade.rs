//! store::facade
//!
//! Single-active-transaction wrapper over a [`MetadataStore`].
//!
//! # Design
//!
//! The facade keeps at most one open transaction per instance in a slot
//! guarded by an async mutex. Writes lock the slot for their whole duration,
//! so concurrent callers cannot interleave inside one another's transaction.
//!
//! - `store`, `delete`, and `commit_transaction` with an empty slot fail with
//!   `NoActiveTransaction`
//! - `start_transaction` with an occupied slot fails with
//!   `TransactionInProgress`
//! - `cleanup` rolls back whatever is left in the slot
//!
//! Names are validated before the slot or backend is touched.
//!
//! # Example
//!
//! ```
//! use gozer::core::metadata::ArtifactMetadata;
//! use gozer::store::mock::MockStore;
//! use gozer::store::Datastore;
//!
//! # tokio_test::block_on(async {
//! let store = Datastore::new(Box::new(MockStore::new()));
//!
//! store.start_transaction().await.unwrap();
//! store.store("web:1.0", &ArtifactMetadata::default()).await.unwrap();
//! store.commit_transaction().await.unwrap();
//!
//! assert!(store.get("web:1.0").await.unwrap().is_some());
//! store.cleanup().await.unwrap();
//! # });
//! ```

use std::sync::Arc;

use tokio::sync::Mutex;

use super::traits::{MetadataStore, StoreError, StoreTransaction};
use crate::core::key::{decode_prefix, ImageName};
use crate::core::metadata::{ArtifactMetadata, ImageRecord, ImageRecordList};

/// Metadata store with one active transaction at a time.
pub struct Datastore {
    backend: Arc<dyn MetadataStore>,
    active: Mutex<Option<Box<dyn StoreTransaction>>>,
}

impl Datastore {
    /// Wrap a backend.
    pub fn new(backend: Box<dyn MetadataStore>) -> Self {
        Self {
            backend: Arc::from(backend),
            active: Mutex::new(None),
        }
    }

    /// Shared handle to the underlying backend.
    pub fn backend(&self) -> Arc<dyn MetadataStore> {
        Arc::clone(&self.backend)
    }

    /// Open the transaction subsequent writes go into.
    pub async fn start_transaction(&self) -> Result<(), StoreError> {
        let mut active = self.active.lock().await;
        if active.is_some() {
            return Err(StoreError::TransactionInProgress);
        }
        *active = Some(self.backend.begin().await?);
        Ok(())
    }

    /// Stage `meta` under `full_name`.
    pub async fn store(&self, full_name: &str, meta: &ArtifactMetadata) -> Result<(), StoreError> {
        ImageName::parse(full_name)?;
        let mut active = self.active.lock().await;
        let txn = active.as_mut().ok_or(StoreError::NoActiveTransaction)?;
        txn.store(full_name, meta).await
    }

    /// Stage removal of every record selected by `identifier`.
    ///
    /// `identifier` is a bare name or `name:version`. Returns the number of
    /// records the commit will remove.
    pub async fn delete(&self, identifier: &str) -> Result<usize, StoreError> {
        let prefix = decode_prefix(identifier)?;
        let mut active = self.active.lock().await;
        let txn = active.as_mut().ok_or(StoreError::NoActiveTransaction)?;
        txn.delete(&prefix).await
    }

    /// Commit the open transaction.
    pub async fn commit_transaction(&self) -> Result<(), StoreError> {
        let txn = self
            .active
            .lock()
            .await
            .take()
            .ok_or(StoreError::NoActiveTransaction)?;
        txn.commit().await
    }

    /// Discard the open transaction, if any.
    pub async fn rollback_transaction(&self) -> Result<(), StoreError> {
        let txn = self.active.lock().await.take();
        match txn {
            Some(txn) => txn.rollback().await,
            None => Ok(()),
        }
    }

    /// Whether a transaction is open.
    pub async fn in_transaction(&self) -> bool {
        self.active.lock().await.is_some()
    }

    /// Every record selected by `identifier`, in key order.
    pub async fn list(&self, identifier: &str) -> Result<ImageRecordList, StoreError> {
        let prefix = decode_prefix(identifier)?;
        self.backend.list(&prefix).await
    }

    /// The single record stored for `name:version`.
    pub async fn get(&self, full_name: &str) -> Result<Option<ImageRecord>, StoreError> {
        self.backend.get(full_name).await
    }

    /// The most recently created record selected by `identifier`.
    pub async fn get_latest(&self, identifier: &str) -> Result<ImageRecord, StoreError> {
        self.backend.get_latest(identifier).await
    }

    /// Roll back any abandoned transaction and release the backend.
    pub async fn cleanup(&self) -> Result<(), StoreError> {
        if let Some(txn) = self.active.lock().await.take() {
            tracing::warn!("rolling back abandoned transaction");
            if let Err(e) = txn.rollback().await {
                tracing::warn!(error = %e, "rollback during cleanup failed");
            }
        }
        self.backend.cleanup().await
    }
}
