//! store::embedded
//!
//! Single-file embedded backend built on `redb`.
//!
//! # Layout
//!
//! One table, `images`, maps the UTF-8 storage key to the JSON-encoded
//! [`ArtifactMetadata`]. The table is created when the database is opened.
//!
//! # Transactions
//!
//! [`begin`](MetadataStore::begin) opens a real `redb` write transaction and
//! every staged write goes into it, so commit is a single engine commit.
//! Writers are serialized by an async lock the transaction holds for its
//! lifetime: a second `begin` waits on the lock instead of parking a runtime
//! thread inside the engine's own writer lock.
//!
//! Reads use their own read transaction and see the last committed snapshot.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};
use tokio::sync::OwnedMutexGuard;

use super::traits::{MetadataStore, StoreError, StoreTransaction};
use crate::core::clock::Clock;
use crate::core::key::encode_key;
use crate::core::metadata::{ArtifactMetadata, ImageRecord, ImageRecordList};

const IMAGES: TableDefinition<&str, &[u8]> = TableDefinition::new("images");

/// Embedded metadata store.
pub struct EmbeddedStore {
    path: PathBuf,
    db: Mutex<Option<Arc<Database>>>,
    writer: Arc<tokio::sync::Mutex<()>>,
    clock: Arc<dyn Clock>,
}

impl EmbeddedStore {
    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns `BackendUnavailable` if the file cannot be opened or the
    /// `images` table cannot be created. Nothing is retried.
    pub fn open(path: &Path, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::BackendUnavailable(format!(
                    "cannot create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let db = Database::create(path).map_err(|e| {
            StoreError::BackendUnavailable(format!(
                "cannot open database '{}': {}",
                path.display(),
                e
            ))
        })?;

        let setup = db.begin_write().map_err(engine_err)?;
        setup.open_table(IMAGES).map_err(engine_err)?;
        setup.commit().map_err(engine_err)?;

        Ok(Self {
            path: path.to_path_buf(),
            db: Mutex::new(Some(Arc::new(db))),
            writer: Arc::new(tokio::sync::Mutex::new(())),
            clock,
        })
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn database(&self) -> Result<Arc<Database>, StoreError> {
        self.db
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| StoreError::BackendUnavailable("embedded store is closed".to_string()))
    }
}

#[async_trait]
impl MetadataStore for EmbeddedStore {
    fn name(&self) -> &'static str {
        "embedded"
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let writer = Arc::clone(&self.writer).lock_owned().await;
        let db = self.database()?;
        let txn = db.begin_write().map_err(engine_err)?;
        tracing::trace!(path = %self.path.display(), "write transaction opened");

        Ok(Box::new(EmbeddedTransaction {
            txn,
            clock: Arc::clone(&self.clock),
            _writer: writer,
        }))
    }

    async fn list(&self, prefix: &str) -> Result<ImageRecordList, StoreError> {
        let db = self.database()?;
        let read = db.begin_read().map_err(engine_err)?;
        let table = read.open_table(IMAGES).map_err(engine_err)?;

        let records = scan_prefix(&table, prefix)?
            .into_iter()
            .map(|(key, value)| {
                let metadata: ArtifactMetadata = serde_json::from_slice(&value)?;
                Ok(ImageRecord::new(key, metadata))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        Ok(ImageRecordList::new(records))
    }

    async fn cleanup(&self) -> Result<(), StoreError> {
        if self
            .db
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
        {
            tracing::debug!(path = %self.path.display(), "embedded store closed");
        }
        Ok(())
    }
}

/// An open `redb` write transaction plus the writer lock.
struct EmbeddedTransaction {
    // Declared first so the engine transaction ends before the lock is freed.
    txn: WriteTransaction,
    clock: Arc<dyn Clock>,
    _writer: OwnedMutexGuard<()>,
}

#[async_trait]
impl StoreTransaction for EmbeddedTransaction {
    async fn store(&mut self, full_name: &str, meta: &ArtifactMetadata) -> Result<(), StoreError> {
        let key = encode_key(full_name, self.clock.today())?;
        let value = serde_json::to_vec(meta)?;

        let mut table = self.txn.open_table(IMAGES).map_err(engine_err)?;
        table
            .insert(key.as_str(), value.as_slice())
            .map_err(engine_err)?;
        tracing::debug!(key = %key, "staged record");
        Ok(())
    }

    async fn delete(&mut self, prefix: &str) -> Result<usize, StoreError> {
        let mut table = self.txn.open_table(IMAGES).map_err(engine_err)?;
        let keys: Vec<String> = scan_prefix(&table, prefix)?
            .into_iter()
            .map(|(key, _)| key)
            .collect();

        for key in &keys {
            table.remove(key.as_str()).map_err(engine_err)?;
        }
        tracing::debug!(prefix, count = keys.len(), "staged delete");
        Ok(keys.len())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let EmbeddedTransaction { txn, _writer, .. } = *self;
        txn.commit().map_err(engine_err)?;
        drop(_writer);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        let EmbeddedTransaction { txn, _writer, .. } = *self;
        txn.abort().map_err(engine_err)?;
        drop(_writer);
        Ok(())
    }
}

/// Collect every `(key, value)` whose key starts with `prefix`.
///
/// Starts the ordered range at `prefix` and stops at the first key past it.
fn scan_prefix<T>(table: &T, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    let mut out = Vec::new();
    for entry in table.range(prefix..).map_err(engine_err)? {
        let (key, value) = entry.map_err(engine_err)?;
        let key = key.value();
        if !key.starts_with(prefix) {
            break;
        }
        out.push((key.to_string(), value.value().to_vec()));
    }
    Ok(out)
}

fn engine_err(err: impl Into<redb::Error>) -> StoreError {
    StoreError::BackendUnavailable(err.into().to_string())
}
