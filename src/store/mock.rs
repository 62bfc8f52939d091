//! store::mock
//!
//! In-memory metadata store for deterministic testing.
//!
//! # Design
//!
//! Records live in a `BTreeMap` so prefix scans come back in key order, the
//! same as the real backends. Transactions stage their writes locally and
//! apply them under the lock on commit. Any operation can be configured to
//! fail, and every call is recorded for later inspection.
//!
//! # Example
//!
//! ```
//! use gozer::core::metadata::ArtifactMetadata;
//! use gozer::store::mock::MockStore;
//! use gozer::store::MetadataStore;
//!
//! # tokio_test::block_on(async {
//! let store = MockStore::new();
//!
//! let mut txn = store.begin().await.unwrap();
//! txn.store("web:1.0", &ArtifactMetadata::default()).await.unwrap();
//! txn.commit().await.unwrap();
//!
//! assert_eq!(store.list("web:").await.unwrap().len(), 1);
//! # });
//! ```

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};

use super::traits::{MetadataStore, StoreError, StoreTransaction};
use crate::core::clock::{Clock, FixedClock};
use crate::core::key::encode_key;
use crate::core::metadata::{ArtifactMetadata, ImageRecord, ImageRecordList};

/// Mock store for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping.
#[derive(Debug, Clone)]
pub struct MockStore {
    inner: Arc<Mutex<MockStoreInner>>,
    clock: Arc<dyn Clock>,
}

#[derive(Debug)]
struct MockStoreInner {
    records: BTreeMap<String, ArtifactMetadata>,
    fail_on: Option<FailOn>,
    operations: Vec<MockOperation>,
    closed: bool,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail begin with the given error.
    Begin(StoreError),
    /// Fail transaction store with the given error.
    Store(StoreError),
    /// Fail transaction delete with the given error.
    Delete(StoreError),
    /// Fail commit with the given error.
    Commit(StoreError),
    /// Fail list (and so get/get_latest) with the given error.
    List(StoreError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    Begin,
    Store { key: String },
    Delete { prefix: String },
    Commit { writes: usize },
    Rollback,
    List { prefix: String },
    Cleanup,
}

impl MockStore {
    /// Create an empty store dated 2024-01-01.
    pub fn new() -> Self {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        Self::with_clock(Arc::new(clock))
    }

    /// Create an empty store dated by `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockStoreInner {
                records: BTreeMap::new(),
                fail_on: None,
                operations: Vec::new(),
                closed: false,
            })),
            clock,
        }
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use gozer::store::mock::{FailOn, MockStore};
    /// use gozer::store::StoreError;
    ///
    /// let store = MockStore::new()
    ///     .fail_on(FailOn::Commit(StoreError::BackendUnavailable("down".into())));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.fail_on = Some(fail_on);
        }
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_on = None;
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.inner.lock().unwrap().operations.clone()
    }

    /// Committed keys, in order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().unwrap().records.keys().cloned().collect()
    }

    /// Whether `cleanup` has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().unwrap().closed
    }

    fn check_fail(&self, matches: impl Fn(&FailOn) -> Option<StoreError>) -> Result<(), StoreError> {
        let inner = self.inner.lock().unwrap();
        match inner.fail_on.as_ref().and_then(matches) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn record(&self, op: MockOperation) {
        self.inner.lock().unwrap().operations.push(op);
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataStore for MockStore {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        self.record(MockOperation::Begin);
        self.check_fail(|f| match f {
            FailOn::Begin(e) => Some(e.clone()),
            _ => None,
        })?;
        Ok(Box::new(MockTransaction {
            store: self.clone(),
            staged: Vec::new(),
        }))
    }

    async fn list(&self, prefix: &str) -> Result<ImageRecordList, StoreError> {
        self.record(MockOperation::List {
            prefix: prefix.to_string(),
        });
        self.check_fail(|f| match f {
            FailOn::List(e) => Some(e.clone()),
            _ => None,
        })?;

        let inner = self.inner.lock().unwrap();
        let records = inner
            .records
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, meta)| ImageRecord::new(key.clone(), meta.clone()))
            .collect();
        Ok(ImageRecordList::new(records))
    }

    async fn cleanup(&self) -> Result<(), StoreError> {
        self.record(MockOperation::Cleanup);
        self.inner.lock().unwrap().closed = true;
        Ok(())
    }
}

#[derive(Debug)]
enum Staged {
    Put(String, ArtifactMetadata),
    Delete(String),
}

struct MockTransaction {
    store: MockStore,
    staged: Vec<Staged>,
}

impl MockTransaction {
    /// Committed records with the staged writes applied.
    fn preview(&self) -> BTreeMap<String, ArtifactMetadata> {
        let mut records = self.store.inner.lock().unwrap().records.clone();
        apply(&mut records, &self.staged);
        records
    }
}

fn apply(records: &mut BTreeMap<String, ArtifactMetadata>, staged: &[Staged]) {
    for op in staged {
        match op {
            Staged::Put(key, meta) => {
                records.insert(key.clone(), meta.clone());
            }
            Staged::Delete(prefix) => records.retain(|k, _| !k.starts_with(prefix.as_str())),
        }
    }
}

#[async_trait]
impl StoreTransaction for MockTransaction {
    async fn store(&mut self, full_name: &str, meta: &ArtifactMetadata) -> Result<(), StoreError> {
        let key = encode_key(full_name, self.store.clock.today())?;
        self.store.record(MockOperation::Store {
            key: key.to_string(),
        });
        self.store.check_fail(|f| match f {
            FailOn::Store(e) => Some(e.clone()),
            _ => None,
        })?;
        self.staged.push(Staged::Put(key.to_string(), meta.clone()));
        Ok(())
    }

    async fn delete(&mut self, prefix: &str) -> Result<usize, StoreError> {
        self.store.record(MockOperation::Delete {
            prefix: prefix.to_string(),
        });
        self.store.check_fail(|f| match f {
            FailOn::Delete(e) => Some(e.clone()),
            _ => None,
        })?;
        let count = self
            .preview()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .count();
        self.staged.push(Staged::Delete(prefix.to_string()));
        Ok(count)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.store.record(MockOperation::Commit {
            writes: self.staged.len(),
        });
        self.store.check_fail(|f| match f {
            FailOn::Commit(e) => Some(e.clone()),
            _ => None,
        })?;
        let mut inner = self.store.inner.lock().unwrap();
        apply(&mut inner.records, &self.staged);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.store.record(MockOperation::Rollback);
        Ok(())
    }
}
