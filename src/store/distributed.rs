//! store::distributed
//!
//! Remote key-value backend built on `etcd`.
//!
//! # Transactions
//!
//! A transaction is a local batch. `store` appends a put, `delete` appends a
//! prefix delete. `commit` consumes the batch and submits it as one etcd
//! `Txn`, so the writes land atomically in a single round trip and a batch
//! can only be submitted once. An empty batch commits without contacting the
//! server.
//!
//! etcd rejects a `Txn` that writes the same key twice or puts a key inside
//! a deleted range, so the batch is compiled to its final effect before
//! submission (see [`compile_batch`]).
//!
//! # Deadlines
//!
//! Every RPC, including the initial connect, is bounded by the configured
//! timeout. Network, service, and timeout failures all surface as
//! `BackendUnavailable`; nothing is retried.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use etcd_client::{Client, ConnectOptions, DeleteOptions, GetOptions, Txn, TxnOp};

use super::traits::{MetadataStore, StoreError, StoreTransaction};
use crate::core::clock::Clock;
use crate::core::key::encode_key;
use crate::core::metadata::{ArtifactMetadata, ImageRecord, ImageRecordList};

/// etcd-backed metadata store.
pub struct DistributedStore {
    endpoint: String,
    client: Mutex<Option<Client>>,
    timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl DistributedStore {
    /// Connect to the etcd endpoint `host:port`.
    ///
    /// # Errors
    ///
    /// Returns `BackendUnavailable` if the connection cannot be established
    /// within `timeout`.
    pub async fn connect(
        endpoint: &str,
        timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        let options = ConnectOptions::new()
            .with_connect_timeout(timeout)
            .with_timeout(timeout);
        let client = with_deadline(
            timeout,
            "connect",
            Client::connect([endpoint], Some(options)),
        )
        .await?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            client: Mutex::new(Some(client)),
            timeout,
            clock,
        })
    }

    /// The endpoint this store talks to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn client(&self) -> Result<Client, StoreError> {
        self.client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| {
                StoreError::BackendUnavailable("distributed store is closed".to_string())
            })
    }
}

#[async_trait]
impl MetadataStore for DistributedStore {
    fn name(&self) -> &'static str {
        "distributed"
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        Ok(Box::new(DistributedTransaction {
            client: self.client()?,
            timeout: self.timeout,
            clock: Arc::clone(&self.clock),
            pending: Vec::new(),
        }))
    }

    async fn list(&self, prefix: &str) -> Result<ImageRecordList, StoreError> {
        let mut client = self.client()?;
        let response = with_deadline(
            self.timeout,
            "get",
            client.get(prefix, Some(GetOptions::new().with_prefix())),
        )
        .await?;

        let records = response
            .kvs()
            .iter()
            .map(|kv| {
                let key = kv
                    .key_str()
                    .map_err(|e| StoreError::SerializationFailure(e.to_string()))?;
                let metadata: ArtifactMetadata = serde_json::from_slice(kv.value())?;
                Ok(ImageRecord::new(key, metadata))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        Ok(ImageRecordList::new(records))
    }

    async fn cleanup(&self) -> Result<(), StoreError> {
        if self
            .client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
        {
            tracing::debug!(endpoint = %self.endpoint, "distributed store closed");
        }
        Ok(())
    }
}

/// A staged write.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingOp {
    Put { key: String, value: Vec<u8> },
    DeletePrefix { prefix: String, removed: Vec<String> },
}

/// A compiled write as submitted to etcd.
#[derive(Debug, Clone, PartialEq, Eq)]
enum BatchOp {
    Put { key: String, value: Vec<u8> },
    DeleteKey(String),
    DeletePrefix(String),
}

struct DistributedTransaction {
    client: Client,
    timeout: Duration,
    clock: Arc<dyn Clock>,
    pending: Vec<PendingOp>,
}

#[async_trait]
impl StoreTransaction for DistributedTransaction {
    async fn store(&mut self, full_name: &str, meta: &ArtifactMetadata) -> Result<(), StoreError> {
        let key = encode_key(full_name, self.clock.today())?;
        let value = serde_json::to_vec(meta)?;
        tracing::debug!(key = %key, "staged record");
        self.pending.push(PendingOp::Put {
            key: key.to_string(),
            value,
        });
        Ok(())
    }

    async fn delete(&mut self, prefix: &str) -> Result<usize, StoreError> {
        let response = with_deadline(
            self.timeout,
            "get",
            self.client.get(
                prefix,
                Some(GetOptions::new().with_prefix().with_keys_only()),
            ),
        )
        .await?;

        let remote = response
            .kvs()
            .iter()
            .map(|kv| {
                kv.key_str()
                    .map(str::to_string)
                    .map_err(|e| StoreError::SerializationFailure(e.to_string()))
            })
            .collect::<Result<BTreeSet<_>, StoreError>>()?;

        let removed: Vec<String> = visible_keys(remote, &self.pending, prefix)
            .into_iter()
            .collect();
        let count = removed.len();
        tracing::debug!(prefix, count, "staged delete");

        self.pending.push(PendingOp::DeletePrefix {
            prefix: prefix.to_string(),
            removed,
        });
        Ok(count)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let DistributedTransaction {
            mut client,
            timeout,
            pending,
            ..
        } = *self;

        if pending.is_empty() {
            return Ok(());
        }

        let ops: Vec<TxnOp> = compile_batch(pending)
            .into_iter()
            .map(|op| match op {
                BatchOp::Put { key, value } => TxnOp::put(key, value, None),
                BatchOp::DeleteKey(key) => TxnOp::delete(key, None),
                BatchOp::DeletePrefix(prefix) => {
                    TxnOp::delete(prefix, Some(DeleteOptions::new().with_prefix()))
                }
            })
            .collect();
        let count = ops.len();

        let response = with_deadline(timeout, "txn", client.txn(Txn::new().and_then(ops))).await?;
        if !response.succeeded() {
            return Err(StoreError::BackendUnavailable(
                "transaction was not applied".to_string(),
            ));
        }
        tracing::debug!(ops = count, "transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        tracing::trace!(discarded = self.pending.len(), "transaction rolled back");
        Ok(())
    }
}

/// Keys matching `prefix` once the staged ops have been applied on top of
/// the committed keys in `remote`.
fn visible_keys(remote: BTreeSet<String>, pending: &[PendingOp], prefix: &str) -> BTreeSet<String> {
    let mut keys: BTreeSet<String> = remote
        .into_iter()
        .filter(|k| k.starts_with(prefix))
        .collect();

    for op in pending {
        match op {
            PendingOp::Put { key, .. } => {
                if key.starts_with(prefix) {
                    keys.insert(key.clone());
                }
            }
            PendingOp::DeletePrefix { prefix: deleted, .. } => {
                keys.retain(|k| !k.starts_with(deleted.as_str()));
            }
        }
    }
    keys
}

/// Reduce staged ops to a conflict-free batch with the same final effect.
///
/// Later puts to a key replace earlier ones, and a prefix delete cancels
/// earlier puts it covers. A prefix delete that would overlap a surviving
/// put is narrowed to the individual keys it removed.
fn compile_batch(pending: Vec<PendingOp>) -> Vec<BatchOp> {
    let mut puts: BTreeMap<String, Vec<u8>> = BTreeMap::new();
    let mut deletes: Vec<(String, Vec<String>)> = Vec::new();

    for op in pending {
        match op {
            PendingOp::Put { key, value } => {
                puts.insert(key, value);
            }
            PendingOp::DeletePrefix { prefix, removed } => {
                puts.retain(|k, _| !k.starts_with(prefix.as_str()));
                deletes.push((prefix, removed));
            }
        }
    }

    let mut batch = Vec::new();
    let mut narrowed: BTreeSet<String> = BTreeSet::new();
    for (prefix, removed) in deletes {
        if puts.keys().any(|k| k.starts_with(prefix.as_str())) {
            narrowed.extend(removed.into_iter().filter(|k| !puts.contains_key(k)));
        } else {
            batch.push(BatchOp::DeletePrefix(prefix));
        }
    }
    batch.extend(narrowed.into_iter().map(BatchOp::DeleteKey));
    batch.extend(
        puts.into_iter()
            .map(|(key, value)| BatchOp::Put { key, value }),
    );
    batch
}

async fn with_deadline<T, F>(timeout: Duration, what: &str, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, etcd_client::Error>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(StoreError::BackendUnavailable(format!("etcd {}: {}", what, e))),
        Err(_) => Err(StoreError::BackendUnavailable(format!(
            "etcd {}: timed out after {}s",
            what,
            timeout.as_secs()
        ))),
    }
}
