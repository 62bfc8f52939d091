//! builder::mock
//!
//! Mock builder for deterministic testing.
//!
//! # Example
//!
//! ```
//! use gozer::builder::mock::{FailOn, MockBuilder, MockOperation};
//! use gozer::builder::{ArtifactBuilder, BuildError};
//!
//! # tokio_test::block_on(async {
//! let builder = MockBuilder::new();
//! let artifact = builder.build(&[]).await.unwrap();
//! builder.publish(&artifact, "registry/web:20240101.abc").await.unwrap();
//! assert_eq!(builder.pushed(), vec!["registry/web:20240101.abc"]);
//!
//! let failing = MockBuilder::new().fail_on(FailOn::Publish(BuildError::NoArtifactId));
//! let artifact = failing.build(&[]).await.unwrap();
//! assert!(failing.publish(&artifact, "x").await.is_err());
//! # });
//! ```

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use super::traits::{ArtifactBuilder, BuildError, BuiltArtifact};

/// Mock builder for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping.
#[derive(Debug, Clone, Default)]
pub struct MockBuilder {
    inner: Arc<Mutex<MockBuilderInner>>,
}

#[derive(Debug, Default)]
struct MockBuilderInner {
    next_id: u64,
    fail_on: Option<FailOn>,
    operations: Vec<MockOperation>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail build with the given error.
    Build(BuildError),
    /// Fail publish with the given error.
    Publish(BuildError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    Build { args: Vec<String> },
    Publish { id: String, tag: String },
}

impl MockBuilder {
    /// Create a new mock builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the mock to fail on a specific operation.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.fail_on = Some(fail_on);
        }
        self
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.inner.lock().unwrap().operations.clone()
    }

    /// Tags that were published successfully.
    pub fn pushed(&self) -> Vec<String> {
        self.operations()
            .into_iter()
            .filter_map(|op| match op {
                MockOperation::Publish { tag, .. } => Some(tag),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ArtifactBuilder for MockBuilder {
    async fn build(&self, args: &[String]) -> Result<BuiltArtifact, BuildError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(FailOn::Build(e)) = &inner.fail_on {
            return Err(e.clone());
        }
        inner.operations.push(MockOperation::Build {
            args: args.to_vec(),
        });
        inner.next_id += 1;
        Ok(BuiltArtifact {
            id: format!("sha256:mock{}", inner.next_id),
        })
    }

    async fn publish(&self, artifact: &BuiltArtifact, tag: &str) -> Result<(), BuildError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(FailOn::Publish(e)) = &inner.fail_on {
            return Err(e.clone());
        }
        inner.operations.push(MockOperation::Publish {
            id: artifact.id.clone(),
            tag: tag.to_string(),
        });
        Ok(())
    }
}
