//! pipeline
//!
//! Build, record, and publish an artifact as one unit.
//!
//! # Stages
//!
//! 1. **Build**: the builder produces a local artifact
//! 2. **Describe**: the VCS inspector produces its metadata
//! 3. **Tag**: `<repository>/<repo-name>:<YYYYMMDD>.<short-commit>`
//! 4. **Begin**: open a store transaction
//! 5. **Record**: stage the metadata under the tag
//! 6. **Publish**: tag and push the artifact
//! 7. **Commit**: make the record visible
//!
//! The record is committed only after the push succeeds, so a visible record
//! always names a published artifact. A failure at Record or Publish rolls the
//! transaction back. A failure at Commit leaves a published but unrecorded
//! artifact and is reported as [`PipelineError::PartialCommit`] with the tag,
//! so it can be reconciled by hand. Nothing is retried.
//!
//! A failure at Describe or Tag leaves a local, unpublished artifact behind.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use chrono::{DateTime, Utc};
//! use gozer::builder::mock::MockBuilder;
//! use gozer::core::clock::SystemClock;
//! use gozer::core::metadata::ArtifactMetadata;
//! use gozer::git::{GitError, VcsInspector};
//! use gozer::pipeline::Pipeline;
//! use gozer::store::mock::MockStore;
//!
//! struct Fixed;
//! impl VcsInspector for Fixed {
//!     fn describe(&self, _now: DateTime<Utc>) -> Result<ArtifactMetadata, GitError> {
//!         Ok(ArtifactMetadata { commit: "abc1234".into(), ..Default::default() })
//!     }
//!     fn repo_name(&self) -> Result<String, GitError> {
//!         Ok("web".into())
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let store = MockStore::new();
//! let pipeline = Pipeline::new(
//!     Arc::new(store.clone()),
//!     Arc::new(MockBuilder::new()),
//!     Arc::new(Fixed),
//!     Arc::new(SystemClock),
//!     "registry.local/team",
//! );
//! let outcome = pipeline.run(&[]).await.unwrap();
//! assert!(outcome.tag.starts_with("registry.local/team/web:"));
//! assert_eq!(store.keys().len(), 1);
//! # });
//! ```

mod tag;

pub use tag::compose_tag;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

use crate::builder::{ArtifactBuilder, BuildError, BuiltArtifact};
use crate::core::clock::Clock;
use crate::core::key::ImageName;
use crate::core::metadata::ArtifactMetadata;
use crate::git::{GitError, VcsInspector};
use crate::store::{MetadataStore, StoreError, StoreTransaction};

/// A pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Build,
    Describe,
    Tag,
    Begin,
    Record,
    Publish,
    Commit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Build => "build",
            Stage::Describe => "describe",
            Stage::Tag => "tag",
            Stage::Begin => "begin",
            Stage::Record => "record",
            Stage::Publish => "publish",
            Stage::Commit => "commit",
        };
        f.write_str(name)
    }
}

/// Errors from a pipeline run, one per failing stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("build failed: {0}")]
    Build(BuildError),

    #[error("could not describe working copy: {0}")]
    Describe(GitError),

    #[error("could not compose image tag: {0}")]
    Tag(String),

    #[error("could not start transaction: {0}")]
    Begin(StoreError),

    #[error("could not record metadata: {0}")]
    Record(StoreError),

    #[error("push failed, nothing recorded: {0}")]
    Publish(BuildError),

    #[error(
        "image '{tag}' was pushed but its metadata was not recorded; record it by hand with `gzr image store`"
    )]
    PartialCommit {
        tag: String,
        #[source]
        source: StoreError,
    },
}

impl PipelineError {
    /// The stage the run failed in.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Build(_) => Stage::Build,
            PipelineError::Describe(_) => Stage::Describe,
            PipelineError::Tag(_) => Stage::Tag,
            PipelineError::Begin(_) => Stage::Begin,
            PipelineError::Record(_) => Stage::Record,
            PipelineError::Publish(_) => Stage::Publish,
            PipelineError::PartialCommit { .. } => Stage::Commit,
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    /// Identifier of this run in logs
    pub run_id: Uuid,
    /// Tag the artifact was published and recorded under
    pub tag: String,
    /// The built artifact
    pub artifact: BuiltArtifact,
    /// The recorded metadata
    pub metadata: ArtifactMetadata,
}

/// The build-publish pipeline.
pub struct Pipeline {
    store: Arc<dyn MetadataStore>,
    builder: Arc<dyn ArtifactBuilder>,
    inspector: Arc<dyn VcsInspector>,
    clock: Arc<dyn Clock>,
    repository: String,
}

impl Pipeline {
    /// Assemble a pipeline publishing under `repository`.
    pub fn new(
        store: Arc<dyn MetadataStore>,
        builder: Arc<dyn ArtifactBuilder>,
        inspector: Arc<dyn VcsInspector>,
        clock: Arc<dyn Clock>,
        repository: impl Into<String>,
    ) -> Self {
        Self {
            store,
            builder,
            inspector,
            clock,
            repository: repository.into(),
        }
    }

    /// Run every stage in order, passing `args` to the builder.
    pub async fn run(&self, args: &[String]) -> Result<BuildOutcome, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("build", %run_id);
        self.run_stages(run_id, args).instrument(span).await
    }

    async fn run_stages(&self, run_id: Uuid, args: &[String]) -> Result<BuildOutcome, PipelineError> {
        let artifact = self.builder.build(args).await.map_err(PipelineError::Build)?;

        let metadata = self
            .inspector
            .describe(self.clock.now())
            .map_err(PipelineError::Describe)?;

        let tag = self.tag_for(&metadata)?;
        tracing::info!(%tag, "composed tag");

        let mut txn = self.store.begin().await.map_err(PipelineError::Begin)?;

        if let Err(e) = txn.store(&tag, &metadata).await {
            abandon(txn).await;
            return Err(PipelineError::Record(e));
        }

        if let Err(e) = self.builder.publish(&artifact, &tag).await {
            abandon(txn).await;
            return Err(PipelineError::Publish(e));
        }

        txn.commit()
            .await
            .map_err(|source| PipelineError::PartialCommit {
                tag: tag.clone(),
                source,
            })?;
        tracing::info!(%tag, "recorded");

        Ok(BuildOutcome {
            run_id,
            tag,
            artifact,
            metadata,
        })
    }

    fn tag_for(&self, metadata: &ArtifactMetadata) -> Result<String, PipelineError> {
        if metadata.commit.is_empty() {
            return Err(PipelineError::Tag("no commit to tag".to_string()));
        }
        let repo_name = self
            .inspector
            .repo_name()
            .map_err(|e| PipelineError::Tag(e.to_string()))?;
        let tag = compose_tag(&self.repository, &repo_name, self.clock.today(), &metadata.commit);
        ImageName::parse(&tag).map_err(|e| PipelineError::Tag(e.to_string()))?;
        Ok(tag)
    }
}

async fn abandon(txn: Box<dyn StoreTransaction>) {
    if let Err(e) = txn.rollback().await {
        tracing::warn!(error = %e, "rollback failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::mock::{self as mock_builder, MockBuilder};
    use crate::core::clock::FixedClock;
    use crate::store::mock::{self as mock_store, MockOperation, MockStore};
    use chrono::{DateTime, TimeZone, Utc};

    struct FixedInspector {
        repo_name: Option<&'static str>,
    }

    impl VcsInspector for FixedInspector {
        fn describe(&self, now: DateTime<Utc>) -> Result<ArtifactMetadata, GitError> {
            Ok(ArtifactMetadata {
                commit: "abc1234".to_string(),
                tags: vec!["v1".to_string()],
                origin: "git@host:team/web.git".to_string(),
                created_at: crate::core::clock::format_timestamp(now),
                ..Default::default()
            })
        }

        fn repo_name(&self) -> Result<String, GitError> {
            self.repo_name
                .map(str::to_string)
                .ok_or(GitError::NoRemote)
        }
    }

    fn pipeline(store: &MockStore, builder: &MockBuilder) -> Pipeline {
        pipeline_with(store, builder, Some("web"))
    }

    fn pipeline_with(store: &MockStore, builder: &MockBuilder, repo: Option<&'static str>) -> Pipeline {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        Pipeline::new(
            Arc::new(store.clone()),
            Arc::new(builder.clone()),
            Arc::new(FixedInspector { repo_name: repo }),
            Arc::new(clock),
            "registry.local/team",
        )
    }

    #[tokio::test]
    async fn success_records_after_push() {
        let store = MockStore::new();
        let builder = MockBuilder::new();

        let outcome = pipeline(&store, &builder).run(&[]).await.unwrap();

        assert_eq!(outcome.tag, "registry.local/team/web:20240101.abc1234");
        assert_eq!(builder.pushed(), vec![outcome.tag.clone()]);
        assert_eq!(
            store.keys(),
            vec!["registry.local/team/web:20240101.abc1234:20240101"]
        );
    }

    #[tokio::test]
    async fn build_failure_touches_nothing() {
        let store = MockStore::new();
        let builder = MockBuilder::new().fail_on(mock_builder::FailOn::Build(BuildError::NoArtifactId));

        let err = pipeline(&store, &builder).run(&[]).await.unwrap_err();
        assert_eq!(err.stage(), Stage::Build);
        assert!(store.operations().is_empty());
    }

    #[tokio::test]
    async fn push_failure_rolls_back() {
        let store = MockStore::new();
        let builder = MockBuilder::new().fail_on(mock_builder::FailOn::Publish(BuildError::Failed {
            command: "docker push".to_string(),
            code: Some(1),
            stderr: "denied".to_string(),
        }));

        let err = pipeline(&store, &builder).run(&[]).await.unwrap_err();
        assert_eq!(err.stage(), Stage::Publish);
        assert!(store.keys().is_empty());
        assert!(store.operations().contains(&MockOperation::Rollback));
    }

    #[tokio::test]
    async fn record_failure_skips_push() {
        let store = MockStore::new().fail_on(mock_store::FailOn::Store(
            StoreError::SerializationFailure("bad".to_string()),
        ));
        let builder = MockBuilder::new();

        let err = pipeline(&store, &builder).run(&[]).await.unwrap_err();
        assert_eq!(err.stage(), Stage::Record);
        assert!(builder.pushed().is_empty());
    }

    #[tokio::test]
    async fn commit_failure_is_partial() {
        let store = MockStore::new().fail_on(mock_store::FailOn::Commit(
            StoreError::BackendUnavailable("down".to_string()),
        ));
        let builder = MockBuilder::new();

        let err = pipeline(&store, &builder).run(&[]).await.unwrap_err();
        match &err {
            PipelineError::PartialCommit { tag, .. } => {
                assert_eq!(tag, "registry.local/team/web:20240101.abc1234");
            }
            other => panic!("expected PartialCommit, got {:?}", other),
        }
        assert_eq!(builder.pushed().len(), 1);
        assert!(err.to_string().contains("gzr image store"));
    }

    #[tokio::test]
    async fn missing_remote_fails_at_tag() {
        let store = MockStore::new();
        let builder = MockBuilder::new();

        let err = pipeline_with(&store, &builder, None)
            .run(&[])
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Stage::Tag);
        assert!(store.operations().is_empty());
    }

    #[tokio::test]
    async fn begin_failure_skips_push() {
        let store = MockStore::new().fail_on(mock_store::FailOn::Begin(
            StoreError::BackendUnavailable("down".to_string()),
        ));
        let builder = MockBuilder::new();

        let err = pipeline(&store, &builder).run(&[]).await.unwrap_err();
        assert_eq!(err.stage(), Stage::Begin);
        assert!(builder.pushed().is_empty());
    }
}
