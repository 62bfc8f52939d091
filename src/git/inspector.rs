//! git::inspector
//!
//! Materializes [`ArtifactMetadata`] from a working copy.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::interface::{Git, GitError};
use crate::core::clock::format_timestamp;
use crate::core::metadata::ArtifactMetadata;

/// Source of provenance facts for a build.
pub trait VcsInspector: Send + Sync {
    /// Describe the working copy as of `now`.
    fn describe(&self, now: DateTime<Utc>) -> Result<ArtifactMetadata, GitError>;

    /// Repository name used in the image tag.
    fn repo_name(&self) -> Result<String, GitError>;
}

/// [`VcsInspector`] backed by a local git working copy.
#[derive(Debug, Clone)]
pub struct GitInspector {
    path: PathBuf,
}

impl GitInspector {
    /// Inspect the repository containing `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The directory being inspected.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VcsInspector for GitInspector {
    fn describe(&self, now: DateTime<Utc>) -> Result<ArtifactMetadata, GitError> {
        let git = Git::open(&self.path)?;

        let mut tags = Vec::new();
        let mut annotations = Vec::new();
        for tag in git.tags_at_head()? {
            annotations.push(tag.annotation.unwrap_or_default());
            tags.push(tag.name);
        }
        while annotations.last().is_some_and(String::is_empty) {
            annotations.pop();
        }

        let meta = ArtifactMetadata {
            commit: git.short_head()?,
            tags,
            annotations,
            origin: git.origin_url()?.unwrap_or_default(),
            created_at: format_timestamp(now),
        };
        tracing::debug!(commit = %meta.commit, tags = meta.tags.len(), "described working copy");
        Ok(meta)
    }

    fn repo_name(&self) -> Result<String, GitError> {
        let git = Git::open(&self.path)?;
        let url = git.origin_url()?.ok_or(GitError::NoRemote)?;
        Git::repo_name_from_remote(&url)
    }
}
