//! builder::traits
//!
//! Artifact builder trait definition.
//!
//! # Design
//!
//! The trait is async because building and pushing run external processes.
//! A build produces a local artifact; publishing tags it and pushes it to
//! the registry. The two are separate calls so the pipeline can record
//! metadata between them.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from builder operations.
#[derive(Debug, Clone, Error)]
pub enum BuildError {
    /// The builder program could not be started.
    #[error("failed to run '{program}': {message}")]
    Spawn {
        /// Program that failed to start
        program: String,
        /// OS error description
        message: String,
    },

    /// The builder ran and reported failure.
    #[error("'{command}' failed ({}): {stderr}", status_text(.code))]
    Failed {
        /// Command line that failed
        command: String,
        /// Exit code, if the process exited normally
        code: Option<i32>,
        /// Captured standard error
        stderr: String,
    },

    /// The builder did not finish in time and was killed.
    #[error("'{command}' timed out after {secs}s")]
    TimedOut {
        /// Command line that timed out
        command: String,
        /// The deadline in seconds
        secs: u64,
    },

    /// The build succeeded but did not report an artifact id.
    #[error("build produced no image id")]
    NoArtifactId,
}

fn status_text(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// A locally built artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltArtifact {
    /// Builder-assigned artifact id
    pub id: String,
}

/// Builds artifacts and publishes them to a registry.
#[async_trait]
pub trait ArtifactBuilder: Send + Sync {
    /// Build an artifact, passing `args` through to the builder.
    async fn build(&self, args: &[String]) -> Result<BuiltArtifact, BuildError>;

    /// Tag `artifact` as `tag` and push it.
    async fn publish(&self, artifact: &BuiltArtifact, tag: &str) -> Result<(), BuildError>;
}
