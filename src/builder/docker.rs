//! builder::docker
//!
//! [`ArtifactBuilder`] that drives the `docker` CLI.
//!
//! # Commands
//!
//! - build: `docker build -q [ARGS...]` (`.` when no args are given); the
//!   last line of stdout is the image id
//! - publish: `docker tag <id> <tag>` then `docker push <tag>`
//!
//! Each process is bounded by the configured timeout and killed when the
//! deadline passes.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::traits::{ArtifactBuilder, BuildError, BuiltArtifact};

/// Docker CLI builder.
#[derive(Debug, Clone)]
pub struct DockerBuilder {
    program: String,
    timeout: Duration,
    work_dir: Option<PathBuf>,
}

impl DockerBuilder {
    /// Builder running `program` with a per-process `timeout`.
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
            work_dir: None,
        }
    }

    /// Run builder processes in `dir`.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Run the builder with `args`, returning stdout.
    async fn run(&self, args: &[String]) -> Result<String, BuildError> {
        let command = format!("{} {}", self.program, args.join(" "));
        tracing::debug!(%command, "running builder");

        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.work_dir {
            cmd.current_dir(dir);
        }

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|e| BuildError::Spawn {
                program: self.program.clone(),
                message: e.to_string(),
            })?,
            Err(_) => {
                return Err(BuildError::TimedOut {
                    command,
                    secs: self.timeout.as_secs(),
                })
            }
        };

        if !output.status.success() {
            return Err(BuildError::Failed {
                command,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// The image id `docker build -q` prints on its last non-empty line.
fn parse_image_id(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .map(str::to_string)
}

#[async_trait]
impl ArtifactBuilder for DockerBuilder {
    async fn build(&self, args: &[String]) -> Result<BuiltArtifact, BuildError> {
        let mut full = vec!["build".to_string(), "-q".to_string()];
        if args.is_empty() {
            full.push(".".to_string());
        } else {
            full.extend(args.iter().cloned());
        }

        let stdout = self.run(&full).await?;
        let id = parse_image_id(&stdout).ok_or(BuildError::NoArtifactId)?;
        tracing::info!(%id, "image built");
        Ok(BuiltArtifact { id })
    }

    async fn publish(&self, artifact: &BuiltArtifact, tag: &str) -> Result<(), BuildError> {
        self.run(&["tag".to_string(), artifact.id.clone(), tag.to_string()])
            .await?;
        self.run(&["push".to_string(), tag.to_string()]).await?;
        tracing::info!(%tag, "image pushed");
        Ok(())
    }
}
