//! cli::commands::build
//!
//! Build an image, publish it, and record its metadata.
//!
//! # Design
//!
//! Wires the configured builder, the git inspector for the working directory,
//! and the configured store into a [`Pipeline`] and runs it once.

use std::sync::Arc;

use anyhow::{Context as _, Result};

use super::{load_config, with_datastore};
use crate::builder::DockerBuilder;
use crate::cli::Context;
use crate::core::clock::SystemClock;
use crate::git::GitInspector;
use crate::pipeline::Pipeline;
use crate::ui::output;

/// Run the build pipeline, passing `args` to the builder.
pub fn build(ctx: &Context, args: &[String]) -> Result<()> {
    let config = load_config(ctx)?;
    let repository = config.repository()?.to_string();
    let builder_config = config.builder();
    builder_config.validate()?;
    let work_dir = ctx.work_dir()?;

    let builder = DockerBuilder::new(builder_config.program(), builder_config.timeout())
        .with_work_dir(&work_dir);
    let inspector = GitInspector::new(&work_dir);

    let outcome = with_datastore(&config, |store| async move {
        let pipeline = Pipeline::new(
            store.backend(),
            Arc::new(builder),
            Arc::new(inspector),
            Arc::new(SystemClock),
            repository,
        );
        pipeline.run(args).await.context("build failed")
    })?;

    tracing::debug!(run_id = %outcome.run_id, artifact = %outcome.artifact.id, "build complete");
    if ctx.quiet {
        println!("{}", outcome.tag);
    } else {
        output::success(format!("Published and recorded {}", outcome.tag), ctx.verbosity());
    }
    Ok(())
}
