//! cli::commands::image
//!
//! Store, query, and delete image metadata records.
//!
//! # Example
//!
//! ```bash
//! # Record metadata for an image
//! gzr image store web:1.4.0 meta.json
//!
//! # Every record of every version of web
//! gzr image get web
//!
//! # The most recently created record of web:1.4.0, as JSON
//! gzr image get web:1.4.0 --latest --json
//!
//! # Remove every dated record of web:1.4.0
//! gzr image delete web:1.4.0
//! ```

use std::path::Path;

use anyhow::{Context as _, Result};

use super::{load_config, with_datastore};
use crate::cli::Context;
use crate::core::key::{decode_prefix, ImageName};
use crate::core::metadata::ArtifactMetadata;
use crate::ui::output;

/// Record the metadata document at `metadata_path` under `name`.
pub fn image_store(ctx: &Context, name: &str, metadata_path: &Path) -> Result<()> {
    ImageName::parse(name)?;
    let meta = ArtifactMetadata::from_file(metadata_path)?;
    let config = load_config(ctx)?;

    with_datastore(&config, |store| async move {
        store.start_transaction().await?;
        if let Err(e) = store.store(name, &meta).await {
            store.rollback_transaction().await.ok();
            return Err(e).with_context(|| format!("failed to store '{}'", name));
        }
        store
            .commit_transaction()
            .await
            .with_context(|| format!("failed to commit '{}'", name))?;
        Ok::<(), anyhow::Error>(())
    })?;

    output::success(format!("Stored {}", name), ctx.verbosity());
    Ok(())
}

/// Show the records matching `identifier`, or only the latest one.
pub fn image_get(ctx: &Context, identifier: &str, latest: bool, json: bool) -> Result<()> {
    decode_prefix(identifier)?;
    let config = load_config(ctx)?;

    if latest {
        let record = with_datastore(&config, |store| async move {
            store
                .get_latest(identifier)
                .await
                .with_context(|| format!("no latest record for '{}'", identifier))
        })?;
        if json {
            output::json(&record)?;
        } else {
            println!("{}", record);
        }
        return Ok(());
    }

    let records = with_datastore(&config, |store| async move {
        store
            .list(identifier)
            .await
            .with_context(|| format!("failed to list '{}'", identifier))
    })?;
    if json {
        output::json(&records)?;
    } else {
        println!("{}", records);
    }
    Ok(())
}

/// Delete every record of `name`.
pub fn image_delete(ctx: &Context, name: &str) -> Result<()> {
    ImageName::parse(name)?;
    let config = load_config(ctx)?;

    let removed = with_datastore(&config, |store| async move {
        store.start_transaction().await?;
        let removed = match store.delete(name).await {
            Ok(n) => n,
            Err(e) => {
                store.rollback_transaction().await.ok();
                return Err(e).with_context(|| format!("failed to delete '{}'", name));
            }
        };
        store.commit_transaction().await?;
        Ok::<usize, anyhow::Error>(removed)
    })?;

    tracing::debug!(%name, removed, "deleted records");
    if ctx.quiet {
        println!("{}", removed);
    } else {
        println!("Deleted {} record(s) of {}", removed, name);
    }
    Ok(())
}
