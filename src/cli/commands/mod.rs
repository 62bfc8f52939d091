//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Validates command-specific arguments
//! 2. Opens the store and other collaborators from configuration
//! 3. Formats and displays output
//!
//! # Async Commands
//!
//! Store and builder operations are async. Handlers are synchronous wrappers
//! that create a tokio runtime and `block_on` the async implementation.

mod build;
mod completion;
mod image;
mod version;

pub use build::build;
pub use completion::completion;
pub use image::{image_delete, image_get, image_store};
pub use version::version;

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use super::Context;
use crate::cli::args::{Command, ImageAction};
use crate::core::clock::{Clock, SystemClock};
use crate::core::config::Config;
use crate::store::{create_store, Datastore};

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Image { action } => match action {
            ImageAction::Store {
                name,
                metadata_path,
            } => image::image_store(ctx, &name, &metadata_path),
            ImageAction::Get { name, latest, json } => image::image_get(ctx, &name, latest, json),
            ImageAction::Delete { name } => image::image_delete(ctx, &name),
        },
        Command::Build { args } => build::build(ctx, &args),
        Command::Version => version::version(),
        Command::Completion { shell } => completion::completion(shell),
    }
}

/// Load configuration for `ctx`.
fn load_config(ctx: &Context) -> Result<Config> {
    Config::load(ctx.config_path()).context("failed to load configuration")
}

/// Open the configured store, run `f` against it, and always release it.
fn with_datastore<F, Fut, T>(config: &Config, f: F) -> Result<T>
where
    F: FnOnce(Arc<Datastore>) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let datastore_config = config.datastore()?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let backend = create_store(datastore_config, clock)
            .await
            .context("failed to open datastore")?;
        let store = Arc::new(Datastore::new(backend));

        let result = f(Arc::clone(&store)).await;

        if let Err(e) = store.cleanup().await {
            tracing::warn!(error = %e, "datastore cleanup failed");
        }
        result
    })
}
