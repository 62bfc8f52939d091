//! cli
//!
//! Command-line interface layer for gozer.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration and install logging
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. Handlers are synchronous; those that talk to a
//! store build a tokio runtime and block on the async work, always releasing
//! the store before returning.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::ui::output::Verbosity;

/// Execution context shared by command handlers.
#[derive(Debug, Clone)]
pub struct Context {
    /// Explicit config file, if given
    pub config: Option<PathBuf>,
    /// Working directory override
    pub cwd: Option<PathBuf>,
    /// Debug logging enabled
    pub debug: bool,
    /// Minimal output
    pub quiet: bool,
}

impl Context {
    /// Output verbosity for this invocation.
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.debug)
    }

    /// Directory commands operate in.
    pub fn work_dir(&self) -> Result<PathBuf> {
        match &self.cwd {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().context("cannot determine current directory"),
        }
    }

    /// Explicit config path, if any.
    pub fn config_path(&self) -> Option<&Path> {
        self.config.as_deref()
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    if let Err(e) = crate::telemetry::init(cli.debug) {
        eprintln!("warning: {}", e);
    }

    let ctx = Context {
        config: cli.config.clone(),
        cwd: cli.cwd.clone(),
        debug: cli.debug,
        quiet: cli.quiet,
    };

    commands::dispatch(cli.command, &ctx)
}
