//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--config <path>`: Read configuration from this file
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// gzr - record provenance for built container images and publish them
#[derive(Parser, Debug)]
#[command(name = "gzr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Read configuration from this file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Run as if gzr was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage stored image metadata
    #[command(
        name = "image",
        long_about = "Store, query, and delete image metadata records.\n\n\
            Records are keyed by NAME:VERSION plus the UTC day they were written. \
            Storing the same NAME:VERSION twice on one day overwrites the first \
            record; storing it on a later day keeps both."
    )]
    Image {
        #[command(subcommand)]
        action: ImageAction,
    },

    /// Build an image, push it, and record its metadata
    #[command(
        name = "build",
        long_about = "Build an image, push it, and record its metadata.\n\n\
            Arguments are passed through to the builder's build command. The image \
            is tagged <repository>/<repo-name>:<YYYYMMDD>.<short-commit>, where \
            repository comes from configuration and repo-name from the origin \
            remote. Metadata is recorded only once the push succeeds.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Build the Dockerfile in the current directory
    gzr build

    # Pass arguments through to docker build
    gzr build -- -f Dockerfile.prod --build-arg VERSION=1 ."
    )]
    Build {
        /// Arguments passed to the builder
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "BUILD ARGS")]
        args: Vec<String>,
    },

    /// Show version information
    #[command(name = "version")]
    Version,

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        long_about = "Generate shell completion scripts for tab-completion.\n\n\
            Outputs a completion script for the specified shell. Add the output \
            to your shell's configuration to enable tab-completion for gzr commands.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash (add to ~/.bashrc)
    gzr completion bash >> ~/.bashrc

    # Zsh (add to ~/.zshrc)
    gzr completion zsh >> ~/.zshrc

    # Fish
    gzr completion fish > ~/.config/fish/completions/gzr.fish"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Image subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ImageAction {
    /// Store metadata for an image from a JSON file
    Store {
        /// Image to record, as NAME:VERSION
        #[arg(value_name = "NAME:VERSION")]
        name: String,

        /// Path to a JSON metadata document
        #[arg(value_name = "METADATA_PATH")]
        metadata_path: PathBuf,
    },

    /// Show records for a name or name:version
    Get {
        /// Image name, optionally with :VERSION
        #[arg(value_name = "NAME[:VERSION]")]
        name: String,

        /// Show only the most recently created record
        #[arg(long)]
        latest: bool,

        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete every record of a name:version
    Delete {
        /// Image to delete, as NAME:VERSION
        #[arg(value_name = "NAME:VERSION")]
        name: String,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn build_passes_hyphenated_args_through() {
        let cli = Cli::try_parse_from(["gzr", "build", "-f", "Dockerfile.prod", "."]).unwrap();
        match cli.command {
            Command::Build { args } => assert_eq!(args, vec!["-f", "Dockerfile.prod", "."]),
            other => panic!("expected build, got {:?}", other),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["gzr", "image", "get", "web", "--latest", "--config", "/tmp/c.toml"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        match cli.command {
            Command::Image {
                action: ImageAction::Get { name, latest, json },
            } => {
                assert_eq!(name, "web");
                assert!(latest);
                assert!(!json);
            }
            other => panic!("expected image get, got {:?}", other),
        }
    }
}
