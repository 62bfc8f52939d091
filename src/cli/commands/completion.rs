//! completion command - Write a shell completion script to stdout

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::{generate, shells, Generator};

use crate::cli::args::{Cli, Shell};

/// Generate the completion script for `shell`.
pub fn completion(shell: Shell) -> Result<()> {
    match shell {
        Shell::Bash => emit(shells::Bash),
        Shell::Zsh => emit(shells::Zsh),
        Shell::Fish => emit(shells::Fish),
        Shell::PowerShell => emit(shells::PowerShell),
    }
    Ok(())
}

fn emit<G: Generator>(generator: G) {
    let mut cmd = Cli::command();
    let bin = cmd.get_name().to_string();
    generate(generator, &mut cmd, bin, &mut std::io::stdout());
}
