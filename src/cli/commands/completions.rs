//! `vaultkeep completions` — print a shell completion script to stdout.
//!
//! Usage:
//!   vaultkeep completions bash > ~/.bash_completion.d/vaultkeep
//!   vaultkeep completions            # uses the shell named by $SHELL

use std::io;

use clap::{CommandFactory, ValueEnum};
use clap_complete::{generate, Shell};

use crate::cli::Cli;
use crate::errors::{Result, VaultError};

/// Execute the `completions` command.
pub fn execute(shell: Option<&str>) -> Result<()> {
    let shell = match shell {
        Some(name) => parse_shell(name)?,
        None => Shell::from_env().ok_or_else(|| {
            VaultError::CommandFailed(format!(
                "could not detect your shell from $SHELL; pass one of: {}",
                supported()
            ))
        })?,
    };
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "vaultkeep", &mut io::stdout());
    Ok(())
}

fn parse_shell(name: &str) -> Result<Shell> {
    let name = name.trim().to_lowercase();
    let name = match name.as_str() {
        "ps" | "pwsh" => "powershell",
        other => other,
    };
    <Shell as ValueEnum>::from_str(name, true).map_err(|_| {
        VaultError::CommandFailed(format!(
            "unknown shell '{name}'; supported: {}",
            supported()
        ))
    })
}

fn supported() -> String {
    Shell::value_variants()
        .iter()
        .filter_map(|s| s.to_possible_value())
        .map(|v| v.get_name().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
