//! `vaultkeep status` — show whether a vault exists and what it holds.
//!
//! Without `VAULTKEEP_PASSWORD` only the manifest is read; with it the
//! vault is unlocked and record counts are shown too.

use console::style;

use crate::cli::output;
use crate::cli::{open_session, prompt_secret, vault_dir, Cli, PASSWORD_ENV};
use crate::errors::Result;

/// Execute the `status` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let dir = vault_dir(cli)?;
    if !dir.exists() {
        output::info(&format!("No vault at {}", dir.display()));
        output::tip("Run `vaultkeep init` to create one.");
        return Ok(());
    }

    let (mut session, settings) = open_session(cli)?;
    let Some(manifest) = session.store().manifest()? else {
        output::info(&format!("No vault at {}", dir.display()));
        output::tip("Run `vaultkeep init` to create one.");
        return Ok(());
    };

    println!("{} {}", style("Vault:").bold(), dir.display());
    println!(
        "{} {}",
        style("Created:").bold(),
        manifest.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(rotated) = manifest.rotated_at {
        println!(
            "{} {}",
            style("Secret changed:").bold(),
            rotated.format("%Y-%m-%d %H:%M:%S")
        );
    }
    println!("{} {}", style("Generation:").bold(), manifest.generation);
    println!(
        "{} {}",
        style("Import policy:").bold(),
        settings.default_collision_policy
    );

    if std::env::var_os(PASSWORD_ENV).is_some() {
        let secret = prompt_secret("Enter master secret")?;
        session.unlock(&secret)?;
        println!(
            "{} {} passwords, {} notes",
            style("Contents:").bold(),
            session.passwords()?.len(),
            session.notes()?.len()
        );
        session.lock();
    }

    Ok(())
}
