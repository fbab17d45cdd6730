//! `vaultkeep reset` — irreversibly erase the vault.
//!
//! Always requires the master secret.  `--force` only skips the
//! confirmation prompt.

use crate::cli::output;
use crate::cli::{confirm, open_session, prompt_secret, vault_dir, Cli};
use crate::errors::{Result, VaultError};
use crate::vault::SessionState;

/// Execute the `reset` command.
pub fn execute(cli: &Cli, force: bool) -> Result<()> {
    let dir = vault_dir(cli)?;
    if !dir.exists() {
        return Err(VaultError::NotInitialized);
    }

    let (mut session, _) = open_session(cli)?;
    if session.state() == SessionState::Uninitialized {
        return Err(VaultError::NotInitialized);
    }

    let secret = prompt_secret("Enter master secret")?;
    if !session.verify_master_secret(&secret)? {
        return Err(VaultError::InvalidSecret);
    }

    if !force {
        output::warning(&format!(
            "This permanently deletes every password and note in {}.",
            dir.display()
        ));
        if !confirm("Erase the vault?")? {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    session.clear_all_data()?;

    crate::audit::log_audit(cli, "reset", None, Some("vault erased"));
    output::success(&format!("Vault at {} erased", dir.display()));
    output::tip("Run `vaultkeep init` to start over.");

    Ok(())
}
