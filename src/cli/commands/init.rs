//! `vaultkeep init` — create a new vault and choose its master secret.

use crate::cli::output;
use crate::cli::{open_session, prompt_new_secret, vault_dir, Cli, PASSWORD_ENV};
use crate::errors::{Result, VaultError};
use crate::vault::SessionState;

/// Execute the `init` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let dir = vault_dir(cli)?;
    let created_dir = !dir.exists();

    // 1. Open the location (creates the directory if missing).
    let (mut session, settings) = open_session(cli)?;
    if created_dir {
        output::info(&format!("Created vault directory: {}", dir.display()));
    }

    // 2. Refuse to touch an existing vault.
    if session.state() != SessionState::Uninitialized {
        output::tip("Use `vaultkeep add` to add entries to the existing vault.");
        return Err(VaultError::AlreadyInitialized);
    }

    // 3. Choose the master secret and write the empty vault.
    let secret = prompt_new_secret(PASSWORD_ENV)?;
    session.setup(&secret)?;

    crate::audit::log_audit(cli, "init", None, Some("vault created"));

    output::success(&format!("Vault created at {}", dir.display()));
    let params = settings.argon2_params();
    output::info(&format!(
        "Key derivation: Argon2id, {} KiB, {} iterations, {} lanes",
        params.memory_kib, params.iterations, params.parallelism
    ));
    output::tip("Run `vaultkeep add <APP>` to store a password.");
    output::tip("Run `vaultkeep note add <TITLE>` to store a secure note.");

    Ok(())
}
