//! `vaultkeep change-secret` — change the master secret.
//!
//! Every collection is re-encrypted under the new secret and committed
//! together with the new verifier; an interruption leaves the old secret
//! working.

use crate::cli::output;
use crate::cli::{prompt_new_secret, unlock_session, Cli, NEW_PASSWORD_ENV};
use crate::errors::Result;

/// Execute the `change-secret` command.
pub fn execute(cli: &Cli) -> Result<()> {
    // 1. Unlock with the current secret.
    output::info("Enter your current master secret.");
    let (mut session, old) = unlock_session(cli)?;

    // 2. Choose the new one.
    output::info("Choose your new master secret.");
    let new = prompt_new_secret(NEW_PASSWORD_ENV)?;

    // 3. Re-encrypt and commit.
    session.change_master_secret(&old, &new)?;
    let (passwords, notes) = (session.passwords()?.len(), session.notes()?.len());
    session.lock();

    crate::audit::log_audit(
        cli,
        "change-secret",
        None,
        Some(&format!("{passwords} passwords, {notes} notes re-encrypted")),
    );
    output::success(&format!(
        "Master secret changed ({passwords} passwords, {notes} notes re-encrypted)"
    ));

    Ok(())
}
