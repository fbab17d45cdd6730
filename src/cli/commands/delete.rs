//! `vaultkeep delete` — remove a password entry.

use crate::cli::output;
use crate::cli::{confirm, resolve, unlock_session, Cli};
use crate::errors::Result;

/// Execute the `delete` command.
pub fn execute(cli: &Cli, query: &str, force: bool) -> Result<()> {
    let (mut session, _) = unlock_session(cli)?;

    let target = resolve(session.passwords()?, query, |r| r.app_name.as_str())?;
    let (id, app) = (target.id.clone(), target.app_name.clone());

    // Unless --force is set, ask for confirmation before deleting.
    if !force && !confirm(&format!("Delete password for '{app}'?"))? {
        output::info("Cancelled.");
        return Ok(());
    }

    session.remove_password(&id)?;

    crate::audit::log_audit(cli, "delete", Some(&app), None);
    output::success(&format!("Deleted password for '{app}'"));

    Ok(())
}
