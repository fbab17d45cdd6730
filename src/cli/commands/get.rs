//! `vaultkeep get` — print a password, or copy it to the clipboard.

use crate::cli::output;
use crate::cli::{resolve, unlock_session, Cli};
use crate::errors::{Result, VaultError};

/// Execute the `get` command.
pub fn execute(cli: &Cli, query: &str, copy: bool) -> Result<()> {
    let (mut session, _) = unlock_session(cli)?;

    let id = resolve(session.passwords()?, query, |r| r.app_name.as_str())?
        .id
        .clone();
    let record = session.touch_password(&id)?;

    if copy {
        let mut clipboard = arboard::Clipboard::new()
            .map_err(|e| VaultError::CommandFailed(format!("clipboard unavailable: {e}")))?;
        clipboard
            .set_text(record.password.as_str())
            .map_err(|e| VaultError::CommandFailed(format!("clipboard write failed: {e}")))?;
        output::success(&format!("Copied password for '{}' to the clipboard", record.app_name));
    } else {
        println!("{}", record.password);
    }

    crate::audit::log_audit(
        cli,
        "get",
        Some(&record.app_name),
        Some(if copy { "copied" } else { "revealed" }),
    );

    Ok(())
}
