//! `vaultkeep export` — write an encrypted backup snapshot.
//!
//! The snapshot holds the stored ciphertext as-is; it can only be opened
//! with the master secret that was current at export time.

use std::fs;
use std::path::Path;

use crate::cli::output;
use crate::cli::{unlock_session, vault_dir, Cli};
use crate::errors::{Result, VaultError};

/// Execute the `export` command.
pub fn execute(cli: &Cli, output_path: Option<&Path>) -> Result<()> {
    let (session, _) = unlock_session(cli)?;
    let json = session.export_snapshot()?;
    let (passwords, notes) = (session.passwords()?.len(), session.notes()?.len());

    crate::audit::log_audit(
        cli,
        "export",
        None,
        Some(&format!("{passwords} passwords, {notes} notes")),
    );

    match output_path {
        Some(dest) => {
            // Refuse to write a backup inside the vault directory.
            let vault = vault_dir(cli)?;
            let parent = dest
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            if let (Ok(a), Ok(b)) = (parent.canonicalize(), vault.canonicalize()) {
                if a.starts_with(&b) {
                    return Err(VaultError::CommandFailed(
                        "refusing to export into the vault directory".into(),
                    ));
                }
            }

            fs::write(dest, format!("{json}\n")).map_err(|e| {
                VaultError::CommandFailed(format!("failed to write export file: {e}"))
            })?;

            output::success(&format!(
                "Exported {passwords} passwords and {notes} notes to {}",
                dest.display()
            ));
        }
        None => println!("{json}"),
    }

    Ok(())
}
