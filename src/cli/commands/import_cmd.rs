//! `vaultkeep import` — merge an encrypted backup into the vault.
//!
//! Accepts current snapshots and the older bare `encryptedData` form.
//! The backup is decrypted with the secret it was exported under
//! (`VAULTKEEP_IMPORT_PASSWORD`, else `VAULTKEEP_PASSWORD`, else a prompt)
//! and re-sealed under this vault's secret.

use std::fs;
use std::path::Path;

use crate::cli::output;
use crate::cli::{open_session, prompt_secret, prompt_secret_from, Cli, IMPORT_PASSWORD_ENV, PASSWORD_ENV};
use crate::errors::{Result, VaultError};
use crate::vault::{CollisionPolicy, ImportSummary, SessionState};

/// Execute the `import` command.
pub fn execute(cli: &Cli, file: &Path, policy: Option<CollisionPolicy>) -> Result<()> {
    let raw = fs::read_to_string(file).map_err(|e| {
        VaultError::CommandFailed(format!("cannot read {}: {e}", file.display()))
    })?;

    let (mut session, settings) = open_session(cli)?;
    if session.state() == SessionState::Uninitialized {
        output::tip("Run `vaultkeep init` to create a vault first.");
        return Err(VaultError::NotInitialized);
    }
    let secret = prompt_secret("Enter master secret")?;
    session.unlock(&secret)?;

    let import_var = if std::env::var_os(IMPORT_PASSWORD_ENV).is_some() {
        IMPORT_PASSWORD_ENV
    } else {
        PASSWORD_ENV
    };
    let import_secret = prompt_secret_from(import_var, "Enter the backup's master secret")?;

    let policy = policy.unwrap_or(settings.default_collision_policy);
    let summary = session.import_snapshot(&raw, &import_secret, policy)?;

    crate::audit::log_audit(
        cli,
        "import",
        Some(&file.display().to_string()),
        Some(&describe(&summary)),
    );

    output::success(&format!("Imported {} ({})", file.display(), summary.format));
    output::info(&describe(&summary));
    if summary.collisions > 0 && policy == CollisionPolicy::KeepExisting {
        output::tip("Pass `--policy prefer-imported` or `--policy prefer-newer` to take imported entries.");
    }

    Ok(())
}

fn describe(summary: &ImportSummary) -> String {
    format!(
        "{} passwords and {} notes added, {} collisions ({} replaced), {} settings added",
        summary.passwords.added,
        summary.notes.added,
        summary.collisions,
        summary.passwords.replaced + summary.notes.replaced,
        summary.settings_added
    )
}
