//! `vaultkeep add` — add or update a password entry.
//!
//! An existing entry with the same app name and username is updated in
//! place (keeping its id and creation time); anything else is a new entry.

use std::io::{self, IsTerminal, Read};

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{unlock_session, Cli};
use crate::errors::{Result, VaultError};
use crate::vault::{PasswordRecord, PasswordStrength};

/// Options for a new or updated entry.
pub struct AddArgs<'a> {
    pub app: &'a str,
    pub password: Option<&'a str>,
    pub username: Option<&'a str>,
    pub url: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub tags: &'a [String],
    pub favorite: bool,
}

/// Execute the `add` command.
pub fn execute(cli: &Cli, args: AddArgs<'_>) -> Result<()> {
    let password = read_password(args.app, args.password)?;
    if password.is_empty() {
        return Err(VaultError::CommandFailed("password must not be empty".into()));
    }

    let (mut session, _) = unlock_session(cli)?;

    let existing = session
        .passwords()?
        .iter()
        .find(|r| r.app_name.eq_ignore_ascii_case(args.app) && r.username.as_deref() == args.username)
        .cloned();
    let updated = existing.is_some();

    let mut record = existing.unwrap_or_else(|| PasswordRecord::new(args.app, ""));
    record.password = password.to_string();
    record.username = args.username.map(str::to_string);
    if let Some(url) = args.url {
        record.url = Some(url.to_string());
    }
    if let Some(notes) = args.notes {
        record.notes = Some(notes.to_string());
    }
    if !args.tags.is_empty() {
        record.tags = args.tags.to_vec();
    }
    record.favorite |= args.favorite;

    let stored = session.upsert_password(record)?;
    let total = session.passwords()?.len();

    crate::audit::log_audit(
        cli,
        "add",
        Some(&stored.app_name),
        Some(if updated { "updated" } else { "added" }),
    );

    output::success(&format!(
        "{} '{}' ({} total)",
        if updated { "Updated" } else { "Added" },
        stored.app_name,
        total
    ));
    if stored.strength == PasswordStrength::Weak {
        output::warning("This password is weak. Consider a longer one with mixed characters.");
    }

    Ok(())
}

/// Password from the command line, piped stdin, or a hidden prompt.
fn read_password(app: &str, inline: Option<&str>) -> Result<Zeroizing<String>> {
    if let Some(v) = inline {
        output::warning("Password provided on command line — it may appear in shell history.");
        return Ok(Zeroizing::new(v.to_string()));
    }

    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_to_string(&mut buf)?;
        let trimmed = buf.trim_end().len();
        buf.truncate(trimmed);
        return Ok(buf);
    }

    let pw = dialoguer::Password::new()
        .with_prompt(format!("Password for {app}"))
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("input prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}
