//! `vaultkeep list` — list password entries (never the passwords).

use crate::cli::output;
use crate::cli::{unlock_session, Cli};
use crate::errors::Result;
use crate::vault::PasswordRecord;

/// Execute the `list` command.
pub fn execute(cli: &Cli, tag: Option<&str>, favorites: bool) -> Result<()> {
    let (session, _) = unlock_session(cli)?;

    let mut records: Vec<&PasswordRecord> = session
        .passwords()?
        .iter()
        .filter(|r| !favorites || r.favorite)
        .filter(|r| tag.map_or(true, |t| r.tags.iter().any(|rt| rt.eq_ignore_ascii_case(t))))
        .collect();
    records.sort_by_key(|r| r.app_name.to_lowercase());

    output::print_passwords_table(&records);
    Ok(())
}
