//! `vaultkeep audit` — display the audit log.
//!
//! Usage:
//!   vaultkeep audit               # last 50 entries
//!   vaultkeep audit --last 20     # last 20
//!   vaultkeep audit --since 7d    # entries from the last 7 days

use chrono::{DateTime, Duration, Utc};

use crate::cli::Cli;
use crate::errors::{Result, VaultError};

/// Execute the `audit` command.
#[cfg(feature = "audit-log")]
pub fn execute(cli: &Cli, last: usize, since: Option<&str>) -> Result<()> {
    use crate::audit::AuditLog;
    use crate::cli::output;

    let vault_dir = crate::cli::vault_dir(cli)?;
    if !vault_dir.exists() {
        return Err(VaultError::NotInitialized);
    }

    let audit = AuditLog::open(&vault_dir)
        .ok_or_else(|| VaultError::AuditError("failed to open audit database".into()))?;

    let since_dt = since.map(parse_since).transpose()?;
    let entries = audit.query(last, since_dt)?;

    if entries.is_empty() {
        output::info("No audit entries found.");
        return Ok(());
    }

    print_audit_table(&entries);
    Ok(())
}

#[cfg(not(feature = "audit-log"))]
pub fn execute(cli: &Cli, last: usize, since: Option<&str>) -> Result<()> {
    let _ = (cli, last, since.map(parse_since).transpose()?);
    Err(VaultError::AuditError(
        "this build has no audit log (rebuild with the `audit-log` feature)".into(),
    ))
}

/// Turn "7d", "24h" or "30m" into the instant that long ago.
fn parse_since(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    let invalid = || {
        VaultError::CommandFailed(format!(
            "invalid duration '{input}' — use format like 7d, 24h, or 30m"
        ))
    };

    let (split, _) = input.char_indices().last().ok_or_else(invalid)?;
    let (num_str, unit) = input.split_at(split);
    let num: i64 = num_str.parse().map_err(|_| invalid())?;
    if num < 0 {
        return Err(invalid());
    }

    let duration = match unit {
        "d" => Duration::try_days(num),
        "h" => Duration::try_hours(num),
        "m" => Duration::try_minutes(num),
        _ => None,
    }
    .ok_or_else(invalid)?;

    Utc::now().checked_sub_signed(duration).ok_or_else(invalid)
}

#[cfg(feature = "audit-log")]
fn print_audit_table(entries: &[crate::audit::AuditEntry]) {
    use comfy_table::{ContentArrangement, Table};
    use console::style;

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Time", "Operation", "Target", "Details"]);

    for entry in entries {
        table.add_row(vec![
            entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            colorize_operation(&entry.operation),
            entry.target.clone().unwrap_or_else(|| "-".into()),
            entry.details.clone().unwrap_or_else(|| "-".into()),
        ]);
    }

    println!("{}", style(format!("{} audit entries:", entries.len())).bold());
    println!("{table}");
}

#[cfg(feature = "audit-log")]
fn colorize_operation(op: &str) -> String {
    use console::style;

    match op {
        "init" | "add" | "note-add" => style(op).green().to_string(),
        "get" | "settings-set" => style(op).blue().to_string(),
        "delete" | "note-delete" | "reset" => style(op).red().to_string(),
        "change-secret" => style(op).yellow().to_string(),
        "export" | "import" => style(op).cyan().to_string(),
        _ => op.to_string(),
    }
}
