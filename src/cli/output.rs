//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::{NoteRecord, PasswordRecord, PasswordStrength};

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// First 8 characters of a record id, enough to address it on the CLI.
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn strength_cell(strength: PasswordStrength) -> String {
    match strength {
        PasswordStrength::Weak => style(strength).red().to_string(),
        PasswordStrength::Medium => style(strength).yellow().to_string(),
        PasswordStrength::Strong => style(strength).green().to_string(),
    }
}

fn star(favorite: bool) -> &'static str {
    if favorite {
        "\u{2605}"
    } else {
        ""
    }
}

/// Print a table of password entries.  Passwords themselves are never shown.
pub fn print_passwords_table(records: &[&PasswordRecord]) {
    if records.is_empty() {
        info("No passwords in this vault yet.");
        tip("Run `vaultkeep add <APP>` to add your first entry.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["ID", "", "App", "Username", "Strength", "Tags", "Updated"]);

    for r in records {
        table.add_row(vec![
            short_id(&r.id).to_string(),
            star(r.favorite).to_string(),
            r.app_name.clone(),
            r.username.clone().unwrap_or_default(),
            strength_cell(r.strength),
            r.tags.join(", "),
            r.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }

    println!("{table}");
}

/// Print a table of notes (titles only).
pub fn print_notes_table(notes: &[NoteRecord]) {
    if notes.is_empty() {
        info("No notes in this vault yet.");
        tip("Run `vaultkeep note add <TITLE>` to add one.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["ID", "", "Title", "Tags", "Updated"]);

    for n in notes {
        table.add_row(vec![
            short_id(&n.id).to_string(),
            star(n.favorite).to_string(),
            n.title.clone(),
            n.tags.join(", "),
            n.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }

    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_id_truncates_long_ids_only() {
        assert_eq!(short_id("0123456789abcdef"), "01234567");
        assert_eq!(short_id("abc"), "abc");
    }
}
