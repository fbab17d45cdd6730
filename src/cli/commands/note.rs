//! `vaultkeep note` — add, list, show and delete secure notes.

use std::io::{self, IsTerminal, Read};

use console::style;

use crate::cli::output;
use crate::cli::{confirm, resolve, unlock_session, Cli, NoteAction};
use crate::errors::{Result, VaultError};
use crate::vault::NoteRecord;

/// Execute a `note` subcommand.
pub fn execute(cli: &Cli, action: &NoteAction) -> Result<()> {
    match action {
        NoteAction::Add {
            title,
            content,
            tags,
        } => add(cli, title, content.as_deref(), tags),
        NoteAction::List => list(cli),
        NoteAction::Show { query } => show(cli, query),
        NoteAction::Delete { query, force } => delete(cli, query, *force),
    }
}

fn add(cli: &Cli, title: &str, content: Option<&str>, tags: &[String]) -> Result<()> {
    let content = match content {
        Some(c) => c.to_string(),
        None if !io::stdin().is_terminal() => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
        None => dialoguer::Editor::new()
            .edit("")
            .map_err(|e| VaultError::CommandFailed(format!("editor: {e}")))?
            .ok_or(VaultError::UserCancelled)?,
    };

    let (mut session, _) = unlock_session(cli)?;
    let mut note = NoteRecord::new(title, content);
    note.tags = tags.to_vec();
    let stored = session.upsert_note(note)?;

    crate::audit::log_audit(cli, "note-add", Some(&stored.title), None);
    output::success(&format!(
        "Added note '{}' ({} total)",
        stored.title,
        session.notes()?.len()
    ));
    Ok(())
}

fn list(cli: &Cli) -> Result<()> {
    let (session, _) = unlock_session(cli)?;
    output::print_notes_table(session.notes()?);
    Ok(())
}

fn show(cli: &Cli, query: &str) -> Result<()> {
    let (session, _) = unlock_session(cli)?;
    let note = resolve(session.notes()?, query, |n| n.title.as_str())?;

    println!("{}", style(&note.title).bold());
    if !note.tags.is_empty() {
        println!("{}", style(note.tags.join(", ")).dim());
    }
    println!();
    println!("{}", note.content);
    Ok(())
}

fn delete(cli: &Cli, query: &str, force: bool) -> Result<()> {
    let (mut session, _) = unlock_session(cli)?;
    let target = resolve(session.notes()?, query, |n| n.title.as_str())?;
    let (id, title) = (target.id.clone(), target.title.clone());

    if !force && !confirm(&format!("Delete note '{title}'?"))? {
        output::info("Cancelled.");
        return Ok(());
    }

    session.remove_note(&id)?;
    crate::audit::log_audit(cli, "note-delete", Some(&title), None);
    output::success(&format!("Deleted note '{title}'"));
    Ok(())
}
