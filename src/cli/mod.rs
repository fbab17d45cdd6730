//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Parser;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::crypto::MasterSecret;
use crate::errors::{Result, VaultError};
use crate::storage::FileStore;
use crate::vault::{CollisionPolicy, Record, SessionState, VaultSession};

/// Minimum master secret length accepted when choosing a new secret.
pub const MIN_SECRET_LEN: usize = 4;

/// Master secret for non-interactive use.
pub const PASSWORD_ENV: &str = "VAULTKEEP_PASSWORD";

/// Replacement secret for non-interactive `change-secret`.
pub const NEW_PASSWORD_ENV: &str = "VAULTKEEP_NEW_PASSWORD";

/// Secret a backup was exported under, for non-interactive `import`.
pub const IMPORT_PASSWORD_ENV: &str = "VAULTKEEP_IMPORT_PASSWORD";

/// vaultkeep CLI: local-first encrypted password and note vault.
#[derive(Parser)]
#[command(
    name = "vaultkeep",
    about = "Local-first encrypted password and note vault",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault directory (default: .vaultkeep)
    #[arg(long, env = "VAULTKEEP_DIR", default_value = ".vaultkeep", global = true)]
    pub vault_dir: PathBuf,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new vault and choose its master secret
    Init,

    /// Show whether a vault exists and what it holds
    Status,

    /// Add a password entry
    Add {
        /// Application or site name (e.g. GitHub)
        app: String,
        /// Password (omit for interactive prompt)
        password: Option<String>,
        /// Account username or email
        #[arg(short, long)]
        username: Option<String>,
        /// Login URL
        #[arg(long)]
        url: Option<String>,
        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
        /// Tag (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        /// Mark as favorite
        #[arg(long)]
        favorite: bool,
    },

    /// Show a password (by app name or id)
    Get {
        /// App name or id prefix
        query: String,
        /// Copy to the clipboard instead of printing
        #[arg(short, long)]
        copy: bool,
    },

    /// List password entries
    List {
        /// Only entries with this tag
        #[arg(long)]
        tag: Option<String>,
        /// Only favorites
        #[arg(long)]
        favorites: bool,
    },

    /// Delete a password entry
    Delete {
        /// App name or id prefix
        query: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Manage secure notes
    Note {
        #[command(subcommand)]
        action: NoteAction,
    },

    /// Show or change vault settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Change the master secret (re-encrypts everything)
    ChangeSecret,

    /// Export an encrypted backup
    Export {
        /// Output file path (prints to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Merge an encrypted backup into this vault
    Import {
        /// Path to the backup file
        file: PathBuf,
        /// Collision policy: keep-existing, prefer-imported, prefer-newer
        #[arg(long)]
        policy: Option<CollisionPolicy>,
    },

    /// Erase the vault and all its data
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// View the audit log of vault operations
    Audit {
        /// Number of entries to show (default: 50)
        #[arg(long, default_value = "50")]
        last: usize,
        /// Show entries since a duration ago (e.g. 7d, 24h, 30m)
        #[arg(long)]
        since: Option<String>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell,
        /// elvish); detected from $SHELL when omitted
        shell: Option<String>,
    },
}

/// Note subcommands.
#[derive(clap::Subcommand)]
pub enum NoteAction {
    /// Add a note
    Add {
        /// Note title
        title: String,
        /// Note body (omit for interactive prompt)
        content: Option<String>,
        /// Tag (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// List notes
    List,

    /// Print a note
    Show {
        /// Title or id prefix
        query: String,
    },

    /// Delete a note
    Delete {
        /// Title or id prefix
        query: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

/// Settings subcommands.
#[derive(clap::Subcommand)]
pub enum SettingsAction {
    /// Print all settings
    Show,

    /// Set one setting (value parsed as JSON, else stored as a string)
    Set { key: String, value: String },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Resolve `--vault-dir` against the current directory.
pub fn vault_dir(cli: &Cli) -> Result<PathBuf> {
    if cli.vault_dir.is_absolute() {
        return Ok(cli.vault_dir.clone());
    }
    Ok(std::env::current_dir()?.join(&cli.vault_dir))
}

/// Load settings and open a session on the vault directory.
pub fn open_session(cli: &Cli) -> Result<(VaultSession<FileStore>, Settings)> {
    let dir = vault_dir(cli)?;
    let settings = Settings::load(&dir)?;
    let store = FileStore::open(&dir)?;
    let session = VaultSession::open(store, settings.argon2_params())?;
    Ok((session, settings))
}

/// Open the vault and unlock it with a prompted secret.
///
/// Returns the secret too, for commands that need it again.
pub fn unlock_session(cli: &Cli) -> Result<(VaultSession<FileStore>, MasterSecret)> {
    let (mut session, _) = open_session(cli)?;
    if session.state() == SessionState::Uninitialized {
        output::tip("Run `vaultkeep init` to create a vault.");
        return Err(VaultError::NotInitialized);
    }
    let secret = prompt_secret("Enter master secret")?;
    session.unlock(&secret)?;
    Ok((session, secret))
}

fn secret_from_env(var: &str) -> Option<Zeroizing<String>> {
    std::env::var(var)
        .ok()
        .map(Zeroizing::new)
        .filter(|s| !s.is_empty())
}

/// Get the master secret, trying `VAULTKEEP_PASSWORD` first and then an
/// interactive prompt.
pub fn prompt_secret(prompt: &str) -> Result<MasterSecret> {
    prompt_secret_from(PASSWORD_ENV, prompt)
}

/// Like `prompt_secret`, reading the named environment variable first.
pub fn prompt_secret_from(var: &str, prompt: &str) -> Result<MasterSecret> {
    if let Some(secret) = secret_from_env(var) {
        return Ok(MasterSecret::new(secret.as_str()));
    }

    let secret = Zeroizing::new(
        dialoguer::Password::new()
            .with_prompt(prompt)
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("secret prompt: {e}")))?,
    );
    Ok(MasterSecret::new(secret.as_str()))
}

/// Prompt for a new secret with confirmation, enforcing the minimum length.
///
/// `var` is checked first for scripted use.
pub fn prompt_new_secret(var: &str) -> Result<MasterSecret> {
    if let Some(secret) = secret_from_env(var) {
        check_new_secret(&secret)?;
        return Ok(MasterSecret::new(secret.as_str()));
    }

    loop {
        let secret = Zeroizing::new(
            dialoguer::Password::new()
                .with_prompt("Choose master secret")
                .with_confirmation("Confirm master secret", "Secrets do not match, try again")
                .interact()
                .map_err(|e| VaultError::CommandFailed(format!("secret prompt: {e}")))?,
        );

        if let Err(e) = check_new_secret(&secret) {
            output::warning(&format!("{e}. Try again."));
            continue;
        }
        return Ok(MasterSecret::new(secret.as_str()));
    }
}

fn check_new_secret(secret: &str) -> Result<()> {
    if secret.chars().count() < MIN_SECRET_LEN {
        return Err(VaultError::CommandFailed(format!(
            "master secret must be at least {MIN_SECRET_LEN} characters"
        )));
    }
    Ok(())
}

/// Ask for a yes/no confirmation (default no).
pub fn confirm(prompt: &str) -> Result<bool> {
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("failed to read confirmation: {e}")))
}

/// Find one record by id, id prefix, or case-insensitive label.
///
/// An exact id wins; otherwise exactly one record must match.
pub fn resolve<'a, R: Record>(
    items: &'a [R],
    query: &str,
    label: impl Fn(&R) -> &str,
) -> Result<&'a R> {
    if let Some(record) = items.iter().find(|r| r.id() == query) {
        return Ok(record);
    }

    let matches: Vec<&R> = items
        .iter()
        .filter(|r| label(r).eq_ignore_ascii_case(query) || r.id().starts_with(query))
        .collect();

    match matches.as_slice() {
        [record] => Ok(*record),
        [] => Err(VaultError::RecordNotFound(query.to_string())),
        many => Err(VaultError::CommandFailed(format!(
            "'{query}' matches {} entries — use the id instead",
            many.len()
        ))),
    }
}
