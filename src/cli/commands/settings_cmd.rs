//! `vaultkeep settings` — show or change the vault's settings collection.

use serde_json::Value;

use crate::cli::output;
use crate::cli::{unlock_session, Cli, SettingsAction};
use crate::errors::{Result, VaultError};

/// Execute a `settings` subcommand.
pub fn execute(cli: &Cli, action: &SettingsAction) -> Result<()> {
    let (mut session, _) = unlock_session(cli)?;

    match action {
        SettingsAction::Show => {
            let settings = session.settings()?;
            if settings.is_empty() {
                output::info("No settings stored.");
                return Ok(());
            }
            let json = serde_json::to_string_pretty(settings)
                .map_err(|e| VaultError::SerializationError(format!("settings: {e}")))?;
            println!("{json}");
        }
        SettingsAction::Set { key, value } => {
            let mut settings = session.settings()?.clone();
            settings.set(key.clone(), parse_value(value));
            session.write_settings(settings)?;
            crate::audit::log_audit(cli, "settings-set", Some(key), None);
            output::success(&format!("Setting '{key}' saved"));
        }
    }
    Ok(())
}

/// JSON if it parses (numbers, booleans, objects), otherwise a plain string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_value_prefers_json() {
        assert_eq!(parse_value("true"), Value::Bool(true));
        assert_eq!(parse_value("42"), Value::from(42));
        assert_eq!(parse_value("dark"), Value::String("dark".into()));
        assert_eq!(parse_value("\"quoted\""), Value::String("quoted".into()));
    }
}
