//! One module per subcommand.  Each exposes an `execute` entry point.

pub mod add;
pub mod audit_cmd;
pub mod change_secret;
pub mod completions;
pub mod delete;
pub mod export;
pub mod get;
pub mod import_cmd;
pub mod init;
pub mod list;
pub mod note;
pub mod reset;
pub mod settings_cmd;
pub mod status;
