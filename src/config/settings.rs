use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crypto::Argon2Params;
use crate::errors::{Result, VaultError};
use crate::vault::CollisionPolicy;

/// Per-vault configuration, loaded from `<vault_dir>/vaultkeep.toml`.
///
/// Every field has a default so a vault works without any config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Argon2 memory cost in KiB (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,

    /// How `import` resolves id collisions when `--policy` is not given.
    #[serde(default)]
    pub default_collision_policy: CollisionPolicy,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
            default_collision_policy: CollisionPolicy::default(),
        }
    }
}

impl Settings {
    /// Name of the config file inside the vault directory.
    pub const FILE_NAME: &'static str = "vaultkeep.toml";

    /// Load settings from `<vault_dir>/vaultkeep.toml`.
    ///
    /// A missing file yields defaults.  A file that does not parse, or
    /// whose Argon2 params are out of range, is an error.
    pub fn load(vault_dir: &Path) -> Result<Self> {
        let config_path = vault_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        settings.argon2_params().validate().map_err(|e| {
            VaultError::ConfigError(format!("{}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// Convert the Argon2 settings into crypto-layer params.
    pub fn argon2_params(&self) -> Argon2Params {
        Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.argon2_params(), Argon2Params::default());
        assert_eq!(s.default_collision_policy, CollisionPolicy::KeepExisting);
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(Settings::load(tmp.path()).unwrap(), Settings::default());
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
argon2_memory_kib = 131072
argon2_iterations = 5
argon2_parallelism = 8
default_collision_policy = "prefer-newer"
"#;
        fs::write(tmp.path().join("vaultkeep.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.argon2_memory_kib, 131_072);
        assert_eq!(settings.argon2_iterations, 5);
        assert_eq!(settings.argon2_parallelism, 8);
        assert_eq!(settings.default_collision_policy, CollisionPolicy::PreferNewer);
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("vaultkeep.toml"), "argon2_iterations = 2\n").unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.argon2_iterations, 2);
        assert_eq!(settings.argon2_memory_kib, 65_536);
        assert_eq!(settings.default_collision_policy, CollisionPolicy::KeepExisting);
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("vaultkeep.toml"), "not valid {{toml").unwrap();
        assert!(matches!(
            Settings::load(tmp.path()),
            Err(VaultError::ConfigError(_))
        ));
    }

    #[test]
    fn load_rejects_weak_argon2_params() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("vaultkeep.toml"), "argon2_memory_kib = 16\n").unwrap();
        assert!(matches!(
            Settings::load(tmp.path()),
            Err(VaultError::ConfigError(_))
        ));
    }

    #[test]
    fn load_rejects_unknown_policy() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("vaultkeep.toml"),
            "default_collision_policy = \"coin-flip\"\n",
        )
        .unwrap();
        assert!(Settings::load(tmp.path()).is_err());
    }
}
