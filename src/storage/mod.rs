//! Persistent key-value substrate the vault is written on.
//!
//! The engine only needs four operations from its host: get, set, delete
//! and list.  `set` must be atomic per key: after a crash a reader sees
//! either the old value or the new one, never a torn write.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::errors::{Result, VaultError};

/// Durable byte storage addressed by string keys.
pub trait KeyValueStore {
    /// Return the value for `key`, or `None` if it was never written.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Atomically replace the value for `key`.
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Remove `key`.  Removing a missing key is not an error.
    fn delete(&self, key: &str) -> Result<()>;

    /// List every key currently stored, in ascending order.
    fn keys(&self) -> Result<Vec<String>>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }

    fn keys(&self) -> Result<Vec<String>> {
        (**self).keys()
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }

    fn keys(&self) -> Result<Vec<String>> {
        (**self).keys()
    }
}

/// Validate that a storage key is safe to use as a file name.
///
/// Allowed: ASCII lowercase letters, digits, underscores, hyphens, periods.
/// Must be non-empty, at most 128 characters, and not start with a period.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.len() > 128 {
        return Err(VaultError::Storage(format!(
            "storage key must be 1-128 characters (got {})",
            key.len()
        )));
    }
    if key.starts_with('.') {
        return Err(VaultError::Storage(format!(
            "storage key '{key}' cannot start with a period"
        )));
    }
    if !key.bytes().all(|b| {
        b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-' || b == b'.'
    }) {
        return Err(VaultError::Storage(format!(
            "storage key '{key}' contains invalid characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_keys() {
        assert!(validate_key("manifest").is_ok());
        assert!(validate_key("g1.passwords").is_ok());
        assert!(validate_key("settings").is_ok());
    }

    #[test]
    fn rejects_unsafe_keys() {
        assert!(validate_key("").is_err());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key(".hidden").is_err());
        assert!(validate_key("Upper").is_err());
        assert!(validate_key(&"a".repeat(129)).is_err());
    }
}
