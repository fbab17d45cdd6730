//! In-memory `KeyValueStore`, for tests and ephemeral vaults.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{validate_key, KeyValueStore};
use crate::errors::{Result, VaultError};

/// A `KeyValueStore` backed by a shared map.
///
/// Clones share the same map, so a test can keep one handle to inspect
/// what a session wrote through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.entries
            .lock()
            .map_err(|_| VaultError::Storage("memory store lock poisoned".into()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        validate_key(key)?;
        self.lock()?.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.lock()?.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_entries() {
        let a = MemoryStore::new();
        let b = a.clone();
        a.set("manifest", b"{}").unwrap();
        assert_eq!(b.get("manifest").unwrap().as_deref(), Some(&b"{}"[..]));
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn delete_missing_key_is_ok() {
        let store = MemoryStore::new();
        assert!(store.delete("nothing").is_ok());
        assert!(store.is_empty());
    }
}
