//! `VaultSession` — the stateful façade the application talks to.
//!
//! ```text
//! Uninitialized --setup--> Locked --unlock--> Unlocked --lock--> Locked
//!        ^                                                          |
//!        +------------------------- reset --------------------------+
//! ```
//!
//! One session owns one storage location.  Every state-changing method
//! takes `&mut self`, so a caller that shares a session across threads
//! has to put it behind its own lock; the engine does no internal locking.

use chrono::Utc;
use tracing::{info, warn};
use zeroize::Zeroizing;

use super::record::{CollectionKind, Collections, NoteRecord, PasswordRecord, Record, VaultSettings};
use super::store::VaultStore;
use crate::crypto::{Argon2Params, Cipher, CredentialVerifier, MasterSecret};
use crate::errors::{Result, VaultError};
use crate::storage::KeyValueStore;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Locked,
    Unlocked,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Locked => "locked",
            Self::Unlocked => "unlocked",
        }
    }
}

/// Plaintext state held only while unlocked.  Dropping it wipes the
/// secret and the record passwords/note bodies.
struct Unlocked {
    secret: MasterSecret,
    data: Collections,
}

/// A handle on one vault.
pub struct VaultSession<B> {
    store: VaultStore<B>,
    verifier: CredentialVerifier,
    initialized: bool,
    unlocked: Option<Unlocked>,
}

impl<B: KeyValueStore> VaultSession<B> {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Open a session on `backend`, sweeping leftovers of any interrupted
    /// rotation or import.  New vaults and rotations use `params`.
    pub fn open(backend: B, params: Argon2Params) -> Result<Self> {
        let store = VaultStore::new(backend, params);
        store.recover()?;
        let initialized = store.is_initialized()?;
        Ok(Self {
            store,
            verifier: CredentialVerifier::new(params),
            initialized,
            unlocked: None,
        })
    }

    pub fn state(&self) -> SessionState {
        match (&self.unlocked, self.initialized) {
            (Some(_), _) => SessionState::Unlocked,
            (None, true) => SessionState::Locked,
            (None, false) => SessionState::Uninitialized,
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked.is_some()
    }

    pub fn store(&self) -> &VaultStore<B> {
        &self.store
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Create the vault: store the verifier and empty collections.
    ///
    /// Leaves the session `Locked`; call `unlock` to start using it.
    pub fn setup(&mut self, secret: &MasterSecret) -> Result<()> {
        let existing = self.store.manifest()?;
        let hash = self
            .verifier
            .setup(secret, existing.as_ref().map(|m| &m.verifier))?;
        self.store.initialize(hash, secret)?;
        self.initialized = true;
        info!("master secret set up");
        Ok(())
    }

    /// Verify `secret` and decrypt every collection into memory.
    pub fn unlock(&mut self, secret: &MasterSecret) -> Result<()> {
        match self.state() {
            SessionState::Uninitialized => return Err(VaultError::NotInitialized),
            SessionState::Unlocked => return Err(VaultError::InvalidState("unlocked")),
            SessionState::Locked => {}
        }

        if !self.store.verify_secret(secret)? {
            warn!("unlock rejected: invalid master secret");
            return Err(VaultError::InvalidSecret);
        }

        // The secret verified, so any authentication failure from here on
        // is damaged storage, not a typo.
        let data = Collections {
            passwords: self.load_verified(CollectionKind::Passwords, secret)?,
            notes: self.load_verified(CollectionKind::Notes, secret)?,
            settings: self.load_verified(CollectionKind::Settings, secret)?,
        };

        info!(
            passwords = data.passwords.len(),
            notes = data.notes.len(),
            "vault unlocked"
        );
        self.unlocked = Some(Unlocked {
            secret: secret.clone(),
            data,
        });
        Ok(())
    }

    fn load_verified<T: serde::de::DeserializeOwned>(
        &self,
        kind: CollectionKind,
        secret: &MasterSecret,
    ) -> Result<T> {
        let json = self
            .store
            .load(kind, secret)
            .map_err(VaultError::into_corrupt)?;
        serde_json::from_slice(&json).map_err(|_| VaultError::Corrupt {
            collection: kind.name().into(),
        })
    }

    /// Forget the secret and all decrypted data.
    pub fn lock(&mut self) {
        if self.unlocked.take().is_some() {
            info!("vault locked");
        }
    }

    /// Erase everything and return to `Uninitialized`.
    pub fn reset(&mut self) -> Result<()> {
        self.unlocked = None;
        self.store.clear()?;
        self.initialized = false;
        info!("vault reset");
        Ok(())
    }

    /// Re-encrypt every collection under `new` and replace the verifier.
    ///
    /// The stored blobs are decrypted with `old` and re-sealed under a new
    /// salt, then committed together with the new verifier as one
    /// generation.  If anything fails first, `old` keeps working.
    pub fn rotate_secret(&mut self, old: &MasterSecret, new: &MasterSecret) -> Result<()> {
        self.require_unlocked()?;
        let manifest = self.store.manifest()?.ok_or(VaultError::NotInitialized)?;
        let hash = self.verifier.rotate(old, new, &manifest.verifier)?;

        let mut changes = Vec::with_capacity(CollectionKind::ENCRYPTED.len());
        for kind in CollectionKind::ENCRYPTED {
            let plaintext = match self.store.load_blob(kind)? {
                Some(blob) => Zeroizing::new(
                    Cipher::decrypt(&blob, old, kind.name().as_bytes())
                        .map_err(|e| VaultError::from_cipher(e, kind.name()).into_corrupt())?,
                ),
                None => self.serialize_current(kind)?,
            };
            changes.push((kind, self.store.seal(kind, &plaintext, new)?));
        }

        let manifest = self.store.commit_generation(changes, Some(hash))?;

        if let Some(unlocked) = self.unlocked.as_mut() {
            unlocked.secret = new.clone();
        }
        info!(generation = manifest.generation, "master secret rotated");
        Ok(())
    }

    fn serialize_current(&self, kind: CollectionKind) -> Result<Zeroizing<Vec<u8>>> {
        let data = &self.require_unlocked()?.data;
        let json = match kind {
            CollectionKind::Passwords => serde_json::to_vec(&data.passwords),
            CollectionKind::Notes => serde_json::to_vec(&data.notes),
            CollectionKind::Settings => serde_json::to_vec(&data.settings),
        };
        json.map(Zeroizing::new)
            .map_err(|e| VaultError::SerializationError(format!("{kind}: {e}")))
    }

    // ------------------------------------------------------------------
    // Reading
    // ------------------------------------------------------------------

    fn require_unlocked(&self) -> Result<&Unlocked> {
        match (&self.unlocked, self.initialized) {
            (Some(unlocked), _) => Ok(unlocked),
            (None, true) => Err(VaultError::InvalidState("locked")),
            (None, false) => Err(VaultError::NotInitialized),
        }
    }

    /// All records of one collection.
    pub fn read_collection<R: Record>(&self) -> Result<&[R]> {
        Ok(R::items(&self.require_unlocked()?.data))
    }

    pub fn passwords(&self) -> Result<&[PasswordRecord]> {
        self.read_collection()
    }

    pub fn notes(&self) -> Result<&[NoteRecord]> {
        self.read_collection()
    }

    pub fn settings(&self) -> Result<&VaultSettings> {
        Ok(&self.require_unlocked()?.data.settings)
    }

    /// Look a record up by id.
    pub fn find<R: Record>(&self, id: &str) -> Result<Option<&R>> {
        Ok(self.read_collection::<R>()?.iter().find(|r| r.id() == id))
    }

    // ------------------------------------------------------------------
    // Writing
    // ------------------------------------------------------------------

    /// Insert or replace a record by id and persist its collection.
    ///
    /// `updated_at` moves to now; `created_at` is kept from the stored
    /// record when one exists.  Returns the record as stored.
    pub fn upsert<R: Record>(&mut self, mut record: R) -> Result<R> {
        let mut items = self.read_collection::<R>()?.to_vec();
        let now = Utc::now();

        match items.iter().position(|r| r.id() == record.id()) {
            Some(index) => {
                record.stamp(items[index].created_at(), now);
                items[index] = record.clone();
            }
            None => {
                let created_at = record.created_at();
                record.stamp(created_at, now);
                items.push(record.clone());
            }
        }

        self.persist(items)?;
        Ok(record)
    }

    /// Remove a record by id and persist its collection.
    pub fn remove<R: Record>(&mut self, id: &str) -> Result<R> {
        let mut items = self.read_collection::<R>()?.to_vec();
        let index = items
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| VaultError::RecordNotFound(id.to_string()))?;
        let removed = items.remove(index);
        self.persist(items)?;
        Ok(removed)
    }

    /// Replace a whole collection.
    ///
    /// Records that are new or differ from the stored record with the same
    /// id get `updated_at` set to now; unchanged records keep theirs.
    pub fn write_collection<R: Record>(&mut self, items: Vec<R>) -> Result<()> {
        let current = self.read_collection::<R>()?;
        let now = Utc::now();

        let stamped: Vec<R> = items
            .into_iter()
            .map(|mut record| {
                match current.iter().find(|r| r.id() == record.id()) {
                    Some(existing) if *existing == record => {}
                    Some(existing) => record.stamp(existing.created_at(), now),
                    None => {
                        let created_at = record.created_at();
                        record.stamp(created_at, now);
                    }
                }
                record
            })
            .collect();

        self.persist(stamped)
    }

    /// Record that a password was just used (copied or revealed).
    pub fn touch_password(&mut self, id: &str) -> Result<PasswordRecord> {
        let mut items = self.read_collection::<PasswordRecord>()?.to_vec();
        let record = items
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| VaultError::RecordNotFound(id.to_string()))?;
        record.last_used = Some(Utc::now());
        let touched = record.clone();
        self.persist(items)?;
        Ok(touched)
    }

    /// Replace the settings collection.
    pub fn write_settings(&mut self, settings: VaultSettings) -> Result<()> {
        let unlocked = self.require_unlocked()?;
        let json = serde_json::to_vec(&settings)
            .map_err(|e| VaultError::SerializationError(format!("settings: {e}")))?;
        self.store
            .save(CollectionKind::Settings, &json, &unlocked.secret)?;
        if let Some(unlocked) = self.unlocked.as_mut() {
            unlocked.data.settings = settings;
        }
        Ok(())
    }

    /// Persist `items` as the whole collection, then adopt them in memory.
    /// Memory is only updated once the write is durable.
    pub(crate) fn persist<R: Record>(&mut self, items: Vec<R>) -> Result<()> {
        let unlocked = self.require_unlocked()?;
        let json = Zeroizing::new(
            serde_json::to_vec(&items)
                .map_err(|e| VaultError::SerializationError(format!("{}: {e}", R::KIND)))?,
        );
        self.store.save(R::KIND, &json, &unlocked.secret)?;

        if let Some(unlocked) = self.unlocked.as_mut() {
            *R::items_mut(&mut unlocked.data) = items;
        }
        Ok(())
    }

    /// Commit several rewritten collections as one generation, then adopt
    /// them in memory.  Used by import so a merge lands all-or-nothing.
    pub(crate) fn persist_all(&mut self, data: Collections, changed: &[CollectionKind]) -> Result<()> {
        let unlocked = self.require_unlocked()?;
        let mut changes = Vec::with_capacity(changed.len());
        for kind in changed {
            let json = match kind {
                CollectionKind::Passwords => serde_json::to_vec(&data.passwords),
                CollectionKind::Notes => serde_json::to_vec(&data.notes),
                CollectionKind::Settings => serde_json::to_vec(&data.settings),
            }
            .map(Zeroizing::new)
            .map_err(|e| VaultError::SerializationError(format!("{kind}: {e}")))?;
            changes.push((*kind, self.store.seal(*kind, &json, &unlocked.secret)?));
        }

        self.store.commit_generation(changes, None)?;

        if let Some(unlocked) = self.unlocked.as_mut() {
            unlocked.data = data;
        }
        Ok(())
    }

    pub(crate) fn current(&self) -> Result<&Collections> {
        Ok(&self.require_unlocked()?.data)
    }

    // ------------------------------------------------------------------
    // Application-facing names
    // ------------------------------------------------------------------

    /// Alias of `setup`.
    pub fn setup_master_secret(&mut self, secret: &MasterSecret) -> Result<()> {
        self.setup(secret)
    }

    /// Check a candidate secret without unlocking.
    pub fn verify_master_secret(&self, secret: &MasterSecret) -> Result<bool> {
        self.store.verify_secret(secret)
    }

    /// Alias of `rotate_secret`.
    pub fn change_master_secret(&mut self, old: &MasterSecret, new: &MasterSecret) -> Result<()> {
        self.rotate_secret(old, new)
    }

    /// An owned copy of one collection.
    pub fn load_collection<R: Record>(&self) -> Result<Vec<R>> {
        Ok(self.read_collection::<R>()?.to_vec())
    }

    /// Alias of `write_collection`.
    pub fn save_collection<R: Record>(&mut self, items: Vec<R>) -> Result<()> {
        self.write_collection(items)
    }

    pub fn upsert_password(&mut self, record: PasswordRecord) -> Result<PasswordRecord> {
        self.upsert(record)
    }

    pub fn upsert_note(&mut self, record: NoteRecord) -> Result<NoteRecord> {
        self.upsert(record)
    }

    pub fn remove_password(&mut self, id: &str) -> Result<PasswordRecord> {
        self.remove(id)
    }

    pub fn remove_note(&mut self, id: &str) -> Result<NoteRecord> {
        self.remove(id)
    }

    /// Alias of `reset`.
    pub fn clear_all_data(&mut self) -> Result<()> {
        self.reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn fast() -> Argon2Params {
        Argon2Params {
            memory_kib: 8_192,
            iterations: 1,
            parallelism: 1,
        }
    }

    fn unlocked(secret: &str) -> VaultSession<MemoryStore> {
        let mut session = VaultSession::open(MemoryStore::new(), fast()).unwrap();
        session.setup(&secret.into()).unwrap();
        session.unlock(&secret.into()).unwrap();
        session
    }

    #[test]
    fn fresh_session_is_uninitialized() {
        let session = VaultSession::open(MemoryStore::new(), fast()).unwrap();
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert!(matches!(
            session.passwords(),
            Err(VaultError::NotInitialized)
        ));
    }

    #[test]
    fn unlock_before_setup_fails() {
        let mut session = VaultSession::open(MemoryStore::new(), fast()).unwrap();
        assert!(matches!(
            session.unlock(&"1234".into()),
            Err(VaultError::NotInitialized)
        ));
    }

    #[test]
    fn unlock_twice_is_invalid_state() {
        let mut session = unlocked("1234");
        assert!(matches!(
            session.unlock(&"1234".into()),
            Err(VaultError::InvalidState("unlocked"))
        ));
    }

    #[test]
    fn reads_require_unlock() {
        let mut session = unlocked("1234");
        session.lock();
        assert_eq!(session.state(), SessionState::Locked);
        assert!(matches!(
            session.passwords(),
            Err(VaultError::InvalidState("locked"))
        ));
    }

    #[test]
    fn upsert_preserves_created_at_and_bumps_updated_at() {
        let mut session = unlocked("1234");
        let stored = session.upsert(PasswordRecord::new("GitHub", "abc")).unwrap();

        let mut edited = stored.clone();
        edited.password = "Longer-Password-1".into();
        edited.created_at = edited.created_at + chrono::Duration::days(3);
        let updated = session.upsert(edited).unwrap();

        assert_eq!(updated.created_at, stored.created_at);
        assert!(updated.updated_at >= stored.updated_at);
        assert_eq!(session.passwords().unwrap().len(), 1);
        assert_eq!(session.passwords().unwrap()[0].password, "Longer-Password-1");
    }

    #[test]
    fn remove_missing_record_fails() {
        let mut session = unlocked("1234");
        assert!(matches!(
            session.remove::<NoteRecord>("nope"),
            Err(VaultError::RecordNotFound(_))
        ));
    }

    #[test]
    fn write_collection_only_stamps_changed_records() {
        let mut session = unlocked("1234");
        let a = session.upsert(NoteRecord::new("a", "1")).unwrap();
        let b = session.upsert(NoteRecord::new("b", "2")).unwrap();

        let mut b_edit = b.clone();
        b_edit.content = "changed".into();
        session.write_collection(vec![a.clone(), b_edit]).unwrap();

        let notes = session.notes().unwrap();
        assert_eq!(notes[0].updated_at, a.updated_at);
        assert!(notes[1].updated_at >= b.updated_at);
        assert_eq!(notes[1].content, "changed");
    }

    #[test]
    fn writes_survive_lock_and_unlock() {
        let mut session = unlocked("1234");
        session.upsert(NoteRecord::new("todo", "milk")).unwrap();
        let mut settings = VaultSettings::default();
        settings.set("theme", "dark".into());
        session.write_settings(settings.clone()).unwrap();

        session.lock();
        session.unlock(&"1234".into()).unwrap();
        assert_eq!(session.notes().unwrap()[0].content, "milk");
        assert_eq!(session.settings().unwrap(), &settings);
    }

    #[test]
    fn touch_password_sets_last_used() {
        let mut session = unlocked("1234");
        let record = session.upsert(PasswordRecord::new("Mail", "pw")).unwrap();
        assert!(record.last_used.is_none());
        let touched = session.touch_password(&record.id).unwrap();
        assert!(touched.last_used.is_some());
        assert_eq!(touched.updated_at, record.updated_at);
    }

    #[test]
    fn rotate_requires_unlocked_session() {
        let mut session = unlocked("1234");
        session.lock();
        assert!(matches!(
            session.rotate_secret(&"1234".into(), &"5678".into()),
            Err(VaultError::InvalidState("locked"))
        ));
    }

    #[test]
    fn reset_returns_to_uninitialized() {
        let mut session = unlocked("1234");
        session.reset().unwrap();
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert!(session.store().backend().is_empty());
    }
}
