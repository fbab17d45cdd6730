//! Encrypted collection storage on top of a `KeyValueStore`.
//!
//! `VaultStore` turns "save the passwords collection" into: serialize,
//! encrypt under a fresh salt and nonce, and atomically replace one key.
//! It never holds plaintext or secrets between calls.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::manifest::{self, VaultManifest, FIRST_GENERATION, MANIFEST_KEY};
use super::record::CollectionKind;
use crate::crypto::{Argon2Params, Cipher, CredentialVerifier, EncryptedBlob, MasterSecret, SaltedHash};
use crate::errors::{Result, VaultError};
use crate::storage::KeyValueStore;

/// The persistence layer of a vault.
pub struct VaultStore<B> {
    backend: B,
    cipher: Cipher,
}

impl<B: KeyValueStore> VaultStore<B> {
    /// Wrap a backend.  `params` are used for every new encryption; old
    /// blobs keep decrypting with whatever params they record.
    pub fn new(backend: B, params: Argon2Params) -> Self {
        Self {
            backend,
            cipher: Cipher::new(params),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn cipher(&self) -> &Cipher {
        &self.cipher
    }

    // ------------------------------------------------------------------
    // Manifest
    // ------------------------------------------------------------------

    /// The stored manifest, or `None` for an uninitialized location.
    pub fn manifest(&self) -> Result<Option<VaultManifest>> {
        match self.backend.get(MANIFEST_KEY)? {
            Some(bytes) => Ok(Some(VaultManifest::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    fn require_manifest(&self) -> Result<VaultManifest> {
        self.manifest()?.ok_or(VaultError::NotInitialized)
    }

    pub fn is_initialized(&self) -> Result<bool> {
        Ok(self.manifest()?.is_some())
    }

    /// Write empty collections and the manifest for a new vault.
    ///
    /// The manifest goes last: until it lands the location still reads
    /// as uninitialized, and the half-written keys are swept by `recover`.
    pub fn initialize(&self, verifier: SaltedHash, secret: &MasterSecret) -> Result<VaultManifest> {
        if self.is_initialized()? {
            return Err(VaultError::AlreadyInitialized);
        }
        self.sweep(None)?;

        for kind in CollectionKind::ALL {
            let bytes = self.seal(kind, kind.empty_json(), secret)?;
            self.backend
                .set(&manifest::collection_key(FIRST_GENERATION, kind), &bytes)?;
        }

        let manifest = VaultManifest::new(verifier);
        self.backend.set(MANIFEST_KEY, &manifest.to_bytes()?)?;
        info!(generation = manifest.generation, "vault initialized");
        Ok(manifest)
    }

    // ------------------------------------------------------------------
    // Collections
    // ------------------------------------------------------------------

    /// Encrypt and persist one collection's JSON.
    pub fn save(&self, kind: CollectionKind, plaintext_json: &[u8], secret: &MasterSecret) -> Result<()> {
        let manifest = self.require_manifest()?;
        let bytes = self.seal(kind, plaintext_json, secret)?;
        self.backend
            .set(&manifest::collection_key(manifest.generation, kind), &bytes)?;
        debug!(collection = %kind, generation = manifest.generation, "collection saved");
        Ok(())
    }

    /// Load and decrypt one collection's JSON.
    ///
    /// A collection that was never written yields its empty value.  A blob
    /// that fails authentication yields `DecryptionFailed`; whether that is
    /// corruption or a wrong secret is for the caller to decide.
    pub fn load(&self, kind: CollectionKind, secret: &MasterSecret) -> Result<Zeroizing<Vec<u8>>> {
        if !kind.is_encrypted() {
            return Ok(Zeroizing::new(
                self.load_raw(kind)?
                    .unwrap_or_else(|| kind.empty_json().to_vec()),
            ));
        }

        match self.load_blob(kind)? {
            Some(blob) => Cipher::decrypt(&blob, secret, kind.name().as_bytes())
                .map(Zeroizing::new)
                .map_err(|e| VaultError::from_cipher(e, kind.name())),
            None => Ok(Zeroizing::new(kind.empty_json().to_vec())),
        }
    }

    /// The stored blob of an encrypted collection, without decrypting it.
    pub fn load_blob(&self, kind: CollectionKind) -> Result<Option<EncryptedBlob>> {
        match self.load_raw(kind)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|_| VaultError::Corrupt {
                    collection: kind.name().into(),
                }),
            None => Ok(None),
        }
    }

    /// The stored settings JSON, if any was written.
    pub fn load_settings_value(&self) -> Result<Option<serde_json::Value>> {
        match self.load_raw(CollectionKind::Settings)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|_| VaultError::Corrupt {
                    collection: CollectionKind::Settings.name().into(),
                }),
            None => Ok(None),
        }
    }

    fn load_raw(&self, kind: CollectionKind) -> Result<Option<Vec<u8>>> {
        let Some(manifest) = self.manifest()? else {
            return Ok(None);
        };
        self.backend
            .get(&manifest::collection_key(manifest.generation, kind))
    }

    /// Turn collection JSON into the bytes stored for `kind`.
    ///
    /// Secret collections become an `EncryptedBlob`; settings are checked
    /// to be a JSON object and stored as-is.
    pub fn seal(&self, kind: CollectionKind, plaintext_json: &[u8], secret: &MasterSecret) -> Result<Vec<u8>> {
        if !kind.is_encrypted() {
            let value: serde_json::Value = serde_json::from_slice(plaintext_json)
                .map_err(|e| VaultError::SerializationError(format!("settings: {e}")))?;
            if !value.is_object() {
                return Err(VaultError::SerializationError(
                    "settings must be a JSON object".into(),
                ));
            }
            return Ok(plaintext_json.to_vec());
        }

        let blob = self
            .cipher
            .encrypt(plaintext_json, secret, kind.name().as_bytes())
            .map_err(|e| VaultError::from_cipher(e, kind.name()))?;
        serde_json::to_vec(&blob)
            .map_err(|e| VaultError::SerializationError(format!("{kind} blob: {e}")))
    }

    // ------------------------------------------------------------------
    // Typed access with verification
    // ------------------------------------------------------------------

    /// Verify `secret`, then load and deserialize a collection.
    ///
    /// Wrong secrets are `InvalidSecret`; authentication failures after a
    /// successful verify are `Corrupt`.
    pub fn load_collection<T: DeserializeOwned>(&self, kind: CollectionKind, secret: &MasterSecret) -> Result<T> {
        self.check_secret(secret)?;
        let json = self.load(kind, secret).map_err(VaultError::into_corrupt)?;
        serde_json::from_slice(&json)
            .map_err(|e| VaultError::SerializationError(format!("{kind}: {e}")))
    }

    /// Verify `secret`, then serialize and save a collection.
    pub fn save_collection<T: Serialize + ?Sized>(&self, kind: CollectionKind, items: &T, secret: &MasterSecret) -> Result<()> {
        self.check_secret(secret)?;
        let json = Zeroizing::new(
            serde_json::to_vec(items)
                .map_err(|e| VaultError::SerializationError(format!("{kind}: {e}")))?,
        );
        self.save(kind, &json, secret)
    }

    /// Verify `secret` against the stored verifier.
    pub fn verify_secret(&self, secret: &MasterSecret) -> Result<bool> {
        let manifest = self.require_manifest()?;
        CredentialVerifier::verify(secret, &manifest.verifier)
    }

    fn check_secret(&self, secret: &MasterSecret) -> Result<()> {
        if self.verify_secret(secret)? {
            Ok(())
        } else {
            Err(VaultError::InvalidSecret)
        }
    }

    // ------------------------------------------------------------------
    // Generation commits
    // ------------------------------------------------------------------

    /// Atomically replace several collections (and optionally the verifier).
    ///
    /// `changes` holds stored bytes as produced by `seal`.  Collections not
    /// in `changes` are copied unchanged.  Everything is written under the
    /// next generation; only then is the manifest swapped.  If any write
    /// fails before the swap, the staged keys are removed and the current
    /// generation stays live and untouched.
    pub fn commit_generation(
        &self,
        changes: Vec<(CollectionKind, Vec<u8>)>,
        verifier: Option<SaltedHash>,
    ) -> Result<VaultManifest> {
        let current = self.require_manifest()?;
        let next = current.next(verifier);

        if let Err(e) = self.stage(&current, &next, &changes) {
            warn!(generation = next.generation, error = %e, "staging failed, discarding");
            self.discard_generation(next.generation);
            return Err(e);
        }

        if let Err(e) = self.backend.set(MANIFEST_KEY, &next.to_bytes()?) {
            warn!(generation = next.generation, error = %e, "manifest swap failed, discarding");
            self.discard_generation(next.generation);
            return Err(e);
        }

        info!(generation = next.generation, "generation committed");
        self.discard_generation(current.generation);
        Ok(next)
    }

    fn stage(
        &self,
        current: &VaultManifest,
        next: &VaultManifest,
        changes: &[(CollectionKind, Vec<u8>)],
    ) -> Result<()> {
        for kind in CollectionKind::ALL {
            let bytes = match changes.iter().find(|(k, _)| *k == kind) {
                Some((_, bytes)) => Some(bytes.clone()),
                None => self
                    .backend
                    .get(&manifest::collection_key(current.generation, kind))?,
            };
            if let Some(bytes) = bytes {
                self.backend
                    .set(&manifest::collection_key(next.generation, kind), &bytes)?;
            }
        }
        Ok(())
    }

    /// Best-effort removal of every key in `generation`.
    fn discard_generation(&self, generation: u64) {
        for kind in CollectionKind::ALL {
            if let Err(e) = self
                .backend
                .delete(&manifest::collection_key(generation, kind))
            {
                warn!(generation, collection = %kind, error = %e, "could not remove stale key");
            }
        }
    }

    // ------------------------------------------------------------------
    // Maintenance
    // ------------------------------------------------------------------

    /// Remove collection keys that do not belong to the live generation.
    ///
    /// These are leftovers of an interrupted setup, rotation or import.
    /// Returns the number of keys removed.
    pub fn recover(&self) -> Result<usize> {
        let live = self.manifest()?.map(|m| m.generation);
        let removed = self.sweep(live)?;
        if removed > 0 {
            warn!(removed, "removed leftovers of an interrupted write");
        }
        Ok(removed)
    }

    fn sweep(&self, live: Option<u64>) -> Result<usize> {
        let mut removed = 0;
        for key in self.backend.keys()? {
            if let Some(generation) = manifest::generation_of(&key) {
                if Some(generation) != live {
                    self.backend.delete(&key)?;
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    /// Irreversibly erase every collection and the verifier.
    pub fn clear(&self) -> Result<()> {
        // Manifest first: once it is gone the location reads as
        // uninitialized even if deleting the rest fails halfway.
        self.backend.delete(MANIFEST_KEY)?;
        for key in self.backend.keys()? {
            self.backend.delete(&key)?;
        }
        info!("vault storage cleared");
        Ok(())
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

    fn initialized(secret: &MasterSecret) -> (MemoryStore, VaultStore<MemoryStore>) {
        let backend = MemoryStore::new();
        let store = VaultStore::new(backend.clone(), fast());
        let verifier = CredentialVerifier::new(fast()).hash(secret).unwrap();
        store.initialize(verifier, secret).unwrap();
        (backend, store)
    }

    #[test]
    fn load_before_initialize_returns_empty_defaults() {
        let store = VaultStore::new(MemoryStore::new(), fast());
        let secret = MasterSecret::new("1234");
        assert_eq!(&**store.load(CollectionKind::Passwords, &secret).unwrap(), b"[]");
        assert_eq!(&**store.load(CollectionKind::Settings, &secret).unwrap(), b"{}");
    }

    #[test]
    fn initialize_writes_every_collection_then_manifest() {
        let secret = MasterSecret::new("1234");
        let (backend, _store) = initialized(&secret);
        assert_eq!(
            backend.keys().unwrap(),
            vec!["g1.notes", "g1.passwords", "g1.settings", "manifest"]
        );
    }

    #[test]
    fn initialize_twice_fails() {
        let secret = MasterSecret::new("1234");
        let (_backend, store) = initialized(&secret);
        let verifier = CredentialVerifier::new(fast()).hash(&secret).unwrap();
        assert!(matches!(
            store.initialize(verifier, &secret),
            Err(VaultError::AlreadyInitialized)
        ));
    }

    #[test]
    fn save_then_load_roundtrip() {
        let secret = MasterSecret::new("1234");
        let (backend, store) = initialized(&secret);
        store
            .save(CollectionKind::Notes, br#"[{"x":1}]"#, &secret)
            .unwrap();

        let raw = backend.get("g1.notes").unwrap().unwrap();
        assert!(!String::from_utf8_lossy(&raw).contains("\"x\""));

        let json = store.load(CollectionKind::Notes, &secret).unwrap();
        assert_eq!(&**json, br#"[{"x":1}]"#);
    }

    #[test]
    fn load_with_wrong_secret_is_uniform_decryption_failure() {
        let secret = MasterSecret::new("1234");
        let (_backend, store) = initialized(&secret);
        let err = store
            .load(CollectionKind::Passwords, &MasterSecret::new("0000"))
            .unwrap_err();
        assert!(matches!(err, VaultError::DecryptionFailed { .. }));
    }

    #[test]
    fn typed_access_distinguishes_wrong_secret_from_corruption() {
        let secret = MasterSecret::new("1234");
        let (backend, store) = initialized(&secret);

        let err = store
            .load_collection::<Vec<serde_json::Value>>(CollectionKind::Passwords, &"0000".into())
            .unwrap_err();
        assert!(matches!(err, VaultError::InvalidSecret));

        let mut blob: EncryptedBlob =
            serde_json::from_slice(&backend.get("g1.passwords").unwrap().unwrap()).unwrap();
        blob.ciphertext[0] ^= 0x01;
        backend
            .set("g1.passwords", &serde_json::to_vec(&blob).unwrap())
            .unwrap();

        let err = store
            .load_collection::<Vec<serde_json::Value>>(CollectionKind::Passwords, &secret)
            .unwrap_err();
        assert!(matches!(err, VaultError::Corrupt { .. }));
    }

    #[test]
    fn settings_must_be_an_object() {
        let secret = MasterSecret::new("1234");
        let (_backend, store) = initialized(&secret);
        assert!(store
            .save(CollectionKind::Settings, b"[1,2]", &secret)
            .is_err());
        store
            .save(CollectionKind::Settings, br#"{"theme":"dark"}"#, &secret)
            .unwrap();
        assert_eq!(
            store.load_settings_value().unwrap().unwrap()["theme"],
            "dark"
        );
    }

    #[test]
    fn commit_generation_swaps_and_cleans_up() {
        let secret = MasterSecret::new("1234");
        let (backend, store) = initialized(&secret);

        let notes = store.seal(CollectionKind::Notes, b"[]", &secret).unwrap();
        let manifest = store
            .commit_generation(vec![(CollectionKind::Notes, notes)], None)
            .unwrap();

        assert_eq!(manifest.generation, 2);
        assert_eq!(
            backend.keys().unwrap(),
            vec!["g2.notes", "g2.passwords", "g2.settings", "manifest"]
        );
        assert_eq!(&**store.load(CollectionKind::Passwords, &secret).unwrap(), b"[]");
    }

    #[test]
    fn recover_sweeps_foreign_generations() {
        let secret = MasterSecret::new("1234");
        let (backend, store) = initialized(&secret);
        backend.set("g5.passwords", b"junk").unwrap();

        assert_eq!(store.recover().unwrap(), 1);
        assert!(backend.get("g5.passwords").unwrap().is_none());
        assert!(backend.get("g1.passwords").unwrap().is_some());
    }

    #[test]
    fn clear_erases_everything() {
        let secret = MasterSecret::new("1234");
        let (backend, store) = initialized(&secret);
        store.clear().unwrap();
        assert!(backend.is_empty());
        assert!(!store.is_initialized().unwrap());
    }
}
