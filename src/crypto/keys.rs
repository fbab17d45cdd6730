//! Key material wrappers and HKDF-SHA256 domain separation.
//!
//! Argon2id produces one stretched root per (secret, salt) pair.  HKDF
//! (RFC 5869) then expands that root under a purpose-specific `info`
//! string, giving independent sub-keys for data encryption and for the
//! master-secret verifier.

use std::fmt;

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::kdf::KEY_LEN;
use crate::errors::{Result, VaultError};

/// HKDF info for collection encryption keys.
pub(crate) const DATA_KEY_INFO: &[u8] = b"vaultkeep/data-key/v1";

/// HKDF info for the master-secret verifier hash.
pub(crate) const VERIFIER_INFO: &[u8] = b"vaultkeep/verifier/v1";

/// Run HKDF-SHA256 expand with the given `info`.
///
/// We skip a separate salt because the input already came out of
/// Argon2id with a per-use random salt.
pub(crate) fn expand(ikm: &[u8], info: &[u8]) -> Result<[u8; KEY_LEN]> {
    let hk = Hkdf::<Sha256>::new(None, ikm);

    let mut okm = [0u8; KEY_LEN];
    hk.expand(info, &mut okm)
        .map_err(|e| VaultError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}

/// A 32-byte derived encryption key that zeroes its memory on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    bytes: [u8; KEY_LEN],
}

impl DerivedKey {
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// The user's master secret (PIN or password).
///
/// Lives only for the duration of an unlocked session and is wiped from
/// memory when dropped.  Never serialized, never logged.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterSecret {
    inner: String,
}

impl MasterSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            inner: secret.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl From<&str> for MasterSecret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for MasterSecret {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterSecret([REDACTED])")
    }
}
