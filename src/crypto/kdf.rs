//! Password-based key derivation using Argon2id.
//!
//! Argon2id is a memory-hard KDF that protects against brute-force and
//! GPU-based attacks.  The stretched output is never used directly: it is
//! fed through HKDF (see `keys`) with a purpose-specific info string, so
//! the data-encryption key and the verifier hash are domain separated even
//! when derived from the same secret.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::keys::{self, DerivedKey, DATA_KEY_INFO, VERIFIER_INFO};
use crate::errors::{Result, VaultError};

/// Length of every salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Length of the stretched root and derived keys in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// Minimum safe memory cost in KiB (8 MB).
const MIN_MEMORY_KIB: u32 = 8_192;

/// Maximum accepted memory cost in KiB (1 GB).  Blobs carry their own
/// params, so an imported file must not be able to demand unbounded memory.
const MAX_MEMORY_KIB: u32 = 1_048_576;

/// Maximum accepted time cost.  Derivation time grows linearly with it.
const MAX_ITERATIONS: u32 = 64;

/// Maximum accepted lane count.  Argon2 also needs 8 KiB of memory per lane.
const MAX_PARALLELISM: u32 = 64;

/// Argon2id cost parameters.
///
/// Stored next to every blob and verifier hash so the exact same settings
/// are used when re-deriving, even after the configured defaults change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argon2Params {
    /// Memory cost in KiB (default: 65 536 = 64 MB).
    pub memory_kib: u32,
    /// Number of iterations (default: 3).
    pub iterations: u32,
    /// Parallelism lanes (default: 4).
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl Argon2Params {
    /// Reject parameters that are dangerously weak or absurdly expensive.
    pub fn validate(&self) -> Result<()> {
        if self.memory_kib < MIN_MEMORY_KIB {
            return Err(VaultError::KeyDerivationFailed(format!(
                "Argon2 memory_kib must be at least {MIN_MEMORY_KIB} (got {})",
                self.memory_kib
            )));
        }
        if self.memory_kib > MAX_MEMORY_KIB {
            return Err(VaultError::KeyDerivationFailed(format!(
                "Argon2 memory_kib must be at most {MAX_MEMORY_KIB} (got {})",
                self.memory_kib
            )));
        }
        if !(1..=MAX_ITERATIONS).contains(&self.iterations) {
            return Err(VaultError::KeyDerivationFailed(format!(
                "Argon2 iterations must be between 1 and {MAX_ITERATIONS} (got {})",
                self.iterations
            )));
        }
        let max_lanes = MAX_PARALLELISM.min(self.memory_kib / 8);
        if !(1..=max_lanes).contains(&self.parallelism) {
            return Err(VaultError::KeyDerivationFailed(format!(
                "Argon2 parallelism must be between 1 and {max_lanes} (got {})",
                self.parallelism
            )));
        }
        Ok(())
    }
}

/// Derive the data-encryption key for `secret` and `salt`.
pub fn derive_key(secret: &[u8], salt: &[u8; SALT_LEN], params: &Argon2Params) -> Result<DerivedKey> {
    let root = stretch(secret, salt, params)?;
    Ok(DerivedKey::new(keys::expand(root.as_ref(), DATA_KEY_INFO)?))
}

/// Derive the verification hash for `secret` and `salt`.
///
/// Uses a different HKDF info string than `derive_key`, so a leaked
/// verifier hash is useless as an encryption key.
pub fn derive_verifier(
    secret: &[u8],
    salt: &[u8; SALT_LEN],
    params: &Argon2Params,
) -> Result<[u8; KEY_LEN]> {
    let root = stretch(secret, salt, params)?;
    keys::expand(root.as_ref(), VERIFIER_INFO)
}

/// Generate a cryptographically random 32-byte salt.
pub fn new_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}

/// Run Argon2id over `secret` and `salt`.
///
/// The hashing itself runs on a scoped worker thread and is joined before
/// returning, so callers on an interactive thread are never left holding a
/// half-finished derivation.
fn stretch(
    secret: &[u8],
    salt: &[u8; SALT_LEN],
    argon2_params: &Argon2Params,
) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    argon2_params.validate()?;

    let params = Params::new(
        argon2_params.memory_kib,
        argon2_params.iterations,
        argon2_params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| VaultError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    off_thread(move || {
        let mut root = Zeroizing::new([0u8; KEY_LEN]);
        argon2
            .hash_password_into(secret, salt, root.as_mut())
            .map_err(|e| {
                VaultError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}"))
            })?;
        Ok(root)
    })
}

fn off_thread<T, F>(work: F) -> T
where
    F: FnOnce() -> T + Send,
    T: Send,
{
    std::thread::scope(|scope| match scope.spawn(work).join() {
        Ok(value) => value,
        Err(panic) => std::panic::resume_unwind(panic),
    })
}
