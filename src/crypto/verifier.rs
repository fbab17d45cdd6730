//! Master-secret verification, independent of the data-encryption key.
//!
//! A `SaltedHash` lets us reject a wrong PIN with one Argon2 run and a
//! constant-time compare, without touching (or misreporting errors from)
//! any encrypted collection.

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use super::blob::{base64_decode, base64_encode};
use super::kdf::{self, Argon2Params, SALT_LEN};
use super::keys::MasterSecret;
use crate::errors::{Result, VaultError};

/// Persisted verifier for the master secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaltedHash {
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub hash: Vec<u8>,

    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,

    #[serde(default)]
    pub kdf: Argon2Params,
}

/// Creates, checks and rotates `SaltedHash` values.
#[derive(Debug, Clone, Copy, Default)]
pub struct CredentialVerifier {
    params: Argon2Params,
}

impl CredentialVerifier {
    pub fn new(params: Argon2Params) -> Self {
        Self { params }
    }

    /// Hash a brand-new secret.  Fails if a verifier already exists.
    pub fn setup(&self, secret: &MasterSecret, existing: Option<&SaltedHash>) -> Result<SaltedHash> {
        if existing.is_some() {
            return Err(VaultError::AlreadyInitialized);
        }
        self.hash(secret)
    }

    /// Produce a freshly salted hash of `secret`.
    pub fn hash(&self, secret: &MasterSecret) -> Result<SaltedHash> {
        if secret.is_empty() {
            return Err(VaultError::EmptySecret);
        }
        let salt = kdf::new_salt();
        let hash = kdf::derive_verifier(secret.as_bytes(), &salt, &self.params)?;
        Ok(SaltedHash {
            hash: hash.to_vec(),
            salt: salt.to_vec(),
            kdf: self.params,
        })
    }

    /// Check `secret` against a stored hash in constant time.
    pub fn verify(secret: &MasterSecret, stored: &SaltedHash) -> Result<bool> {
        let salt: [u8; SALT_LEN] =
            stored
                .salt
                .as_slice()
                .try_into()
                .map_err(|_| VaultError::Corrupt {
                    collection: "verifier".into(),
                })?;

        let candidate = kdf::derive_verifier(secret.as_bytes(), &salt, &stored.kdf)?;
        Ok(candidate.as_slice().ct_eq(stored.hash.as_slice()).into())
    }

    /// Replace the hash of `old` with a fresh hash of `new`.
    pub fn rotate(
        &self,
        old: &MasterSecret,
        new: &MasterSecret,
        stored: &SaltedHash,
    ) -> Result<SaltedHash> {
        if !Self::verify(old, stored)? {
            return Err(VaultError::WrongSecret);
        }
        self.hash(new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> CredentialVerifier {
        CredentialVerifier::new(Argon2Params {
            memory_kib: 8_192,
            iterations: 1,
            parallelism: 1,
        })
    }

    #[test]
    fn setup_then_verify() {
        let stored = verifier().setup(&"1234".into(), None).unwrap();
        assert!(CredentialVerifier::verify(&"1234".into(), &stored).unwrap());
        assert!(!CredentialVerifier::verify(&"0000".into(), &stored).unwrap());
    }

    #[test]
    fn setup_refuses_when_already_initialized() {
        let stored = verifier().setup(&"1234".into(), None).unwrap();
        let err = verifier().setup(&"5678".into(), Some(&stored)).unwrap_err();
        assert!(matches!(err, VaultError::AlreadyInitialized));
    }

    #[test]
    fn same_secret_gets_a_new_salt_each_time() {
        let a = verifier().hash(&"1234".into()).unwrap();
        let b = verifier().hash(&"1234".into()).unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn rotate_requires_old_secret() {
        let stored = verifier().setup(&"1234".into(), None).unwrap();

        let err = verifier()
            .rotate(&"9999".into(), &"5678".into(), &stored)
            .unwrap_err();
        assert!(matches!(err, VaultError::WrongSecret));

        let rotated = verifier()
            .rotate(&"1234".into(), &"5678".into(), &stored)
            .unwrap();
        assert!(CredentialVerifier::verify(&"5678".into(), &rotated).unwrap());
        assert!(!CredentialVerifier::verify(&"1234".into(), &rotated).unwrap());
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(matches!(
            verifier().hash(&"".into()),
            Err(VaultError::EmptySecret)
        ));
    }

    #[test]
    fn malformed_salt_is_reported_as_corruption() {
        let mut stored = verifier().setup(&"1234".into(), None).unwrap();
        stored.salt.pop();
        assert!(matches!(
            CredentialVerifier::verify(&"1234".into(), &stored),
            Err(VaultError::Corrupt { .. })
        ));
    }
}
