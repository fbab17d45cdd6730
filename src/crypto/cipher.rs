//! AES-256-GCM authenticated encryption of opaque payloads.
//!
//! Every blob gets its own key: `encrypt` draws a fresh 32-byte salt,
//! derives a key from the master secret with Argon2id + HKDF, and seals
//! the payload under a fresh random 12-byte nonce.  The salt, nonce and
//! Argon2 params travel inside the returned `EncryptedBlob` so `decrypt`
//! can re-derive the same key from the secret alone.
//!
//! The caller-supplied `aad` (the collection name) is authenticated but
//! not encrypted, so a blob moved under another collection fails to open.

use aes_gcm::aead::{Aead, KeyInit, OsRng, Payload};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use zeroize::Zeroize;

use super::blob::EncryptedBlob;
use super::kdf::{self, Argon2Params, SALT_LEN};
use super::keys::MasterSecret;
use crate::errors::CipherError;

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the AES-256-GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Encrypts with a fixed set of Argon2 params; decrypts with whatever
/// params the blob records.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cipher {
    params: Argon2Params,
}

impl Cipher {
    pub fn new(params: Argon2Params) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &Argon2Params {
        &self.params
    }

    /// Encrypt `plaintext` under a key derived from `secret` and a fresh salt.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        secret: &MasterSecret,
        aad: &[u8],
    ) -> Result<EncryptedBlob, CipherError> {
        self.encrypt_with_salt(plaintext, secret, kdf::new_salt(), aad)
    }

    /// Encrypt with a caller-chosen salt.  The nonce is always fresh.
    pub fn encrypt_with_salt(
        &self,
        plaintext: &[u8],
        secret: &MasterSecret,
        salt: [u8; SALT_LEN],
        aad: &[u8],
    ) -> Result<EncryptedBlob, CipherError> {
        let key = kdf::derive_key(secret.as_bytes(), &salt, &self.params)
            .map_err(|e| CipherError::KeyDerivation(e.to_string()))?;

        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| CipherError::EncryptionFailed(format!("invalid key length: {e}")))?;

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = cipher
            .encrypt(&nonce, Payload { msg: plaintext, aad })
            .map_err(|e| CipherError::EncryptionFailed(format!("encryption error: {e}")))?;

        Ok(EncryptedBlob {
            ciphertext,
            salt: salt.to_vec(),
            nonce: nonce.to_vec(),
            kdf: self.params,
        })
    }

    /// Open a blob produced by `encrypt`.
    ///
    /// A wrong secret, a wrong `aad`, or any modified byte of the
    /// ciphertext, salt, nonce or params yields `AuthenticationFailed`.
    pub fn decrypt(
        blob: &EncryptedBlob,
        secret: &MasterSecret,
        aad: &[u8],
    ) -> Result<Vec<u8>, CipherError> {
        if blob.nonce.len() != NONCE_LEN || blob.ciphertext.len() < TAG_LEN {
            return Err(CipherError::AuthenticationFailed);
        }
        let salt: [u8; SALT_LEN] = blob
            .salt
            .as_slice()
            .try_into()
            .map_err(|_| CipherError::AuthenticationFailed)?;

        // Params outside the accepted range were never written by us.
        blob.kdf
            .validate()
            .map_err(|_| CipherError::AuthenticationFailed)?;

        let key = kdf::derive_key(secret.as_bytes(), &salt, &blob.kdf)
            .map_err(|e| CipherError::KeyDerivation(e.to_string()))?;

        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|_| CipherError::AuthenticationFailed)?;

        cipher
            .decrypt(
                Nonce::from_slice(&blob.nonce),
                Payload {
                    msg: &blob.ciphertext,
                    aad,
                },
            )
            .map_err(|_| CipherError::AuthenticationFailed)
    }

    /// Decrypt and hand the plaintext to `f`, wiping it afterwards.
    pub fn with_plaintext<T>(
        blob: &EncryptedBlob,
        secret: &MasterSecret,
        aad: &[u8],
        f: impl FnOnce(&[u8]) -> T,
    ) -> Result<T, CipherError> {
        let mut plaintext = Self::decrypt(blob, secret, aad)?;
        let out = f(&plaintext);
        plaintext.zeroize();
        Ok(out)
    }
}
