//! Cryptographic primitives for vaultkeep.
//!
//! This module provides:
//! - Argon2id password-based key derivation (`kdf`)
//! - HKDF domain separation and zeroizing key wrappers (`keys`)
//! - AES-256-GCM encryption and decryption (`cipher`)
//! - The persisted `EncryptedBlob` shape (`blob`)
//! - Master-secret verification (`verifier`)

pub mod blob;
pub mod cipher;
pub mod kdf;
pub mod keys;
pub mod verifier;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{Cipher, EncryptedBlob, MasterSecret, ...};
pub use blob::EncryptedBlob;
pub use cipher::Cipher;
pub use kdf::{derive_key, derive_verifier, new_salt, Argon2Params};
pub use keys::{DerivedKey, MasterSecret};
pub use verifier::{CredentialVerifier, SaltedHash};
