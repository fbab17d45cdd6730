use thiserror::Error;

/// Errors from the pure AEAD layer.
///
/// Kept separate from `VaultError` so the cipher has no opinion about
/// *why* a blob failed to open — callers decide whether that means a
/// wrong secret or corrupted storage.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("authentication failed — wrong secret or tampered data")]
    AuthenticationFailed,

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),
}

/// All errors that can occur in vaultkeep.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Credential errors ---
    #[error("Invalid master secret")]
    InvalidSecret,

    #[error("Wrong secret — the supplied secret cannot decrypt this data")]
    WrongSecret,

    #[error("Master secret must not be empty")]
    EmptySecret,

    // --- Lifecycle errors ---
    #[error("Vault is already initialized")]
    AlreadyInitialized,

    #[error("Vault is not initialized — run setup first")]
    NotInitialized,

    #[error("Operation not allowed while the vault is {0}")]
    InvalidState(&'static str),

    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Could not decrypt collection '{collection}'")]
    DecryptionFailed { collection: String },

    #[error("Collection '{collection}' is corrupted — authentication failed for a verified secret")]
    Corrupt { collection: String },

    // --- Backup errors ---
    #[error("Malformed backup file: {0}")]
    MalformedFile(String),

    // --- Record errors ---
    #[error("Record '{0}' not found")]
    RecordNotFound(String),

    // --- Storage errors ---
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    StorageIo(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- CLI errors ---
    #[error("Audit error: {0}")]
    AuditError(String),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("User cancelled operation")]
    UserCancelled,
}

impl VaultError {
    /// Reinterpret a cipher failure for a collection whose secret has
    /// not been verified upstream.
    pub(crate) fn from_cipher(err: CipherError, collection: &str) -> Self {
        match err {
            CipherError::AuthenticationFailed => VaultError::DecryptionFailed {
                collection: collection.to_string(),
            },
            CipherError::EncryptionFailed(msg) => VaultError::EncryptionFailed(msg),
            CipherError::KeyDerivation(msg) => VaultError::KeyDerivationFailed(msg),
        }
    }

    /// Upgrade a uniform decryption failure to `Corrupt`, for callers
    /// that already checked the secret against the verifier.
    pub(crate) fn into_corrupt(self) -> Self {
        match self {
            VaultError::DecryptionFailed { collection } => VaultError::Corrupt { collection },
            other => other,
        }
    }

    /// Map a uniform decryption failure to `WrongSecret`, for callers
    /// decrypting with a caller-supplied secret (import, rotation).
    pub(crate) fn into_wrong_secret(self) -> Self {
        match self {
            VaultError::DecryptionFailed { .. } => VaultError::WrongSecret,
            other => other,
        }
    }
}

/// Convenience type alias for vaultkeep results.
pub type Result<T> = std::result::Result<T, VaultError>;
