//! The vault manifest and the storage key layout.
//!
//! ```text
//! manifest          -> VaultManifest JSON (verifier + live generation)
//! g<N>.passwords    -> EncryptedBlob JSON
//! g<N>.notes        -> EncryptedBlob JSON
//! g<N>.settings     -> plain settings JSON
//! ```
//!
//! Collections are keyed by generation.  Rewriting every collection (key
//! rotation, import) happens under generation N+1 while N stays live;
//! replacing the single `manifest` value is the commit point.  Keys of any
//! other generation are leftovers and get swept on open.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::CollectionKind;
use crate::crypto::SaltedHash;
use crate::errors::{Result, VaultError};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Storage key of the manifest.
pub const MANIFEST_KEY: &str = "manifest";

/// Current manifest format version.
pub const CURRENT_VERSION: u8 = 1;

/// Generation written by `setup`.
pub const FIRST_GENERATION: u64 = 1;

// ---------------------------------------------------------------------------
// VaultManifest
// ---------------------------------------------------------------------------

/// Metadata that makes a storage location an initialized vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultManifest {
    /// Format version.
    pub version: u8,

    /// Which generation of collection keys is live.
    pub generation: u64,

    /// When the vault was first set up.
    pub created_at: DateTime<Utc>,

    /// When the master secret was last changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotated_at: Option<DateTime<Utc>>,

    /// Salted hash of the master secret.
    pub verifier: SaltedHash,
}

impl VaultManifest {
    /// A fresh manifest for a newly set-up vault.
    pub fn new(verifier: SaltedHash) -> Self {
        Self {
            version: CURRENT_VERSION,
            generation: FIRST_GENERATION,
            created_at: Utc::now(),
            rotated_at: None,
            verifier,
        }
    }

    /// The manifest that commits generation `generation + 1`.
    pub fn next(&self, verifier: Option<SaltedHash>) -> Self {
        let rotated = verifier.is_some();
        Self {
            version: CURRENT_VERSION,
            generation: self.generation + 1,
            created_at: self.created_at,
            rotated_at: if rotated { Some(Utc::now()) } else { self.rotated_at },
            verifier: verifier.unwrap_or_else(|| self.verifier.clone()),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| VaultError::SerializationError(format!("manifest: {e}")))
    }

    /// Parse a stored manifest.  An unreadable or unsupported manifest
    /// means the vault cannot be trusted, so both are `Corrupt`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let manifest: VaultManifest =
            serde_json::from_slice(bytes).map_err(|_| VaultError::Corrupt {
                collection: MANIFEST_KEY.into(),
            })?;

        if manifest.version != CURRENT_VERSION {
            return Err(VaultError::Corrupt {
                collection: format!(
                    "{MANIFEST_KEY} (unsupported version {}, expected {CURRENT_VERSION})",
                    manifest.version
                ),
            });
        }
        Ok(manifest)
    }
}

// ---------------------------------------------------------------------------
// Key layout
// ---------------------------------------------------------------------------

/// Storage key of `kind` in `generation`.
pub fn collection_key(generation: u64, kind: CollectionKind) -> String {
    format!("g{generation}.{}", kind.name())
}

/// The generation a collection key belongs to, if it is one.
pub fn generation_of(key: &str) -> Option<u64> {
    let (prefix, _) = key.split_once('.')?;
    prefix.strip_prefix('g')?.parse().ok()
}
