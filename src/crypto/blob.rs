//! `EncryptedBlob` — the only shape in which vault data touches storage.
//!
//! Binary fields serialize as base64 strings so blobs embed cleanly in
//! the JSON manifest and in backup snapshots:
//!
//! ```text
//! {"ciphertext":"...","salt":"...","nonce":"...","kdf":{"memory_kib":65536,...}}
//! ```

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::cipher::{NONCE_LEN, TAG_LEN};
use super::kdf::{Argon2Params, SALT_LEN};

/// Ciphertext plus everything needed to re-derive its key, minus the secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBlob {
    /// AES-256-GCM ciphertext with the 16-byte tag appended.
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub ciphertext: Vec<u8>,

    /// Argon2id salt used to derive this blob's key.
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,

    /// 12-byte AES-GCM nonce.
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub nonce: Vec<u8>,

    /// Argon2id params used for this blob.  Missing in older files, in
    /// which case the defaults apply.
    #[serde(default)]
    pub kdf: Argon2Params,
}

impl EncryptedBlob {
    /// Check field lengths and KDF params without deriving anything.
    ///
    /// A blob that fails here cannot be opened by any secret.
    pub fn check_layout(&self) -> Result<(), String> {
        if self.salt.len() != SALT_LEN {
            return Err(format!("salt is {} bytes, expected {SALT_LEN}", self.salt.len()));
        }
        if self.nonce.len() != NONCE_LEN {
            return Err(format!("nonce is {} bytes, expected {NONCE_LEN}", self.nonce.len()));
        }
        if self.ciphertext.len() < TAG_LEN {
            return Err(format!("ciphertext is shorter than the {TAG_LEN}-byte tag"));
        }
        self.kdf.validate().map_err(|e| e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&BASE64.encode(data))
}

pub(crate) fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_fields_serialize_as_base64() {
        let blob = EncryptedBlob {
            ciphertext: vec![1, 2, 3],
            salt: vec![0xFF; 4],
            nonce: vec![0; 12],
            kdf: Argon2Params::default(),
        };

        let json = serde_json::to_value(&blob).unwrap();
        assert_eq!(json["ciphertext"], "AQID");
        assert_eq!(json["salt"], "/////w==");

        let back: EncryptedBlob = serde_json::from_value(json).unwrap();
        assert_eq!(back, blob);
    }

    #[test]
    fn missing_kdf_falls_back_to_defaults() {
        let json = r#"{"ciphertext":"AQID","salt":"AA==","nonce":"AA=="}"#;
        let blob: EncryptedBlob = serde_json::from_str(json).unwrap();
        assert_eq!(blob.kdf, Argon2Params::default());
    }

    #[test]
    fn layout_check_names_the_bad_field() {
        let good = EncryptedBlob {
            ciphertext: vec![0; TAG_LEN],
            salt: vec![0; SALT_LEN],
            nonce: vec![0; NONCE_LEN],
            kdf: Argon2Params::default(),
        };
        assert!(good.check_layout().is_ok());

        let short_nonce = EncryptedBlob {
            nonce: vec![0; 8],
            ..good.clone()
        };
        assert!(short_nonce.check_layout().unwrap_err().contains("nonce"));

        let slow = EncryptedBlob {
            kdf: Argon2Params {
                iterations: u32::MAX,
                ..Argon2Params::default()
            },
            ..good
        };
        assert!(slow.check_layout().unwrap_err().contains("iterations"));
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let json = r#"{"ciphertext":"!!!","salt":"AA==","nonce":"AA=="}"#;
        assert!(serde_json::from_str::<EncryptedBlob>(json).is_err());
    }
}
