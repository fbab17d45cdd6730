//! Integration tests for the vaultkeep crypto layer.

use vaultkeep::crypto::{
    derive_key, derive_verifier, new_salt, Argon2Params, Cipher, CredentialVerifier, EncryptedBlob,
    MasterSecret,
};
use vaultkeep::errors::{CipherError, VaultError};

fn fast() -> Argon2Params {
    Argon2Params {
        memory_kib: 8_192,
        iterations: 1,
        parallelism: 1,
    }
}

fn sealed(plaintext: &[u8], secret: &str) -> EncryptedBlob {
    Cipher::new(fast())
        .encrypt(plaintext, &MasterSecret::from(secret), b"passwords")
        .expect("encrypt")
}

// ---------------------------------------------------------------------------
// Key derivation
// ---------------------------------------------------------------------------

#[test]
fn derivation_is_deterministic_per_salt() {
    let salt = new_salt();
    let a = derive_key(b"1234", &salt, &fast()).unwrap();
    let b = derive_key(b"1234", &salt, &fast()).unwrap();
    assert_eq!(a.as_bytes(), b.as_bytes());

    let other = derive_key(b"1234", &new_salt(), &fast()).unwrap();
    assert_ne!(a.as_bytes(), other.as_bytes());
}

#[test]
fn data_key_and_verifier_are_domain_separated() {
    let salt = new_salt();
    let key = derive_key(b"1234", &salt, &fast()).unwrap();
    let verifier = derive_verifier(b"1234", &salt, &fast()).unwrap();
    assert_ne!(key.as_bytes(), &verifier);
}

#[test]
fn derived_key_debug_is_redacted() {
    let key = derive_key(b"1234", &new_salt(), &fast()).unwrap();
    let debug = format!("{key:?}");
    assert!(debug.contains("REDACTED"));
    assert!(!debug.contains(&format!("{:?}", key.as_bytes())));
}

#[test]
fn weak_params_are_rejected() {
    let weak = Argon2Params {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    };
    assert!(matches!(
        derive_key(b"1234", &new_salt(), &weak),
        Err(VaultError::KeyDerivationFailed(_))
    ));
}

// ---------------------------------------------------------------------------
// Cipher
// ---------------------------------------------------------------------------

#[test]
fn encrypt_decrypt_roundtrip() {
    let secret = MasterSecret::from("1234");
    let blob = sealed(br#"[{"appName":"GitHub"}]"#, "1234");
    let plaintext = Cipher::decrypt(&blob, &secret, b"passwords").unwrap();
    assert_eq!(plaintext, br#"[{"appName":"GitHub"}]"#);
}

#[test]
fn every_encryption_uses_fresh_salt_and_nonce() {
    let a = sealed(b"same", "1234");
    let b = sealed(b"same", "1234");
    assert_ne!(a.salt, b.salt);
    assert_ne!(a.nonce, b.nonce);
    assert_ne!(a.ciphertext, b.ciphertext);
}

#[test]
fn encrypt_with_salt_keeps_salt_but_not_nonce() {
    let cipher = Cipher::new(fast());
    let secret = MasterSecret::from("1234");
    let salt = new_salt();
    let a = cipher.encrypt_with_salt(b"x", &secret, salt, b"notes").unwrap();
    let b = cipher.encrypt_with_salt(b"x", &secret, salt, b"notes").unwrap();
    assert_eq!(a.salt, salt.to_vec());
    assert_eq!(a.salt, b.salt);
    assert_ne!(a.nonce, b.nonce);
}

#[test]
fn wrong_secret_fails_authentication() {
    let blob = sealed(b"data", "1234");
    assert_eq!(
        Cipher::decrypt(&blob, &"0000".into(), b"passwords"),
        Err(CipherError::AuthenticationFailed)
    );
}

#[test]
fn blob_cannot_be_moved_between_collections() {
    let blob = sealed(b"data", "1234");
    assert_eq!(
        Cipher::decrypt(&blob, &"1234".into(), b"notes"),
        Err(CipherError::AuthenticationFailed)
    );
}

#[test]
fn tampering_with_any_field_is_detected() {
    let secret = MasterSecret::from("1234");
    let original = sealed(b"some secret data", "1234");

    let mut ciphertext = original.clone();
    ciphertext.ciphertext[0] ^= 0x01;

    let mut salt = original.clone();
    salt.salt[5] ^= 0x80;

    let mut nonce = original.clone();
    nonce.nonce[11] ^= 0xff;

    let mut kdf = original.clone();
    kdf.kdf.iterations += 1;

    let mut short_nonce = original.clone();
    short_nonce.nonce.pop();

    let mut short_salt = original.clone();
    short_salt.salt.truncate(16);

    for blob in [ciphertext, salt, nonce, kdf, short_nonce, short_salt] {
        assert_eq!(
            Cipher::decrypt(&blob, &secret, b"passwords"),
            Err(CipherError::AuthenticationFailed)
        );
    }
}

#[test]
fn hostile_kdf_params_are_refused_without_deriving() {
    let mut blob = sealed(b"data", "1234");
    blob.kdf.memory_kib = u32::MAX;
    assert_eq!(
        Cipher::decrypt(&blob, &"1234".into(), b"passwords"),
        Err(CipherError::AuthenticationFailed)
    );
}

#[test]
fn unbounded_time_or_lane_counts_are_refused() {
    let fast = fast();
    let too_slow = Argon2Params {
        iterations: u32::MAX,
        ..fast
    };
    let too_wide = Argon2Params {
        parallelism: 1_000,
        ..fast
    };
    for params in [too_slow, too_wide] {
        assert!(matches!(
            params.validate(),
            Err(VaultError::KeyDerivationFailed(_))
        ));

        // Refused up front; deriving with u32::MAX iterations would never finish.
        let mut blob = sealed(b"data", "1234");
        blob.kdf = params;
        assert_eq!(
            Cipher::decrypt(&blob, &"1234".into(), b"passwords"),
            Err(CipherError::AuthenticationFailed)
        );
    }
}

#[test]
fn blob_json_uses_base64_fields() {
    let blob = sealed(b"data", "1234");
    let json = serde_json::to_value(&blob).unwrap();
    assert!(json["ciphertext"].is_string());
    assert!(json["salt"].is_string());
    assert!(json["nonce"].is_string());

    let back: EncryptedBlob = serde_json::from_value(json).unwrap();
    assert_eq!(back, blob);
}

// ---------------------------------------------------------------------------
// Credential verifier
// ---------------------------------------------------------------------------

#[test]
fn verifier_accepts_only_the_right_secret() {
    let verifier = CredentialVerifier::new(fast());
    let stored = verifier.setup(&"1234".into(), None).unwrap();
    assert!(CredentialVerifier::verify(&"1234".into(), &stored).unwrap());
    assert!(!CredentialVerifier::verify(&"0000".into(), &stored).unwrap());
}

#[test]
fn setup_refuses_to_overwrite() {
    let verifier = CredentialVerifier::new(fast());
    let stored = verifier.setup(&"1234".into(), None).unwrap();
    assert!(matches!(
        verifier.setup(&"5678".into(), Some(&stored)),
        Err(VaultError::AlreadyInitialized)
    ));
}

#[test]
fn empty_secret_is_rejected() {
    let verifier = CredentialVerifier::new(fast());
    assert!(matches!(
        verifier.setup(&"".into(), None),
        Err(VaultError::EmptySecret)
    ));
}

#[test]
fn rotate_requires_old_secret() {
    let verifier = CredentialVerifier::new(fast());
    let stored = verifier.setup(&"1234".into(), None).unwrap();

    assert!(matches!(
        verifier.rotate(&"0000".into(), &"5678".into(), &stored),
        Err(VaultError::WrongSecret)
    ));

    let rotated = verifier.rotate(&"1234".into(), &"5678".into(), &stored).unwrap();
    assert_ne!(rotated.salt, stored.salt);
    assert!(CredentialVerifier::verify(&"5678".into(), &rotated).unwrap());
    assert!(!CredentialVerifier::verify(&"1234".into(), &rotated).unwrap());
}

#[test]
fn master_secret_debug_is_redacted() {
    let secret = MasterSecret::from("hunter22");
    assert!(!format!("{secret:?}").contains("hunter22"));
}
