//! Vault module — the encrypted password/notes engine.
//!
//! This module provides:
//! - Record and collection types (`record`)
//! - The storage key layout and manifest (`manifest`)
//! - Encrypted collection persistence over a `KeyValueStore` (`store`)
//! - The `VaultSession` lifecycle state machine (`session`)
//! - Snapshot export and merge-import (`backup`)

pub mod backup;
pub mod manifest;
pub mod record;
pub mod session;
pub mod store;

// Re-export the most commonly used items.
pub use backup::{BackupCodec, BackupSnapshot, CollisionPolicy, FormatKind, ImportSummary, MergeStats};
pub use manifest::VaultManifest;
pub use record::{
    CollectionKind, Collections, NoteRecord, PasswordRecord, PasswordStrength, Record, VaultSettings,
};
pub use session::{SessionState, VaultSession};
pub use store::VaultStore;
