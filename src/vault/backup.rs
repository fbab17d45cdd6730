//! Portable backups: export the still-encrypted collections as one JSON
//! document and merge such a document back into a vault.
//!
//! ```text
//! {
//!   "app": "vaultkeep",
//!   "version": 1,
//!   "exportDate": "2024-05-01T12:00:00Z",
//!   "dataStats": { "passwords": 3, "notes": 1 },
//!   "encryptedData": {
//!     "passwords": { EncryptedBlob } | null,
//!     "notes":     { EncryptedBlob } | null,
//!     "settings":  { ... }           | null
//!   }
//! }
//! ```
//!
//! Older exports carry only the `encryptedData` part, sometimes as a JSON
//! string wrapping the object.  Both are accepted on import.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::record::{CollectionKind, Collections, NoteRecord, PasswordRecord, Record, VaultSettings};
use super::session::VaultSession;
use crate::crypto::{Cipher, EncryptedBlob, MasterSecret};
use crate::errors::{Result, VaultError};
use crate::storage::KeyValueStore;

/// Value of the `app` field in exported snapshots.
pub const SNAPSHOT_APP: &str = "vaultkeep";

/// Newest snapshot format this build can read.
pub const SNAPSHOT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Snapshot shape
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSnapshot {
    pub app: String,
    pub version: u32,
    pub export_date: DateTime<Utc>,
    #[serde(default)]
    pub data_stats: DataStats,
    pub encrypted_data: EncryptedData,
}

/// Record counts at export time.  Informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataStats {
    pub passwords: usize,
    pub notes: usize,
}

/// The collections as they were stored.  Absent collections are `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncryptedData {
    #[serde(default)]
    pub passwords: Option<EncryptedBlob>,
    #[serde(default)]
    pub notes: Option<EncryptedBlob>,
    #[serde(default)]
    pub settings: Option<Value>,
}

impl EncryptedData {
    fn is_empty(&self) -> bool {
        self.passwords.is_none() && self.notes.is_none() && self.settings.is_none()
    }
}

impl BackupSnapshot {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| VaultError::SerializationError(format!("snapshot: {e}")))
    }
}

/// What `detect_format` recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    NativeSnapshot,
    LegacyString,
    Unknown,
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NativeSnapshot => "snapshot",
            Self::LegacyString => "legacy",
            Self::Unknown => "unknown",
        })
    }
}

// ---------------------------------------------------------------------------
// Merge policy
// ---------------------------------------------------------------------------

/// What to do when an imported record has the same id as a local one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Keep the local record.
    #[default]
    KeepExisting,
    /// Take the imported record.
    PreferImported,
    /// Take whichever record was updated last; ties keep the local one.
    PreferNewer,
}

impl CollisionPolicy {
    pub const NAMES: [&'static str; 3] = ["keep-existing", "prefer-imported", "prefer-newer"];

    pub fn name(self) -> &'static str {
        match self {
            Self::KeepExisting => "keep-existing",
            Self::PreferImported => "prefer-imported",
            Self::PreferNewer => "prefer-newer",
        }
    }

    fn takes_incoming<R: Record>(self, local: &R, incoming: &R) -> bool {
        match self {
            Self::KeepExisting => false,
            Self::PreferImported => true,
            Self::PreferNewer => incoming.updated_at() > local.updated_at(),
        }
    }
}

impl fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "keep-existing" | "keep" => Ok(Self::KeepExisting),
            "prefer-imported" | "imported" => Ok(Self::PreferImported),
            "prefer-newer" | "newer" => Ok(Self::PreferNewer),
            other => Err(format!(
                "unknown collision policy '{other}' (expected one of: {})",
                Self::NAMES.join(", ")
            )),
        }
    }
}

/// Outcome of merging one collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Records whose id was not present locally.
    pub added: usize,
    /// Records whose id was already present, whatever the policy did.
    pub collisions: usize,
    /// Collisions resolved in favour of the imported record.
    pub replaced: usize,
}

impl MergeStats {
    fn changed(&self) -> bool {
        self.added > 0 || self.replaced > 0
    }
}

/// Outcome of a whole import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub format: FormatKind,
    pub passwords: MergeStats,
    pub notes: MergeStats,
    /// Id collisions across both collections.
    pub collisions: usize,
    /// Settings keys that were absent locally and got filled in.
    pub settings_added: usize,
}

/// Merge `incoming` into `existing` by id.
///
/// Local order is kept; new records are appended in import order.
pub fn merge<R: Record>(existing: &[R], incoming: Vec<R>, policy: CollisionPolicy) -> (Vec<R>, MergeStats) {
    let mut merged = existing.to_vec();
    let mut stats = MergeStats::default();

    for record in incoming {
        match merged.iter().position(|r| r.id() == record.id()) {
            Some(index) => {
                stats.collisions += 1;
                if policy.takes_incoming(&merged[index], &record) {
                    merged[index] = record;
                    stats.replaced += 1;
                }
            }
            None => {
                merged.push(record);
                stats.added += 1;
            }
        }
    }

    (merged, stats)
}

// ---------------------------------------------------------------------------
// BackupCodec
// ---------------------------------------------------------------------------

/// Export, detection, parsing and import of backup snapshots.
pub struct BackupCodec;

impl BackupCodec {
    /// Snapshot the vault behind an unlocked session.
    ///
    /// The stored blobs are copied as they are; nothing is re-encrypted,
    /// so the snapshot opens with the secret that was current at export.
    pub fn export<B: KeyValueStore>(session: &VaultSession<B>) -> Result<BackupSnapshot> {
        let current = session.current()?;
        let store = session.store();

        let settings = serde_json::to_value(&current.settings)
            .map_err(|e| VaultError::SerializationError(format!("settings: {e}")))?;

        Ok(BackupSnapshot {
            app: SNAPSHOT_APP.to_string(),
            version: SNAPSHOT_VERSION,
            export_date: Utc::now(),
            data_stats: DataStats {
                passwords: current.passwords.len(),
                notes: current.notes.len(),
            },
            encrypted_data: EncryptedData {
                passwords: store.load_blob(CollectionKind::Passwords)?,
                notes: store.load_blob(CollectionKind::Notes)?,
                settings: Some(settings),
            },
        })
    }

    /// Classify raw backup text without fully parsing it.
    pub fn detect_format(raw: &str) -> FormatKind {
        match serde_json::from_str::<Value>(raw.trim()) {
            Ok(Value::String(inner)) => match serde_json::from_str::<Value>(&inner) {
                Ok(value) if shape_of(&value) != FormatKind::Unknown => FormatKind::LegacyString,
                _ => FormatKind::Unknown,
            },
            Ok(value) => shape_of(&value),
            Err(_) => FormatKind::Unknown,
        }
    }

    /// Parse raw backup text of either format into a snapshot.
    pub fn parse(raw: &str) -> Result<BackupSnapshot> {
        let format = Self::detect_format(raw);
        if format == FormatKind::Unknown {
            return Err(VaultError::MalformedFile(
                "not a vaultkeep backup (unrecognized format)".into(),
            ));
        }

        let value: Value = match serde_json::from_str(raw.trim()) {
            Ok(Value::String(inner)) => serde_json::from_str(&inner),
            other => other,
        }
        .map_err(|e| VaultError::MalformedFile(e.to_string()))?;

        let snapshot = if is_native(&value) {
            let snapshot: BackupSnapshot = serde_json::from_value(value)
                .map_err(|e| VaultError::MalformedFile(format!("snapshot: {e}")))?;
            if snapshot.version > SNAPSHOT_VERSION {
                return Err(VaultError::MalformedFile(format!(
                    "snapshot version {} is newer than supported version {SNAPSHOT_VERSION}",
                    snapshot.version
                )));
            }
            if snapshot.app != SNAPSHOT_APP {
                warn!(app = %snapshot.app, "snapshot was written by a different application");
            }
            snapshot
        } else {
            let data = match value {
                Value::Object(mut map) if map.contains_key("encryptedData") => {
                    map.remove("encryptedData").unwrap_or(Value::Null)
                }
                other => other,
            };
            let encrypted_data: EncryptedData = serde_json::from_value(data)
                .map_err(|e| VaultError::MalformedFile(format!("encryptedData: {e}")))?;
            BackupSnapshot {
                app: SNAPSHOT_APP.to_string(),
                version: SNAPSHOT_VERSION,
                export_date: Utc::now(),
                data_stats: DataStats::default(),
                encrypted_data,
            }
        };

        if snapshot.encrypted_data.is_empty() {
            return Err(VaultError::MalformedFile("backup contains no collections".into()));
        }
        Ok(snapshot)
    }

    /// Merge a backup into an unlocked session.
    ///
    /// Every blob is decrypted with `secret` before anything is written;
    /// a blob no secret could open is `MalformedFile`, and the first one
    /// that fails authentication aborts with `WrongSecret`.  The merged
    /// collections are sealed under the session's own secret and
    /// committed together.
    pub fn import<B: KeyValueStore>(
        session: &mut VaultSession<B>,
        raw: &str,
        secret: &MasterSecret,
        policy: CollisionPolicy,
    ) -> Result<ImportSummary> {
        let current = session.current()?;
        let format = Self::detect_format(raw);
        let snapshot = Self::parse(raw)?;
        let data = &snapshot.encrypted_data;

        let passwords = open_collection::<PasswordRecord>(data.passwords.as_ref(), secret)?;
        let notes = open_collection::<NoteRecord>(data.notes.as_ref(), secret)?;
        let settings: VaultSettings = match &data.settings {
            Some(Value::Null) | None => VaultSettings::default(),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| VaultError::MalformedFile(format!("settings: {e}")))?,
        };

        let (merged_passwords, password_stats) = merge(&current.passwords, passwords, policy);
        let (merged_notes, note_stats) = merge(&current.notes, notes, policy);
        let mut merged_settings = current.settings.clone();
        let settings_added = merged_settings.fill_missing(&settings);

        let mut changed = Vec::new();
        if password_stats.changed() {
            changed.push(CollectionKind::Passwords);
        }
        if note_stats.changed() {
            changed.push(CollectionKind::Notes);
        }
        if settings_added > 0 {
            changed.push(CollectionKind::Settings);
        }

        if !changed.is_empty() {
            session.persist_all(
                Collections {
                    passwords: merged_passwords,
                    notes: merged_notes,
                    settings: merged_settings,
                },
                &changed,
            )?;
        }

        let summary = ImportSummary {
            format,
            passwords: password_stats,
            notes: note_stats,
            collisions: password_stats.collisions + note_stats.collisions,
            settings_added,
        };
        info!(
            %format,
            %policy,
            passwords_added = password_stats.added,
            notes_added = note_stats.added,
            collisions = summary.collisions,
            "backup imported"
        );
        Ok(summary)
    }
}

fn is_native(value: &Value) -> bool {
    value.as_object().is_some_and(|obj| {
        obj.contains_key("app") && obj.contains_key("version") && obj.contains_key("encryptedData")
    })
}

fn shape_of(value: &Value) -> FormatKind {
    let Some(obj) = value.as_object() else {
        return FormatKind::Unknown;
    };
    if is_native(value) {
        FormatKind::NativeSnapshot
    } else if obj.contains_key("encryptedData")
        || CollectionKind::ALL.iter().any(|k| obj.contains_key(k.name()))
    {
        FormatKind::LegacyString
    } else {
        FormatKind::Unknown
    }
}

/// Decrypt and parse one imported collection.
fn open_collection<R: Record>(blob: Option<&EncryptedBlob>, secret: &MasterSecret) -> Result<Vec<R>> {
    let Some(blob) = blob else {
        return Ok(Vec::new());
    };
    let name = R::KIND.name();
    blob.check_layout()
        .map_err(|e| VaultError::MalformedFile(format!("{name}: {e}")))?;
    Cipher::with_plaintext(blob, secret, name.as_bytes(), |plaintext| {
        serde_json::from_slice::<Vec<R>>(plaintext)
    })
    .map_err(|e| VaultError::from_cipher(e, name).into_wrong_secret())?
    .map_err(|e| VaultError::MalformedFile(format!("{name}: {e}")))
}

// ---------------------------------------------------------------------------
// Session entry points
// ---------------------------------------------------------------------------

impl<B: KeyValueStore> VaultSession<B> {
    /// Export the vault as pretty-printed snapshot JSON.
    pub fn export_snapshot(&self) -> Result<String> {
        let snapshot = BackupCodec::export(self)?;
        info!(
            passwords = snapshot.data_stats.passwords,
            notes = snapshot.data_stats.notes,
            "snapshot exported"
        );
        snapshot.to_json()
    }

    /// Merge backup text encrypted under `secret` into this vault.
    pub fn import_snapshot(
        &mut self,
        raw: &str,
        secret: &MasterSecret,
        policy: CollisionPolicy,
    ) -> Result<ImportSummary> {
        BackupCodec::import(self, raw, secret, policy)
    }
}
