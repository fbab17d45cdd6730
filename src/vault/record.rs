//! Record types held in the vault's collections.
//!
//! Passwords and notes are always encrypted at rest; settings are not
//! secret and are stored as plain JSON.  Every record serializes with
//! camelCase field names so snapshots stay readable by other clients.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroize;

/// The named collections a vault holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Passwords,
    Notes,
    Settings,
}

impl CollectionKind {
    /// Every collection, in storage order.
    pub const ALL: [CollectionKind; 3] = [Self::Passwords, Self::Notes, Self::Settings];

    /// Collections that must never touch storage unencrypted.
    pub const ENCRYPTED: [CollectionKind; 2] = [Self::Passwords, Self::Notes];

    pub fn name(self) -> &'static str {
        match self {
            Self::Passwords => "passwords",
            Self::Notes => "notes",
            Self::Settings => "settings",
        }
    }

    pub fn is_encrypted(self) -> bool {
        !matches!(self, Self::Settings)
    }

    /// JSON for a collection that has never been written.
    pub fn empty_json(self) -> &'static [u8] {
        match self {
            Self::Passwords | Self::Notes => b"[]",
            Self::Settings => b"{}",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CollectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "passwords" => Ok(Self::Passwords),
            "notes" => Ok(Self::Notes),
            "settings" => Ok(Self::Settings),
            other => Err(format!(
                "unknown collection '{other}' — use passwords, notes or settings"
            )),
        }
    }
}

/// Rough strength classification of a stored password.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordStrength {
    #[default]
    Weak,
    Medium,
    Strong,
}

impl PasswordStrength {
    /// Classify by length and how many character classes appear
    /// (lowercase, uppercase, digits, everything else).
    pub fn classify(password: &str) -> Self {
        let len = password.chars().count();
        let classes = [
            password.chars().any(|c| c.is_lowercase()),
            password.chars().any(|c| c.is_uppercase()),
            password.chars().any(|c| c.is_ascii_digit()),
            password.chars().any(|c| !c.is_alphanumeric()),
        ]
        .iter()
        .filter(|present| **present)
        .count();

        if len >= 12 && classes >= 3 {
            Self::Strong
        } else if len >= 8 && classes >= 2 {
            Self::Medium
        } else {
            Self::Weak
        }
    }
}

impl fmt::Display for PasswordStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Weak => "weak",
            Self::Medium => "medium",
            Self::Strong => "strong",
        })
    }
}

/// A stored credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordRecord {
    pub id: String,
    pub app_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub strength: PasswordStrength,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
}

impl PasswordRecord {
    /// A new record with a random id and both timestamps set to now.
    pub fn new(app_name: impl Into<String>, password: impl Into<String>) -> Self {
        let now = Utc::now();
        let password = password.into();
        Self {
            id: Uuid::new_v4().to_string(),
            app_name: app_name.into(),
            username: None,
            strength: PasswordStrength::classify(&password),
            password,
            url: None,
            notes: None,
            tags: Vec::new(),
            favorite: false,
            created_at: now,
            updated_at: now,
            last_used: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

impl Drop for PasswordRecord {
    fn drop(&mut self) {
        self.password.zeroize();
    }
}

/// An encrypted free-text note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRecord {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NoteRecord {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            content: content.into(),
            tags: Vec::new(),
            favorite: false,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Drop for NoteRecord {
    fn drop(&mut self) {
        self.content.zeroize();
    }
}

/// Free-form application settings.  Not secret.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VaultSettings(pub BTreeMap<String, serde_json::Value>);

impl VaultSettings {
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.0.insert(key.into(), value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy over keys from `other` that are absent here.  Returns how
    /// many keys were added.
    pub fn fill_missing(&mut self, other: &VaultSettings) -> usize {
        let mut added = 0;
        for (key, value) in &other.0 {
            if !self.0.contains_key(key) {
                self.0.insert(key.clone(), value.clone());
                added += 1;
            }
        }
        added
    }
}

/// Decrypted contents of an unlocked vault.
#[derive(Debug, Clone, Default)]
pub struct Collections {
    pub passwords: Vec<PasswordRecord>,
    pub notes: Vec<NoteRecord>,
    pub settings: VaultSettings,
}

/// A record stored in one of the encrypted list collections.
pub trait Record: Clone + PartialEq + Serialize + DeserializeOwned {
    const KIND: CollectionKind;

    fn id(&self) -> &str;

    fn created_at(&self) -> DateTime<Utc>;

    fn updated_at(&self) -> DateTime<Utc>;

    /// Mark the record as written at `now`, keeping `created_at`.
    fn stamp(&mut self, created_at: DateTime<Utc>, now: DateTime<Utc>);

    fn items(collections: &Collections) -> &[Self];

    fn items_mut(collections: &mut Collections) -> &mut Vec<Self>;
}

impl Record for PasswordRecord {
    const KIND: CollectionKind = CollectionKind::Passwords;

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn stamp(&mut self, created_at: DateTime<Utc>, now: DateTime<Utc>) {
        self.created_at = created_at;
        self.updated_at = now;
        self.strength = PasswordStrength::classify(&self.password);
    }

    fn items(collections: &Collections) -> &[Self] {
        &collections.passwords
    }

    fn items_mut(collections: &mut Collections) -> &mut Vec<Self> {
        &mut collections.passwords
    }
}

impl Record for NoteRecord {
    const KIND: CollectionKind = CollectionKind::Notes;

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn stamp(&mut self, created_at: DateTime<Utc>, now: DateTime<Utc>) {
        self.created_at = created_at;
        self.updated_at = now;
    }

    fn items(collections: &Collections) -> &[Self] {
        &collections.notes
    }

    fn items_mut(collections: &mut Collections) -> &mut Vec<Self> {
        &mut collections.notes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strength_classification() {
        assert_eq!(PasswordStrength::classify("abc"), PasswordStrength::Weak);
        assert_eq!(PasswordStrength::classify("abcdefgh"), PasswordStrength::Weak);
        assert_eq!(PasswordStrength::classify("abcdefg1"), PasswordStrength::Medium);
        assert_eq!(
            PasswordStrength::classify("Correct-Horse-9"),
            PasswordStrength::Strong
        );
    }

    #[test]
    fn password_record_uses_camel_case_json() {
        let record = PasswordRecord::new("GitHub", "abc").with_username("octocat");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["appName"], "GitHub");
        assert_eq!(json["username"], "octocat");
        assert_eq!(json["strength"], "weak");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("lastUsed").is_none());
    }

    #[test]
    fn minimal_record_json_deserializes_with_defaults() {
        let json = r#"{
            "id": "1",
            "appName": "GitHub",
            "password": "abc",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        }"#;
        let record: PasswordRecord = serde_json::from_str(json).unwrap();
        assert!(record.tags.is_empty());
        assert!(!record.favorite);
        assert_eq!(record.strength, PasswordStrength::Weak);
    }

    #[test]
    fn stamp_keeps_created_and_recomputes_strength() {
        let mut record = PasswordRecord::new("Mail", "weak");
        let created = record.created_at;
        record.password = "Much-Stronger-42".into();
        let later = created + chrono::Duration::seconds(5);
        record.stamp(created, later);

        assert_eq!(record.created_at, created);
        assert_eq!(record.updated_at, later);
        assert_eq!(record.strength, PasswordStrength::Strong);
    }

    #[test]
    fn fill_missing_never_overwrites() {
        let mut local = VaultSettings::default();
        local.set("theme", "dark".into());

        let mut incoming = VaultSettings::default();
        incoming.set("theme", "light".into());
        incoming.set("autoLockMinutes", 5.into());

        assert_eq!(local.fill_missing(&incoming), 1);
        assert_eq!(local.get("theme"), Some(&serde_json::Value::from("dark")));
        assert_eq!(local.get("autoLockMinutes"), Some(&serde_json::Value::from(5)));
    }

    #[test]
    fn collection_kind_parses_names() {
        assert_eq!("notes".parse::<CollectionKind>().unwrap(), CollectionKind::Notes);
        assert!("secrets".parse::<CollectionKind>().is_err());
        assert!(!CollectionKind::Settings.is_encrypted());
    }
}
