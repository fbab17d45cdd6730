//! Audit log — SQLite-based operation history.
//!
//! Stores a record of every vault operation (add, delete, change-secret,
//! import, ...) in a local SQLite database at `<vault_dir>/audit.db`.
//! Only operation names, record titles and counts are written; secrets
//! and record contents never are.
//!
//! Designed for graceful degradation: if the database can't be opened or
//! written to, operations silently continue without logging.  Without the
//! `audit-log` feature `log_audit` is a no-op.

use crate::cli::Cli;

#[cfg(feature = "audit-log")]
pub use sqlite::{AuditEntry, AuditLog};

/// Log an audit event for the vault the CLI points at.
///
/// Never fails the parent operation.
pub fn log_audit(cli: &Cli, op: &str, target: Option<&str>, details: Option<&str>) {
    #[cfg(feature = "audit-log")]
    {
        let Ok(vault_dir) = crate::cli::vault_dir(cli) else {
            return;
        };
        if let Some(audit) = AuditLog::open(&vault_dir) {
            audit.log(op, target, details);
        }
    }

    #[cfg(not(feature = "audit-log"))]
    let _ = (cli, op, target, details);
}

#[cfg(feature = "audit-log")]
mod sqlite {
    use std::path::{Path, PathBuf};

    use chrono::{DateTime, SecondsFormat, Utc};
    use rusqlite::Connection;
    use tracing::debug;

    use crate::errors::{Result, VaultError};

    /// Timestamps are compared as text, so every row uses one fixed width.
    fn stamp(ts: DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// A single audit log entry.
    #[derive(Debug, Clone)]
    pub struct AuditEntry {
        pub id: i64,
        pub timestamp: DateTime<Utc>,
        pub operation: String,
        pub target: Option<String>,
        pub details: Option<String>,
    }

    /// SQLite-backed audit log.
    pub struct AuditLog {
        conn: Connection,
    }

    impl AuditLog {
        /// Open (or create) the audit database at `<vault_dir>/audit.db`.
        ///
        /// Returns `None` if the database can't be opened — callers should
        /// treat this as "audit logging unavailable" and continue normally.
        pub fn open(vault_dir: &Path) -> Option<Self> {
            let db_path = Self::db_path(vault_dir);
            let conn = match Connection::open(&db_path) {
                Ok(conn) => conn,
                Err(e) => {
                    debug!(path = %db_path.display(), error = %e, "audit log unavailable");
                    return None;
                }
            };

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let perms = std::fs::Permissions::from_mode(0o600);
                let _ = std::fs::set_permissions(&db_path, perms);
            }

            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS audit_log (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    timestamp   TEXT NOT NULL,
                    operation   TEXT NOT NULL,
                    target      TEXT,
                    details     TEXT
                );",
            )
            .ok()?;

            Some(Self { conn })
        }

        /// Record an operation. Errors are ignored.
        pub fn log(&self, operation: &str, target: Option<&str>, details: Option<&str>) {
            let now = stamp(Utc::now());
            if let Err(e) = self.conn.execute(
                "INSERT INTO audit_log (timestamp, operation, target, details)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![now, operation, target, details],
            ) {
                debug!(operation, error = %e, "audit insert failed");
            }
        }

        /// Most recent entries first, at most `limit`, optionally only
        /// those at or after `since`.
        pub fn query(&self, limit: usize, since: Option<DateTime<Utc>>) -> Result<Vec<AuditEntry>> {
            let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
            // An absent bound matches everything.
            let since_str = since.map(stamp);

            let mut stmt = self
                .conn
                .prepare(
                    "SELECT id, timestamp, operation, target, details
                     FROM audit_log
                     WHERE ?1 IS NULL OR timestamp >= ?1
                     ORDER BY id DESC
                     LIMIT ?2",
                )
                .map_err(|e| VaultError::AuditError(format!("query prepare: {e}")))?;

            let rows = stmt
                .query_map(rusqlite::params![since_str, limit_i64], |row| {
                    let ts_str: String = row.get(1)?;
                    let timestamp = DateTime::parse_from_rfc3339(&ts_str)
                        .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc));

                    Ok(AuditEntry {
                        id: row.get(0)?,
                        timestamp,
                        operation: row.get(2)?,
                        target: row.get(3)?,
                        details: row.get(4)?,
                    })
                })
                .map_err(|e| VaultError::AuditError(format!("query exec: {e}")))?;

            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| VaultError::AuditError(format!("row parse: {e}")))
        }

        /// Path of the audit database inside `vault_dir`.
        pub fn db_path(vault_dir: &Path) -> PathBuf {
            vault_dir.join("audit.db")
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use tempfile::TempDir;

        #[test]
        fn open_creates_database() {
            let dir = TempDir::new().unwrap();
            assert!(AuditLog::open(dir.path()).is_some());
            assert!(dir.path().join("audit.db").exists());
        }

        #[test]
        fn log_and_query_most_recent_first() {
            let dir = TempDir::new().unwrap();
            let audit = AuditLog::open(dir.path()).unwrap();

            audit.log("add", Some("GitHub"), None);
            audit.log("note-add", Some("Groceries"), None);
            audit.log("delete", Some("GitHub"), None);

            let entries = audit.query(10, None).unwrap();
            let ops: Vec<&str> = entries.iter().map(|e| e.operation.as_str()).collect();
            assert_eq!(ops, vec!["delete", "note-add", "add"]);
        }

        #[test]
        fn query_with_limit() {
            let dir = TempDir::new().unwrap();
            let audit = AuditLog::open(dir.path()).unwrap();
            for i in 0..10 {
                audit.log("add", Some(&format!("site-{i}")), None);
            }
            assert_eq!(audit.query(3, None).unwrap().len(), 3);
        }

        #[test]
        fn query_with_since_filter() {
            let dir = TempDir::new().unwrap();
            let audit = AuditLog::open(dir.path()).unwrap();
            audit.log("init", None, Some("vault created"));

            let past = Utc::now() - chrono::Duration::hours(1);
            let entries = audit.query(10, Some(past)).unwrap();
            assert_eq!(entries.len(), 1);
            assert!(entries[0].target.is_none());
            assert_eq!(entries[0].details.as_deref(), Some("vault created"));

            let future = Utc::now() + chrono::Duration::hours(1);
            assert!(audit.query(10, Some(future)).unwrap().is_empty());
        }

        #[test]
        fn open_returns_none_on_bad_path() {
            assert!(AuditLog::open(Path::new("/nonexistent/path/that/does/not/exist")).is_none());
        }

        #[cfg(unix)]
        #[test]
        fn audit_db_has_restrictive_permissions() {
            use std::os::unix::fs::PermissionsExt;

            let dir = TempDir::new().unwrap();
            let _audit = AuditLog::open(dir.path()).unwrap();
            let perms = std::fs::metadata(dir.path().join("audit.db"))
                .unwrap()
                .permissions();
            assert_eq!(perms.mode() & 0o777, 0o600);
        }
    }
}
