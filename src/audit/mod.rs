//! Audit log: SQLite-backed operation history.
//!
//! Every reseal, rotation and store write is recorded in
//! `<project>/.sealvault/audit.db` with the secret short name, the key
//! and a short outcome detail. Values are never recorded.
//!
//! Logging degrades gracefully: if the database cannot be opened or
//! written, the operation continues without a record.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::debug;

use crate::errors::{Result, SealVaultError};

/// A single audit log entry.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub short_name: Option<String>,
    pub key_name: Option<String>,
    pub details: Option<String>,
}

pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    /// Open (or create) the audit database at `db_path`.
    ///
    /// `None` means audit logging is unavailable; callers carry on.
    pub fn open(db_path: &Path) -> Option<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok()?;
        }
        let conn = match Connection::open(db_path) {
            Ok(conn) => conn,
            Err(e) => {
                debug!(path = %db_path.display(), "audit log unavailable: {e}");
                return None;
            }
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(db_path, std::fs::Permissions::from_mode(0o600));
        }

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS audit_log (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp   TEXT NOT NULL,
                operation   TEXT NOT NULL,
                short_name  TEXT,
                key_name    TEXT,
                details     TEXT
            );",
        )
        .ok()?;

        Some(Self { conn })
    }

    /// Record an operation. Errors are ignored.
    pub fn log(
        &self,
        operation: &str,
        short_name: Option<&str>,
        key_name: Option<&str>,
        details: Option<&str>,
    ) {
        let now = Utc::now().to_rfc3339();
        if let Err(e) = self.conn.execute(
            "INSERT INTO audit_log (timestamp, operation, short_name, key_name, details)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![now, operation, short_name, key_name, details],
        ) {
            debug!(operation, "audit insert failed: {e}");
        }
    }

    /// Most recent entries first, at most `limit`, optionally only those
    /// at or after `since`.
    pub fn query(&self, limit: usize, since: Option<DateTime<Utc>>) -> Result<Vec<AuditEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        // RFC 3339 strings in UTC sort chronologically.
        let since = since.map_or_else(String::new, |ts| ts.to_rfc3339());

        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, timestamp, operation, short_name, key_name, details
                 FROM audit_log
                 WHERE timestamp >= ?1
                 ORDER BY id DESC
                 LIMIT ?2",
            )
            .map_err(|e| SealVaultError::AuditError(format!("query prepare: {e}")))?;

        let rows = stmt
            .query_map(rusqlite::params![since, limit], |row| {
                let ts: String = row.get(1)?;
                let timestamp = DateTime::parse_from_rfc3339(&ts)
                    .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc));
                Ok(AuditEntry {
                    id: row.get(0)?,
                    timestamp,
                    operation: row.get(2)?,
                    short_name: row.get(3)?,
                    key_name: row.get(4)?,
                    details: row.get(5)?,
                })
            })
            .map_err(|e| SealVaultError::AuditError(format!("query exec: {e}")))?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(|e| SealVaultError::AuditError(format!("row parse: {e}")))?);
        }
        Ok(entries)
    }
}

/// Open the log at `db_path` and record one event, ignoring any failure.
pub fn log_event(
    db_path: &Path,
    operation: &str,
    short_name: Option<&str>,
    key_name: Option<&str>,
    details: Option<&str>,
) {
    if let Some(audit) = AuditLog::open(db_path) {
        audit.log(operation, short_name, key_name, details);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open(dir: &TempDir) -> AuditLog {
        AuditLog::open(&dir.path().join(".sealvault").join("audit.db")).unwrap()
    }

    #[test]
    fn open_creates_database_and_parent() {
        let dir = TempDir::new().unwrap();
        let _audit = open(&dir);
        assert!(dir.path().join(".sealvault/audit.db").exists());
    }

    #[test]
    fn log_and_query_most_recent_first() {
        let dir = TempDir::new().unwrap();
        let audit = open(&dir);

        audit.log("store-put", None, Some("db-password"), Some("version 1"));
        audit.log("reseal", Some("app-db"), None, Some("resealed 2 keys"));
        audit.log("rotate", Some("app-db"), Some("password"), Some("version 2"));

        let entries = audit.query(10, None).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].operation, "rotate");
        assert_eq!(entries[0].key_name.as_deref(), Some("password"));
        assert_eq!(entries[1].short_name.as_deref(), Some("app-db"));
        assert!(entries[2].short_name.is_none());
    }

    #[test]
    fn query_respects_limit_and_since() {
        let dir = TempDir::new().unwrap();
        let audit = open(&dir);
        for i in 0..5 {
            audit.log("reseal", Some(&format!("s{i}")), None, None);
        }
        assert_eq!(audit.query(3, None).unwrap().len(), 3);

        let past = Utc::now() - chrono::Duration::hours(1);
        assert_eq!(audit.query(10, Some(past)).unwrap().len(), 5);
        let future = Utc::now() + chrono::Duration::hours(1);
        assert!(audit.query(10, Some(future)).unwrap().is_empty());
    }

    #[test]
    fn log_event_never_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();
        // The parent is a regular file, so the database cannot be created.
        log_event(&blocker.join("audit.db"), "reseal", None, None, None);
        assert!(AuditLog::open(&blocker.join("audit.db")).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn audit_db_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let _audit = open(&dir);
        let mode = std::fs::metadata(dir.path().join(".sealvault/audit.db"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
