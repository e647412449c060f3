//! SQLite schema definition and migrations.

use rusqlite::Connection;
use thiserror::Error;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Scan marker value before the first completed pass. No real directory
/// mtime compares equal to it, so the first `reconcile()` always scans.
pub const SCAN_MARKER_SENTINEL: i64 = -1;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Schema version {found} is newer than supported {supported}")]
    VersionTooNew { found: i32, supported: i32 },

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

/// Initialize or migrate the database schema.
pub fn init_schema(conn: &Connection) -> Result<(), SchemaError> {
    let version = get_schema_version(conn)?;

    if version == 0 {
        create_schema_v1(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if version < SCHEMA_VERSION {
        migrate(conn, version)?;
    } else if version > SCHEMA_VERSION {
        return Err(SchemaError::VersionTooNew {
            found: version,
            supported: SCHEMA_VERSION,
        });
    }

    Ok(())
}

fn get_schema_version(conn: &Connection) -> Result<i32, SchemaError> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 =
        conn.query_row("SELECT version FROM schema_version", [], |row| row.get(0))?;

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), SchemaError> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?1)",
        [version],
    )?;
    Ok(())
}

fn create_schema_v1(conn: &Connection) -> Result<(), SchemaError> {
    conn.execute_batch(&format!(
        r#"
        CREATE TABLE schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL
        );

        -- One row per post file. Timestamps are nanoseconds since the epoch.
        CREATE TABLE posts (
            title TEXT PRIMARY KEY,
            changed_at INTEGER NOT NULL,
            scanned_at INTEGER NOT NULL
        );

        CREATE INDEX idx_posts_changed ON posts(changed_at);
        CREATE INDEX idx_posts_scanned ON posts(scanned_at);

        -- Directory mtime as of the last completed scan pass
        CREATE TABLE scan_marker (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            mtime INTEGER NOT NULL
        );

        INSERT INTO scan_marker (id, mtime) VALUES (1, {SCAN_MARKER_SENTINEL});

        -- Full text of every post, kept 1:1 with the posts table
        CREATE VIRTUAL TABLE posts_fts USING fts5(title, text);
        "#
    ))?;

    Ok(())
}

fn migrate(_conn: &Connection, from_version: i32) -> Result<(), SchemaError> {
    Err(SchemaError::MigrationFailed(format!(
        "No migration path from version {} to {}",
        from_version, SCHEMA_VERSION
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_init_fresh_database() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let version: i32 = conn
            .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"posts".to_string()));
        assert!(tables.contains(&"scan_marker".to_string()));
        assert!(tables.contains(&"posts_fts".to_string()));
    }

    #[test]
    fn test_scan_marker_seeded_with_sentinel() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let mtime: i64 = conn
            .query_row("SELECT mtime FROM scan_marker WHERE id = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mtime, SCAN_MARKER_SENTINEL);
    }

    #[test]
    fn test_init_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn.execute("UPDATE scan_marker SET mtime = 7 WHERE id = 1", []).unwrap();

        init_schema(&conn).unwrap();

        let mtime: i64 = conn
            .query_row("SELECT mtime FROM scan_marker WHERE id = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mtime, 7);
    }

    #[test]
    fn test_rejects_newer_schema() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn.execute("UPDATE schema_version SET version = 99", []).unwrap();

        let err = init_schema(&conn).unwrap_err();
        assert!(matches!(err, SchemaError::VersionTooNew { found: 99, .. }));
    }
}
