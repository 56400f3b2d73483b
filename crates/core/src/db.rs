//! Shared SQLite connection setup and schema.
//!
//! Six tables share one database file and the foreign keys between them
//! require a fixed creation order, so schema initialization is centralized
//! here rather than repeated per store. Every store opens its own
//! connection through [`open`] (or [`open_in_memory`] in tests), which
//! applies the pragmas and creates the schema idempotently.

use std::path::Path;

use rusqlite::Connection;

/// Open (or create) the database at `path` with pragmas and schema applied.
pub fn open(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    initialize_schema(&conn)?;
    Ok(conn)
}

/// In-memory database with the full schema (useful for testing).
pub fn open_in_memory() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    initialize_schema(&conn)?;
    Ok(conn)
}

fn configure(conn: &Connection) -> rusqlite::Result<()> {
    // Enforce the protect-on-delete relations; wait instead of failing
    // immediately when another connection holds the write lock.
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    Ok(())
}

fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS organizations (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            website TEXT NOT NULL DEFAULT '',
            contact_email TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            deleted_at TEXT,
            version INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS venues (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            address TEXT NOT NULL DEFAULT '',
            capacity INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            deleted_at TEXT,
            version INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS event_categories (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            deleted_at TEXT,
            version INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS events (
            id TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL REFERENCES organizations(id),
            venue_id TEXT NOT NULL REFERENCES venues(id),
            category_id TEXT NOT NULL REFERENCES event_categories(id),
            title TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            starts_at TEXT NOT NULL,
            ends_at TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'DRAFT',
            capacity INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            deleted_at TEXT,
            version INTEGER NOT NULL DEFAULT 0,
            CHECK (ends_at > starts_at)
        );

        CREATE TABLE IF NOT EXISTS ticket_tiers (
            id TEXT PRIMARY KEY,
            event_id TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
            ticket_type TEXT NOT NULL,
            price TEXT NOT NULL,
            quota INTEGER NOT NULL DEFAULT 0,
            sold INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            deleted_at TEXT,
            version INTEGER NOT NULL DEFAULT 0,
            UNIQUE (event_id, ticket_type),
            -- Last-resort guards; the real invariant is held by the
            -- ledger's serialized read-check-write protocol.
            CHECK (quota >= 0),
            CHECK (sold >= 0),
            CHECK (sold <= quota)
        );

        CREATE TABLE IF NOT EXISTS bookings (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            tier_id TEXT NOT NULL REFERENCES ticket_tiers(id),
            quantity INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'PENDING',
            expires_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            deleted_at TEXT,
            version INTEGER NOT NULL DEFAULT 0,
            CHECK (quantity >= 1)
        );

        CREATE INDEX IF NOT EXISTS idx_events_status ON events(status);
        CREATE INDEX IF NOT EXISTS idx_events_starts_at ON events(starts_at);
        CREATE INDEX IF NOT EXISTS idx_events_organization ON events(organization_id);
        CREATE INDEX IF NOT EXISTS idx_tiers_event ON ticket_tiers(event_id);
        CREATE INDEX IF NOT EXISTS idx_bookings_user ON bookings(user_id);
        CREATE INDEX IF NOT EXISTS idx_bookings_tier ON bookings(tier_id);
        CREATE INDEX IF NOT EXISTS idx_bookings_status ON bookings(status);
        CREATE INDEX IF NOT EXISTS idx_bookings_expires_at ON bookings(expires_at);
        "#,
    )
}

/// Whether the error is a busy/locked condition, safe for the caller to
/// retry with backoff.
pub fn is_busy(e: &rusqlite::Error) -> bool {
    matches!(
        e.sqlite_error_code(),
        Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked)
    )
}

/// Whether the error is a UNIQUE constraint violation.
pub fn is_unique_violation(e: &rusqlite::Error) -> bool {
    match e {
        rusqlite::Error::SqliteFailure(err, Some(msg)) => {
            err.code == rusqlite::ErrorCode::ConstraintViolation && msg.contains("UNIQUE")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory_creates_schema() {
        let conn = open_in_memory().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN \
                 ('organizations', 'venues', 'event_categories', 'events', 'ticket_tiers', 'bookings')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 6);
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        initialize_schema(&conn).unwrap();
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = open_in_memory().unwrap();
        let enabled: i64 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_open_creates_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("boxoffice.db");
        let _conn = open(&db_path).unwrap();
        assert!(db_path.exists());
    }
}
