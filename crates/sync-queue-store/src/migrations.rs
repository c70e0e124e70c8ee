//! Schema migrations.
//!
//! Migrations run in order and are tracked in the `migrations` table, so
//! every process opening the same file converges on one schema.

use crate::{StoreError, StoreResult};
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version.
pub const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> StoreResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM migrations",
        [],
        |row| row.get(0),
    )?;

    if current_version > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {current_version} is newer than supported version {CURRENT_VERSION}"
        )));
    }

    info!(current_version, target_version = CURRENT_VERSION, "Running migrations");

    if current_version < 1 {
        migrate_v1_queue_records(conn)?;
    }
    if current_version < 2 {
        migrate_v2_created_at_index(conn)?;
    }

    info!("Migrations complete");
    Ok(())
}

fn record_migration(conn: &Connection, version: i32, name: &str) -> StoreResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO migrations (version, name) VALUES (?1, ?2)",
        rusqlite::params![version, name],
    )?;
    debug!(version, name, "Migration applied");
    Ok(())
}

/// V1: the single ordered record table every queue lives in.
fn migrate_v1_queue_records(conn: &Connection) -> StoreResult<()> {
    info!("Applying migration v1: queue records");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS queue_records (
            key TEXT PRIMARY KEY,
            value BLOB NOT NULL,
            created_at INTEGER NOT NULL
        );
        ",
    )?;

    record_migration(conn, 1, "queue_records")
}

/// V2: index for age-based inspection of stale records.
fn migrate_v2_created_at_index(conn: &Connection) -> StoreResult<()> {
    info!("Applying migration v2: created_at index");

    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_queue_records_created_at
            ON queue_records(created_at);
        ",
    )?;

    record_migration(conn, 2, "created_at_index")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn newer_schema_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.execute(
            "INSERT INTO migrations (version, name) VALUES (?1, 'future')",
            [CURRENT_VERSION + 1],
        )
        .unwrap();

        let err = run_migrations(&conn).unwrap_err();
        assert_eq!(err.kind(), "migration");
    }
}
