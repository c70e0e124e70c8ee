//! SQLite-backed item store.
//!
//! One table holds every queue's records. Several processes may open the same
//! file: WAL mode lets readers proceed during writes, the busy timeout makes
//! writers wait for each other instead of failing, and the PRIMARY KEY on
//! `key` is what turns `INSERT OR IGNORE` into an atomic insert-if-absent.

use crate::{migrations, ItemStore, KeyRange, StoreRecord, StoreResult};
use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// Rows per multi-row INSERT statement, kept well under SQLite's bound
/// parameter limit.
const INSERT_CHUNK_ROWS: usize = 200;

/// Durable item store backed by a single SQLite file.
pub struct SqliteItemStore {
    conn: Mutex<Connection>,
}

impl SqliteItemStore {
    /// Open a store at the given path, running migrations if needed.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        migrations::run_migrations(&conn)?;
        debug!(path = %path.display(), "Opened SQLite item store");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory store for testing.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        // Note: WAL mode doesn't apply to in-memory databases
        conn.execute_batch("PRAGMA temp_store = MEMORY;")?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn now_millis() -> i64 {
        Utc::now().timestamp_millis()
    }
}

impl ItemStore for SqliteItemStore {
    fn insert_if_absent(&self, key: &str, value: &[u8]) -> StoreResult<bool> {
        let conn = self.conn.lock()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO queue_records (key, value, created_at) VALUES (?1, ?2, ?3)",
            params![key, value, Self::now_millis()],
        )?;
        Ok(inserted == 1)
    }

    fn insert_batch(&self, records: &[StoreRecord]) -> StoreResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = Self::now_millis();
        let mut inserted = 0;

        for chunk in records.chunks(INSERT_CHUNK_ROWS) {
            let placeholders = vec!["(?, ?, ?)"; chunk.len()].join(", ");
            let sql = format!(
                "INSERT OR IGNORE INTO queue_records (key, value, created_at) VALUES {placeholders}"
            );
            let mut values: Vec<rusqlite::types::Value> = Vec::with_capacity(chunk.len() * 3);
            for record in chunk {
                values.push(record.key.clone().into());
                values.push(record.value.clone().into());
                values.push(now.into());
            }
            inserted += tx.execute(&sql, params_from_iter(values))?;
        }

        tx.commit()?;
        Ok(inserted)
    }

    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let conn = self.conn.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM queue_records WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let conn = self.conn.lock()?;
        conn.execute(
            "INSERT INTO queue_records (key, value, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value, Self::now_millis()],
        )?;
        Ok(())
    }

    fn scan(&self, range: &KeyRange, limit: Option<usize>) -> StoreResult<Vec<StoreRecord>> {
        let conn = self.conn.lock()?;
        // LIMIT -1 means no limit in SQLite
        let limit = limit.map(|n| n as i64).unwrap_or(-1);
        let mut stmt = conn.prepare_cached(
            "SELECT key, value FROM queue_records
             WHERE key >= ?1 AND key < ?2
             ORDER BY key ASC
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![range.start, range.end, limit], |row| {
            Ok(StoreRecord {
                key: row.get(0)?,
                value: row.get(1)?,
            })
        })?;
        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn count(&self, range: &KeyRange) -> StoreResult<usize> {
        let conn = self.conn.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM queue_records WHERE key >= ?1 AND key < ?2",
            params![range.start, range.end],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn delete_keys(&self, keys: &[String]) -> StoreResult<usize> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let deleted = delete_each(&tx, keys)?;
        tx.commit()?;
        Ok(deleted)
    }

    fn delete_range(&self, range: &KeyRange) -> StoreResult<usize> {
        let conn = self.conn.lock()?;
        let deleted = conn.execute(
            "DELETE FROM queue_records WHERE key >= ?1 AND key < ?2",
            params![range.start, range.end],
        )?;
        Ok(deleted)
    }

    fn delete_if_match(
        &self,
        guard_key: &str,
        expected: &[u8],
        keys: &[String],
    ) -> StoreResult<Option<usize>> {
        let mut conn = self.conn.lock()?;
        // IMMEDIATE takes the write lock up front, so no other process can
        // replace the guard between the read and the deletes.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current: Option<Vec<u8>> = tx
            .query_row(
                "SELECT value FROM queue_records WHERE key = ?1",
                params![guard_key],
                |row| row.get(0),
            )
            .optional()?;

        if current.as_deref() != Some(expected) {
            tx.rollback()?;
            return Ok(None);
        }

        let deleted = delete_each(&tx, keys)?;
        tx.commit()?;
        Ok(Some(deleted))
    }
}

fn delete_each(conn: &Connection, keys: &[String]) -> StoreResult<usize> {
    let mut stmt = conn.prepare_cached("DELETE FROM queue_records WHERE key = ?1")?;
    let mut deleted = 0;
    for key in keys {
        deleted += stmt.execute(params![key])?;
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn range() -> KeyRange {
        KeyRange::new("q-0", "q-:")
    }

    #[test]
    fn insert_if_absent_never_overwrites() {
        let store = SqliteItemStore::open_in_memory().unwrap();

        assert!(store.insert_if_absent("q-checkout", b"first").unwrap());
        assert!(!store.insert_if_absent("q-checkout", b"second").unwrap());
        assert_eq!(store.get("q-checkout").unwrap(), Some(b"first".to_vec()));
    }

    #[test]
    fn insert_batch_skips_collisions() {
        let store = SqliteItemStore::open_in_memory().unwrap();
        store.insert_if_absent("q-2", b"existing").unwrap();

        let inserted = store
            .insert_batch(&[
                StoreRecord::new("q-1", "a"),
                StoreRecord::new("q-2", "b"),
                StoreRecord::new("q-3", "c"),
            ])
            .unwrap();

        assert_eq!(inserted, 2);
        assert_eq!(store.get("q-2").unwrap(), Some(b"existing".to_vec()));
    }

    #[test]
    fn insert_batch_spans_multiple_chunks() {
        let store = SqliteItemStore::open_in_memory().unwrap();
        let records: Vec<_> = (0..(INSERT_CHUNK_ROWS * 2 + 7))
            .map(|i| StoreRecord::new(format!("q-{i:06}"), "v"))
            .collect();

        assert_eq!(store.insert_batch(&records).unwrap(), records.len());
        assert_eq!(store.count(&range()).unwrap(), records.len());
    }

    #[test]
    fn scan_is_ordered_and_limited() {
        let store = SqliteItemStore::open_in_memory().unwrap();
        for key in ["q-3", "q-1", "q-2", "q-checkout", "r-0"] {
            store.insert_if_absent(key, b"v").unwrap();
        }

        let keys: Vec<_> = store
            .scan(&range(), Some(2))
            .unwrap()
            .into_iter()
            .map(|r| r.key)
            .collect();
        assert_eq!(keys, vec!["q-1", "q-2"]);
        assert_eq!(store.count(&range()).unwrap(), 3);
        assert_eq!(store.scan(&range(), None).unwrap().len(), 3);
    }

    #[test]
    fn put_upserts() {
        let store = SqliteItemStore::open_in_memory().unwrap();
        store.put("settings", b"1").unwrap();
        store.put("settings", b"2").unwrap();
        assert_eq!(store.get("settings").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn delete_if_match_requires_exact_guard() {
        let store = SqliteItemStore::open_in_memory().unwrap();
        store.insert_if_absent("q-checkout", b"buf-a").unwrap();
        store.insert_if_absent("q-1", b"v").unwrap();

        let keys = vec!["q-1".to_string(), "q-checkout".to_string()];
        assert_eq!(store.delete_if_match("q-checkout", b"buf-b", &keys).unwrap(), None);
        assert_eq!(store.count(&range()).unwrap(), 1);

        assert_eq!(
            store.delete_if_match("q-checkout", b"buf-a", &keys).unwrap(),
            Some(2)
        );
        assert_eq!(store.get("q-checkout").unwrap(), None);
        assert_eq!(store.count(&range()).unwrap(), 0);
    }

    #[test]
    fn delete_if_match_on_missing_guard() {
        let store = SqliteItemStore::open_in_memory().unwrap();
        let keys = vec!["q-checkout".to_string()];
        assert_eq!(store.delete_if_match("q-checkout", b"x", &keys).unwrap(), None);
    }

    #[test]
    fn delete_range_and_keys() {
        let store = SqliteItemStore::open_in_memory().unwrap();
        for key in ["q-1", "q-2", "q-3", "q-lock"] {
            store.insert_if_absent(key, b"v").unwrap();
        }

        assert_eq!(
            store
                .delete_keys(&["q-1".to_string(), "q-missing".to_string()])
                .unwrap(),
            1
        );
        assert_eq!(store.delete_range(&range()).unwrap(), 2);
        assert!(store.get("q-lock").unwrap().is_some());
    }

    #[test]
    fn two_handles_share_one_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("queue.sqlite");

        let a = SqliteItemStore::open(&path).unwrap();
        let b = SqliteItemStore::open(&path).unwrap();

        assert!(a.insert_if_absent("q-checkout", b"a").unwrap());
        assert!(!b.insert_if_absent("q-checkout", b"b").unwrap());
        assert_eq!(b.get("q-checkout").unwrap(), Some(b"a".to_vec()));
    }
}
