//! The item store seam.

use crate::StoreResult;
use std::sync::Arc;

/// A single key/value record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRecord {
    pub key: String,
    pub value: Vec<u8>,
}

impl StoreRecord {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Half-open key range `[start, end)` compared bytewise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    pub start: String,
    pub end: String,
}

impl KeyRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Returns true if `key` falls inside the range.
    pub fn contains(&self, key: &str) -> bool {
        key >= self.start.as_str() && key < self.end.as_str()
    }
}

/// Ordered key-value namespace shared by every queue handle.
///
/// Implementations must be safe to call from several threads, and
/// [`SqliteItemStore`](crate::SqliteItemStore) additionally from several
/// processes sharing one file. Keys are ordered bytewise.
pub trait ItemStore: Send + Sync {
    /// Inserts `value` under `key` unless the key exists. Never overwrites.
    ///
    /// Returns `true` when this call created the key.
    fn insert_if_absent(&self, key: &str, value: &[u8]) -> StoreResult<bool>;

    /// Inserts every record whose key is free, skipping collisions.
    ///
    /// Returns the number of rows actually inserted.
    fn insert_batch(&self, records: &[StoreRecord]) -> StoreResult<usize>;

    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Unconditional upsert. Reserved for singleton metadata records.
    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Returns records in `range`, ascending by key, at most `limit` of them.
    fn scan(&self, range: &KeyRange, limit: Option<usize>) -> StoreResult<Vec<StoreRecord>>;

    fn count(&self, range: &KeyRange) -> StoreResult<usize>;

    /// Deletes the given keys, returning how many existed.
    fn delete_keys(&self, keys: &[String]) -> StoreResult<usize>;

    fn delete_range(&self, range: &KeyRange) -> StoreResult<usize>;

    /// Atomically: if `guard_key` holds exactly `expected`, delete every key in
    /// `keys` and return the number deleted. Otherwise delete nothing and
    /// return `None`.
    fn delete_if_match(
        &self,
        guard_key: &str,
        expected: &[u8],
        keys: &[String],
    ) -> StoreResult<Option<usize>>;
}

impl<S: ItemStore + ?Sized> ItemStore for Arc<S> {
    fn insert_if_absent(&self, key: &str, value: &[u8]) -> StoreResult<bool> {
        (**self).insert_if_absent(key, value)
    }

    fn insert_batch(&self, records: &[StoreRecord]) -> StoreResult<usize> {
        (**self).insert_batch(records)
    }

    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        (**self).put(key, value)
    }

    fn scan(&self, range: &KeyRange, limit: Option<usize>) -> StoreResult<Vec<StoreRecord>> {
        (**self).scan(range, limit)
    }

    fn count(&self, range: &KeyRange) -> StoreResult<usize> {
        (**self).count(range)
    }

    fn delete_keys(&self, keys: &[String]) -> StoreResult<usize> {
        (**self).delete_keys(keys)
    }

    fn delete_range(&self, range: &KeyRange) -> StoreResult<usize> {
        (**self).delete_range(range)
    }

    fn delete_if_match(
        &self,
        guard_key: &str,
        expected: &[u8],
        keys: &[String],
    ) -> StoreResult<Option<usize>> {
        (**self).delete_if_match(guard_key, expected, keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_range_is_half_open() {
        let range = KeyRange::new("sync-0", "sync-:");
        assert!(range.contains("sync-0000000001.000000000-1.0"));
        assert!(range.contains("sync-9"));
        assert!(!range.contains("sync-:"));
        assert!(!range.contains("sync-checkout"));
        assert!(!range.contains("sync-lock"));
        assert!(!range.contains("full_sync-0000000001"));
    }
}
