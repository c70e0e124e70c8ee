//! In-process item store.

use crate::{ItemStore, KeyRange, StoreRecord, StoreResult};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Item store held in memory. Every operation takes one mutex, so each call
/// is atomic with respect to other threads in this process.
#[derive(Default)]
pub struct MemoryItemStore {
    records: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn in_range<'a>(
    records: &'a BTreeMap<String, Vec<u8>>,
    range: &KeyRange,
) -> impl Iterator<Item = (&'a String, &'a Vec<u8>)> {
    let end = range.end.clone();
    records
        .range(range.start.clone()..)
        .take_while(move |(key, _)| key.as_str() < end.as_str())
}

impl ItemStore for MemoryItemStore {
    fn insert_if_absent(&self, key: &str, value: &[u8]) -> StoreResult<bool> {
        let mut records = self.records.lock()?;
        if records.contains_key(key) {
            return Ok(false);
        }
        records.insert(key.to_string(), value.to_vec());
        Ok(true)
    }

    fn insert_batch(&self, batch: &[StoreRecord]) -> StoreResult<usize> {
        let mut records = self.records.lock()?;
        let mut inserted = 0;
        for record in batch {
            if !records.contains_key(&record.key) {
                records.insert(record.key.clone(), record.value.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.records.lock()?.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.records
            .lock()?
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn scan(&self, range: &KeyRange, limit: Option<usize>) -> StoreResult<Vec<StoreRecord>> {
        let records = self.records.lock()?;
        let iter = in_range(&records, range).map(|(key, value)| StoreRecord {
            key: key.clone(),
            value: value.clone(),
        });
        Ok(match limit {
            Some(n) => iter.take(n).collect(),
            None => iter.collect(),
        })
    }

    fn count(&self, range: &KeyRange) -> StoreResult<usize> {
        let records = self.records.lock()?;
        Ok(in_range(&records, range).count())
    }

    fn delete_keys(&self, keys: &[String]) -> StoreResult<usize> {
        let mut records = self.records.lock()?;
        Ok(keys.iter().filter(|k| records.remove(*k).is_some()).count())
    }

    fn delete_range(&self, range: &KeyRange) -> StoreResult<usize> {
        let mut records = self.records.lock()?;
        let doomed: Vec<String> = in_range(&records, range).map(|(k, _)| k.clone()).collect();
        for key in &doomed {
            records.remove(key);
        }
        Ok(doomed.len())
    }

    fn delete_if_match(
        &self,
        guard_key: &str,
        expected: &[u8],
        keys: &[String],
    ) -> StoreResult<Option<usize>> {
        let mut records = self.records.lock()?;
        if records.get(guard_key).map(Vec::as_slice) != Some(expected) {
            return Ok(None);
        }
        Ok(Some(
            keys.iter().filter(|k| records.remove(*k).is_some()).count(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn behaves_like_an_ordered_store() {
        let store = MemoryItemStore::new();
        for key in ["q-2", "q-1", "q-checkout"] {
            assert!(store.insert_if_absent(key, b"v").unwrap());
        }
        assert!(!store.insert_if_absent("q-1", b"other").unwrap());

        let range = KeyRange::new("q-0", "q-:");
        let keys: Vec<_> = store
            .scan(&range, None)
            .unwrap()
            .into_iter()
            .map(|r| r.key)
            .collect();
        assert_eq!(keys, vec!["q-1", "q-2"]);
        assert_eq!(store.count(&range).unwrap(), 2);
        assert_eq!(store.delete_range(&range).unwrap(), 2);
        assert!(store.get("q-checkout").unwrap().is_some());
    }

    #[test]
    fn guarded_delete() {
        let store = MemoryItemStore::new();
        store.insert_if_absent("q-checkout", b"a").unwrap();
        store.insert_if_absent("q-1", b"v").unwrap();
        let keys = vec!["q-1".to_string(), "q-checkout".to_string()];

        assert_eq!(store.delete_if_match("q-checkout", b"b", &keys).unwrap(), None);
        assert_eq!(store.delete_if_match("q-checkout", b"a", &keys).unwrap(), Some(2));
        assert_eq!(store.delete_if_match("q-checkout", b"a", &keys).unwrap(), None);
    }

    #[test]
    fn batch_reports_inserted_rows() {
        let store = MemoryItemStore::new();
        store.put("q-b", b"taken").unwrap();
        let inserted = store
            .insert_batch(&[
                StoreRecord::new("q-a", "1"),
                StoreRecord::new("q-b", "2"),
                StoreRecord::new("q-c", "3"),
            ])
            .unwrap();
        assert_eq!(inserted, 2);
    }
}
