//! Checksums over the local queue store.
//!
//! Stands in for a real replica so `sync.check` and `sync.histogram` have
//! something to hash: each queue's items are the "objects", hashed in key
//! order with SHA-256.

use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use sync_endpoints::{EndpointError, EndpointResult, HistogramQuery, ReplicaStore, ALLOWED_QUEUES};
use sync_queue::keys;
use sync_queue_store::{ItemStore, StoreRecord};

const DEFAULT_BUCKETS: u32 = 10;

pub struct StoreChecksumReplica {
    store: Arc<dyn ItemStore>,
}

impl StoreChecksumReplica {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    fn records(&self, queue: &str) -> EndpointResult<Vec<StoreRecord>> {
        Ok(self.store.scan(&keys::item_range(queue), None)?)
    }
}

fn digest(records: &[StoreRecord]) -> String {
    let mut hasher = Sha256::new();
    for record in records {
        hasher.update(record.key.as_bytes());
        hasher.update([0u8]);
        hasher.update(&record.value);
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

impl ReplicaStore for StoreChecksumReplica {
    fn checksum_all(&self) -> EndpointResult<Value> {
        let mut checksums = Map::new();
        for queue in ALLOWED_QUEUES {
            checksums.insert(queue.to_string(), json!(digest(&self.records(queue)?)));
        }
        Ok(Value::Object(checksums))
    }

    /// `object_type` names a queue; ids are positions in key order.
    fn checksum_histogram(&self, query: &HistogramQuery) -> EndpointResult<Value> {
        if !ALLOWED_QUEUES.contains(&query.object_type.as_str()) {
            return Err(EndpointError::InvalidArgument(format!(
                "unknown object type: {}",
                query.object_type
            )));
        }
        let records = self.records(&query.object_type)?;
        let start = query.start_id.unwrap_or(0).max(0) as usize;
        let end = query
            .end_id
            .map(|end| (end.max(0) as usize).min(records.len()))
            .unwrap_or(records.len());
        let selected = records.get(start..end).unwrap_or_default();

        let buckets = query.buckets.unwrap_or(DEFAULT_BUCKETS).max(1) as usize;
        let per_bucket = selected.len().div_ceil(buckets).max(1);

        let mut histogram = Map::new();
        for (i, chunk) in selected.chunks(per_bucket).enumerate() {
            let first = start + i * per_bucket;
            let last = first + chunk.len() - 1;
            histogram.insert(format!("{first}-{last}"), json!(digest(chunk)));
        }
        Ok(Value::Object(histogram))
    }
}
