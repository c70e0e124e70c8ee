//! Test fixtures: endpoints over an in-memory store plus scripted
//! collaborators.

use crate::collaborators::{HistogramQuery, ReplicaStore, SyncModules, SyncSender};
use crate::{EndpointConfig, EndpointError, EndpointResult, SyncEndpoints};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sync_codec::IdentityCodec;
use sync_queue::Queue;
use sync_queue_store::{ItemStore, MemoryItemStore};

pub fn store() -> Arc<dyn ItemStore> {
    Arc::new(MemoryItemStore::new())
}

/// Default timings with the identity codec.
pub fn config() -> EndpointConfig {
    EndpointConfig {
        codec: Arc::new(IdentityCodec),
        ..EndpointConfig::default()
    }
}

pub fn endpoints(store: Arc<dyn ItemStore>) -> SyncEndpoints {
    SyncEndpoints::new(store, config())
}

/// A queue handle on the same store, standing in for another consumer.
pub fn queue(store: &Arc<dyn ItemStore>, name: &str) -> Queue {
    Queue::new(name, store.clone()).unwrap()
}

/// Replica that records how often it was asked, and whether the sync queue
/// was locked at the time.
pub struct ScriptedReplica {
    store: Arc<dyn ItemStore>,
    pub calls: AtomicUsize,
    pub saw_lock: Mutex<Vec<bool>>,
    pub fail: bool,
}

impl ScriptedReplica {
    pub fn new(store: Arc<dyn ItemStore>, fail: bool) -> Self {
        Self {
            store,
            calls: AtomicUsize::new(0),
            saw_lock: Mutex::new(Vec::new()),
            fail,
        }
    }

    fn record(&self) -> EndpointResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let locked = queue(&self.store, "sync").is_locked().unwrap();
        self.saw_lock.lock().unwrap().push(locked);
        if self.fail {
            return Err(EndpointError::Collaborator("checksum failed".into()));
        }
        Ok(())
    }
}

impl ReplicaStore for ScriptedReplica {
    fn checksum_all(&self) -> EndpointResult<Value> {
        self.record()?;
        Ok(json!({ "posts": "abc", "comments": "def" }))
    }

    fn checksum_histogram(&self, query: &HistogramQuery) -> EndpointResult<Value> {
        self.record()?;
        Ok(json!({ "object_type": query.object_type, "buckets": query.buckets }))
    }
}

/// Sender whose next sync is a fixed offset from now.
pub struct FixedSender {
    pub next_in: Duration,
}

impl SyncSender for FixedSender {
    fn next_sync_time(&self, queue: &str) -> EndpointResult<Option<f64>> {
        if queue != "sync" {
            return Ok(None);
        }
        let now = chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0;
        Ok(Some(now + self.next_in.as_secs_f64()))
    }

    fn do_sync_for_queue(&self, queue: &Queue) -> EndpointResult<Value> {
        Ok(json!({ "queue": queue.name(), "sent": queue.size()? }))
    }
}

/// One module, `posts`, that echoes the ids back as objects.
pub struct PostsModule;

impl SyncModules for PostsModule {
    fn get_objects_by_id(
        &self,
        module: &str,
        object_type: &str,
        ids: &[Value],
    ) -> EndpointResult<Option<Value>> {
        if module != "posts" {
            return Ok(None);
        }
        Ok(Some(Value::Array(
            ids.iter()
                .map(|id| json!({ "type": object_type, "id": id }))
                .collect(),
        )))
    }
}
