//! Seams to the rest of the sync subsystem.
//!
//! The endpoints drive the queue; everything about *what* is synchronized
//! lives behind these traits. [`Unconfigured`] stands in for collaborators a
//! deployment has not wired up.

use crate::schedule::FullSyncModules;
use crate::{EndpointError, EndpointResult};
use serde_json::{Map, Value};
use sync_queue::Queue;

/// Full-sync job scheduling.
pub trait FullSyncScheduler: Send + Sync {
    /// Schedule a full sync, optionally limited to some modules.
    ///
    /// Returns the scheduled job identifier.
    fn schedule(&self, modules: Option<&FullSyncModules>) -> EndpointResult<Value>;

    fn is_scheduled(&self) -> EndpointResult<bool>;

    /// Progress fields merged into `sync.status`.
    fn status(&self) -> EndpointResult<Map<String, Value>>;
}

/// Arguments of a checksum histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramQuery {
    pub object_type: String,
    pub buckets: Option<u32>,
    pub start_id: Option<i64>,
    pub end_id: Option<i64>,
    /// `None` means the replica's default columns.
    pub columns: Option<Vec<String>>,
}

/// Read-side checksums used by consistency checks.
pub trait ReplicaStore: Send + Sync {
    fn checksum_all(&self) -> EndpointResult<Value>;

    fn checksum_histogram(&self, query: &HistogramQuery) -> EndpointResult<Value>;
}

/// The process that ships buffers to the remote side.
pub trait SyncSender: Send + Sync {
    /// Unix time (seconds) of the next scheduled send for `queue`.
    fn next_sync_time(&self, queue: &str) -> EndpointResult<Option<f64>>;

    /// Run one send cycle for `queue` now.
    fn do_sync_for_queue(&self, queue: &Queue) -> EndpointResult<Value>;
}

/// Content-type modules able to serialize objects by id.
pub trait SyncModules: Send + Sync {
    /// Returns `None` when `module` does not exist.
    fn get_objects_by_id(
        &self,
        module: &str,
        object_type: &str,
        ids: &[Value],
    ) -> EndpointResult<Option<Value>>;
}

/// Persistent sync settings.
pub trait SettingsStore: Send + Sync {
    /// Every setting, defaults included.
    fn get_settings(&self) -> EndpointResult<Map<String, Value>>;

    fn update_settings(&self, settings: &Map<String, Value>) -> EndpointResult<()>;
}

/// Placeholder for collaborators that are not wired up.
///
/// Reads report nothing scheduled; actions fail with `Unavailable`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unconfigured;

impl ReplicaStore for Unconfigured {
    fn checksum_all(&self) -> EndpointResult<Value> {
        Err(EndpointError::Unavailable("replica store"))
    }

    fn checksum_histogram(&self, _query: &HistogramQuery) -> EndpointResult<Value> {
        Err(EndpointError::Unavailable("replica store"))
    }
}

impl SyncSender for Unconfigured {
    fn next_sync_time(&self, _queue: &str) -> EndpointResult<Option<f64>> {
        Ok(None)
    }

    fn do_sync_for_queue(&self, _queue: &Queue) -> EndpointResult<Value> {
        Err(EndpointError::Unavailable("sync sender"))
    }
}

impl SyncModules for Unconfigured {
    fn get_objects_by_id(
        &self,
        _module: &str,
        _object_type: &str,
        _ids: &[Value],
    ) -> EndpointResult<Option<Value>> {
        Ok(None)
    }
}
