//! `sync.status`: full-sync progress plus queue health.

use crate::endpoints::{SyncEndpoints, FULL_SYNC_QUEUE, SYNC_QUEUE};
use crate::EndpointResult;
use chrono::Utc;
use serde_json::{json, Value};

impl SyncEndpoints {
    /// Scheduler status merged with, per queue, `<prefix>_size`,
    /// `<prefix>_lag` (seconds) and `<prefix>_next_sync` (seconds from now,
    /// `null` if nothing is scheduled). The prefix is `queue` for the sync
    /// queue and `full_queue` for the full-sync queue.
    pub fn status(&self) -> EndpointResult<Value> {
        let mut status = self.scheduler.status()?;
        status.insert("is_scheduled".into(), json!(self.scheduler.is_scheduled()?));

        let now = Utc::now().timestamp_micros() as f64 / 1_000_000.0;
        for (prefix, name) in [("queue", SYNC_QUEUE), ("full_queue", FULL_SYNC_QUEUE)] {
            let queue = self.queue(name)?;
            let next_sync = self.sender.next_sync_time(name)?.map(|at| at - now);

            status.insert(format!("{prefix}_size"), json!(queue.size()?));
            status.insert(format!("{prefix}_lag"), json!(queue.lag()?.as_secs_f64()));
            status.insert(format!("{prefix}_next_sync"), json!(next_sync));
        }

        Ok(Value::Object(status))
    }
}
