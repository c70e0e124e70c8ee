//! `sync.check` and `sync.histogram`: checksums taken with the sync queue
//! locked so no new changes land mid-scan.

use crate::collaborators::HistogramQuery;
use crate::endpoints::{SyncEndpoints, SYNC_QUEUE};
use crate::{EndpointError, EndpointResult};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use sync_queue::Queue;
use tracing::{debug, warn};

/// Holds a queue's whole-queue lock; unlocks on drop.
pub struct QueueLockGuard<'a> {
    queue: &'a Queue,
}

impl<'a> QueueLockGuard<'a> {
    /// Wait up to `timeout` for the lock.
    ///
    /// On failure the lock is cleared anyway so a crashed holder cannot
    /// block checks for a whole TTL. This can also release a live holder's
    /// lock.
    pub async fn acquire(queue: &'a Queue, timeout: Duration) -> EndpointResult<Self> {
        match queue.lock(timeout).await {
            Ok(()) => {
                debug!(queue = queue.name(), "Queue locked for consistency check");
                Ok(Self { queue })
            }
            Err(e) => {
                if let Err(unlock_err) = queue.unlock() {
                    warn!(queue = queue.name(), error = %unlock_err, "Failed to clear lock after timeout");
                }
                Err(e.into())
            }
        }
    }
}

impl Drop for QueueLockGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.queue.unlock() {
            warn!(queue = self.queue.name(), error = %e, "Failed to unlock queue");
        }
    }
}

/// `sync.histogram` params.
#[derive(Debug, Default, Deserialize)]
pub struct HistogramParams {
    #[serde(default)]
    pub object_type: Option<String>,
    #[serde(default)]
    pub buckets: Option<u32>,
    #[serde(default)]
    pub start_id: Option<i64>,
    #[serde(default)]
    pub end_id: Option<i64>,
    /// Comma-separated column list.
    #[serde(default)]
    pub columns: Option<String>,
}

impl HistogramParams {
    pub fn into_query(self) -> EndpointResult<HistogramQuery> {
        let object_type = self
            .object_type
            .filter(|t| !t.is_empty())
            .ok_or_else(|| EndpointError::MissingArgument("object_type".to_string()))?;
        if self.buckets == Some(0) {
            return Err(EndpointError::InvalidArgument(
                "buckets must be at least 1".to_string(),
            ));
        }
        let columns = self
            .columns
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|columns| !columns.is_empty());

        Ok(HistogramQuery {
            object_type,
            buckets: self.buckets,
            start_id: self.start_id,
            end_id: self.end_id,
            columns,
        })
    }
}

impl SyncEndpoints {
    pub async fn check(&self) -> EndpointResult<Value> {
        let queue = self.queue(SYNC_QUEUE)?;
        let _guard = QueueLockGuard::acquire(&queue, self.config.lock_timeout).await?;
        self.replica.checksum_all()
    }

    pub async fn histogram(&self, params: HistogramParams) -> EndpointResult<Value> {
        let query = params.into_query()?;
        let queue = self.queue(SYNC_QUEUE)?;
        let _guard = QueueLockGuard::acquire(&queue, self.config.lock_timeout).await?;
        self.replica.checksum_histogram(&query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_params() {
        let query = HistogramParams {
            object_type: Some("posts".into()),
            buckets: Some(4),
            columns: Some("ID, post_modified,".into()),
            ..HistogramParams::default()
        }
        .into_query()
        .unwrap();
        assert_eq!(query.object_type, "posts");
        assert_eq!(
            query.columns,
            Some(vec!["ID".to_string(), "post_modified".to_string()])
        );

        let err = HistogramParams::default().into_query().unwrap_err();
        assert_eq!(err.kind(), "missing_argument");

        let err = HistogramParams {
            object_type: Some("posts".into()),
            buckets: Some(0),
            ..HistogramParams::default()
        }
        .into_query()
        .unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
    }
}
