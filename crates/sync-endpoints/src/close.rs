//! `sync.close`: delete confirmed items and release the buffer.

use crate::endpoints::{validate_queue, SyncEndpoints};
use crate::{EndpointError, EndpointResult};
use serde::Deserialize;
use serde_json::{json, Value};
use sync_queue::Buffer;
use tracing::info;

/// `sync.close` params.
#[derive(Debug, Default, Deserialize)]
pub struct CloseParams {
    #[serde(default)]
    pub queue: Option<String>,
    #[serde(default)]
    pub buffer_id: Option<String>,
    /// Ids the remote side confirmed; may be empty.
    #[serde(default)]
    pub item_ids: Option<Vec<String>>,
}

impl SyncEndpoints {
    pub fn close(&self, params: CloseParams) -> EndpointResult<Value> {
        let queue_name = validate_queue(params.queue.as_deref())?;
        let buffer_id = params
            .buffer_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| EndpointError::MissingArgument("buffer_id".to_string()))?;
        let item_ids = params
            .item_ids
            .ok_or_else(|| EndpointError::MissingArgument("item_ids".to_string()))?;

        let queue = self.queue(queue_name)?;
        let deleted = queue.close(&Buffer::from_id(buffer_id.as_str()), &item_ids)?;
        info!(queue = queue_name, buffer_id = %buffer_id, deleted, "Closed buffer");

        Ok(json!({ "success": true }))
    }
}
