//! `sync.object` and `sync.now`.

use crate::endpoints::{validate_queue, SyncEndpoints};
use crate::{EndpointError, EndpointResult};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

/// `sync.object` params.
#[derive(Debug, Default, Deserialize)]
pub struct ObjectParams {
    #[serde(default)]
    pub module_name: Option<String>,
    #[serde(default)]
    pub object_type: Option<String>,
    #[serde(default)]
    pub object_ids: Option<Vec<Value>>,
}

/// `sync.now` params.
#[derive(Debug, Default, Deserialize)]
pub struct NowParams {
    #[serde(default)]
    pub queue: Option<String>,
}

impl SyncEndpoints {
    /// Fetch objects by id from a sync module; the result is codec-encoded.
    pub fn object(&self, params: ObjectParams) -> EndpointResult<Value> {
        let module = params
            .module_name
            .ok_or_else(|| EndpointError::MissingArgument("module_name".to_string()))?;
        let object_type = params
            .object_type
            .ok_or_else(|| EndpointError::MissingArgument("object_type".to_string()))?;
        let ids = params.object_ids.unwrap_or_default();

        let objects = self
            .modules
            .get_objects_by_id(&module, &object_type, &ids)?
            .ok_or_else(|| EndpointError::InvalidModule(module.clone()))?;

        Ok(json!({ "objects": self.config.codec.encode(&objects)? }))
    }

    /// Run one send cycle for a queue right away.
    pub fn sync_now(&self, params: NowParams) -> EndpointResult<Value> {
        let queue_name = validate_queue(params.queue.as_deref())?;
        let queue = self.queue(queue_name)?;
        let response = self.sender.do_sync_for_queue(&queue)?;
        info!(queue = queue_name, "Ran immediate sync");
        Ok(json!({ "response": response }))
    }
}
