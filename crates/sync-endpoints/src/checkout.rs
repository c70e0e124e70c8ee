//! `sync.checkout`: hand the oldest items of a queue to the remote side.

use crate::endpoints::{server_microtime, validate_queue, RequestContext, SyncEndpoints};
use crate::{EndpointError, EndpointResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sync_codec::Codec;
use sync_queue::{Buffer, Queue, QueueError};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// `sync.checkout` params.
#[derive(Debug, Default, Deserialize)]
pub struct CheckoutParams {
    #[serde(default)]
    pub queue: Option<String>,
    #[serde(default)]
    pub number_of_items: Option<i64>,
    /// Release an abandoned buffer before checking out.
    #[serde(default)]
    pub force: bool,
    /// Encode each item with the configured codec.
    #[serde(default)]
    pub encode: bool,
}

/// `sync.checkout` result.
///
/// `buffer_id` is `null` when the queue was empty. `items` maps item ids to
/// payloads in queue order; vetoed items are listed in `skipped_items`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub buffer_id: Option<String>,
    pub items: Map<String, Value>,
    pub skipped_items: Vec<String>,
    /// Codec name when `encode` was requested.
    pub codec: Option<String>,
    pub server_microtime: f64,
}

impl SyncEndpoints {
    pub async fn checkout(
        &self,
        params: CheckoutParams,
        ctx: &RequestContext,
    ) -> EndpointResult<CheckoutResponse> {
        let queue_name = validate_queue(params.queue.as_deref())?;
        let number_of_items = match params.number_of_items {
            None => None,
            Some(n) if n < 1 => {
                return Err(EndpointError::InvalidArgument(
                    "number_of_items must be an integer larger than 0".to_string(),
                ))
            }
            Some(n) => Some(usize::try_from(n).map_err(|_| {
                EndpointError::InvalidArgument(format!("number_of_items out of range: {n}"))
            })?),
        };

        let queue = self.queue(queue_name)?;
        if params.force {
            queue.force_checkin()?;
        }
        let codec = params.encode.then(|| self.config.codec.clone());

        let mut response = CheckoutResponse {
            buffer_id: None,
            items: Map::new(),
            skipped_items: Vec::new(),
            codec: codec.as_ref().map(|c| c.name().to_string()),
            server_microtime: 0.0,
        };

        if let Some(buffer) = self.acquire_buffer(&queue, number_of_items, ctx).await? {
            let buffer_id = buffer.id().to_string();
            if let Err(e) = self.fill_response(&mut response, buffer, codec.as_deref()) {
                // Release the buffer so the items are not stranded until force.
                if let Err(checkin_err) = queue.checkin(&Buffer::from_id(buffer_id.as_str())) {
                    warn!(queue = queue_name, error = %checkin_err, "Failed to release buffer after encode failure");
                }
                return Err(e);
            }
            info!(
                queue = queue_name,
                buffer_id = %buffer_id,
                items = response.items.len(),
                skipped = response.skipped_items.len(),
                "Checked out buffer"
            );
            response.buffer_id = Some(buffer_id);
        }

        response.server_microtime = server_microtime();
        Ok(response)
    }

    fn fill_response(
        &self,
        response: &mut CheckoutResponse,
        buffer: Buffer,
        codec: Option<&dyn Codec>,
    ) -> EndpointResult<()> {
        for item in buffer.into_items() {
            let Some(value) = self.hooks.apply(item.value) else {
                response.skipped_items.push(item.id);
                continue;
            };
            let payload = match codec {
                Some(codec) => Value::String(codec.encode(&value)?),
                None => value,
            };
            response.items.insert(item.id, payload);
        }
        Ok(())
    }

    /// Check out a buffer, retrying while another consumer holds one or the
    /// queue is locked.
    ///
    /// Gives up with `BufferBusy` once the checkout budget (or the request
    /// deadline, if sooner) has passed.
    async fn acquire_buffer(
        &self,
        queue: &Queue,
        number_of_items: Option<usize>,
        ctx: &RequestContext,
    ) -> EndpointResult<Option<Buffer>> {
        let mut deadline = Instant::now() + self.config.checkout_budget;
        if let Some(request_deadline) = ctx.deadline {
            deadline = deadline.min(request_deadline);
        }

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            if queue.is_locked()? {
                debug!(queue = queue.name(), attempts, "Queue locked, checkout waits");
            } else {
                match queue.checkout(number_of_items) {
                    Ok(buffer) => return Ok(buffer),
                    Err(QueueError::AlreadyCheckedOut { .. }) => {
                        debug!(queue = queue.name(), attempts, "Buffer held elsewhere, checkout waits");
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(queue = queue.name(), attempts, "Checkout stayed contested, giving up");
                return Err(EndpointError::BufferBusy {
                    queue: queue.name().to_string(),
                });
            }
            sleep(self.config.checkout_backoff.min(deadline - now)).await;
        }
    }
}
