//! The sync orchestration surface.

use crate::collaborators::{
    FullSyncScheduler, ReplicaStore, SettingsStore, SyncModules, SyncSender, Unconfigured,
};
use crate::hooks::HookRegistry;
use crate::schedule::StoreFullSyncScheduler;
use crate::settings::StoreSettings;
use crate::{error_codes, EndpointError, EndpointResult, Method, Request, Response};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use sync_codec::{codec_by_name, Codec, CodecError, DeflateJsonArrayCodec};
use sync_config_and_utils::{
    Config, DEFAULT_CHECKOUT_BACKOFF_MS, DEFAULT_CHECKOUT_BUDGET_MS, DEFAULT_LOCK_TIMEOUT_SECS,
};
use sync_queue::{Queue, DEFAULT_CHECKOUT_SIZE, DEFAULT_LOCK_TTL};
use sync_queue_store::ItemStore;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// The incremental sync queue.
pub const SYNC_QUEUE: &str = "sync";

/// The full-sync queue.
pub const FULL_SYNC_QUEUE: &str = "full_sync";

/// Queue names remote callers may address.
pub const ALLOWED_QUEUES: [&str; 2] = [SYNC_QUEUE, FULL_SYNC_QUEUE];

/// Tunables for the endpoints.
#[derive(Clone)]
pub struct EndpointConfig {
    /// Items per checkout when the caller gives no size.
    pub checkout_size: usize,
    /// How long a contested checkout keeps retrying.
    pub checkout_budget: Duration,
    /// Pause between contested checkout attempts.
    pub checkout_backoff: Duration,
    /// Wait for the sync queue lock during consistency checks.
    pub lock_timeout: Duration,
    pub lock_ttl: Duration,
    /// Codec for encoded checkouts and object fetches.
    pub codec: Arc<dyn Codec>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            checkout_size: DEFAULT_CHECKOUT_SIZE,
            checkout_budget: Duration::from_millis(DEFAULT_CHECKOUT_BUDGET_MS),
            checkout_backoff: Duration::from_millis(DEFAULT_CHECKOUT_BACKOFF_MS),
            lock_timeout: Duration::from_secs(DEFAULT_LOCK_TIMEOUT_SECS),
            lock_ttl: DEFAULT_LOCK_TTL,
            codec: Arc::new(DeflateJsonArrayCodec::default()),
        }
    }
}

impl EndpointConfig {
    pub fn from_config(config: &Config) -> EndpointResult<Self> {
        let codec = codec_by_name(&config.codec)
            .ok_or_else(|| CodecError::UnknownCodec(config.codec.clone()))?;
        Ok(Self {
            checkout_size: config.checkout_size,
            checkout_budget: config.checkout_budget(),
            checkout_backoff: config.checkout_backoff(),
            lock_timeout: config.lock_timeout(),
            lock_ttl: config.lock_ttl(),
            codec,
        })
    }
}

/// Per-request context.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestContext {
    /// The caller gives up at this instant; retry loops stop early.
    pub deadline: Option<Instant>,
}

impl RequestContext {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
        }
    }
}

/// Drives queues, hooks and codec on behalf of remote requests.
///
/// Holds no coordination state of its own; any number of instances may
/// serve the same store.
pub struct SyncEndpoints {
    pub(crate) store: Arc<dyn ItemStore>,
    pub(crate) config: EndpointConfig,
    pub(crate) hooks: HookRegistry,
    pub(crate) scheduler: Arc<dyn FullSyncScheduler>,
    pub(crate) replica: Arc<dyn ReplicaStore>,
    pub(crate) sender: Arc<dyn SyncSender>,
    pub(crate) modules: Arc<dyn SyncModules>,
    pub(crate) settings: Arc<dyn SettingsStore>,
}

impl SyncEndpoints {
    /// Endpoints over `store` with store-backed settings and scheduling.
    ///
    /// Replica, sender and modules start [`Unconfigured`].
    pub fn new(store: Arc<dyn ItemStore>, config: EndpointConfig) -> Self {
        Self {
            scheduler: Arc::new(StoreFullSyncScheduler::new(store.clone())),
            settings: Arc::new(StoreSettings::new(store.clone())),
            replica: Arc::new(Unconfigured),
            sender: Arc::new(Unconfigured),
            modules: Arc::new(Unconfigured),
            hooks: HookRegistry::new(),
            store,
            config,
        }
    }

    pub fn with_hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn FullSyncScheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_replica(mut self, replica: Arc<dyn ReplicaStore>) -> Self {
        self.replica = replica;
        self
    }

    pub fn with_sender(mut self, sender: Arc<dyn SyncSender>) -> Self {
        self.sender = sender;
        self
    }

    pub fn with_modules(mut self, modules: Arc<dyn SyncModules>) -> Self {
        self.modules = modules;
        self
    }

    pub fn with_settings_store(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = settings;
        self
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    pub fn hooks_mut(&mut self) -> &mut HookRegistry {
        &mut self.hooks
    }

    /// A queue handle configured for these endpoints.
    pub fn queue(&self, name: &str) -> EndpointResult<Queue> {
        Ok(Queue::new(name, self.store.clone())?
            .with_checkout_size(self.config.checkout_size)?
            .with_lock_ttl(self.config.lock_ttl))
    }

    /// Handle one request. Never fails: errors become error responses.
    pub async fn handle(&self, request: Request, ctx: &RequestContext) -> Response {
        let id = request.id.clone();
        let method = request.method;
        debug!(request_id = %id, method = method.as_str(), "Handling request");

        match self.dispatch(request, ctx).await {
            Ok(result) => Response::success(&id, result),
            Err(e) => {
                if e.code() == error_codes::INTERNAL_ERROR {
                    error!(request_id = %id, method = method.as_str(), error = %e, "Request failed");
                } else {
                    warn!(request_id = %id, method = method.as_str(), kind = e.kind(), error = %e, "Request rejected");
                }
                Response::error_with_data(&id, e.code(), &e.to_string(), json!({ "kind": e.kind() }))
            }
        }
    }

    /// Handle one raw JSON request line.
    pub async fn handle_json(&self, raw: &str, ctx: &RequestContext) -> Response {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                return Response::error(
                    "",
                    error_codes::PARSE_ERROR,
                    &format!("Invalid JSON: {e}"),
                )
            }
        };

        let id = value
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let method = value.get("method").and_then(Value::as_str).unwrap_or_default();
        if Method::from_name(method).is_none() {
            return Response::error(
                &id,
                error_codes::METHOD_NOT_FOUND,
                &format!("Unknown method: {method:?}"),
            );
        }

        match serde_json::from_value::<Request>(value) {
            Ok(request) => self.handle(request, ctx).await,
            Err(e) => Response::error(
                &id,
                error_codes::INVALID_REQUEST,
                &format!("Invalid request: {e}"),
            ),
        }
    }

    async fn dispatch(&self, request: Request, ctx: &RequestContext) -> EndpointResult<Value> {
        let params = request.params;
        match request.method {
            Method::Schedule => self.schedule(parse_params(params)?),
            Method::Status => self.status(),
            Method::Checkout => {
                let response = self.checkout(parse_params(params)?, ctx).await?;
                Ok(serde_json::to_value(response)?)
            }
            Method::Close => self.close(parse_params(params)?),
            Method::Check => self.check().await,
            Method::Histogram => self.histogram(parse_params(params)?).await,
            Method::SettingsGet => self.get_settings(),
            Method::SettingsSet => self.set_settings(params.unwrap_or(Value::Null)),
            Method::Object => self.object(parse_params(params)?),
            Method::Now => self.sync_now(parse_params(params)?),
        }
    }
}

/// Check a caller-supplied queue name against [`ALLOWED_QUEUES`].
pub fn validate_queue(name: Option<&str>) -> EndpointResult<&'static str> {
    let Some(name) = name else {
        return Err(EndpointError::InvalidQueueName(
            "Queue name is required".to_string(),
        ));
    };
    ALLOWED_QUEUES
        .into_iter()
        .find(|allowed| *allowed == name)
        .ok_or_else(|| {
            EndpointError::InvalidQueueName(format!(
                "Queue name should be sync or full_sync, got {name:?}"
            ))
        })
}

/// Decode method params, treating absent params as an empty object.
pub(crate) fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> EndpointResult<T> {
    let params = match params {
        None | Some(Value::Null) => json!({}),
        Some(params) => params,
    };
    serde_json::from_value(params).map_err(|e| EndpointError::InvalidArgument(e.to_string()))
}

/// Wall-clock seconds with microsecond precision.
pub(crate) fn server_microtime() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list() {
        assert_eq!(validate_queue(Some("sync")).unwrap(), "sync");
        assert_eq!(validate_queue(Some("full_sync")).unwrap(), "full_sync");

        for bad in [None, Some(""), Some("other"), Some("sync-checkout")] {
            let err = validate_queue(bad).unwrap_err();
            assert_eq!(err.kind(), "invalid_queue_name");
        }
    }

    #[test]
    fn config_from_file_settings() {
        let config = Config {
            codec: "identity".to_string(),
            checkout_size: 4,
            checkout_budget_ms: 100,
            ..Config::default()
        };
        let endpoint_config = EndpointConfig::from_config(&config).unwrap();
        assert_eq!(endpoint_config.codec.name(), "identity");
        assert_eq!(endpoint_config.checkout_size, 4);
        assert_eq!(endpoint_config.checkout_budget, Duration::from_millis(100));

        let bad = Config {
            codec: "zip".to_string(),
            ..Config::default()
        };
        let err = EndpointConfig::from_config(&bad).err().unwrap();
        assert_eq!(err.kind(), "unknown_codec");
    }

    #[test]
    fn params_default_to_empty_object() {
        #[derive(serde::Deserialize, Debug)]
        struct P {
            #[serde(default)]
            queue: Option<String>,
        }
        let p: P = parse_params(None).unwrap();
        assert!(p.queue.is_none());
        let err = parse_params::<P>(Some(json!({"queue": 5}))).unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
    }
}
