//! Request/response types for the sync endpoints.
//!
//! Messages are JSON objects shaped like JSON-RPC:
//!
//! ```json
//! {"id": "1", "method": "sync.checkout", "params": {"queue": "sync"}}
//! {"id": "1", "result": {"buffer_id": "...", "items": {...}}}
//! {"id": "1", "error": {"code": -32004, "message": "...", "data": {"kind": "buffer_busy"}}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Endpoint methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    /// Schedule a full sync
    #[serde(rename = "sync.schedule")]
    Schedule,
    /// Queue health and full-sync status
    #[serde(rename = "sync.status")]
    Status,
    /// Check out the next batch of a queue
    #[serde(rename = "sync.checkout")]
    Checkout,
    /// Delete confirmed items and release the buffer
    #[serde(rename = "sync.close")]
    Close,
    /// Lock the sync queue and checksum the replica
    #[serde(rename = "sync.check")]
    Check,
    /// Lock the sync queue and build a checksum histogram
    #[serde(rename = "sync.histogram")]
    Histogram,
    #[serde(rename = "sync.settings.get")]
    SettingsGet,
    #[serde(rename = "sync.settings.set")]
    SettingsSet,
    /// Fetch objects from a sync module, codec-encoded
    #[serde(rename = "sync.object")]
    Object,
    /// Ask the sender to sync a queue immediately
    #[serde(rename = "sync.now")]
    Now,
}

impl Method {
    /// All methods, in documentation order.
    pub const ALL: [Method; 10] = [
        Method::Schedule,
        Method::Status,
        Method::Checkout,
        Method::Close,
        Method::Check,
        Method::Histogram,
        Method::SettingsGet,
        Method::SettingsSet,
        Method::Object,
        Method::Now,
    ];

    /// Wire name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Schedule => "sync.schedule",
            Method::Status => "sync.status",
            Method::Checkout => "sync.checkout",
            Method::Close => "sync.close",
            Method::Check => "sync.check",
            Method::Histogram => "sync.histogram",
            Method::SettingsGet => "sync.settings.get",
            Method::SettingsSet => "sync.settings.set",
            Method::Object => "sync.object",
            Method::Now => "sync.now",
        }
    }

    pub fn from_name(name: &str) -> Option<Method> {
        Method::ALL.into_iter().find(|m| m.as_str() == name)
    }
}

/// One call: `{"id", "method", "params"?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Echoed back in the response.
    pub id: String,
    pub method: Method,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    /// A request with a fresh UUID and no params.
    pub fn new(method: Method) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            method,
            params: None,
        }
    }

    pub fn with_params(method: Method, params: Value) -> Self {
        Self {
            params: Some(params),
            ..Self::new(method)
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// Reply to a [`Request`]; exactly one of `result` and `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// One of [`error_codes`].
    pub code: i32,
    pub message: String,
    /// Carries `{"kind": ...}` for endpoint errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Response {
    pub fn success(id: &str, result: Value) -> Self {
        Self {
            id: id.to_owned(),
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: &str, code: i32, message: &str) -> Self {
        Self::failure(id, code, message, None)
    }

    pub fn error_with_data(id: &str, code: i32, message: &str, data: Value) -> Self {
        Self::failure(id, code, message, Some(data))
    }

    fn failure(id: &str, code: i32, message: &str, data: Option<Value>) -> Self {
        Self {
            id: id.to_owned(),
            result: None,
            error: Some(ErrorInfo {
                code,
                message: message.to_owned(),
                data,
            }),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// The `data.kind` of an error response.
    pub fn error_kind(&self) -> Option<&str> {
        self.error.as_ref()?.data.as_ref()?.get("kind")?.as_str()
    }
}

/// Response error codes. The first five follow JSON-RPC; the rest are
/// sync-specific.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Buffer ownership check failed
    pub const CONFLICT: i32 = -32003;
    pub const BUFFER_BUSY: i32 = -32004;
    pub const LOCK_TIMEOUT: i32 = -32005;
}
