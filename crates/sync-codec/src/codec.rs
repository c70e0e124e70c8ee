//! The codec trait and lookup.

use crate::{CodecError, CodecResult, DeflateJsonArrayCodec};
use serde_json::Value;
use std::sync::Arc;

/// Name of the codec used when none is configured.
pub const DEFAULT_CODEC: &str = DeflateJsonArrayCodec::NAME;

/// A named, reversible encoding of JSON values.
pub trait Codec: Send + Sync {
    /// Stable name sent alongside encoded payloads.
    fn name(&self) -> &'static str;

    fn encode(&self, value: &Value) -> CodecResult<String>;

    /// Inverse of [`encode`](Codec::encode). Fails with a decode error on
    /// input this codec did not produce.
    fn decode(&self, encoded: &str) -> CodecResult<Value>;
}

/// No transformation beyond JSON text. For debugging and small payloads.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityCodec;

impl IdentityCodec {
    pub const NAME: &'static str = "identity";
}

impl Codec for IdentityCodec {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn encode(&self, value: &Value) -> CodecResult<String> {
        serde_json::to_string(value).map_err(|e| CodecError::encode(Self::NAME, e))
    }

    fn decode(&self, encoded: &str) -> CodecResult<Value> {
        serde_json::from_str(encoded).map_err(|e| CodecError::decode(Self::NAME, e))
    }
}

/// Look a codec up by its declared name.
pub fn codec_by_name(name: &str) -> Option<Arc<dyn Codec>> {
    match name {
        IdentityCodec::NAME => Some(Arc::new(IdentityCodec)),
        DeflateJsonArrayCodec::NAME => Some(Arc::new(DeflateJsonArrayCodec::default())),
        _ => None,
    }
}
