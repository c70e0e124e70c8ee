//! Deflate-compressed JSON codec.

use crate::{Codec, CodecError, CodecResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use serde_json::Value;
use std::io::{Read, Write};
use tracing::trace;

/// JSON text, raw-deflate compressed, then base64 (standard alphabet).
#[derive(Debug, Clone, Copy)]
pub struct DeflateJsonArrayCodec {
    level: Compression,
}

impl DeflateJsonArrayCodec {
    pub const NAME: &'static str = "deflate-json-array";

    pub fn with_level(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }
}

impl Default for DeflateJsonArrayCodec {
    fn default() -> Self {
        Self {
            level: Compression::default(),
        }
    }
}

impl Codec for DeflateJsonArrayCodec {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn encode(&self, value: &Value) -> CodecResult<String> {
        let json = serde_json::to_vec(value).map_err(|e| CodecError::encode(Self::NAME, e))?;

        let mut encoder = DeflateEncoder::new(Vec::with_capacity(json.len() / 2), self.level);
        encoder
            .write_all(&json)
            .map_err(|e| CodecError::encode(Self::NAME, e))?;
        let compressed = encoder
            .finish()
            .map_err(|e| CodecError::encode(Self::NAME, e))?;

        trace!(raw = json.len(), compressed = compressed.len(), "Deflated payload");
        Ok(STANDARD.encode(compressed))
    }

    fn decode(&self, encoded: &str) -> CodecResult<Value> {
        let compressed = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CodecError::decode(Self::NAME, e))?;

        let mut json = Vec::new();
        DeflateDecoder::new(compressed.as_slice())
            .read_to_end(&mut json)
            .map_err(|e| CodecError::decode(Self::NAME, e))?;

        serde_json::from_slice(&json).map_err(|e| CodecError::decode(Self::NAME, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_a_batch() {
        let codec = DeflateJsonArrayCodec::default();
        let batch = json!({
            "sync-0000000001.000000000-1.1": ["save_post", [1, {"post_title": "Hello", "tags": ["a", "b"]}], 7, "1700000000.123456", false],
            "sync-0000000001.000000001-1.2": ["deleted_post", [2], 7, "1700000000.223456", false],
            "sync-0000000001.000000002-1.3": ["unicode", ["ünïcødé ✓", null, 3.5]],
        });

        let encoded = codec.encode(&batch).unwrap();
        assert!(encoded
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '='));
        assert_eq!(codec.decode(&encoded).unwrap(), batch);
    }

    #[test]
    fn compresses_repetitive_payloads() {
        let codec = DeflateJsonArrayCodec::default();
        let value = json!(vec!["jetpack_sync_save_post"; 200]);
        let encoded = codec.encode(&value).unwrap();
        assert!(encoded.len() < value.to_string().len() / 4);
    }

    #[test]
    fn levels_are_interchangeable_for_decoding() {
        let value = json!([1, 2, 3, "x"]);
        let fast = DeflateJsonArrayCodec::with_level(1).encode(&value).unwrap();
        assert_eq!(DeflateJsonArrayCodec::with_level(9).decode(&fast).unwrap(), value);
    }

    #[test]
    fn malformed_input_is_a_decode_error() {
        let codec = DeflateJsonArrayCodec::default();

        // not base64
        let err = codec.decode("***").unwrap_err();
        assert_eq!(err.kind(), "decode_error");

        // base64 but not deflate
        let err = codec.decode(&STANDARD.encode([0xff, 0xfe, 0xfd])).unwrap_err();
        assert_eq!(err.kind(), "decode_error");

        // deflate but not JSON
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"{oops").unwrap();
        let not_json = STANDARD.encode(encoder.finish().unwrap());
        let err = codec.decode(&not_json).unwrap_err();
        assert!(matches!(err, CodecError::Decode { .. }));
    }
}
