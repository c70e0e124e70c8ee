//! Transport codecs for queue payloads.
//!
//! A codec turns a JSON value (one item or a whole batch) into a
//! transport-safe string and back. Every codec declares a stable
//! [`name`](Codec::name) so the receiving side can pick the matching decoder.
//!
//! - [`IdentityCodec`] (`identity`): plain JSON text
//! - [`DeflateJsonArrayCodec`] (`deflate-json-array`): JSON, raw deflate, base64

mod codec;
mod deflate;
mod error;

pub use codec::{codec_by_name, Codec, IdentityCodec, DEFAULT_CODEC};
pub use deflate::DeflateJsonArrayCodec;
pub use error::{CodecError, CodecResult};
