//! Codec trait and the JSON codec used for `request_data`.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! The game server only speaks JSON, but keeping the [`Codec`] trait at this
//! seam lets tests and tools swap in a recording codec without touching the
//! client.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because the codec lives inside the client for
/// the client's whole lifetime.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] producing the exact JSON the game client sends.
///
/// The output is compact (no whitespace between tokens) and UTF-8 with
/// non-ASCII characters left unescaped, which is what `serde_json` emits by
/// default. Object keys keep insertion order.
///
/// ```rust
/// use sifemu_protocol::{Codec, JsonCodec, RequestShape, CallKind};
///
/// let envelope = RequestShape::single("user", "changeName")
///     .into_envelope(CallKind::Batched)
///     .stamp(1, None);
///
/// let bytes = JsonCodec.encode(&envelope).unwrap();
/// assert_eq!(
///     bytes,
///     br#"{"module":"user","action":"changeName","timeStamp":1}"#
/// );
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_encode_leaves_non_ascii_unescaped() {
        let bytes = JsonCodec.encode(&json!({ "name": "学院生" })).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), r#"{"name":"学院生"}"#);
    }

    #[test]
    fn test_decode_malformed_returns_decode_error() {
        let result: Result<serde_json::Value, _> = JsonCodec.decode(b"{oops");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
