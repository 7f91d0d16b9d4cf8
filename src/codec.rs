//! Codec Module
//!
//! Turns payload values into bytes and back. Every backend owns a codec
//! instance explicitly (no global serializer state); [`JsonCodec`] is the
//! stateless default.

use serde_json::Value;

use crate::error::Result;

// == Codec Trait ==
/// Encodes and decodes cache payloads.
///
/// Implementations must round-trip exactly for every value the cache ever
/// stores, including negative numbers and `null`.
pub trait Codec: Send + Sync {
    /// Encodes a value into bytes for storage.
    fn encode(&self, value: &Value) -> Result<Vec<u8>>;

    /// Decodes stored bytes back into a value.
    fn decode(&self, data: &[u8]) -> Result<Value>;
}

// == JSON Codec ==
/// Compact JSON codec.
///
/// Integers serialize as plain decimal text (`5` -> `b"5"`), which lets the
/// Redis backend run native `INCRBY` directly against the stored bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode(&self, data: &[u8]) -> Result<Value> {
        Ok(serde_json::from_slice(data)?)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_trip_scalars() {
        let codec = JsonCodec;
        for value in [
            json!(null),
            json!(true),
            json!(0),
            json!(-42),
            json!(i64::MAX),
            json!("hello"),
            json!(1.5),
        ] {
            let bytes = codec.encode(&value).unwrap();
            assert_eq!(codec.decode(&bytes).unwrap(), value);
        }
    }

    #[test]
    fn test_round_trip_compound() {
        let codec = JsonCodec;
        let value = json!({"a": [1, 2, 3], "b": {"nested": null}});
        let bytes = codec.encode(&value).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), value);
    }

    #[test]
    fn test_integers_encode_as_decimal_text() {
        let codec = JsonCodec;
        assert_eq!(codec.encode(&json!(5)).unwrap(), b"5");
        assert_eq!(codec.encode(&json!(-17)).unwrap(), b"-17");
    }

    #[test]
    fn test_decode_garbage_fails() {
        let codec = JsonCodec;
        assert!(codec.decode(b"\xff\xfe not json").is_err());
    }
}
