//! Wire codecs.
//!
//! Messages go over the wire either as JSON text or as MessagePack. The
//! format is chosen once per server; both sides of a connection must agree.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::NetError;

/// Encode a value to MessagePack bytes.
///
/// Structs are written as maps so field names survive on the wire.
///
/// # Errors
///
/// Returns [`NetError::Encode`] if serialisation fails.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, NetError> {
    rmp_serde::to_vec_named(value).map_err(NetError::Encode)
}

/// Decode a value from MessagePack bytes.
///
/// # Errors
///
/// Returns [`NetError::Decode`] if deserialisation fails.
pub fn decode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, NetError> {
    rmp_serde::from_slice(bytes).map_err(NetError::Decode)
}

/// Payload encoding used on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    #[default]
    Json,
    MessagePack,
}

impl WireFormat {
    /// Encode `value` in this format.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Json`] or [`NetError::Encode`] if serialisation
    /// fails.
    pub fn encode<T: Serialize>(self, value: &T) -> Result<Vec<u8>, NetError> {
        match self {
            WireFormat::Json => Ok(serde_json::to_vec(value)?),
            WireFormat::MessagePack => encode(value),
        }
    }

    /// Decode a value from bytes in this format.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Json`] or [`NetError::Decode`] if the bytes do
    /// not hold a `T`.
    pub fn decode<T: DeserializeOwned>(self, bytes: &[u8]) -> Result<T, NetError> {
        match self {
            WireFormat::Json => Ok(serde_json::from_slice(bytes)?),
            WireFormat::MessagePack => decode(bytes),
        }
    }
}

impl std::fmt::Display for WireFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WireFormat::Json => f.write_str("json"),
            WireFormat::MessagePack => f.write_str("message_pack"),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    #[test]
    fn test_json_is_text() {
        let bytes = WireFormat::Json.encode(&json!({"type": "movement"})).unwrap();
        assert_eq!(std::str::from_utf8(&bytes).unwrap(), r#"{"type":"movement"}"#);
    }

    #[test]
    fn test_message_pack_keeps_field_names() {
        #[derive(Serialize)]
        struct Shot {
            angle: f32,
        }
        let bytes = WireFormat::MessagePack.encode(&Shot { angle: 1.5 }).unwrap();
        let value: Value = WireFormat::MessagePack.decode(&bytes).unwrap();
        assert_eq!(value, json!({"angle": 1.5}));
    }

    #[test]
    fn test_decode_invalid_bytes() {
        assert!(matches!(
            WireFormat::MessagePack.decode::<Value>(&[0xC1]),
            Err(NetError::Decode(_))
        ));
        assert!(matches!(
            WireFormat::Json.decode::<Value>(b"{not json"),
            Err(NetError::Json(_))
        ));
    }
}
