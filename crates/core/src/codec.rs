//! Pluggable message codec.
//!
//! The wire format (§4.1) is codec-independent: a length prefix followed by
//! a payload encoded however the selected codec likes. This keeps the
//! framing layer from leaking a particular serializer into the protocol
//! contract.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::ProtocolError;

/// A named, swappable message encoder/decoder.
pub trait Codec: Send + Sync {
    /// Codec name as advertised in runtime metadata and handshake replies.
    fn name(&self) -> &'static str;

    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, ProtocolError>;
}

/// The only codec implemented so far. Requesting anything besides the
/// default is a configuration error surfaced up front rather than attempted
/// on the wire.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(|e| ProtocolError::Codec(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(bytes).map_err(|e| ProtocolError::Codec(e.to_string()))
    }
}

/// Resolve a codec by name, rejecting anything not implemented.
///
/// `"msgpack"` is recognized but rejected with a dedicated "not implemented"
/// message rather than falling through to the generic unknown-codec error.
pub fn get_codec(name: &str) -> Result<JsonCodec, ProtocolError> {
    match name {
        "json" => Ok(JsonCodec),
        "msgpack" => Err(ProtocolError::Codec(
            "msgpack codec is not yet implemented".to_string(),
        )),
        other => Err(ProtocolError::Codec(format!("unknown codec: {other}"))),
    }
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
