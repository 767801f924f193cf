//! Codec trait and the JSON implementation.
//!
//! The gateway and the connection handler only ever see envelopes; how
//! those become bytes is a [`Codec`]'s job. Browser clients speak JSON,
//! so [`JsonCodec`] is the only implementation today.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Encodes values to bytes and decodes bytes back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// [`ProtocolError::Encode`] if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes into a value.
    ///
    /// # Errors
    /// [`ProtocolError::Decode`] if the bytes are malformed or do not match `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Like [`encode`](Self::encode) but for text frames.
    ///
    /// # Errors
    /// [`ProtocolError::Encode`] if the value cannot be represented, or
    /// [`ProtocolError::InvalidMessage`] if the codec is not text based.
    fn encode_text<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        let bytes = self.encode(value)?;
        String::from_utf8(bytes)
            .map_err(|_| ProtocolError::InvalidMessage("codec produced non-UTF-8 output".into()))
    }
}

/// A [`Codec`] backed by `serde_json`.
///
/// ```rust
/// use pickban_protocol::{ClientEnvelope, ClientRequest, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let frame = ClientEnvelope { seq: 1, request: ClientRequest::GetTeams };
/// let bytes = codec.encode(&frame).unwrap();
/// let decoded: ClientEnvelope = codec.decode(&bytes).unwrap();
/// assert_eq!(frame, decoded);
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

    fn encode_text<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }
}
