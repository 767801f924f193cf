//! Error types for the protocol layer.

/// Errors that can occur while encoding, decoding or validating wire data.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, an unknown event name,
    /// missing fields or wrong field types.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame decoded but breaks a protocol rule, e.g. an empty
    /// session id or a team mode like `"3v2"`.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
