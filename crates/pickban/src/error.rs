//! Unified error type for the pickban server.

use pickban_draft::DraftError;
use pickban_protocol::ProtocolError;
use pickban_session::SessionError;

use crate::transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impls, so
/// the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PickbanError {
    /// A transport-level error (bind, upgrade, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session registry error.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A rejected team or draft operation.
    #[error(transparent)]
    Draft(#[from] DraftError),

    /// The hub task stopped and no longer accepts commands.
    #[error("hub is not running")]
    HubClosed,
}
