//! Error types for the session layer.

use pickban_protocol::{ConnectionId, SessionId};

/// Errors that can occur during session bookkeeping.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session exists for the given token. Either it never connected
    /// or its grace period already expired.
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// The connection was never attached (or was already detached).
    #[error("connection {0} is not attached to a session")]
    UnknownConnection(ConnectionId),

    /// The connection is already attached to a session. A connection
    /// belongs to exactly one session for its whole life.
    #[error("connection {0} is already attached to session {1}")]
    ConnectionInUse(ConnectionId, SessionId),
}
