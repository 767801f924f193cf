//! Identity newtypes.
//!
//! Three different things get identified in a draft server and they must
//! never be mixed up:
//!
//! - a [`SessionId`] is the durable token a client chooses and re-presents
//!   on every connection (it survives page reloads and network blips),
//! - a [`ConnectionId`] names one live transport connection,
//! - a [`TeamId`] names one draft lobby.
//!
//! Wrapping each in its own struct means a function like
//! `fn kick(team: &TeamId, session: &SessionId)` cannot be called with the
//! arguments swapped.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Longest session token the server accepts.
pub const MAX_SESSION_ID_LEN: usize = 64;

/// A client-supplied identity token.
///
/// Trusted at face value: whoever presents the token *is* that session.
/// `#[serde(transparent)]` keeps it a plain JSON string on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Validates a raw token received from a client.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidMessage`] if the token is empty, longer than
    /// [`MAX_SESSION_ID_LEN`] characters, or contains control characters.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ProtocolError::InvalidMessage("session id is empty".into()));
        }
        if trimmed.chars().count() > MAX_SESSION_ID_LEN {
            return Err(ProtocolError::InvalidMessage(format!(
                "session id longer than {MAX_SESSION_ID_LEN} characters"
            )));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(ProtocolError::InvalidMessage(
                "session id contains control characters".into(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque team (room) identifier, generated by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(String);

impl TeamId {
    /// Wraps an already-generated identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TeamId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T-{}", self.0)
    }
}

/// Identifier for one live transport connection.
///
/// Never sent to clients; a session may own several of these at once
/// (one per open browser tab).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_parse_trims_whitespace() {
        let id = SessionId::parse("  abc-123 ").unwrap();
        assert_eq!(id.as_str(), "abc-123");
    }

    #[test]
    fn test_session_id_parse_empty_returns_error() {
        assert!(SessionId::parse("   ").is_err());
    }

    #[test]
    fn test_session_id_parse_too_long_returns_error() {
        let raw = "x".repeat(MAX_SESSION_ID_LEN + 1);
        assert!(SessionId::parse(&raw).is_err());
        let raw = "x".repeat(MAX_SESSION_ID_LEN);
        assert!(SessionId::parse(&raw).is_ok());
    }

    #[test]
    fn test_session_id_parse_control_chars_returns_error() {
        assert!(SessionId::parse("ab\u{0007}c").is_err());
    }

    #[test]
    fn test_session_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&SessionId::from("s-1")).unwrap();
        assert_eq!(json, "\"s-1\"");
    }

    #[test]
    fn test_team_id_display() {
        assert_eq!(TeamId::from("ab12").to_string(), "T-ab12");
    }

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
    }
}
