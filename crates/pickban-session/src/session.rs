//! Session types: the server's record of one client identity.
//!
//! A session tracks:
//! - WHO the client is (`SessionId`, chosen by the client)
//! - WHICH connections it currently has open (one per browser tab)
//! - WHERE it sits (team, side) and what it told us (name, rank score)
//! - WHEN its last connection dropped, while it is in the grace period

use std::time::Duration;

use pickban_protocol::{ConnectionId, PlayerInfo, SessionId, Side, TeamId};
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a session with no live connections is kept before it is
    /// torn down. A reconnect inside this window is treated as continuity.
    ///
    /// Default: 5 seconds.
    pub reconnect_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_grace: Duration::from_secs(5),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Connection state of a session.
///
/// ```text
///   Connected ──(last detach)──→ Disconnected ──(grace elapsed)──→ removed
///       ↑                             │
///       └──────────(attach)───────────┘
/// ```
///
/// Uses Tokio's `Instant` so paused-clock tests see the same time the
/// grace timers do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// At least one connection is open.
    Connected,

    /// All connections closed at `since`.
    Disconnected { since: Instant },
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One client identity on the server.
#[derive(Debug, Clone)]
pub struct Session {
    /// The client-supplied token this session is keyed by.
    pub session_id: SessionId,

    /// Current lifecycle state.
    pub state: SessionState,

    /// Team this session is a member of, if any.
    pub team_id: Option<TeamId>,

    /// Side picked in the current team's draft, if any.
    pub side: Option<Side>,

    /// Name given with the last side selection.
    pub display_name: Option<String>,

    /// Rank score given with the last side selection.
    pub rank_score: Option<i64>,

    /// Open connections, oldest first. The last entry is the active one.
    connections: Vec<ConnectionId>,
}

impl Session {
    pub(crate) fn new(session_id: SessionId, first: ConnectionId) -> Self {
        Self {
            session_id,
            state: SessionState::Connected,
            team_id: None,
            side: None,
            display_name: None,
            rank_score: None,
            connections: vec![first],
        }
    }

    /// The most recently attached open connection.
    pub fn active_connection(&self) -> Option<ConnectionId> {
        self.connections.last().copied()
    }

    /// All open connections, oldest first.
    pub fn connections(&self) -> &[ConnectionId] {
        &self.connections
    }

    /// Number of simultaneously open connections.
    pub fn live_connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Returns `true` while at least one connection is open.
    pub fn is_connected(&self) -> bool {
        matches!(self.state, SessionState::Connected)
    }

    /// Forgets team-scoped data after the session leaves its team.
    pub fn clear_team(&mut self) {
        self.team_id = None;
        self.side = None;
    }

    /// Wire view of this session.
    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            session_id: self.session_id.clone(),
            team_id: self.team_id.clone(),
            side: self.side,
            display_name: self.display_name.clone(),
            rank_score: self.rank_score,
            live_connections: self.connections.len(),
        }
    }

    /// Adds a connection and makes it the active one.
    pub(crate) fn push_connection(&mut self, conn: ConnectionId) {
        self.connections.retain(|c| *c != conn);
        self.connections.push(conn);
        self.state = SessionState::Connected;
    }

    /// Removes a connection. Returns how many remain.
    pub(crate) fn drop_connection(&mut self, conn: ConnectionId) -> usize {
        self.connections.retain(|c| *c != conn);
        if self.connections.is_empty() {
            self.state = SessionState::Disconnected {
                since: Instant::now(),
            };
        }
        self.connections.len()
    }
}
