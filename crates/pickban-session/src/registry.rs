//! The session registry: maps client tokens to their connections and
//! reconnection bookkeeping.
//!
//! # Concurrency note
//!
//! `SessionRegistry` is a plain struct over `HashMap`s. It is owned by the
//! hub actor, which processes one event at a time, so it needs no locking
//! of its own.

use std::collections::HashMap;
use std::time::Duration;

use pickban_protocol::{ConnectionId, SessionId};

use crate::{Session, SessionConfig, SessionError, SessionState};

/// Outcome of [`SessionRegistry::attach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attached {
    /// `true` if this was the first contact for the token.
    pub created: bool,
    /// `true` if the session was in its grace period and is now resumed.
    /// The caller must cancel the pending teardown timer.
    pub resumed: bool,
    /// Open connections after attaching.
    pub live_connections: usize,
}

/// Outcome of [`SessionRegistry::detach`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detached {
    /// The session the connection belonged to.
    pub session_id: SessionId,
    /// Open connections left for that session.
    pub remaining: usize,
}

impl Detached {
    /// `true` when the last connection closed and the grace period starts.
    pub fn grace_started(&self) -> bool {
        self.remaining == 0
    }
}

/// Tracks every known session.
///
/// ```text
/// attach() ──→ [Connected] ──detach() (last)──→ [Disconnected]
///                  ↑                                  │
///                  └────────── attach() ──────────────┤
///                                                     ▼ (grace elapsed)
///                                                 expire() ──→ removed
/// ```
pub struct SessionRegistry {
    /// All sessions, keyed by client token.
    sessions: HashMap<SessionId, Session>,

    /// Reverse index from connection to owning session. Kept in sync with
    /// each session's own connection list.
    owners: HashMap<ConnectionId, SessionId>,

    config: SessionConfig,
}

impl SessionRegistry {
    /// Creates a new, empty registry with the given config.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            owners: HashMap::new(),
            config,
        }
    }

    /// The configured grace period.
    pub fn grace(&self) -> Duration {
        self.config.reconnect_grace
    }

    /// Attaches a connection to a session, creating the session on first
    /// contact.
    ///
    /// For a known session the new connection becomes the active one and
    /// the live-connection count goes up.
    ///
    /// # Errors
    /// [`SessionError::ConnectionInUse`] if `conn` is already attached.
    pub fn attach(
        &mut self,
        session_id: SessionId,
        conn: ConnectionId,
    ) -> Result<Attached, SessionError> {
        if let Some(owner) = self.owners.get(&conn) {
            return Err(SessionError::ConnectionInUse(conn, owner.clone()));
        }

        let outcome = match self.sessions.get_mut(&session_id) {
            Some(session) => {
                let resumed = matches!(session.state, SessionState::Disconnected { .. });
                session.push_connection(conn);
                if resumed {
                    tracing::info!(%session_id, %conn, "session resumed within grace period");
                } else {
                    tracing::debug!(
                        %session_id,
                        %conn,
                        connections = session.live_connection_count(),
                        "additional connection attached"
                    );
                }
                Attached {
                    created: false,
                    resumed,
                    live_connections: session.live_connection_count(),
                }
            }
            None => {
                self.sessions
                    .insert(session_id.clone(), Session::new(session_id.clone(), conn));
                tracing::info!(%session_id, %conn, "session created");
                Attached {
                    created: true,
                    resumed: false,
                    live_connections: 1,
                }
            }
        };

        self.owners.insert(conn, session_id);
        Ok(outcome)
    }

    /// Detaches a connection from its session.
    ///
    /// The session itself stays; when this was its last connection it
    /// enters the grace period and the caller should schedule a teardown
    /// after [`grace`](Self::grace).
    ///
    /// # Errors
    /// [`SessionError::UnknownConnection`] if `conn` is not attached.
    pub fn detach(&mut self, conn: ConnectionId) -> Result<Detached, SessionError> {
        let session_id = self
            .owners
            .remove(&conn)
            .ok_or(SessionError::UnknownConnection(conn))?;

        let session = self
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.clone()))?;

        let remaining = session.drop_connection(conn);
        if remaining == 0 {
            tracing::info!(%session_id, %conn, "last connection closed, grace period started");
        }

        Ok(Detached {
            session_id,
            remaining,
        })
    }

    /// Removes a session whose grace period elapsed.
    ///
    /// Re-validates at call time: a session that reconnected in the
    /// meantime is left alone and `None` is returned.
    pub fn expire(&mut self, session_id: &SessionId) -> Option<Session> {
        let session = self.sessions.get(session_id)?;
        if session.is_connected() || session.live_connection_count() > 0 {
            return None;
        }
        let session = self.sessions.remove(session_id)?;
        tracing::info!(%session_id, "session expired (grace period elapsed)");
        Some(session)
    }

    /// The session a connection belongs to.
    pub fn session_of(&self, conn: ConnectionId) -> Option<&SessionId> {
        self.owners.get(&conn)
    }

    /// Looks up a session by token.
    pub fn get(&self, session_id: &SessionId) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    /// Mutable lookup by token.
    pub fn get_mut(&mut self, session_id: &SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(session_id)
    }

    /// Open connections of a session (empty if unknown).
    pub fn connections(&self, session_id: &SessionId) -> Vec<ConnectionId> {
        self.sessions
            .get(session_id)
            .map(|s| s.connections().to_vec())
            .unwrap_or_default()
    }

    /// Returns the number of sessions (any state).
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if there are no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `SessionRegistry`, named
    //! `test_{function}_{scenario}_{expected}`.

    use super::*;
    use pickban_protocol::TeamId;

    fn sid(raw: &str) -> SessionId {
        SessionId::from(raw)
    }

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    // =====================================================================
    // attach()
    // =====================================================================

    #[test]
    fn test_attach_new_session_creates_with_one_connection() {
        let mut reg = SessionRegistry::default();

        let outcome = reg.attach(sid("a"), conn(1)).unwrap();

        assert!(outcome.created);
        assert!(!outcome.resumed);
        assert_eq!(outcome.live_connections, 1);
        let session = reg.get(&sid("a")).unwrap();
        assert_eq!(session.active_connection(), Some(conn(1)));
        assert!(session.is_connected());
    }

    #[test]
    fn test_attach_second_tab_increments_count_and_replaces_active() {
        let mut reg = SessionRegistry::default();
        reg.attach(sid("a"), conn(1)).unwrap();

        let outcome = reg.attach(sid("a"), conn(2)).unwrap();

        assert!(!outcome.created);
        assert!(!outcome.resumed);
        assert_eq!(outcome.live_connections, 2);
        assert_eq!(reg.get(&sid("a")).unwrap().active_connection(), Some(conn(2)));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_attach_same_connection_twice_returns_error() {
        let mut reg = SessionRegistry::default();
        reg.attach(sid("a"), conn(1)).unwrap();

        let result = reg.attach(sid("b"), conn(1));

        assert!(matches!(result, Err(SessionError::ConnectionInUse(c, _)) if c == conn(1)));
        assert!(reg.get(&sid("b")).is_none());
    }

    #[test]
    fn test_attach_after_last_detach_reports_resumed() {
        let mut reg = SessionRegistry::default();
        reg.attach(sid("a"), conn(1)).unwrap();
        reg.detach(conn(1)).unwrap();

        let outcome = reg.attach(sid("a"), conn(2)).unwrap();

        assert!(outcome.resumed);
        assert!(reg.get(&sid("a")).unwrap().is_connected());
    }

    #[test]
    fn test_attach_keeps_team_view_across_reconnect() {
        let mut reg = SessionRegistry::default();
        reg.attach(sid("a"), conn(1)).unwrap();
        reg.get_mut(&sid("a")).unwrap().team_id = Some(TeamId::from("t1"));
        reg.detach(conn(1)).unwrap();

        reg.attach(sid("a"), conn(2)).unwrap();

        assert_eq!(reg.get(&sid("a")).unwrap().team_id, Some(TeamId::from("t1")));
    }

    // =====================================================================
    // detach()
    // =====================================================================

    #[test]
    fn test_detach_one_of_two_tabs_does_not_start_grace() {
        let mut reg = SessionRegistry::default();
        reg.attach(sid("a"), conn(1)).unwrap();
        reg.attach(sid("a"), conn(2)).unwrap();

        let detached = reg.detach(conn(2)).unwrap();

        assert_eq!(detached.remaining, 1);
        assert!(!detached.grace_started());
        // The older tab becomes active again.
        assert_eq!(reg.get(&sid("a")).unwrap().active_connection(), Some(conn(1)));
    }

    #[test]
    fn test_detach_last_connection_starts_grace() {
        let mut reg = SessionRegistry::default();
        reg.attach(sid("a"), conn(1)).unwrap();

        let detached = reg.detach(conn(1)).unwrap();

        assert!(detached.grace_started());
        assert_eq!(detached.session_id, sid("a"));
        let session = reg.get(&sid("a")).expect("session survives detach");
        assert!(matches!(session.state, SessionState::Disconnected { .. }));
        assert_eq!(session.active_connection(), None);
    }

    #[test]
    fn test_detach_unknown_connection_returns_error() {
        let mut reg = SessionRegistry::default();

        let result = reg.detach(conn(9));

        assert!(matches!(result, Err(SessionError::UnknownConnection(c)) if c == conn(9)));
    }

    // =====================================================================
    // expire()
    // =====================================================================

    #[test]
    fn test_expire_disconnected_session_removes_it() {
        let mut reg = SessionRegistry::default();
        reg.attach(sid("a"), conn(1)).unwrap();
        reg.detach(conn(1)).unwrap();

        let expired = reg.expire(&sid("a"));

        assert_eq!(expired.map(|s| s.session_id), Some(sid("a")));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_expire_reconnected_session_is_noop() {
        let mut reg = SessionRegistry::default();
        reg.attach(sid("a"), conn(1)).unwrap();
        reg.detach(conn(1)).unwrap();
        reg.attach(sid("a"), conn(2)).unwrap();

        assert!(reg.expire(&sid("a")).is_none());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_expire_unknown_session_is_noop() {
        let mut reg = SessionRegistry::default();
        assert!(reg.expire(&sid("ghost")).is_none());
    }

    // =====================================================================
    // lookups
    // =====================================================================

    #[test]
    fn test_session_of_tracks_owner_until_detach() {
        let mut reg = SessionRegistry::default();
        reg.attach(sid("a"), conn(1)).unwrap();
        assert_eq!(reg.session_of(conn(1)), Some(&sid("a")));

        reg.detach(conn(1)).unwrap();
        assert_eq!(reg.session_of(conn(1)), None);
    }

    #[test]
    fn test_info_reports_live_connections() {
        let mut reg = SessionRegistry::default();
        reg.attach(sid("a"), conn(1)).unwrap();
        reg.attach(sid("a"), conn(2)).unwrap();

        let info = reg.get(&sid("a")).unwrap().info();

        assert_eq!(info.live_connections, 2);
        assert_eq!(info.team_id, None);
        assert_eq!(reg.connections(&sid("a")), vec![conn(1), conn(2)]);
    }

    // =====================================================================
    // Disconnected { since }
    // =====================================================================

    #[tokio::test(start_paused = true)]
    async fn test_detach_last_records_disconnect_instant() {
        let mut reg = SessionRegistry::default();
        reg.attach(sid("a"), conn(1)).unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;
        let closed_at = tokio::time::Instant::now();

        reg.detach(conn(1)).unwrap();

        assert_eq!(
            reg.get(&sid("a")).unwrap().state,
            SessionState::Disconnected { since: closed_at }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_detach_one_of_two_tabs_stays_connected() {
        let mut reg = SessionRegistry::default();
        reg.attach(sid("a"), conn(1)).unwrap();
        reg.attach(sid("a"), conn(2)).unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;

        reg.detach(conn(2)).unwrap();

        assert_eq!(reg.get(&sid("a")).unwrap().state, SessionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_disconnect_restarts_since() {
        let mut reg = SessionRegistry::default();
        reg.attach(sid("a"), conn(1)).unwrap();
        reg.detach(conn(1)).unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;
        reg.attach(sid("a"), conn(2)).unwrap();
        assert_eq!(reg.get(&sid("a")).unwrap().state, SessionState::Connected);
        tokio::time::advance(Duration::from_secs(2)).await;
        let closed_at = tokio::time::Instant::now();

        reg.detach(conn(2)).unwrap();

        let SessionState::Disconnected { since } = reg.get(&sid("a")).unwrap().state else {
            panic!("expected disconnected");
        };
        assert_eq!(since, closed_at);
    }
}
