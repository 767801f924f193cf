//! The hub: a single actor that owns every registry and processes one
//! command at a time.
//!
//! Connection tasks, and the timers the hub schedules for itself, all feed
//! the same unbounded command queue. Each command runs to completion
//! (validate, mutate, broadcast) before the next one is looked at, so no
//! handler ever observes another one half-done.
//!
//! ```text
//! conn task ──Connect/Request/Disconnect──┐
//! conn task ──────────────────────────────┼──→ [command queue] ──→ Hub::handle
//! TimerSet  ──Timer(Fired)────────────────┘                          │
//!                                                                    ▼
//!                                                          Gateway ──→ conn queues
//! ```
//!
//! Timers can be overtaken by the state they were scheduled for: a
//! session reconnects, a team is deleted, a vote is already closed. The
//! hub claims every fired timer against the [`TimerSet`] and then checks
//! the current state again before acting.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use pickban_draft::{DraftError, Removal, TeamDirectory, rules};
use pickban_protocol::{
    ChatLine, ClientRequest, ConnectionId, ServerEvent, SessionId, Side, TeamId,
};
use pickban_session::{SessionConfig, SessionRegistry};
use pickban_timer::{Fired, TimerSet};
use tokio::sync::mpsc;

use crate::PickbanError;
use crate::gateway::{Gateway, Group, Outbound};
use crate::server::PROTOCOL_VERSION;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Timing and limits for the hub.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Session registry settings (reconnection grace period).
    pub session: SessionConfig,

    /// How long a drafted game runs before voting opens.
    pub game_duration: Duration,

    /// How long the post-game vote stays open.
    pub voting_window: Duration,

    /// Chat lines longer than this many characters are truncated.
    pub chat_max_chars: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            game_duration: Duration::from_secs(25 * 60),
            voting_window: Duration::from_secs(60),
            chat_max_chars: 200,
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Delayed work the hub schedules for itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerKey {
    /// A disconnected session's reconnection window.
    Grace(SessionId),
    /// A completed draft's game; voting opens when it fires.
    GameDuration(TeamId),
    /// An open vote; the tally runs when it fires.
    VotingWindow(TeamId),
}

impl TimerKey {
    fn team(&self) -> Option<&TeamId> {
        match self {
            Self::Grace(_) => None,
            Self::GameDuration(team) | Self::VotingWindow(team) => Some(team),
        }
    }
}

/// Everything the hub reacts to.
#[derive(Debug)]
pub enum Command {
    /// A connection finished its handshake.
    Connect {
        conn: ConnectionId,
        session_id: SessionId,
        outbound: Outbound,
    },
    /// A connection closed.
    Disconnect { conn: ConnectionId },
    /// A decoded client request.
    Request {
        conn: ConnectionId,
        seq: u64,
        request: ClientRequest,
    },
    /// A frame that could not be decoded.
    Malformed { conn: ConnectionId, reason: String },
    /// A timer elapsed.
    Timer(Fired<TimerKey>),
}

/// Cloneable sender side of the hub's queue.
#[derive(Clone)]
pub struct HubHandle {
    commands: mpsc::UnboundedSender<Command>,
    next_conn: Arc<AtomicU64>,
}

impl HubHandle {
    /// Allocates an id for a new connection.
    pub fn next_connection_id(&self) -> ConnectionId {
        ConnectionId::new(self.next_conn.fetch_add(1, Ordering::Relaxed))
    }

    /// Queues a command for the hub.
    ///
    /// # Errors
    /// [`PickbanError::HubClosed`] if the hub has stopped.
    pub fn send(&self, command: Command) -> Result<(), PickbanError> {
        self.commands
            .send(command)
            .map_err(|_| PickbanError::HubClosed)
    }
}

// ---------------------------------------------------------------------------
// Hub
// ---------------------------------------------------------------------------

/// Why a member is being removed from its team.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Left,
    GraceExpired,
}

/// Owner of sessions, teams, timers and the broadcast gateway.
pub struct Hub {
    config: HubConfig,
    sessions: SessionRegistry,
    teams: TeamDirectory,
    gateway: Gateway,
    timers: TimerSet<TimerKey, Command>,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl Hub {
    /// Creates a hub and the handle used to feed it.
    ///
    /// Must be called from within a Tokio runtime (timers spawn tasks).
    pub fn new(config: HubConfig) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let hub = Self {
            sessions: SessionRegistry::new(config.session.clone()),
            teams: TeamDirectory::new(),
            gateway: Gateway::new(),
            timers: TimerSet::new(tx.clone(), Command::Timer),
            commands: rx,
            config,
        };
        let handle = HubHandle {
            commands: tx,
            next_conn: Arc::new(AtomicU64::new(1)),
        };
        (hub, handle)
    }

    /// Processes commands for as long as the runtime keeps the task alive.
    ///
    /// The timer set holds its own sender, so the queue never closes from
    /// this side and [`PickbanError::HubClosed`] is only seen once the hub
    /// task itself has been dropped.
    pub async fn run(mut self) {
        tracing::info!("hub running");
        while let Some(command) = self.commands.recv().await {
            self.handle(command);
        }
        tracing::info!("hub stopped");
    }

    /// Handles every command already queued, without waiting. Returns
    /// how many were processed.
    pub fn process_pending(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(command) = self.commands.try_recv() {
            self.handle(command);
            processed += 1;
        }
        processed
    }

    /// Applies one command.
    pub fn handle(&mut self, command: Command) {
        match command {
            Command::Connect {
                conn,
                session_id,
                outbound,
            } => self.on_connect(conn, session_id, outbound),
            Command::Disconnect { conn } => self.on_disconnect(conn),
            Command::Request { conn, seq, request } => self.on_request(conn, seq, request),
            Command::Malformed { conn, reason } => {
                tracing::debug!(%conn, %reason, "malformed frame");
                self.gateway.send(
                    conn,
                    ServerEvent::Rejected {
                        code: "invalid-request".into(),
                        message: reason,
                    },
                );
            }
            Command::Timer(fired) => self.on_timer(fired),
        }
    }

    /// Read-only access to the session registry.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Read-only access to the team directory.
    pub fn teams(&self) -> &TeamDirectory {
        &self.teams
    }

    /// Whether a timer is pending under `key`.
    pub fn timer_pending(&self, key: &TimerKey) -> bool {
        self.timers.is_pending(key)
    }

    // -- Connection lifecycle ---------------------------------------------

    fn on_connect(&mut self, conn: ConnectionId, session_id: SessionId, outbound: Outbound) {
        self.gateway.register(conn, outbound);
        let attached = match self.sessions.attach(session_id.clone(), conn) {
            Ok(attached) => attached,
            Err(e) => {
                tracing::warn!(%conn, error = %e, "attach failed");
                self.gateway.send(
                    conn,
                    ServerEvent::Rejected {
                        code: "invalid-request".into(),
                        message: e.to_string(),
                    },
                );
                self.gateway.unregister(conn);
                return;
            }
        };
        if attached.resumed {
            self.timers.cancel(&TimerKey::Grace(session_id.clone()));
        }

        self.gateway.send(
            conn,
            ServerEvent::HandshakeAck {
                session_id: session_id.clone(),
                restored: !attached.created,
                protocol_version: PROTOCOL_VERSION,
            },
        );

        // A returning member gets its team audience and a full resync.
        let team_id = self
            .sessions
            .get(&session_id)
            .and_then(|s| s.team_id.clone());
        if let Some(team_id) = team_id {
            if let Some(team) = self.teams.get(&team_id) {
                let draft = team.draft().snapshot();
                self.gateway.join_group(conn, Group::Team(team_id));
                self.gateway.send(conn, ServerEvent::DraftState { draft });
            }
        }
    }

    fn on_disconnect(&mut self, conn: ConnectionId) {
        self.gateway.unregister(conn);
        let detached = match self.sessions.detach(conn) {
            Ok(detached) => detached,
            Err(e) => {
                tracing::debug!(%conn, error = %e, "disconnect for unattached connection");
                return;
            }
        };
        if detached.grace_started() {
            let grace = self.sessions.grace();
            self.timers
                .schedule(TimerKey::Grace(detached.session_id), grace);
        }
    }

    // -- Requests ---------------------------------------------------------

    fn on_request(&mut self, conn: ConnectionId, seq: u64, request: ClientRequest) {
        let Some(session_id) = self.sessions.session_of(conn).cloned() else {
            tracing::debug!(%conn, "request from unattached connection");
            return;
        };
        let name = request.name();
        tracing::trace!(%conn, %session_id, request = name, seq, "request");

        match self.dispatch(&session_id, request) {
            Ok(reply) => {
                self.gateway.reply(conn, seq, reply);
            }
            Err(e) => {
                tracing::debug!(%session_id, request = name, code = e.code(), error = %e, "request rejected");
                self.gateway.reply(
                    conn,
                    seq,
                    ServerEvent::Rejected {
                        code: e.code().to_string(),
                        message: e.to_string(),
                    },
                );
            }
        }
    }

    fn dispatch(
        &mut self,
        session_id: &SessionId,
        request: ClientRequest,
    ) -> Result<ServerEvent, DraftError> {
        match request {
            ClientRequest::Handshake { .. } => {
                Err(DraftError::InvalidRequest("handshake already completed".into()))
            }
            ClientRequest::Heartbeat => Ok(ServerEvent::HeartbeatAck),
            ClientRequest::CreateTeam { name, mode } => self.create_team(session_id, &name, &mode),
            ClientRequest::JoinTeam { team_id } => self.join_team(session_id, &team_id),
            ClientRequest::SelectSide {
                team_id,
                side,
                display_name,
                rank_score,
            } => self.select_side(session_id, &team_id, side, &display_name, rank_score),
            ClientRequest::DraftBan {
                team_id,
                item_id,
                item,
            } => self.ban(session_id, &team_id, &item_id, item),
            ClientRequest::DraftPick {
                team_id,
                item_id,
                item,
            } => self.pick(session_id, &team_id, &item_id, item),
            ClientRequest::SubmitVote { team_id, choice } => {
                self.vote(session_id, &team_id, choice)
            }
            ClientRequest::SetRoomCode { team_id, code } => {
                self.set_room_code(session_id, &team_id, &code)
            }
            ClientRequest::LeaveTeam { team_id } => {
                let removal = self.teams.remove_member(&team_id, session_id, Utc::now())?;
                self.after_removal(session_id, removal, Exit::Left);
                Ok(ServerEvent::Ok)
            }
            ClientRequest::GetTeams => Ok(ServerEvent::Teams {
                teams: self.teams.summaries(),
            }),
            ClientRequest::GetPlayerInfo => {
                let player = self.player_info(session_id)?;
                Ok(ServerEvent::PlayerInfo { player })
            }
            ClientRequest::RestoreSession => self.restore_session(session_id),
            ClientRequest::DraftChatMessage { team_id, text } => {
                self.chat(session_id, &team_id, &text)
            }
        }
    }

    fn create_team(
        &mut self,
        session_id: &SessionId,
        name: &str,
        mode: &str,
    ) -> Result<ServerEvent, DraftError> {
        let team = self.teams.create(name, mode, session_id, Utc::now())?;
        let (team_id, summary, draft) = (team.id().clone(), team.summary(), team.draft().snapshot());

        if let Some(session) = self.sessions.get_mut(session_id) {
            session.team_id = Some(team_id.clone());
            session.side = None;
        }
        self.join_team_group(session_id, &team_id);
        self.announce_teams();
        Ok(ServerEvent::TeamCreated {
            team: summary,
            draft,
        })
    }

    fn join_team(
        &mut self,
        session_id: &SessionId,
        team_id: &TeamId,
    ) -> Result<ServerEvent, DraftError> {
        let team = self.teams.join(team_id, session_id)?;
        let (summary, draft) = (team.summary(), team.draft().snapshot());

        if let Some(session) = self.sessions.get_mut(session_id) {
            session.team_id = Some(team_id.clone());
            session.side = None;
        }
        self.gateway.broadcast(
            &Group::Team(team_id.clone()),
            &ServerEvent::PlayerJoined {
                session_id: session_id.clone(),
                team: summary.clone(),
            },
        );
        self.join_team_group(session_id, team_id);
        self.announce_teams();
        Ok(ServerEvent::TeamJoined {
            team: summary,
            draft,
        })
    }

    fn select_side(
        &mut self,
        session_id: &SessionId,
        team_id: &TeamId,
        side: Side,
        display_name: &str,
        rank_score: i64,
    ) -> Result<ServerEvent, DraftError> {
        let team = self.teams.member_team_mut(team_id, session_id)?;
        let selection =
            team.update(|d| d.select_side(session_id, side, display_name, rank_score))?;
        let draft = team.draft().snapshot();
        let name = team
            .draft()
            .score_of(session_id)
            .map(|s| s.name.clone());

        if let Some(session) = self.sessions.get_mut(session_id) {
            session.side = Some(side);
            session.display_name = name;
            session.rank_score = Some(rank_score);
        }
        let group = Group::Team(team_id.clone());
        self.gateway.broadcast(
            &group,
            &ServerEvent::SideSelected {
                session_id: session_id.clone(),
                side,
                draft: draft.clone(),
            },
        );
        if selection.draft_started {
            tracing::info!(%team_id, "quorum reached, ban phase started");
            self.gateway
                .broadcast(&group, &ServerEvent::DraftStarted { draft });
            self.announce_teams();
        }
        Ok(ServerEvent::Ok)
    }

    fn ban(
        &mut self,
        session_id: &SessionId,
        team_id: &TeamId,
        item_id: &str,
        item: serde_json::Value,
    ) -> Result<ServerEvent, DraftError> {
        let team = self.teams.member_team_mut(team_id, session_id)?;
        let outcome = team.update(|d| d.ban(session_id, item_id, item))?;
        let draft = team.draft().snapshot();

        tracing::debug!(%team_id, side = %outcome.ban.side, item_id = %outcome.ban.item_id, "item banned");
        if outcome.pick_phase_started {
            tracing::info!(%team_id, "bans done, pick phase started");
        }
        self.gateway.broadcast(
            &Group::Team(team_id.clone()),
            &ServerEvent::ItemBanned {
                ban: outcome.ban,
                draft,
            },
        );
        Ok(ServerEvent::Ok)
    }

    fn pick(
        &mut self,
        session_id: &SessionId,
        team_id: &TeamId,
        item_id: &str,
        item: serde_json::Value,
    ) -> Result<ServerEvent, DraftError> {
        let team = self.teams.member_team_mut(team_id, session_id)?;
        let outcome = team.update(|d| d.pick(session_id, item_id, item, Utc::now()))?;
        let draft = team.draft().snapshot();

        tracing::debug!(%team_id, side = %outcome.pick.side, item_id = %outcome.pick.item_id, "item picked");
        self.gateway.broadcast(
            &Group::Team(team_id.clone()),
            &ServerEvent::ItemPicked {
                pick: outcome.pick,
                draft,
            },
        );
        if outcome.draft_completed {
            self.on_draft_complete(team_id);
        }
        Ok(ServerEvent::Ok)
    }

    fn vote(
        &mut self,
        session_id: &SessionId,
        team_id: &TeamId,
        choice: Side,
    ) -> Result<ServerEvent, DraftError> {
        let team = self.teams.member_team_mut(team_id, session_id)?;
        let counts = team.update(|d| d.vote(session_id, choice))?;
        self.gateway.broadcast(
            &Group::Team(team_id.clone()),
            &ServerEvent::VoteUpdate { counts },
        );
        Ok(ServerEvent::Ok)
    }

    fn set_room_code(
        &mut self,
        session_id: &SessionId,
        team_id: &TeamId,
        code: &str,
    ) -> Result<ServerEvent, DraftError> {
        let team = self.teams.member_team_mut(team_id, session_id)?;
        let code = team.update(|d| d.set_room_code(session_id, code))?;
        tracing::info!(%team_id, "room code set");
        self.gateway.broadcast(
            &Group::Team(team_id.clone()),
            &ServerEvent::RoomCodeSet { code },
        );
        Ok(ServerEvent::Ok)
    }

    fn chat(
        &mut self,
        session_id: &SessionId,
        team_id: &TeamId,
        text: &str,
    ) -> Result<ServerEvent, DraftError> {
        let team = self.teams.member_team_mut(team_id, session_id)?;
        let side = team.draft().require_side(session_id)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(DraftError::InvalidRequest("chat message is empty".into()));
        }
        let line = ChatLine {
            session_id: session_id.clone(),
            name: team.draft().score_of(session_id).map(|s| s.name.clone()),
            side,
            text: rules::truncate_chars(text, self.config.chat_max_chars).to_string(),
            sent_at: Utc::now(),
        };
        self.gateway
            .broadcast(&Group::Team(team_id.clone()), &ServerEvent::ChatMessage(line));
        Ok(ServerEvent::Ok)
    }

    fn restore_session(&mut self, session_id: &SessionId) -> Result<ServerEvent, DraftError> {
        let player = self.player_info(session_id)?;
        let team = player.team_id.as_ref().and_then(|id| self.teams.get(id));
        let (team_summary, draft) = match team {
            Some(team) => (Some(team.summary()), Some(team.draft().snapshot())),
            None => (None, None),
        };
        if let Some(team_id) = &player.team_id {
            self.join_team_group(session_id, team_id);
        }
        Ok(ServerEvent::SessionRestored {
            player,
            team: team_summary,
            draft,
        })
    }

    fn player_info(&self, session_id: &SessionId) -> Result<pickban_protocol::PlayerInfo, DraftError> {
        self.sessions
            .get(session_id)
            .map(|s| s.info())
            .ok_or_else(|| DraftError::InvalidRequest(format!("unknown session {session_id}")))
    }

    // -- Timers -----------------------------------------------------------

    fn on_timer(&mut self, fired: Fired<TimerKey>) {
        if !self.timers.claim(&fired) {
            return;
        }
        match fired.key {
            TimerKey::Grace(session_id) => self.on_grace_elapsed(&session_id),
            TimerKey::GameDuration(team_id) => self.on_game_over(&team_id),
            TimerKey::VotingWindow(team_id) => self.on_voting_closed(&team_id),
        }
    }

    fn on_grace_elapsed(&mut self, session_id: &SessionId) {
        let Some(expired) = self.sessions.expire(session_id) else {
            tracing::debug!(%session_id, "grace timer fired for live or unknown session");
            return;
        };
        let Some(team_id) = expired.team_id else {
            return;
        };
        match self.teams.remove_member(&team_id, session_id, Utc::now()) {
            Ok(removal) => self.after_removal(session_id, removal, Exit::GraceExpired),
            Err(e) => tracing::debug!(%session_id, %team_id, error = %e, "expired session had no team"),
        }
    }

    fn on_game_over(&mut self, team_id: &TeamId) {
        let deadline = Utc::now() + to_chrono(self.config.voting_window);
        let Some(team) = self.teams.get_mut(team_id) else {
            tracing::debug!(%team_id, "game timer fired for deleted team");
            return;
        };
        if team.update(|d| d.start_voting(deadline)).is_none() {
            tracing::debug!(%team_id, "voting already started or decided");
            return;
        }
        let draft = team.draft().snapshot();
        tracing::info!(%team_id, %deadline, "voting opened");
        self.gateway.broadcast(
            &Group::Team(team_id.clone()),
            &ServerEvent::VotingStarted { deadline, draft },
        );
        self.timers.schedule(
            TimerKey::VotingWindow(team_id.clone()),
            self.config.voting_window,
        );
    }

    fn on_voting_closed(&mut self, team_id: &TeamId) {
        let Some(team) = self.teams.get_mut(team_id) else {
            tracing::debug!(%team_id, "voting timer fired for deleted team");
            return;
        };
        let Some(result) = team.update(|d| d.close_voting()) else {
            tracing::debug!(%team_id, "voting timer fired with no open vote");
            return;
        };
        let draft = team.draft().snapshot();
        tracing::info!(
            %team_id,
            winner = %result.winner,
            blue = result.counts.blue,
            red = result.counts.red,
            "voting closed"
        );
        self.gateway.broadcast(
            &Group::Team(team_id.clone()),
            &ServerEvent::VotingEnded {
                winner: result.winner,
                counts: result.counts,
                draft,
            },
        );
        self.announce_teams();
    }

    // -- Shared steps -----------------------------------------------------

    fn on_draft_complete(&mut self, team_id: &TeamId) {
        let Some(team) = self.teams.get(team_id) else {
            return;
        };
        let draft = team.draft().snapshot();
        tracing::info!(%team_id, "draft complete, game started");
        self.gateway.broadcast(
            &Group::Team(team_id.clone()),
            &ServerEvent::DraftComplete { draft },
        );
        self.timers.schedule(
            TimerKey::GameDuration(team_id.clone()),
            self.config.game_duration,
        );
        self.announce_teams();
    }

    /// Side effects of a member leaving a team, voluntarily or not.
    fn after_removal(&mut self, session_id: &SessionId, removal: Removal, exit: Exit) {
        let team_id = removal.team_id;
        let group = Group::Team(team_id.clone());

        if let Some(session) = self.sessions.get_mut(session_id) {
            session.clear_team();
        }
        for conn in self.sessions.connections(session_id) {
            self.gateway.leave_group(conn, &group);
        }

        if removal.team_deleted {
            let cancelled = self
                .timers
                .cancel_where(|key| key.team() == Some(&team_id));
            self.gateway.drop_group(&group);
            tracing::debug!(%team_id, cancelled, "team timers cancelled");
        } else if let Some(team) = self.teams.get(&team_id) {
            let draft = team.draft().snapshot();
            let event = match exit {
                Exit::Left => ServerEvent::PlayerLeft {
                    session_id: session_id.clone(),
                    draft,
                },
                Exit::GraceExpired => ServerEvent::PlayerDisconnected {
                    session_id: session_id.clone(),
                    draft,
                },
            };
            self.gateway.broadcast(&group, &event);
            if removal.departure.was_leader {
                tracing::info!(%team_id, side = ?removal.departure.side, "leader left, re-elected");
            }
            if removal.departure.draft_completed {
                self.on_draft_complete(&team_id);
                return;
            }
        }
        self.announce_teams();
    }

    fn join_team_group(&mut self, session_id: &SessionId, team_id: &TeamId) {
        for conn in self.sessions.connections(session_id) {
            self.gateway.join_group(conn, Group::Team(team_id.clone()));
        }
    }

    fn announce_teams(&mut self) {
        let teams = self.teams.summaries();
        self.gateway
            .broadcast(&Group::Lobby, &ServerEvent::TeamsUpdated { teams });
    }
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero())
}
