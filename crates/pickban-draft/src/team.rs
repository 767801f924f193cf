//! Team directory: creates, tracks, and routes sessions to teams.
//!
//! Each [`Team`] owns its [`DraftState`]; deleting a team drops its draft
//! with it. A session is a member of at most one team at a time.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use pickban_protocol::{Phase, SessionId, TeamId, TeamMode, TeamStatus, TeamSummary};
use rand::Rng;

use crate::draft::{Departure, DraftState};
use crate::rules::{MAX_TEAM_NAME_CHARS, clean_text};
use crate::DraftError;

/// Hex digits in a generated team id.
const TEAM_ID_HEX_DIGITS: usize = 12;

// ---------------------------------------------------------------------------
// Team
// ---------------------------------------------------------------------------

/// One draft lobby.
#[derive(Debug, Clone)]
pub struct Team {
    id: TeamId,
    name: String,
    mode: TeamMode,
    created_at: DateTime<Utc>,
    members: Vec<SessionId>,
    status: TeamStatus,
    draft: DraftState,
}

impl Team {
    fn new(id: TeamId, name: String, mode: TeamMode, creator: SessionId, now: DateTime<Utc>) -> Self {
        let draft = DraftState::new(id.clone(), mode.quorum_per_side());
        Self {
            id,
            name,
            mode,
            created_at: now,
            members: vec![creator],
            status: TeamStatus::Waiting,
            draft,
        }
    }

    pub fn id(&self) -> &TeamId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> TeamMode {
        self.mode
    }

    pub fn members(&self) -> &[SessionId] {
        &self.members
    }

    pub fn is_member(&self, session: &SessionId) -> bool {
        self.members.contains(session)
    }

    pub fn status(&self) -> TeamStatus {
        self.status
    }

    pub fn draft(&self) -> &DraftState {
        &self.draft
    }

    /// Runs `f` against the draft, then brings the status label in line
    /// with the draft's phase. All draft mutation goes through here.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut DraftState) -> R) -> R {
        let result = f(&mut self.draft);
        self.sync_status();
        result
    }

    /// Lobby listing entry.
    pub fn summary(&self) -> TeamSummary {
        TeamSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            mode: self.mode,
            created_at: self.created_at,
            members: self.members.clone(),
            capacity: self.mode.total_capacity(),
            status: self.status,
        }
    }

    fn sync_status(&mut self) {
        let status = match self.draft.phase() {
            Phase::Waiting => TeamStatus::Waiting,
            Phase::Ban | Phase::Pick => TeamStatus::Drafting,
            Phase::Complete if self.draft.winner().is_some() => TeamStatus::Finished,
            Phase::Complete => TeamStatus::Live,
        };
        if status != self.status {
            tracing::info!(team_id = %self.id, from = %self.status, to = %status, "team status changed");
            self.status = status;
        }
    }
}

// ---------------------------------------------------------------------------
// TeamDirectory
// ---------------------------------------------------------------------------

/// Result of [`TeamDirectory::remove_member`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub team_id: TeamId,
    pub departure: Departure,
    /// The last member left and the team was deleted.
    pub team_deleted: bool,
}

/// Every active team, plus the reverse index from session to team.
#[derive(Debug, Default)]
pub struct TeamDirectory {
    teams: HashMap<TeamId, Team>,

    /// A session is in at most ONE team. Kept in sync with each team's
    /// member list.
    memberships: HashMap<SessionId, TeamId>,
}

impl TeamDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a team with `creator` as its only member.
    ///
    /// # Errors
    /// - [`DraftError::InvalidRequest`] for a bad name or mode string
    /// - [`DraftError::AlreadyInTeam`] if `creator` is already in a team
    pub fn create(
        &mut self,
        name: &str,
        mode: &str,
        creator: &SessionId,
        now: DateTime<Utc>,
    ) -> Result<&Team, DraftError> {
        let name = clean_text(name, "team name", MAX_TEAM_NAME_CHARS)?;
        let mode = crate::rules::parse_mode(mode)?;
        if let Some(current) = self.memberships.get(creator) {
            return Err(DraftError::AlreadyInTeam(current.clone()));
        }

        let id = self.fresh_id();
        tracing::info!(team_id = %id, %mode, creator = %creator, "team created");
        self.memberships.insert(creator.clone(), id.clone());
        let team = self
            .teams
            .entry(id.clone())
            .or_insert_with(|| Team::new(id, name, mode, creator.clone(), now));
        Ok(team)
    }

    /// Adds `session` to a team.
    ///
    /// # Errors
    /// - [`DraftError::TeamNotFound`]
    /// - [`DraftError::AlreadyMember`] if already listed on this team
    /// - [`DraftError::AlreadyInTeam`] if listed on a different team
    /// - [`DraftError::CapacityExceeded`] if the team is full
    pub fn join(&mut self, team_id: &TeamId, session: &SessionId) -> Result<&Team, DraftError> {
        let team = self
            .teams
            .get_mut(team_id)
            .ok_or_else(|| DraftError::TeamNotFound(team_id.clone()))?;
        if team.is_member(session) {
            return Err(DraftError::AlreadyMember(team_id.clone()));
        }
        if let Some(current) = self.memberships.get(session) {
            return Err(DraftError::AlreadyInTeam(current.clone()));
        }
        let capacity = team.mode.total_capacity();
        if team.members.len() >= capacity {
            return Err(DraftError::CapacityExceeded {
                team: team_id.clone(),
                capacity,
            });
        }

        team.members.push(session.clone());
        self.memberships.insert(session.clone(), team_id.clone());
        tracing::info!(%team_id, %session, members = team.members.len(), "member joined team");
        Ok(team)
    }

    /// Removes `session` from a team and its draft. Deletes the team once
    /// its last member is gone.
    ///
    /// # Errors
    /// [`DraftError::TeamNotFound`], or [`DraftError::NotMember`] if the
    /// session is not on that team.
    pub fn remove_member(
        &mut self,
        team_id: &TeamId,
        session: &SessionId,
        now: DateTime<Utc>,
    ) -> Result<Removal, DraftError> {
        let team = self
            .teams
            .get_mut(team_id)
            .ok_or_else(|| DraftError::TeamNotFound(team_id.clone()))?;
        if !team.is_member(session) {
            return Err(DraftError::NotMember(team_id.clone()));
        }

        team.members.retain(|m| m != session);
        self.memberships.remove(session);
        let departure = team.update(|draft| draft.remove_player(session, now));
        tracing::info!(%team_id, %session, members = team.members.len(), "member left team");

        let team_deleted = team.members.is_empty();
        if team_deleted {
            self.teams.remove(team_id);
            tracing::info!(%team_id, "team deleted (no members left)");
        }

        Ok(Removal {
            team_id: team_id.clone(),
            departure,
            team_deleted,
        })
    }

    /// Removes `session` from whatever team it is in. `None` if it is in
    /// no team.
    pub fn leave_current(&mut self, session: &SessionId, now: DateTime<Utc>) -> Option<Removal> {
        let team_id = self.memberships.get(session)?.clone();
        self.remove_member(&team_id, session, now).ok()
    }

    pub fn get(&self, team_id: &TeamId) -> Option<&Team> {
        self.teams.get(team_id)
    }

    pub fn get_mut(&mut self, team_id: &TeamId) -> Option<&mut Team> {
        self.teams.get_mut(team_id)
    }

    /// Looks up a team the caller belongs to.
    ///
    /// # Errors
    /// [`DraftError::TeamNotFound`] or [`DraftError::NotMember`].
    pub fn member_team_mut(
        &mut self,
        team_id: &TeamId,
        session: &SessionId,
    ) -> Result<&mut Team, DraftError> {
        let team = self
            .teams
            .get_mut(team_id)
            .ok_or_else(|| DraftError::TeamNotFound(team_id.clone()))?;
        if !team.is_member(session) {
            return Err(DraftError::NotMember(team_id.clone()));
        }
        Ok(team)
    }

    /// The team `session` belongs to, if any.
    pub fn team_of(&self, session: &SessionId) -> Option<&TeamId> {
        self.memberships.get(session)
    }

    /// Lobby listing, oldest team first.
    pub fn summaries(&self) -> Vec<TeamSummary> {
        let mut list: Vec<TeamSummary> = self.teams.values().map(Team::summary).collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        list
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    fn fresh_id(&self) -> TeamId {
        let mut rng = rand::rng();
        loop {
            let raw: u64 = rng.random();
            let id = TeamId::new(format!(
                "{:0width$x}",
                raw >> (64 - 4 * TEAM_ID_HEX_DIGITS),
                width = TEAM_ID_HEX_DIGITS
            ));
            if !self.teams.contains_key(&id) {
                return id;
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
