//! The per-team draft state machine.
//!
//! ```text
//! Waiting ──(both sides reach quorum)──→ Ban ──(both sides banned 3)──→ Pick
//!    ──(every side member picked once)──→ Complete ──(game timer)──→ voting
//!    ──(voting timer)──→ winner recorded
//! ```
//!
//! Every operation validates against the current phase and turn before
//! touching anything. A rejected call returns a [`DraftError`] and leaves
//! the state exactly as it was.
//!
//! Time is passed in by the caller (`now`) so the engine stays a plain
//! synchronous value that tests can drive directly.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use pickban_protocol::{
    BanRecord, DraftSnapshot, PerSide, Phase, PickRecord, PlayerScore, SessionId, Side, TeamId,
    VoteCounts, Winner,
};

use crate::DraftError;
use crate::leader::elect_leader;
use crate::rules::{BANS_PER_SIDE, MAX_DISPLAY_NAME_CHARS, MAX_ITEM_ID_CHARS, MAX_ROOM_CODE_CHARS, clean_text};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of a successful [`DraftState::select_side`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideSelection {
    pub side: Side,
    /// The selection filled the last quorum slot; phase is now `Ban`.
    pub draft_started: bool,
}

/// Result of [`DraftState::remove_player`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    /// Side the player was on, if any.
    pub side: Option<Side>,
    /// The player led that side; a new leader was elected.
    pub was_leader: bool,
    /// The departure left every remaining side member picked; phase is
    /// now `Complete`.
    pub draft_completed: bool,
}

/// Result of a successful [`DraftState::ban`].
#[derive(Debug, Clone, PartialEq)]
pub struct BanOutcome {
    pub ban: BanRecord,
    /// The banning side used its last ban and the turn moved on.
    pub turn_passed: bool,
    /// Both sides are done banning; phase is now `Pick`.
    pub pick_phase_started: bool,
}

/// Result of a successful [`DraftState::pick`].
#[derive(Debug, Clone, PartialEq)]
pub struct PickOutcome {
    pub pick: PickRecord,
    /// Every side member has picked; phase is now `Complete`.
    pub draft_completed: bool,
}

/// Result of [`DraftState::close_voting`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VotingResult {
    pub winner: Winner,
    pub counts: VoteCounts,
}

// ---------------------------------------------------------------------------
// DraftState
// ---------------------------------------------------------------------------

/// Ban/pick/vote state of one team.
#[derive(Debug, Clone)]
pub struct DraftState {
    team_id: TeamId,
    quorum_per_side: usize,

    side_players: PerSide<Vec<SessionId>>,
    player_side: HashMap<SessionId, Side>,
    scores: HashMap<SessionId, PlayerScore>,
    leader: PerSide<Option<SessionId>>,

    phase: Phase,
    turn: Side,
    turn_number: u32,

    ban_count: PerSide<u8>,
    bans: Vec<BanRecord>,
    picks: Vec<PickRecord>,
    picked_by: HashSet<SessionId>,

    room_code: Option<String>,

    game_started_at: Option<DateTime<Utc>>,
    voting_active: bool,
    voting_deadline: Option<DateTime<Utc>>,
    votes: HashMap<SessionId, Side>,
    winner: Option<Winner>,
}

impl DraftState {
    /// A fresh draft in the `Waiting` phase.
    pub fn new(team_id: TeamId, quorum_per_side: usize) -> Self {
        Self {
            team_id,
            quorum_per_side,
            side_players: PerSide::default(),
            player_side: HashMap::new(),
            scores: HashMap::new(),
            leader: PerSide::default(),
            phase: Phase::Waiting,
            turn: Side::Blue,
            turn_number: 1,
            ban_count: PerSide::default(),
            bans: Vec::new(),
            picks: Vec::new(),
            picked_by: HashSet::new(),
            room_code: None,
            game_started_at: None,
            voting_active: false,
            voting_deadline: None,
            votes: HashMap::new(),
            winner: None,
        }
    }

    // -- Side selection ---------------------------------------------------

    /// Puts `session` on `side`, recording its name and rank score.
    ///
    /// Switching sides is allowed while waiting. During the ban and pick
    /// phases an unseated member may still take a free seat, so a side
    /// emptied by departures can be refilled; seated players stay put.
    /// The capacity check runs against the target side as it stands,
    /// before the caller is removed from anywhere.
    ///
    /// # Errors
    /// - [`DraftError::InvalidPhase`] once complete, or for a seated player
    ///   after the draft has started
    /// - [`DraftError::InvalidRequest`] for an empty or over-long name
    /// - [`DraftError::SideFull`] if the side already has its quorum
    pub fn select_side(
        &mut self,
        session: &SessionId,
        side: Side,
        display_name: &str,
        rank_score: i64,
    ) -> Result<SideSelection, DraftError> {
        match self.phase {
            Phase::Waiting => {}
            Phase::Ban | Phase::Pick if !self.player_side.contains_key(session) => {}
            Phase::Ban | Phase::Pick => {
                return Err(DraftError::InvalidPhase(format!(
                    "sides are locked for seated players during the {} phase",
                    self.phase
                )));
            }
            Phase::Complete => {
                return Err(DraftError::InvalidPhase(
                    "sides are closed once the draft is complete".into(),
                ));
            }
        }
        let name = clean_text(display_name, "display name", MAX_DISPLAY_NAME_CHARS)?;
        if self.side_players[side].len() >= self.quorum_per_side {
            return Err(DraftError::SideFull(side));
        }

        self.detach_from_sides(session);
        self.side_players[side].push(session.clone());
        self.player_side.insert(session.clone(), side);
        self.scores.insert(
            session.clone(),
            PlayerScore {
                name,
                rank_score,
            },
        );
        self.recompute_leaders();

        let draft_started = self.maybe_start_ban_phase();
        Ok(SideSelection {
            side,
            draft_started,
        })
    }

    /// Removes a departing player from the draft.
    ///
    /// Past bans, picks and votes stay on record; the player's `picked_by`
    /// entry is dropped so the completion check only counts current side
    /// members. Never fails: removing an unknown session is a no-op.
    pub fn remove_player(&mut self, session: &SessionId, now: DateTime<Utc>) -> Departure {
        let side = self.player_side.get(session).copied();
        let was_leader = side.is_some_and(|s| self.leader[s].as_ref() == Some(session));

        self.detach_from_sides(session);
        self.scores.remove(session);
        self.picked_by.remove(session);
        self.recompute_leaders();

        let draft_completed = self.phase == Phase::Pick && side.is_some() && self.maybe_complete(now);

        Departure {
            side,
            was_leader,
            draft_completed,
        }
    }

    // -- Ban phase --------------------------------------------------------

    /// Bans an item on behalf of the caller's side.
    ///
    /// Only the leader of the side holding the turn may ban, up to
    /// [`BANS_PER_SIDE`] times. The turn passes when the side's last ban
    /// lands; the pick phase opens, blue first, once both sides are done.
    ///
    /// # Errors
    /// `InvalidPhase`, `Unauthorized` (no side, or not the leader),
    /// `BanQuota`, `InvalidTurn`, `InvalidRequest`, `ItemUnavailable`.
    pub fn ban(
        &mut self,
        session: &SessionId,
        item_id: &str,
        item: serde_json::Value,
    ) -> Result<BanOutcome, DraftError> {
        if self.phase != Phase::Ban {
            return Err(DraftError::InvalidPhase(format!(
                "cannot ban during the {} phase",
                self.phase
            )));
        }
        let side = self.require_side(session)?;
        if self.leader[side].as_ref() != Some(session) {
            return Err(DraftError::Unauthorized(format!(
                "only the {side} leader can ban"
            )));
        }
        if self.ban_count[side] >= BANS_PER_SIDE {
            return Err(DraftError::BanQuota(side));
        }
        if side != self.turn {
            return Err(DraftError::InvalidTurn { turn: self.turn });
        }
        let item_id = self.available_item(item_id)?;

        let ban = BanRecord {
            item_id,
            item,
            banner_session_id: session.clone(),
            side,
        };
        self.bans.push(ban.clone());
        self.ban_count[side] += 1;

        let mut turn_passed = false;
        if self.ban_count[side] == BANS_PER_SIDE {
            self.turn = side.other();
            turn_passed = true;
        }

        let mut pick_phase_started = false;
        if Side::ALL.iter().all(|s| self.ban_count[*s] == BANS_PER_SIDE) {
            self.phase = Phase::Pick;
            self.turn = Side::Blue;
            pick_phase_started = true;
        }

        Ok(BanOutcome {
            ban,
            turn_passed,
            pick_phase_started,
        })
    }

    // -- Pick phase -------------------------------------------------------

    /// Picks an item for the caller.
    ///
    /// Every side member picks exactly once, and every pick passes the
    /// turn to the other side regardless of how many members each side
    /// has left to pick.
    ///
    /// # Errors
    /// `AlreadyPicked` (checked first, so a repeat pick after completion
    /// still reports the duplicate), `InvalidPhase`, `Unauthorized`,
    /// `InvalidTurn`, `InvalidRequest`, `ItemUnavailable`.
    pub fn pick(
        &mut self,
        session: &SessionId,
        item_id: &str,
        item: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<PickOutcome, DraftError> {
        if self.picked_by.contains(session) {
            return Err(DraftError::AlreadyPicked);
        }
        if self.phase != Phase::Pick {
            return Err(DraftError::InvalidPhase(format!(
                "cannot pick during the {} phase",
                self.phase
            )));
        }
        let side = self.require_side(session)?;
        if side != self.turn {
            return Err(DraftError::InvalidTurn { turn: self.turn });
        }
        let item_id = self.available_item(item_id)?;

        let pick = PickRecord {
            item_id,
            item,
            side,
            picker_session_id: session.clone(),
        };
        self.picks.push(pick.clone());
        self.picked_by.insert(session.clone());
        self.turn_number += 1;
        self.turn = self.turn.other();

        let draft_completed = self.maybe_complete(now);
        Ok(PickOutcome {
            pick,
            draft_completed,
        })
    }

    // -- Voting -----------------------------------------------------------

    /// Opens the post-game vote, if it has not been opened before and no
    /// winner exists. Returns the deadline that was set.
    pub fn start_voting(&mut self, deadline: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.phase != Phase::Complete
            || self.voting_active
            || self.voting_deadline.is_some()
            || self.winner.is_some()
        {
            return None;
        }
        self.voting_active = true;
        self.voting_deadline = Some(deadline);
        Some(deadline)
    }

    /// Records (or overwrites) the caller's vote.
    ///
    /// # Errors
    /// `InvalidPhase` when voting is closed, `Unauthorized` without a side.
    pub fn vote(&mut self, session: &SessionId, choice: Side) -> Result<VoteCounts, DraftError> {
        if !self.voting_active {
            return Err(DraftError::InvalidPhase("voting is not open".into()));
        }
        self.require_side(session)?;
        self.votes.insert(session.clone(), choice);
        Ok(self.vote_counts())
    }

    /// Closes an open vote and records the winner. `None` if no vote is open.
    pub fn close_voting(&mut self) -> Option<VotingResult> {
        if !self.voting_active {
            return None;
        }
        let counts = self.vote_counts();
        let winner = Winner::from_counts(counts.blue, counts.red);
        self.voting_active = false;
        self.winner = Some(winner);
        Some(VotingResult { winner, counts })
    }

    /// Current vote totals.
    pub fn vote_counts(&self) -> VoteCounts {
        let mut counts = VoteCounts::default();
        for choice in self.votes.values() {
            match choice {
                Side::Blue => counts.blue += 1,
                Side::Red => counts.red += 1,
            }
        }
        counts
    }

    // -- Room code --------------------------------------------------------

    /// Sets the post-draft lobby code. Blue leader only, once complete.
    /// Later calls overwrite earlier ones.
    pub fn set_room_code(&mut self, session: &SessionId, code: &str) -> Result<String, DraftError> {
        if self.phase != Phase::Complete {
            return Err(DraftError::InvalidPhase(
                "room code can only be set after the draft".into(),
            ));
        }
        if self.leader.blue.as_ref() != Some(session) {
            return Err(DraftError::Unauthorized(
                "only the blue leader can set the room code".into(),
            ));
        }
        let code = clean_text(code, "room code", MAX_ROOM_CODE_CHARS)?;
        self.room_code = Some(code.clone());
        Ok(code)
    }

    // -- Queries ----------------------------------------------------------

    pub fn team_id(&self) -> &TeamId {
        &self.team_id
    }

    pub fn quorum_per_side(&self) -> usize {
        self.quorum_per_side
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn turn(&self) -> Side {
        self.turn
    }

    pub fn turn_number(&self) -> u32 {
        self.turn_number
    }

    pub fn ban_count(&self, side: Side) -> u8 {
        self.ban_count[side]
    }

    pub fn bans(&self) -> &[BanRecord] {
        &self.bans
    }

    pub fn picks(&self) -> &[PickRecord] {
        &self.picks
    }

    pub fn picked_count(&self) -> usize {
        self.picked_by.len()
    }

    pub fn has_picked(&self, session: &SessionId) -> bool {
        self.picked_by.contains(session)
    }

    pub fn leader(&self, side: Side) -> Option<&SessionId> {
        self.leader[side].as_ref()
    }

    pub fn side_of(&self, session: &SessionId) -> Option<Side> {
        self.player_side.get(session).copied()
    }

    pub fn side_players(&self, side: Side) -> &[SessionId] {
        &self.side_players[side]
    }

    /// Members on both sides.
    pub fn seated_count(&self) -> usize {
        self.side_players.blue.len() + self.side_players.red.len()
    }

    pub fn score_of(&self, session: &SessionId) -> Option<&PlayerScore> {
        self.scores.get(session)
    }

    pub fn voting_active(&self) -> bool {
        self.voting_active
    }

    pub fn voting_deadline(&self) -> Option<DateTime<Utc>> {
        self.voting_deadline
    }

    pub fn game_started_at(&self) -> Option<DateTime<Utc>> {
        self.game_started_at
    }

    pub fn winner(&self) -> Option<Winner> {
        self.winner
    }

    pub fn room_code(&self) -> Option<&str> {
        self.room_code.as_deref()
    }

    /// The caller's side, or `Unauthorized` if it has none.
    pub fn require_side(&self, session: &SessionId) -> Result<Side, DraftError> {
        self.side_of(session)
            .ok_or_else(|| DraftError::Unauthorized("select a side first".into()))
    }

    /// Wire snapshot of the full state.
    pub fn snapshot(&self) -> DraftSnapshot {
        let mut picked_by: Vec<SessionId> = self.picked_by.iter().cloned().collect();
        picked_by.sort();
        DraftSnapshot {
            team_id: self.team_id.clone(),
            phase: self.phase,
            turn: self.turn,
            turn_number: self.turn_number,
            quorum_per_side: self.quorum_per_side,
            side_players: self.side_players.clone(),
            player_sides: self.player_side.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            scores: self.scores.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            leader: self.leader.clone(),
            ban_count: self.ban_count.clone(),
            bans: self.bans.clone(),
            picks: self.picks.clone(),
            picked_by,
            room_code: self.room_code.clone(),
            game_started_at: self.game_started_at,
            voting_active: self.voting_active,
            voting_deadline: self.voting_deadline,
            votes: self.votes.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            winner: self.winner,
        }
    }

    // -- Internals --------------------------------------------------------

    fn detach_from_sides(&mut self, session: &SessionId) {
        for side in Side::ALL {
            self.side_players[side].retain(|s| s != session);
        }
        self.player_side.remove(session);
    }

    fn recompute_leaders(&mut self) {
        for side in Side::ALL {
            self.leader[side] = elect_leader(&self.side_players[side], &self.scores);
        }
    }

    fn maybe_start_ban_phase(&mut self) -> bool {
        let quorum = Side::ALL
            .iter()
            .all(|s| self.side_players[*s].len() >= self.quorum_per_side);
        if quorum && self.phase == Phase::Waiting {
            self.phase = Phase::Ban;
            self.turn = Side::Blue;
            return true;
        }
        false
    }

    fn maybe_complete(&mut self, now: DateTime<Utc>) -> bool {
        if self.phase != Phase::Pick || self.seated_count() == 0 {
            return false;
        }
        let everyone_picked = Side::ALL
            .iter()
            .flat_map(|s| self.side_players[*s].iter())
            .all(|p| self.picked_by.contains(p));
        if everyone_picked {
            self.phase = Phase::Complete;
            self.game_started_at = Some(now);
        }
        everyone_picked
    }

    fn available_item(&self, item_id: &str) -> Result<String, DraftError> {
        let item_id = clean_text(item_id, "item id", MAX_ITEM_ID_CHARS)?;
        let taken = self.bans.iter().any(|b| b.item_id == item_id)
            || self.picks.iter().any(|p| p.item_id == item_id);
        if taken {
            return Err(DraftError::ItemUnavailable(item_id));
        }
        Ok(item_id)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sid(raw: &str) -> SessionId {
        SessionId::from(raw)
    }

    fn draft(quorum: usize) -> DraftState {
        DraftState::new(TeamId::from("t1"), quorum)
    }

    #[test]
    fn test_new_draft_is_waiting_blue_turn_one() {
        let d = draft(5);
        assert_eq!(d.phase(), Phase::Waiting);
        assert_eq!(d.turn(), Side::Blue);
        assert_eq!(d.turn_number(), 1);
        assert_eq!(d.leader(Side::Blue), None);
    }

    #[test]
    fn test_select_side_switch_moves_player_and_recomputes_both_leaders() {
        let mut d = draft(2);
        d.select_side(&sid("a"), Side::Blue, "A", 2000).unwrap();
        d.select_side(&sid("b"), Side::Blue, "B", 1000).unwrap();
        assert_eq!(d.leader(Side::Blue), Some(&sid("a")));

        d.select_side(&sid("a"), Side::Red, "A", 2000).unwrap();

        assert_eq!(d.side_players(Side::Blue), &[sid("b")]);
        assert_eq!(d.side_players(Side::Red), &[sid("a")]);
        assert_eq!(d.leader(Side::Blue), Some(&sid("b")));
        assert_eq!(d.leader(Side::Red), Some(&sid("a")));
        assert_eq!(d.side_of(&sid("a")), Some(Side::Red));
    }

    #[test]
    fn test_select_side_full_side_rejects_even_current_member() {
        let mut d = draft(1);
        d.select_side(&sid("a"), Side::Blue, "A", 10).unwrap();

        let err = d.select_side(&sid("a"), Side::Blue, "A", 99).unwrap_err();

        assert_eq!(err, DraftError::SideFull(Side::Blue));
        // Unchanged: old score kept.
        assert_eq!(d.score_of(&sid("a")).unwrap().rank_score, 10);
    }

    #[test]
    fn test_select_side_empty_name_rejected_without_mutation() {
        let mut d = draft(1);
        let err = d.select_side(&sid("a"), Side::Blue, "  ", 10).unwrap_err();
        assert_eq!(err.code(), "invalid-request");
        assert_eq!(d.seated_count(), 0);
    }

    #[test]
    fn test_select_side_seated_player_cannot_switch_after_start() {
        let mut d = draft(2);
        d.select_side(&sid("a"), Side::Blue, "A", 1).unwrap();
        d.select_side(&sid("a2"), Side::Blue, "A2", 1).unwrap();
        d.select_side(&sid("b"), Side::Red, "B", 1).unwrap();
        let sel = d.select_side(&sid("b2"), Side::Red, "B2", 1).unwrap();
        assert!(sel.draft_started);
        d.remove_player(&sid("a2"), Utc::now());

        let err = d.select_side(&sid("b"), Side::Blue, "B", 1).unwrap_err();

        assert_eq!(err.code(), "invalid-phase");
        assert_eq!(d.side_of(&sid("b")), Some(Side::Red));
    }

    #[test]
    fn test_select_side_refills_emptied_side_during_ban() {
        let mut d = draft(1);
        d.select_side(&sid("b"), Side::Blue, "B", 1).unwrap();
        d.select_side(&sid("r"), Side::Red, "R", 1).unwrap();
        for item in ["1", "2", "3"] {
            d.ban(&sid("b"), item, json!(null)).unwrap();
        }
        d.remove_player(&sid("r"), Utc::now());
        assert_eq!(d.leader(Side::Red), None);

        let sel = d.select_side(&sid("c"), Side::Red, "C", 5).unwrap();

        assert!(!sel.draft_started);
        assert_eq!(d.phase(), Phase::Ban);
        assert_eq!(d.leader(Side::Red), Some(&sid("c")));
        d.ban(&sid("c"), "4", json!(null)).unwrap();
        assert_eq!(d.ban_count(Side::Red), 1);
    }

    #[test]
    fn test_select_side_full_side_still_rejected_during_pick() {
        let mut d = draft(1);
        d.select_side(&sid("b"), Side::Blue, "B", 1).unwrap();
        d.select_side(&sid("r"), Side::Red, "R", 1).unwrap();
        for item in ["1", "2", "3"] {
            d.ban(&sid("b"), item, json!(null)).unwrap();
        }
        for item in ["4", "5", "6"] {
            d.ban(&sid("r"), item, json!(null)).unwrap();
        }

        let err = d.select_side(&sid("c"), Side::Red, "C", 1).unwrap_err();

        assert_eq!(err, DraftError::SideFull(Side::Red));
    }

    #[test]
    fn test_select_side_closed_after_completion() {
        let mut d = draft(1);
        d.select_side(&sid("b"), Side::Blue, "B", 1).unwrap();
        d.select_side(&sid("r"), Side::Red, "R", 1).unwrap();
        for item in ["1", "2", "3"] {
            d.ban(&sid("b"), item, json!(null)).unwrap();
        }
        for item in ["4", "5", "6"] {
            d.ban(&sid("r"), item, json!(null)).unwrap();
        }
        d.pick(&sid("b"), "7", json!(null), Utc::now()).unwrap();
        d.remove_player(&sid("r"), Utc::now());
        assert_eq!(d.phase(), Phase::Complete);

        let err = d.select_side(&sid("c"), Side::Red, "C", 1).unwrap_err();

        assert_eq!(err.code(), "invalid-phase");
    }

    #[test]
    fn test_remove_player_leader_reelects_from_same_side() {
        let mut d = draft(3);
        d.select_side(&sid("a"), Side::Red, "A", 1500).unwrap();
        d.select_side(&sid("b"), Side::Red, "B", 2500).unwrap();
        d.select_side(&sid("c"), Side::Red, "C", 1800).unwrap();
        d.select_side(&sid("x"), Side::Blue, "X", 9000).unwrap();

        let departure = d.remove_player(&sid("b"), Utc::now());

        assert!(departure.was_leader);
        assert_eq!(departure.side, Some(Side::Red));
        assert_eq!(d.leader(Side::Red), Some(&sid("c")));
        assert_eq!(d.leader(Side::Blue), Some(&sid("x")));
    }

    #[test]
    fn test_remove_player_last_on_side_clears_leader() {
        let mut d = draft(3);
        d.select_side(&sid("a"), Side::Red, "A", 1).unwrap();

        d.remove_player(&sid("a"), Utc::now());

        assert_eq!(d.leader(Side::Red), None);
        assert_eq!(d.side_of(&sid("a")), None);
    }

    #[test]
    fn test_remove_unknown_player_is_noop() {
        let mut d = draft(3);
        let departure = d.remove_player(&sid("ghost"), Utc::now());
        assert_eq!(departure.side, None);
        assert!(!departure.was_leader);
        assert!(!departure.draft_completed);
    }

    #[test]
    fn test_ban_rejects_duplicate_item() {
        let mut d = draft(1);
        d.select_side(&sid("b"), Side::Blue, "B", 1).unwrap();
        d.select_side(&sid("r"), Side::Red, "R", 1).unwrap();
        d.ban(&sid("b"), "ahri", json!({})).unwrap();

        let err = d.ban(&sid("b"), "ahri", json!({})).unwrap_err();

        assert_eq!(err, DraftError::ItemUnavailable("ahri".into()));
        assert_eq!(d.ban_count(Side::Blue), 1);
    }

    #[test]
    fn test_ban_quota_reported_before_turn() {
        let mut d = draft(1);
        d.select_side(&sid("b"), Side::Blue, "B", 1).unwrap();
        d.select_side(&sid("r"), Side::Red, "R", 1).unwrap();
        for item in ["a", "b", "c"] {
            d.ban(&sid("b"), item, json!(null)).unwrap();
        }

        let err = d.ban(&sid("b"), "d", json!(null)).unwrap_err();

        assert_eq!(err, DraftError::BanQuota(Side::Blue));
    }

    #[test]
    fn test_pick_banned_item_is_unavailable() {
        let mut d = draft(1);
        d.select_side(&sid("b"), Side::Blue, "B", 1).unwrap();
        d.select_side(&sid("r"), Side::Red, "R", 1).unwrap();
        for item in ["x1", "x2", "x3"] {
            d.ban(&sid("b"), item, json!(null)).unwrap();
        }
        for item in ["y1", "y2", "y3"] {
            d.ban(&sid("r"), item, json!(null)).unwrap();
        }

        let err = d.pick(&sid("b"), "y2", json!(null), Utc::now()).unwrap_err();

        assert_eq!(err.code(), "item-unavailable");
        assert_eq!(d.picked_count(), 0);
        assert_eq!(d.turn(), Side::Blue);
    }

    #[test]
    fn test_start_voting_only_once() {
        let mut d = draft(1);
        d.select_side(&sid("b"), Side::Blue, "B", 1).unwrap();
        d.select_side(&sid("r"), Side::Red, "R", 1).unwrap();
        for item in ["1", "2", "3"] {
            d.ban(&sid("b"), item, json!(null)).unwrap();
        }
        for item in ["4", "5", "6"] {
            d.ban(&sid("r"), item, json!(null)).unwrap();
        }
        d.pick(&sid("b"), "7", json!(null), Utc::now()).unwrap();
        d.pick(&sid("r"), "8", json!(null), Utc::now()).unwrap();
        assert_eq!(d.phase(), Phase::Complete);

        let deadline = Utc::now();
        assert_eq!(d.start_voting(deadline), Some(deadline));
        assert_eq!(d.start_voting(deadline), None);

        d.close_voting().unwrap();
        assert_eq!(d.start_voting(deadline), None, "no reopening after a winner");
        assert!(!d.voting_active());
    }

    #[test]
    fn test_start_voting_before_complete_is_noop() {
        let mut d = draft(1);
        assert_eq!(d.start_voting(Utc::now()), None);
        assert!(!d.voting_active());
    }

    #[test]
    fn test_close_voting_when_closed_is_none() {
        let mut d = draft(1);
        assert_eq!(d.close_voting(), None);
        assert_eq!(d.winner(), None);
    }

    #[test]
    fn test_snapshot_exposes_plain_maps() {
        let mut d = draft(2);
        d.select_side(&sid("a"), Side::Blue, "Ana", 1700).unwrap();

        let snap = d.snapshot();

        assert_eq!(snap.player_sides.get(&sid("a")), Some(&Side::Blue));
        assert_eq!(snap.scores[&sid("a")].name, "Ana");
        assert_eq!(snap.leader.blue, Some(sid("a")));
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["playerSides"]["a"], "blue");
        assert_eq!(json["sidePlayers"]["blue"][0], "a");
    }
}
