//! Explicit wire snapshots.
//!
//! The engine keeps its state in hash maps and sets; none of that leaks
//! onto the wire. Each broadcast carries one of these plain structs instead,
//! with associative data rendered as ordered key/value objects
//! (`BTreeMap` keyed by session id) so two snapshots of the same state
//! serialize to the same bytes.

use std::collections::BTreeMap;
use std::ops::{Index, IndexMut};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Phase, SessionId, Side, TeamId, TeamMode, TeamStatus, Winner};

// ---------------------------------------------------------------------------
// PerSide
// ---------------------------------------------------------------------------

/// A pair of values, one per [`Side`].
///
/// Indexable by side: `bans[Side::Red] += 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerSide<T> {
    pub blue: T,
    pub red: T,
}

impl<T> PerSide<T> {
    pub fn new(blue: T, red: T) -> Self {
        Self { blue, red }
    }

    /// Applies `f` to both values.
    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> PerSide<U> {
        PerSide {
            blue: f(&self.blue),
            red: f(&self.red),
        }
    }
}

impl<T> Index<Side> for PerSide<T> {
    type Output = T;

    fn index(&self, side: Side) -> &T {
        match side {
            Side::Blue => &self.blue,
            Side::Red => &self.red,
        }
    }
}

impl<T> IndexMut<Side> for PerSide<T> {
    fn index_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::Blue => &mut self.blue,
            Side::Red => &mut self.red,
        }
    }
}

// ---------------------------------------------------------------------------
// Draft records
// ---------------------------------------------------------------------------

/// A player's self-reported name and ranking score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerScore {
    pub name: String,
    pub rank_score: i64,
}

/// One accepted ban. `item` is the client's opaque payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BanRecord {
    pub item_id: String,
    pub item: serde_json::Value,
    pub banner_session_id: SessionId,
    pub side: Side,
}

/// One accepted pick. `item` is the client's opaque payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickRecord {
    pub item_id: String,
    pub item: serde_json::Value,
    pub side: Side,
    pub picker_session_id: SessionId,
}

/// Full state of one team's draft, as sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSnapshot {
    pub team_id: TeamId,
    pub phase: Phase,
    pub turn: Side,
    pub turn_number: u32,
    pub quorum_per_side: usize,
    pub side_players: PerSide<Vec<SessionId>>,
    pub player_sides: BTreeMap<SessionId, Side>,
    pub scores: BTreeMap<SessionId, PlayerScore>,
    pub leader: PerSide<Option<SessionId>>,
    pub ban_count: PerSide<u8>,
    pub bans: Vec<BanRecord>,
    pub picks: Vec<PickRecord>,
    pub picked_by: Vec<SessionId>,
    pub room_code: Option<String>,
    pub game_started_at: Option<DateTime<Utc>>,
    pub voting_active: bool,
    pub voting_deadline: Option<DateTime<Utc>>,
    pub votes: BTreeMap<SessionId, Side>,
    pub winner: Option<Winner>,
}

// ---------------------------------------------------------------------------
// Lobby / player views
// ---------------------------------------------------------------------------

/// A team as listed in the lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    pub id: TeamId,
    pub name: String,
    pub mode: TeamMode,
    pub created_at: DateTime<Utc>,
    pub members: Vec<SessionId>,
    pub capacity: usize,
    pub status: TeamStatus,
}

/// What the server knows about one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub session_id: SessionId,
    pub team_id: Option<TeamId>,
    pub side: Option<Side>,
    pub display_name: Option<String>,
    pub rank_score: Option<i64>,
    pub live_connections: usize,
}

/// Running vote totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCounts {
    pub blue: usize,
    pub red: usize,
}

/// A relayed team chat line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatLine {
    pub session_id: SessionId,
    pub name: Option<String>,
    pub side: Side,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}
