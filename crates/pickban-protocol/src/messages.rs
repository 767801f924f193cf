//! Named client requests and server events, plus their envelopes.
//!
//! Both directions use "adjacently tagged" JSON so event names read like
//! the ones a browser client emits:
//!
//! ```text
//! { "seq": 4, "request": { "event": "draft-ban", "data": { "teamId": "…", "itemId": "ahri" } } }
//! { "seq": 9, "replyTo": 4, "event": { "event": "ok" } }
//! ```
//!
//! Requests that carry no data omit `data` entirely.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    BanRecord, ChatLine, DraftSnapshot, PickRecord, PlayerInfo, SessionId, Side, TeamId,
    TeamSummary, VoteCounts, Winner,
};

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Everything a client can ask of the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientRequest {
    /// First frame on every connection. `session_id` is the client's
    /// durable identity token.
    Handshake { version: u32, session_id: String },

    /// Keep-alive; answered with `heartbeat-ack`.
    Heartbeat,

    CreateTeam { name: String, mode: String },

    JoinTeam { team_id: TeamId },

    SelectSide {
        team_id: TeamId,
        side: Side,
        display_name: String,
        rank_score: i64,
    },

    DraftBan {
        team_id: TeamId,
        item_id: String,
        #[serde(default)]
        item: serde_json::Value,
    },

    DraftPick {
        team_id: TeamId,
        item_id: String,
        #[serde(default)]
        item: serde_json::Value,
    },

    SubmitVote { team_id: TeamId, choice: Side },

    SetRoomCode { team_id: TeamId, code: String },

    LeaveTeam { team_id: TeamId },

    GetTeams,

    GetPlayerInfo,

    /// Asks for a full resync of the caller's team and draft view.
    RestoreSession,

    DraftChatMessage { team_id: TeamId, text: String },
}

impl ClientRequest {
    /// The wire event name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Handshake { .. } => "handshake",
            Self::Heartbeat => "heartbeat",
            Self::CreateTeam { .. } => "create-team",
            Self::JoinTeam { .. } => "join-team",
            Self::SelectSide { .. } => "select-side",
            Self::DraftBan { .. } => "draft-ban",
            Self::DraftPick { .. } => "draft-pick",
            Self::SubmitVote { .. } => "submit-vote",
            Self::SetRoomCode { .. } => "set-room-code",
            Self::LeaveTeam { .. } => "leave-team",
            Self::GetTeams => "get-teams",
            Self::GetPlayerInfo => "get-player-info",
            Self::RestoreSession => "restore-session",
            Self::DraftChatMessage { .. } => "draft-chat-message",
        }
    }
}

/// A client frame. `seq` is echoed back as `replyTo` on the direct reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientEnvelope {
    #[serde(default)]
    pub seq: u64,
    pub request: ClientRequest,
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Replies and pushes sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    // -- Direct replies --
    HandshakeAck {
        session_id: SessionId,
        restored: bool,
        protocol_version: u32,
    },
    HeartbeatAck,
    TeamCreated {
        team: TeamSummary,
        draft: DraftSnapshot,
    },
    TeamJoined {
        team: TeamSummary,
        draft: DraftSnapshot,
    },
    Teams {
        teams: Vec<TeamSummary>,
    },
    PlayerInfo {
        player: PlayerInfo,
    },
    SessionRestored {
        player: PlayerInfo,
        team: Option<TeamSummary>,
        draft: Option<DraftSnapshot>,
    },
    Ok,
    /// A request was refused. `code` is a stable kebab-case reason.
    Rejected {
        code: String,
        message: String,
    },

    // -- Lobby pushes --
    TeamsUpdated {
        teams: Vec<TeamSummary>,
    },

    // -- Team pushes --
    DraftState {
        draft: DraftSnapshot,
    },
    PlayerJoined {
        session_id: SessionId,
        team: TeamSummary,
    },
    PlayerLeft {
        session_id: SessionId,
        draft: DraftSnapshot,
    },
    PlayerDisconnected {
        session_id: SessionId,
        draft: DraftSnapshot,
    },
    SideSelected {
        session_id: SessionId,
        side: Side,
        draft: DraftSnapshot,
    },
    DraftStarted {
        draft: DraftSnapshot,
    },
    ItemBanned {
        ban: BanRecord,
        draft: DraftSnapshot,
    },
    ItemPicked {
        pick: PickRecord,
        draft: DraftSnapshot,
    },
    DraftComplete {
        draft: DraftSnapshot,
    },
    VotingStarted {
        deadline: DateTime<Utc>,
        draft: DraftSnapshot,
    },
    VoteUpdate {
        counts: VoteCounts,
    },
    VotingEnded {
        winner: Winner,
        counts: VoteCounts,
        draft: DraftSnapshot,
    },
    RoomCodeSet {
        code: String,
    },
    ChatMessage(ChatLine),
}

impl ServerEvent {
    /// The wire event name, for logging and tests.
    pub fn name(&self) -> &'static str {
        match self {
            Self::HandshakeAck { .. } => "handshake-ack",
            Self::HeartbeatAck => "heartbeat-ack",
            Self::TeamCreated { .. } => "team-created",
            Self::TeamJoined { .. } => "team-joined",
            Self::Teams { .. } => "teams",
            Self::PlayerInfo { .. } => "player-info",
            Self::SessionRestored { .. } => "session-restored",
            Self::Ok => "ok",
            Self::Rejected { .. } => "rejected",
            Self::TeamsUpdated { .. } => "teams-updated",
            Self::DraftState { .. } => "draft-state",
            Self::PlayerJoined { .. } => "player-joined",
            Self::PlayerLeft { .. } => "player-left",
            Self::PlayerDisconnected { .. } => "player-disconnected",
            Self::SideSelected { .. } => "side-selected",
            Self::DraftStarted { .. } => "draft-started",
            Self::ItemBanned { .. } => "item-banned",
            Self::ItemPicked { .. } => "item-picked",
            Self::DraftComplete { .. } => "draft-complete",
            Self::VotingStarted { .. } => "voting-started",
            Self::VoteUpdate { .. } => "vote-update",
            Self::VotingEnded { .. } => "voting-ended",
            Self::RoomCodeSet { .. } => "room-code-set",
            Self::ChatMessage(_) => "chat-message",
        }
    }
}

/// A server frame. `reply_to` is set only on direct replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerEnvelope {
    pub seq: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<u64>,
    pub event: ServerEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_request_json_shape() {
        let json = r#"{
            "seq": 3,
            "request": {
                "event": "select-side",
                "data": { "teamId": "abc", "side": "red", "displayName": "Ana", "rankScore": 1800 }
            }
        }"#;
        let env: ClientEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(env.seq, 3);
        assert_eq!(
            env.request,
            ClientRequest::SelectSide {
                team_id: TeamId::from("abc"),
                side: Side::Red,
                display_name: "Ana".into(),
                rank_score: 1800,
            }
        );
    }

    #[test]
    fn test_client_request_unit_variant_without_data() {
        let env: ClientEnvelope =
            serde_json::from_str(r#"{ "seq": 1, "request": { "event": "get-teams" } }"#).unwrap();
        assert_eq!(env.request, ClientRequest::GetTeams);
        assert_eq!(env.request.name(), "get-teams");
    }

    #[test]
    fn test_draft_ban_item_defaults_to_null() {
        let json = r#"{ "request": { "event": "draft-ban", "data": { "teamId": "t", "itemId": "zed" } } }"#;
        let env: ClientEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(env.seq, 0);
        match env.request {
            ClientRequest::DraftBan { item_id, item, .. } => {
                assert_eq!(item_id, "zed");
                assert!(item.is_null());
            }
            other => panic!("unexpected request {other:?}"),
        }
    }

    #[test]
    fn test_unknown_event_is_a_decode_error() {
        let json = r#"{ "request": { "event": "fly-to-moon" } }"#;
        assert!(serde_json::from_str::<ClientEnvelope>(json).is_err());
    }

    #[test]
    fn test_server_envelope_reply_shape() {
        let env = ServerEnvelope {
            seq: 9,
            reply_to: Some(4),
            event: ServerEvent::Rejected {
                code: "invalid-turn".into(),
                message: "not your turn".into(),
            },
        };
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["replyTo"], 4);
        assert_eq!(json["event"]["event"], "rejected");
        assert_eq!(json["event"]["data"]["code"], "invalid-turn");
    }

    #[test]
    fn test_server_envelope_push_omits_reply_to() {
        let env = ServerEnvelope {
            seq: 1,
            reply_to: None,
            event: ServerEvent::VoteUpdate {
                counts: VoteCounts { blue: 3, red: 2 },
            },
        };
        let json = serde_json::to_value(&env).unwrap();
        assert!(json.get("replyTo").is_none());
        assert_eq!(json["event"]["event"], "vote-update");
        assert_eq!(json["event"]["data"]["counts"]["blue"], 3);
    }
}
