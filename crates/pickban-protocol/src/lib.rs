//! Wire protocol for pickban.
//!
//! This crate defines what travels between browser clients and the draft
//! server, and nothing else:
//!
//! - **Identities** ([`SessionId`], [`TeamId`], [`ConnectionId`])
//! - **Domain enums** ([`Side`], [`Phase`], [`TeamStatus`], [`TeamMode`], [`Winner`])
//! - **Messages** ([`ClientRequest`], [`ServerEvent`] and their envelopes)
//! - **Snapshots** ([`DraftSnapshot`], [`TeamSummary`], …), the explicit
//!   broadcast shapes of engine state
//! - **Codec** ([`Codec`] trait, [`JsonCodec`])
//!
//! ```text
//! Transport (text frames) → Protocol (envelopes) → Hub (sessions, teams, drafts)
//! ```

mod codec;
mod domain;
mod error;
mod ids;
mod messages;
mod snapshot;

pub use codec::{Codec, JsonCodec};
pub use domain::{Phase, Side, TeamMode, TeamStatus, Winner};
pub use error::ProtocolError;
pub use ids::{ConnectionId, MAX_SESSION_ID_LEN, SessionId, TeamId};
pub use messages::{ClientEnvelope, ClientRequest, ServerEnvelope, ServerEvent};
pub use snapshot::{
    BanRecord, ChatLine, DraftSnapshot, PerSide, PickRecord, PlayerInfo, PlayerScore,
    TeamSummary, VoteCounts,
};
