//! Error types for the draft layer.
//!
//! Every rejection is local and recoverable: the state is left untouched
//! and only the caller hears about it, through [`DraftError::code`].

use pickban_protocol::{Side, TeamId};

/// The broad class of a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidPhase,
    InvalidTurn,
    Unauthorized,
    QuotaExceeded,
    DuplicateAction,
    InvalidRequest,
}

/// Errors returned by team and draft operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    /// The team (or its draft state) does not exist.
    #[error("team {0} not found")]
    TeamNotFound(TeamId),

    /// The caller is not a member of the team it addressed.
    #[error("not a member of team {0}")]
    NotMember(TeamId),

    /// The operation is not legal in the current phase.
    #[error("{0}")]
    InvalidPhase(String),

    /// The caller's side does not hold the turn.
    #[error("it is {turn}'s turn")]
    InvalidTurn { turn: Side },

    /// The caller lacks the required role (side membership or leadership).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The team already has as many members as its mode allows.
    #[error("team {team} is full ({capacity} members)")]
    CapacityExceeded { team: TeamId, capacity: usize },

    /// The chosen side already has its quorum.
    #[error("{0} side is full")]
    SideFull(Side),

    /// The side already used all of its bans.
    #[error("{0} side has no bans left")]
    BanQuota(Side),

    /// The session is already a member of this team.
    #[error("already a member of team {0}")]
    AlreadyMember(TeamId),

    /// The session is already a member of a different team.
    #[error("already a member of team {0}")]
    AlreadyInTeam(TeamId),

    /// The session already made its pick.
    #[error("already picked")]
    AlreadyPicked,

    /// The item was already banned or picked.
    #[error("item {0:?} is no longer available")]
    ItemUnavailable(String),

    /// The request payload is malformed (empty name, unknown mode, …).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl DraftError {
    /// Stable kebab-case reason code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::TeamNotFound(_) | Self::NotMember(_) => "not-found",
            Self::InvalidPhase(_) => "invalid-phase",
            Self::InvalidTurn { .. } => "invalid-turn",
            Self::Unauthorized(_) => "unauthorized",
            Self::CapacityExceeded { .. } => "capacity-exceeded",
            Self::SideFull(_) => "side-full",
            Self::BanQuota(_) => "ban-quota",
            Self::AlreadyMember(_) => "already-member",
            Self::AlreadyInTeam(_) => "already-in-team",
            Self::AlreadyPicked => "already-picked",
            Self::ItemUnavailable(_) => "item-unavailable",
            Self::InvalidRequest(_) => "invalid-request",
        }
    }

    /// Which class of the error taxonomy this rejection belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TeamNotFound(_) | Self::NotMember(_) => ErrorKind::NotFound,
            Self::InvalidPhase(_) => ErrorKind::InvalidPhase,
            Self::InvalidTurn { .. } => ErrorKind::InvalidTurn,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::CapacityExceeded { .. } | Self::SideFull(_) | Self::BanQuota(_) => {
                ErrorKind::QuotaExceeded
            }
            Self::AlreadyMember(_)
            | Self::AlreadyInTeam(_)
            | Self::AlreadyPicked
            | Self::ItemUnavailable(_) => ErrorKind::DuplicateAction,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_kebab_case_and_grouped() {
        let err = DraftError::SideFull(Side::Blue);
        assert_eq!(err.code(), "side-full");
        assert_eq!(err.kind(), ErrorKind::QuotaExceeded);

        let err = DraftError::AlreadyPicked;
        assert_eq!(err.code(), "already-picked");
        assert_eq!(err.kind(), ErrorKind::DuplicateAction);

        let err = DraftError::InvalidTurn { turn: Side::Red };
        assert_eq!(err.to_string(), "it is red's turn");
    }
}
