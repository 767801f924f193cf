//! Small domain enums shared by every layer: sides, phases, team status,
//! team mode and the vote outcome.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// One of the two competing groups inside a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Blue,
    Red,
}

impl Side {
    /// Both sides, blue first.
    pub const ALL: [Side; 2] = [Side::Blue, Side::Red];

    /// The opposing side.
    pub fn other(self) -> Self {
        match self {
            Self::Blue => Self::Red,
            Self::Red => Self::Blue,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blue => f.write_str("blue"),
            Self::Red => f.write_str("red"),
        }
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Draft phase. Only ever moves forward:
///
/// ```text
/// Waiting → Ban → Pick → Complete
/// ```
///
/// The derived `Ord` follows declaration order, so `phase_a < phase_b`
/// reads as "a comes before b".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Waiting,
    Ban,
    Pick,
    Complete,
}

impl Phase {
    /// The phase that follows this one, or `None` at the end.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Waiting => Some(Self::Ban),
            Self::Ban => Some(Self::Pick),
            Self::Pick => Some(Self::Complete),
            Self::Complete => None,
        }
    }

    /// Returns `true` if moving to `target` is a legal single step.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => f.write_str("waiting"),
            Self::Ban => f.write_str("ban"),
            Self::Pick => f.write_str("pick"),
            Self::Complete => f.write_str("complete"),
        }
    }
}

// ---------------------------------------------------------------------------
// TeamStatus
// ---------------------------------------------------------------------------

/// Lobby-facing status label of a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamStatus {
    /// Sides are still filling up.
    Waiting,
    /// Ban or pick phase in progress.
    Drafting,
    /// Draft complete, the game itself is being played.
    Live,
    /// Voting closed and a winner was recorded.
    Finished,
}

impl TeamStatus {
    /// Returns `true` if new members may still join.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Waiting)
    }
}

impl fmt::Display for TeamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => f.write_str("waiting"),
            Self::Drafting => f.write_str("drafting"),
            Self::Live => f.write_str("live"),
            Self::Finished => f.write_str("finished"),
        }
    }
}

// ---------------------------------------------------------------------------
// TeamMode
// ---------------------------------------------------------------------------

/// Team size mode, written `NvN` on the wire (`"5v5"`).
///
/// The mode fixes both the per-side quorum and the total member capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TeamMode {
    per_side: u8,
}

impl TeamMode {
    /// Largest supported side size.
    pub const MAX_PER_SIDE: u8 = 5;

    /// Builds a mode with `per_side` players on each side.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidMessage`] unless `1 <= per_side <= MAX_PER_SIDE`.
    pub fn new(per_side: u8) -> Result<Self, ProtocolError> {
        if per_side == 0 || per_side > Self::MAX_PER_SIDE {
            return Err(ProtocolError::InvalidMessage(format!(
                "team mode must be between 1v1 and {0}v{0}",
                Self::MAX_PER_SIDE
            )));
        }
        Ok(Self { per_side })
    }

    /// Members each side needs before the draft can leave `waiting`.
    pub fn quorum_per_side(&self) -> usize {
        self.per_side as usize
    }

    /// Maximum number of members in the team.
    pub fn total_capacity(&self) -> usize {
        self.quorum_per_side() * 2
    }
}

impl FromStr for TeamMode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ProtocolError::InvalidMessage(format!("unknown team mode {s:?}"));
        let (left, right) = s.trim().split_once(['v', 'V']).ok_or_else(bad)?;
        let left: u8 = left.parse().map_err(|_| bad())?;
        let right: u8 = right.parse().map_err(|_| bad())?;
        if left != right {
            return Err(bad());
        }
        Self::new(left)
    }
}

impl TryFrom<String> for TeamMode {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TeamMode> for String {
    fn from(mode: TeamMode) -> Self {
        mode.to_string()
    }
}

impl fmt::Display for TeamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{0}v{0}", self.per_side)
    }
}

// ---------------------------------------------------------------------------
// Winner
// ---------------------------------------------------------------------------

/// Result of the post-game vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Blue,
    Red,
    Draw,
}

impl Winner {
    /// Strict-majority tally. Equal counts, including zero votes, are a draw.
    pub fn from_counts(blue: usize, red: usize) -> Self {
        match blue.cmp(&red) {
            std::cmp::Ordering::Greater => Self::Blue,
            std::cmp::Ordering::Less => Self::Red,
            std::cmp::Ordering::Equal => Self::Draw,
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blue => f.write_str("blue"),
            Self::Red => f.write_str("red"),
            Self::Draw => f.write_str("draw"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_other_flips() {
        assert_eq!(Side::Blue.other(), Side::Red);
        assert_eq!(Side::Red.other(), Side::Blue);
    }

    #[test]
    fn test_side_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Side::Blue).unwrap(), "\"blue\"");
        let side: Side = serde_json::from_str("\"red\"").unwrap();
        assert_eq!(side, Side::Red);
    }

    #[test]
    fn test_phase_next_follows_strict_order() {
        assert_eq!(Phase::Waiting.next(), Some(Phase::Ban));
        assert_eq!(Phase::Ban.next(), Some(Phase::Pick));
        assert_eq!(Phase::Pick.next(), Some(Phase::Complete));
        assert_eq!(Phase::Complete.next(), None);
        assert!(!Phase::Waiting.can_transition_to(Phase::Pick));
        assert!(Phase::Waiting < Phase::Complete);
    }

    #[test]
    fn test_team_mode_parse_5v5() {
        let mode: TeamMode = "5v5".parse().unwrap();
        assert_eq!(mode.quorum_per_side(), 5);
        assert_eq!(mode.total_capacity(), 10);
        assert_eq!(mode.to_string(), "5v5");
    }

    #[test]
    fn test_team_mode_parse_rejects_asymmetric_and_out_of_range() {
        assert!("3v2".parse::<TeamMode>().is_err());
        assert!("0v0".parse::<TeamMode>().is_err());
        assert!("6v6".parse::<TeamMode>().is_err());
        assert!("five".parse::<TeamMode>().is_err());
    }

    #[test]
    fn test_team_mode_json_is_a_string() {
        let mode: TeamMode = serde_json::from_str("\"2v2\"").unwrap();
        assert_eq!(mode.quorum_per_side(), 2);
        assert_eq!(serde_json::to_string(&mode).unwrap(), "\"2v2\"");
        assert!(serde_json::from_str::<TeamMode>("\"9v9\"").is_err());
    }

    #[test]
    fn test_winner_from_counts() {
        assert_eq!(Winner::from_counts(3, 2), Winner::Blue);
        assert_eq!(Winner::from_counts(1, 4), Winner::Red);
        assert_eq!(Winner::from_counts(2, 2), Winner::Draw);
        assert_eq!(Winner::from_counts(0, 0), Winner::Draw);
    }

    #[test]
    fn test_team_status_is_joinable() {
        assert!(TeamStatus::Waiting.is_joinable());
        assert!(!TeamStatus::Drafting.is_joinable());
        assert!(!TeamStatus::Finished.is_joinable());
    }
}
