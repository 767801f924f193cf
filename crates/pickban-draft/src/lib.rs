//! Team directory and draft engine for pickban.
//!
//! Everything here is plain synchronous state. The hub owns one
//! [`TeamDirectory`], processes one event at a time against it, and is
//! responsible for timers and broadcasting.
//!
//! # Key types
//!
//! - [`TeamDirectory`]: team lifecycle, at most one team per session
//! - [`Team`]: a lobby with its mode, members, status and [`DraftState`]
//! - [`DraftState`]: sides, bans and picks, then the post-game vote
//! - [`DraftError`]: every rejection, with a stable reason code

mod draft;
mod error;
mod leader;
pub mod rules;
mod team;

pub use draft::{BanOutcome, Departure, DraftState, PickOutcome, SideSelection, VotingResult};
pub use error::{DraftError, ErrorKind};
pub use leader::elect_leader;
pub use team::{Removal, Team, TeamDirectory};
