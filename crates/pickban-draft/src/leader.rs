//! Leader election.
//!
//! A side's leader is the member with the strictly highest rank score.
//! Ties go to whoever joined the side first: the scan runs in side-list
//! order and only a strictly greater score displaces the current best.
//! The leader is always recomputed from the side list, never patched.

use std::collections::HashMap;

use pickban_protocol::{PlayerScore, SessionId};

/// Elects the leader of one side. `None` iff `members` is empty.
///
/// A member with no recorded score ranks below every scored member.
pub fn elect_leader(
    members: &[SessionId],
    scores: &HashMap<SessionId, PlayerScore>,
) -> Option<SessionId> {
    let mut best: Option<(&SessionId, i64)> = None;
    for member in members {
        let score = scores.get(member).map_or(i64::MIN, |s| s.rank_score);
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((member, score)),
        }
    }
    best.map(|(member, _)| member.clone())
}
