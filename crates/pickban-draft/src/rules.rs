//! Input limits and text normalization for client-supplied fields.

use pickban_protocol::TeamMode;

use crate::DraftError;

/// Bans each side gets before the pick phase.
pub const BANS_PER_SIDE: u8 = 3;

pub const MAX_TEAM_NAME_CHARS: usize = 32;
pub const MAX_DISPLAY_NAME_CHARS: usize = 24;
pub const MAX_ROOM_CODE_CHARS: usize = 32;
pub const MAX_ITEM_ID_CHARS: usize = 64;

/// Trims `raw` and checks it is non-empty and at most `max` characters.
pub fn clean_text(raw: &str, field: &str, max: usize) -> Result<String, DraftError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DraftError::InvalidRequest(format!("{field} is empty")));
    }
    if trimmed.chars().count() > max {
        return Err(DraftError::InvalidRequest(format!(
            "{field} is longer than {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Cuts `text` to at most `max` characters, on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Parses an `NvN` team mode string.
pub fn parse_mode(raw: &str) -> Result<TeamMode, DraftError> {
    raw.parse()
        .map_err(|e: pickban_protocol::ProtocolError| DraftError::InvalidRequest(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_trims_and_bounds() {
        assert_eq!(clean_text("  Ana ", "name", 24).unwrap(), "Ana");
        assert!(clean_text("   ", "name", 24).is_err());
        assert!(clean_text(&"x".repeat(25), "name", 24).is_err());
    }

    #[test]
    fn test_truncate_chars_respects_multibyte_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_parse_mode_maps_errors_to_invalid_request() {
        assert_eq!(parse_mode("3v3").unwrap().quorum_per_side(), 3);
        assert_eq!(parse_mode("7v7").unwrap_err().code(), "invalid-request");
    }
}
