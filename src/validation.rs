//! Name validation for player identifiers and home names

use crate::storage::DEFAULT_HOME_KEY;

/// Longest player identifier accepted as a document key
pub const MAX_PLAYER_ID_LEN: usize = 64;

/// Player identifier validation errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PlayerIdError {
    #[error("Player id is empty")]
    Empty,

    #[error("Player id is too long (maximum {max} characters)")]
    TooLong { max: usize },

    #[error("Player id contains control characters")]
    ControlCharacters,
}

/// Home name validation errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HomeNameError {
    #[error("Home name is empty")]
    Empty,

    #[error("Home name '__default__' is reserved")]
    Reserved,
}

/// Generate safe filename from a player id using URL encoding
pub fn safe_filename(player: &str) -> String {
    use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
    utf8_percent_encode(player, NON_ALPHANUMERIC).to_string()
}

/// Validate a player id and return the trimmed form used as the document key.
pub fn validate_player_id(player: &str) -> Result<String, PlayerIdError> {
    let trimmed = player.trim();
    if trimmed.is_empty() {
        return Err(PlayerIdError::Empty);
    }
    if trimmed.chars().count() > MAX_PLAYER_ID_LEN {
        return Err(PlayerIdError::TooLong {
            max: MAX_PLAYER_ID_LEN,
        });
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(PlayerIdError::ControlCharacters);
    }
    Ok(trimmed.to_string())
}

/// Home names are case-sensitive and kept verbatim; only the empty string and the
/// reserved default key are refused.
pub fn validate_home_name(name: &str) -> Result<(), HomeNameError> {
    if name.is_empty() {
        return Err(HomeNameError::Empty);
    }
    if name == DEFAULT_HOME_KEY {
        return Err(HomeNameError::Reserved);
    }
    Ok(())
}

/// Validate a folder name taken from config (single path component, no traversal).
pub fn validate_folder_name(folder: &str) -> Result<(), String> {
    if folder.trim().is_empty() {
        return Err("folder name cannot be empty".to_string());
    }
    if folder.contains('/') || folder.contains('\\') {
        return Err(format!("folder name '{}' contains a path separator", folder));
    }
    if folder == "." || folder == ".." {
        return Err(format!("folder name '{}' is not allowed", folder));
    }
    Ok(())
}
