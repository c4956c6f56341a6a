//! Error types for the simulation core.
//!
//! Commands fail with a [`CommandError`] and leave everything untouched.
//! A [`SimError`] means the session's data can no longer be trusted and
//! the turn loop must stop.

use crate::types::{CityId, PlayerId, UnitId};

/// Why a city, unit or player command was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Missing argument {index} for {command}")]
    MissingArgument { command: &'static str, index: usize },

    #[error("Malformed argument {index} for {command}: {reason}")]
    MalformedArgument {
        command: &'static str,
        index: usize,
        reason: String,
    },

    #[error("Unknown city {0}")]
    UnknownCity(CityId),

    #[error("Unknown unit {0}")]
    UnknownUnit(UnitId),

    #[error("Unknown player {0}")]
    UnknownPlayer(PlayerId),

    #[error("Every player slot is taken")]
    NoFreePlayerSlot,

    #[error("Unknown catalog entry: {0}")]
    UnknownTemplate(String),

    #[error("Player {player} does not own {what}")]
    NotOwner { player: PlayerId, what: String },

    #[error("Command not available: {0}")]
    Unavailable(String),

    #[error("Invalid action: {0}")]
    InvalidAction(String),
}

impl CommandError {
    pub(crate) fn malformed(command: &'static str, index: usize, reason: impl Into<String>) -> Self {
        CommandError::MalformedArgument {
            command,
            index,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        CommandError::InvalidAction(reason.into())
    }
}

/// Fatal inconsistency in session data.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    #[error("Catalog inconsistency: {0}")]
    Catalog(String),

    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Entity state inconsistency: {0}")]
    State(String),
}

/// Problems with a [`GameSettings`](crate::settings::GameSettings) document.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    #[error("Game name cannot be empty")]
    EmptyName,

    #[error("Game name must be 64 characters or less")]
    NameTooLong,

    #[error("Need at least 1 player")]
    TooFewPlayers,

    #[error("Maximum 8 players allowed")]
    TooManyPlayers,

    #[error("World is too small for this many players")]
    WorldTooSmallForPlayers,

    #[error("Resource chance must be between 0 and 1, got {0}")]
    ResourceChanceOutOfRange(f64),

    #[error("Settings document is not valid JSON: {0}")]
    Json(String),
}

impl From<serde_json::Error> for SettingsError {
    fn from(err: serde_json::Error) -> Self {
        SettingsError::Json(err.to_string())
    }
}

/// The turn loop a [`CommandSender`](crate::session::CommandSender) feeds
/// has shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Turn loop is no longer accepting commands")]
pub struct SessionClosed;

/// Result type for fallible simulation steps.
pub type Result<T> = std::result::Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_messages() {
        let err = CommandError::malformed("Rename", 0, "expected string");
        assert_eq!(
            err.to_string(),
            "Malformed argument 0 for Rename: expected string"
        );
        assert_eq!(CommandError::UnknownUnit(7).to_string(), "Unknown unit 7");
    }

    #[test]
    fn test_settings_error_converts_to_sim_error() {
        let err: SimError = SettingsError::EmptyName.into();
        assert_eq!(err, SimError::Settings(SettingsError::EmptyName));
        assert!(err.to_string().contains("Game name cannot be empty"));
    }
}
