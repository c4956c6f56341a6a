//! Game settings and configuration.

use crate::error::SettingsError;
use crate::mapgen::WorldGenConfig;
use crate::types::{WorldSize, WorldType};
use serde::{Deserialize, Serialize};

/// Minimum number of tiles each player should have to themselves.
const MIN_TILES_PER_PLAYER: u32 = 50;

/// Configuration for a game session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    /// Display name for the game.
    pub name: String,
    /// Land/sea layout recipe.
    pub world_type: WorldType,
    /// World size preset.
    pub world_size: WorldSize,
    /// Number of players (1-8).
    pub player_count: u8,
    /// Seed for the session's random source.
    pub seed: u64,
    /// Game speed (scales production and research costs).
    pub game_speed: GameSpeed,
    /// Overrides for the world generation passes.
    pub worldgen: Option<WorldGenConfig>,
}

impl GameSettings {
    /// Create default settings for a new game.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            world_type: WorldType::Pangea,
            world_size: WorldSize::Standard,
            player_count: 2,
            seed: 0,
            game_speed: GameSpeed::Normal,
            worldgen: None,
        }
    }

    /// Parse a settings document.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: GameSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize to a pretty-printed settings document.
    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate settings and return any errors.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.name.is_empty() {
            return Err(SettingsError::EmptyName);
        }
        if self.name.len() > 64 {
            return Err(SettingsError::NameTooLong);
        }
        if self.player_count < 1 {
            return Err(SettingsError::TooFewPlayers);
        }
        if self.player_count > 8 {
            return Err(SettingsError::TooManyPlayers);
        }
        let (width, height) = self.world_size.dimensions();
        if width * height / (self.player_count as u32) < MIN_TILES_PER_PLAYER {
            return Err(SettingsError::WorldTooSmallForPlayers);
        }
        if let Some(chance) = self.world_config().resource_chance {
            if !(0.0..=1.0).contains(&chance) {
                return Err(SettingsError::ResourceChanceOutOfRange(chance));
            }
        }
        Ok(())
    }

    /// World generation configuration for these settings.
    ///
    /// An explicit override keeps its pass settings but always follows the
    /// session's world type and size.
    pub fn world_config(&self) -> WorldGenConfig {
        match &self.worldgen {
            Some(config) => WorldGenConfig {
                world_type: self.world_type,
                world_size: self.world_size,
                ..config.clone()
            },
            None => WorldGenConfig::for_world(self.world_type, self.world_size),
        }
    }
}

impl Default for GameSettings {
    fn default() -> Self {
        Self::new("New Game")
    }
}

/// Pace of the session. Scales production and research costs, but not
/// improvement construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GameSpeed {
    Quick,
    #[default]
    Normal,
    Epic,
    Marathon,
}

impl GameSpeed {
    /// Cost multiplier shared by production and research.
    pub const fn cost_multiplier(&self) -> f32 {
        match self {
            GameSpeed::Quick => 0.67,
            GameSpeed::Normal => 1.0,
            GameSpeed::Epic => 1.5,
            GameSpeed::Marathon => 3.0,
        }
    }

    /// Production cost of an item at this speed.
    pub fn production_cost(&self, base: u32) -> u32 {
        scale(base, self.cost_multiplier())
    }

    /// Research cost of a technology at this speed.
    pub fn research_cost(&self, base: u32) -> u32 {
        scale(base, self.cost_multiplier())
    }
}

/// Scaled cost, rounded and never below 1.
fn scale(base: u32, multiplier: f32) -> u32 {
    ((base as f32 * multiplier).round() as u32).max(1)
}
