//! Hexempire Core Library
//!
//! Turn-based simulation core for a hex-grid 4X strategy game. The crate
//! generates worlds, keeps the authoritative board, city, unit and player
//! state for one session, validates commands and advances the session one
//! turn at a time.
//!
//! # Design Principles
//!
//! - **No transport or UI**: hosts feed commands in and drain change events out
//! - **Deterministic**: same settings, seed and commands give the same session
//! - **Injected content**: templates come from a [`Catalog`], randomness from a [`RandomSource`]
//! - **Serializable**: entities and events round-trip through serde

// Board primitives
pub mod board;
pub mod hex;
pub mod terrain;
pub mod types;
pub mod yields;

// World generation
pub mod mapgen;
pub mod noise;
pub mod random;

// Movement
pub mod pathfinding;

// Session inputs
pub mod catalog;
pub mod commands;
pub mod settings;

// Entities and rules
pub mod city;
pub mod combat;
pub mod player;
pub mod unit;

// Controllers
pub mod board_controller;
pub mod city_controller;
pub mod manager;
pub mod player_controller;
pub mod unit_controller;

// Outputs, errors and the turn loop
pub mod error;
pub mod events;
pub mod session;

// Re-exports for convenience
pub use board::{Board, Construction, Tile, IMPASSABLE};
pub use board_controller::BoardController;
pub use catalog::{
    validate_catalog, BuildingTemplate, Catalog, CommandUnlock, StaticCatalog, TechTemplate,
    UnitArchetype, UnitTemplate,
};
pub use city::{City, GrowthOutcome, ProductionItem, ProductionOrder};
pub use city_controller::{CityController, SpawnRequest};
pub use combat::{combat_damage, effective_strength, CombatDamage, CombatOutcome};
pub use commands::{
    CityAction, CityCommand, CityCommandKind, PlayerAction, PlayerCommand, PlayerCommandKind,
    UnitAction, UnitCommand, UnitCommandKind,
};
pub use error::{CommandError, SessionClosed, SettingsError, SimError};
pub use events::{ChangeEvent, Notifications};
pub use hex::{Direction, HexCoord};
pub use manager::ControllerManager;
pub use mapgen::{find_starting_positions, generate_board, WorldGenConfig, WorldGenerator};
pub use pathfinding::{find_path, PathResult};
pub use player::{Player, TechProgress};
pub use player_controller::PlayerController;
pub use random::{GameRng, RandomSource, SequenceRandom};
pub use session::{CommandSender, InboundCommand, TurnLoop, TurnReport};
pub use settings::{GameSettings, GameSpeed};
pub use terrain::{Feature, Improvement, Resource, ResourceCategory, Road, Terrain};
pub use types::*;
pub use unit::Unit;
pub use unit_controller::UnitController;
pub use yields::{YieldKind, Yields};
