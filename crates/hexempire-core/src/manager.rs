//! The per-session controller set and its turn order.
//!
//! A [`ControllerManager`] owns one instance of every controller along with
//! the injected catalog and random source. Commands are applied immediately
//! through the `command_*` entry points; [`ControllerManager::process_turn`]
//! advances board, players, cities and units in that order.

use crate::board::Board;
use crate::board_controller::BoardController;
use crate::catalog::{validate_catalog, Catalog};
use crate::city_controller::CityController;
use crate::commands::{CityCommand, PlayerCommand, UnitCommand};
use crate::error::{CommandError, Result, SimError};
use crate::events::{ChangeEvent, Notifications};
use crate::hex::HexCoord;
use crate::mapgen::{find_starting_positions, WorldGenerator};
use crate::player_controller::PlayerController;
use crate::random::{GameRng, RandomSource};
use crate::settings::GameSettings;
use crate::types::{PlayerId, SessionId, TechId, UnitId};
use crate::unit_controller::UnitController;
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Unit every player starts with to found their first city.
pub const STARTING_SETTLER: &str = "settler";

/// Unit every player starts with to guard it.
pub const STARTING_ESCORT: &str = "warrior";

/// Owner of a game session's simulation state.
pub struct ControllerManager {
    settings: GameSettings,
    catalog: Box<dyn Catalog + Send + Sync>,
    rng: Box<dyn RandomSource + Send>,
    turn: u32,
    board: BoardController,
    cities: CityController,
    units: UnitController,
    players: PlayerController,
    notes: Notifications,
}

impl ControllerManager {
    /// Build a manager around an existing board.
    ///
    /// Fails if the settings are invalid or the catalog references
    /// something it does not define.
    pub fn new(
        settings: GameSettings,
        catalog: Box<dyn Catalog + Send + Sync>,
        board: Board,
        rng: Box<dyn RandomSource + Send>,
    ) -> Result<Self> {
        settings.validate()?;
        validate_catalog(&*catalog)?;
        Ok(Self {
            settings,
            catalog,
            rng,
            turn: 1,
            board: BoardController::new(board),
            cities: CityController::new(),
            units: UnitController::new(),
            players: PlayerController::new(),
            notes: Notifications::new(),
        })
    }

    /// Generate a world from the settings and seat every player on it with
    /// a settler and an escort.
    pub fn new_game(settings: GameSettings, catalog: Box<dyn Catalog + Send + Sync>) -> Result<Self> {
        settings.validate()?;
        let mut rng = GameRng::seeded(settings.seed);
        let board = WorldGenerator::new(settings.world_config(), &mut rng).generate();
        info!(
            world_type = ?settings.world_type,
            world_size = %settings.world_size,
            seed = settings.seed,
            "world generated"
        );

        let count = settings.player_count as usize;
        let starts = find_starting_positions(&board, count);
        if starts.len() < count {
            return Err(SimError::State(format!(
                "world has room for {} of {count} players",
                starts.len()
            )));
        }

        let mut manager = Self::new(settings, catalog, board, Box::new(rng))?;
        for (index, start) in starts.into_iter().enumerate() {
            let player = manager
                .add_player(
                    SessionId::new(format!("session-{index}")),
                    format!("player-{index}"),
                )
                .map_err(|e| SimError::State(e.to_string()))?;
            for template in [STARTING_SETTLER, STARTING_ESCORT] {
                manager
                    .spawn_unit(player, template, start)
                    .map_err(|e| SimError::Catalog(e.to_string()))?;
            }
        }
        Ok(manager)
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn catalog(&self) -> &dyn Catalog {
        &*self.catalog
    }

    /// Number of the turn about to be played.
    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn board(&self) -> &BoardController {
        &self.board
    }

    pub fn cities(&self) -> &CityController {
        &self.cities
    }

    pub fn units(&self) -> &UnitController {
        &self.units
    }

    pub fn players(&self) -> &PlayerController {
        &self.players
    }

    /// Pending change notifications.
    pub fn events(&self) -> &[ChangeEvent] {
        self.notes.events()
    }

    /// Take every pending change notification.
    pub fn drain_events(&mut self) -> Vec<ChangeEvent> {
        self.notes.drain()
    }

    /// Seat a player; fails once every [`PlayerId`] is in use.
    pub fn add_player(
        &mut self,
        session: SessionId,
        name: String,
    ) -> std::result::Result<PlayerId, CommandError> {
        self.players.add_player(session, name, &mut self.notes)
    }

    pub fn remove_player(&mut self, player: PlayerId) -> bool {
        self.players.remove_player(player, &mut self.notes).is_some()
    }

    /// Place a unit for `owner` outside of normal production.
    pub fn spawn_unit(
        &mut self,
        owner: PlayerId,
        template: &str,
        position: HexCoord,
    ) -> std::result::Result<UnitId, CommandError> {
        let techs = techs_of(&self.players, owner)?;
        let template = self
            .catalog
            .unit(template)
            .ok_or_else(|| CommandError::UnknownTemplate(template.to_string()))?;
        if !self.board.tile(&position).is_some_and(|t| t.is_passable()) {
            return Err(CommandError::invalid(format!("cannot place a unit on {position}")));
        }
        Ok(self
            .units
            .spawn(owner, template, position, &self.board, techs, &mut self.notes))
    }

    /// Advance the whole simulation by one turn.
    ///
    /// An error means the session data is inconsistent and play must stop.
    pub fn process_turn(&mut self) -> Result<()> {
        let catalog: &dyn Catalog = &*self.catalog;
        let speed = self.settings.game_speed;

        self.board.process_turn(&mut self.notes);
        self.players
            .process_turn(&self.cities, catalog, speed, &mut self.notes)?;

        let spawns = self.cities.process_turn(
            &mut self.board,
            catalog,
            speed,
            &mut *self.rng,
            &mut self.notes,
        )?;
        let no_techs = BTreeSet::new();
        for spawn in spawns {
            let template = catalog.unit(&spawn.template).ok_or_else(|| {
                SimError::Catalog(format!("city produced unknown unit {}", spawn.template))
            })?;
            let techs = self
                .players
                .player(spawn.owner)
                .map_or(&no_techs, |p| &p.techs);
            self.units.spawn(
                spawn.owner,
                template,
                spawn.position,
                &self.board,
                techs,
                &mut self.notes,
            );
        }

        self.units.process_turn(
            &self.board,
            &self.cities,
            catalog,
            &self.players,
            &mut self.notes,
        )?;
        self.players.reset_turn_state(&mut self.notes);

        info!(turn = self.turn, "turn processed");
        self.turn += 1;
        Ok(())
    }

    /// Apply a city command on behalf of `issuer`.
    pub fn command_city(
        &mut self,
        issuer: PlayerId,
        command: &CityCommand,
    ) -> std::result::Result<(), CommandError> {
        let result = techs_of(&self.players, issuer).and_then(|techs| {
            self.cities.command(
                issuer,
                techs,
                command,
                &self.board,
                &*self.catalog,
                &mut self.notes,
            )
        });
        if let Err(err) = &result {
            warn!(issuer, city = command.city, kind = ?command.kind, %err, "city command rejected");
        }
        result
    }

    /// Apply a unit command on behalf of `issuer`.
    pub fn command_unit(
        &mut self,
        issuer: PlayerId,
        command: &UnitCommand,
    ) -> std::result::Result<(), CommandError> {
        let result = techs_of(&self.players, issuer).and_then(|techs| {
            self.units.command(
                issuer,
                techs,
                command,
                &mut self.board,
                &mut self.cities,
                &*self.catalog,
                &mut self.notes,
            )
        });
        if let Err(err) = &result {
            warn!(issuer, unit = command.unit, kind = ?command.kind, %err, "unit command rejected");
        }
        result
    }

    /// Apply a player command on behalf of `issuer`.
    pub fn command_player(
        &mut self,
        issuer: PlayerId,
        command: &PlayerCommand,
    ) -> std::result::Result<(), CommandError> {
        let result = self
            .players
            .command(issuer, command, &*self.catalog, &mut self.notes);
        if let Err(err) = &result {
            warn!(issuer, player = command.player, kind = ?command.kind, %err, "player command rejected");
        }
        result
    }
}

fn techs_of(players: &PlayerController, player: PlayerId) -> std::result::Result<&BTreeSet<TechId>, CommandError> {
    players
        .player(player)
        .map(|p| &p.techs)
        .ok_or(CommandError::UnknownPlayer(player))
}

impl std::fmt::Debug for ControllerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerManager")
            .field("settings", &self.settings)
            .field("turn", &self.turn)
            .field("cities", &self.cities.cities().count())
            .field("units", &self.units.units().count())
            .field("players", &self.players.players().count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use crate::terrain::Terrain;
    use crate::types::WorldSize;

    fn small_settings() -> GameSettings {
        GameSettings {
            world_size: WorldSize::Small,
            seed: 7,
            ..GameSettings::new("Test")
        }
    }

    #[test]
    fn test_new_game_seats_players() {
        let manager = ControllerManager::new_game(small_settings(), Box::new(StaticCatalog::standard())).unwrap();
        assert_eq!(manager.players().players().count(), 2);
        assert_eq!(manager.units().units().count(), 4);
        for player in manager.players().players() {
            let templates: Vec<&str> = manager
                .units()
                .units_of(player.id)
                .map(|u| u.template.as_str())
                .collect();
            assert_eq!(templates, vec!["settler", "warrior"]);
        }
        assert_eq!(manager.turn(), 1);
    }

    #[test]
    fn test_invalid_catalog_is_fatal() {
        let catalog = StaticCatalog::new().with_unit(
            crate::catalog::UnitTemplate::new("legion", "Legion", crate::catalog::UnitArchetype::Melee, 40)
                .requires("iron_working"),
        );
        let result = ControllerManager::new(
            small_settings(),
            Box::new(catalog),
            Board::filled(10, 10, Terrain::Plains),
            Box::new(GameRng::seeded(1)),
        );
        assert!(matches!(result, Err(SimError::Catalog(_))));
    }

    #[test]
    fn test_commands_require_known_issuer() {
        let mut manager = ControllerManager::new(
            small_settings(),
            Box::new(StaticCatalog::standard()),
            Board::filled(10, 10, Terrain::Plains),
            Box::new(GameRng::seeded(1)),
        )
        .unwrap();
        let cmd = UnitCommand::new(crate::commands::UnitCommandKind::Sleep, 1, vec![]);
        assert_eq!(manager.command_unit(3, &cmd), Err(CommandError::UnknownPlayer(3)));
        assert!(manager.spawn_unit(0, "warrior", HexCoord::new(1, 1)).is_err());
    }

    #[test]
    fn test_turn_counter_advances() {
        let mut manager = ControllerManager::new(
            small_settings(),
            Box::new(StaticCatalog::standard()),
            Board::filled(10, 10, Terrain::Plains),
            Box::new(GameRng::seeded(1)),
        )
        .unwrap();
        manager.process_turn().unwrap();
        manager.process_turn().unwrap();
        assert_eq!(manager.turn(), 3);
    }
}
