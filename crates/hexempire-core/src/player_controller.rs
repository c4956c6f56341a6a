//! Players: seating, income aggregation, research and turn status.

use crate::catalog::Catalog;
use crate::city_controller::CityController;
use crate::commands::{PlayerAction, PlayerCommand};
use crate::error::{CommandError, Result, SimError};
use crate::events::{ChangeEvent, Notifications};
use crate::player::{Player, TechProgress};
use crate::settings::GameSpeed;
use crate::types::{Era, PlayerId, SessionId};
use crate::yields::Yields;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Every seated player, keyed by id.
#[derive(Clone, Debug, Default)]
pub struct PlayerController {
    players: BTreeMap<PlayerId, Player>,
}

impl PlayerController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Player connected through `session`.
    pub fn by_session(&self, session: &SessionId) -> Option<&Player> {
        self.players.values().find(|p| &p.session == session)
    }

    /// Seat a player under the lowest free id.
    pub fn add_player(
        &mut self,
        session: SessionId,
        name: String,
        notes: &mut Notifications,
    ) -> std::result::Result<PlayerId, CommandError> {
        let id = (0..=PlayerId::MAX)
            .find(|id| !self.players.contains_key(id))
            .ok_or(CommandError::NoFreePlayerSlot)?;
        let player = Player::new(id, session, name);
        info!(player = id, name = %player.name, "player added");
        notes.push(ChangeEvent::PlayerAdded {
            player: player.clone(),
        });
        self.players.insert(id, player);
        Ok(id)
    }

    pub fn remove_player(&mut self, id: PlayerId, notes: &mut Notifications) -> Option<Player> {
        let player = self.players.remove(&id)?;
        info!(player = id, "player removed");
        notes.push(ChangeEvent::PlayerRemoved {
            player: player.clone(),
        });
        Some(player)
    }

    /// Collect city income into each player's stockpiles and advance research.
    pub fn process_turn(
        &mut self,
        cities: &CityController,
        catalog: &dyn Catalog,
        speed: GameSpeed,
        notes: &mut Notifications,
    ) -> Result<()> {
        for player in self.players.values_mut() {
            let mut income = Yields::zero();
            let mut strategic = BTreeMap::new();
            for city in cities.cities_of(player.id) {
                income += city.income;
                for (resource, amount) in &city.strategic {
                    *strategic.entry(*resource).or_insert(0) += amount;
                }
            }
            player.collect_income(income, strategic);

            let science = income.science.max(0) as u32;
            let progress = player.apply_research(science, |tech| {
                catalog
                    .technology(tech)
                    .map(|t| speed.research_cost(t.cost))
            });
            match progress {
                TechProgress::Completed(tech) => {
                    player.era = era_of(player, catalog)?;
                    info!(player = player.id, %tech, era = %player.era, "technology unlocked");
                }
                TechProgress::Researching { tech, progress } => {
                    debug!(player = player.id, %tech, progress, "research progressed");
                }
                TechProgress::Idle => {}
            }

            notes.push(ChangeEvent::PlayerUpdated {
                player: player.clone(),
            });
        }
        Ok(())
    }

    /// Choose the technology to research next.
    ///
    /// The technology must exist, be locked, and have every prerequisite
    /// unlocked.
    pub fn select_technology(
        &mut self,
        id: PlayerId,
        tech: &str,
        catalog: &dyn Catalog,
        notes: &mut Notifications,
    ) -> std::result::Result<(), CommandError> {
        let player = self.players.get_mut(&id).ok_or(CommandError::UnknownPlayer(id))?;
        let template = catalog
            .technology(tech)
            .ok_or_else(|| CommandError::UnknownTemplate(tech.to_string()))?;
        if player.has_tech(tech) {
            return Err(CommandError::Unavailable(format!("{tech} is already known")));
        }
        if let Some(missing) = template.prerequisites.iter().find(|p| !player.has_tech(p)) {
            return Err(CommandError::Unavailable(format!("{tech} requires {missing}")));
        }

        player.selected_tech = Some(template.id.clone());
        notes.push(ChangeEvent::PlayerUpdated {
            player: player.clone(),
        });
        Ok(())
    }

    /// Mark a player's turn as finished.
    pub fn end_turn(&mut self, id: PlayerId, notes: &mut Notifications) -> std::result::Result<(), CommandError> {
        let player = self.players.get_mut(&id).ok_or(CommandError::UnknownPlayer(id))?;
        set_finished(player, true, notes);
        Ok(())
    }

    /// Clear every player's turn-finished flag.
    pub fn reset_turn_state(&mut self, notes: &mut Notifications) {
        for player in self.players.values_mut() {
            if player.turn_finished {
                set_finished(player, false, notes);
            }
        }
    }

    /// Whether every seated player has ended their turn.
    pub fn all_finished(&self) -> bool {
        !self.players.is_empty() && self.players.values().all(|p| p.turn_finished)
    }

    /// Apply a command issued by `issuer`, which must be the target player.
    pub fn command(
        &mut self,
        issuer: PlayerId,
        command: &PlayerCommand,
        catalog: &dyn Catalog,
        notes: &mut Notifications,
    ) -> std::result::Result<(), CommandError> {
        let action = command.parse()?;
        if !self.players.contains_key(&command.player) {
            return Err(CommandError::UnknownPlayer(command.player));
        }
        if issuer != command.player {
            return Err(CommandError::NotOwner {
                player: issuer,
                what: format!("player {}", command.player),
            });
        }
        match action {
            PlayerAction::SelectTechnology(tech) => {
                self.select_technology(command.player, &tech, catalog, notes)
            }
            PlayerAction::EndTurn => self.end_turn(command.player, notes),
        }
    }
}

fn set_finished(player: &mut Player, finished: bool, notes: &mut Notifications) {
    player.turn_finished = finished;
    notes.push(ChangeEvent::PlayerTurnStateChanged {
        player: player.id,
        finished,
    });
}

/// Latest era among a player's technologies.
fn era_of(player: &Player, catalog: &dyn Catalog) -> Result<Era> {
    let mut era = Era::Ancient;
    for tech in &player.techs {
        let template = catalog.technology(tech).ok_or_else(|| {
            SimError::Catalog(format!("player {} knows unknown technology {tech}", player.id))
        })?;
        era = era.max(template.era);
    }
    Ok(era)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use crate::city::City;
    use crate::commands::PlayerCommandKind;
    use crate::hex::HexCoord;
    use serde_json::json;

    fn seat(players: &mut PlayerController, notes: &mut Notifications, name: &str) -> PlayerId {
        players
            .add_player(SessionId::new(format!("session-{name}")), name.to_string(), notes)
            .unwrap()
    }

    #[test]
    fn test_add_and_remove_players() {
        let mut players = PlayerController::new();
        let mut notes = Notifications::new();
        let alice = seat(&mut players, &mut notes, "alice");
        let bob = seat(&mut players, &mut notes, "bob");
        assert_eq!((alice, bob), (0, 1));

        assert!(players.remove_player(alice, &mut notes).is_some());
        assert_eq!(seat(&mut players, &mut notes, "carol"), 0);
        assert_eq!(
            players.by_session(&SessionId::new("session-bob")).map(|p| p.id),
            Some(1)
        );
        assert_eq!(notes.len(), 4);
    }

    #[test]
    fn test_add_player_fails_when_every_slot_is_taken() {
        let mut players = PlayerController::new();
        let mut notes = Notifications::new();
        for index in 0..=PlayerId::MAX {
            assert_eq!(seat(&mut players, &mut notes, &format!("p{index}")), index);
        }
        notes.drain();

        let result = players.add_player(SessionId::new("late"), "late".to_string(), &mut notes);
        assert_eq!(result, Err(CommandError::NoFreePlayerSlot));
        assert_eq!(players.player(PlayerId::MAX).unwrap().name, format!("p{}", PlayerId::MAX));
        assert_eq!(players.players().count(), 256);
        assert!(notes.is_empty());
    }

    #[test]
    fn test_select_technology_rules() {
        let catalog = StaticCatalog::standard();
        let mut players = PlayerController::new();
        let mut notes = Notifications::new();
        let id = seat(&mut players, &mut notes, "alice");

        assert!(players.select_technology(id, "pottery", &catalog, &mut notes).is_err());
        assert!(players.select_technology(id, "warp_drive", &catalog, &mut notes).is_err());
        players
            .select_technology(id, "agriculture", &catalog, &mut notes)
            .unwrap();
        assert_eq!(players.player(id).unwrap().selected_tech.as_deref(), Some("agriculture"));
    }

    #[test]
    fn test_research_from_city_science() {
        let catalog = StaticCatalog::standard();
        let mut players = PlayerController::new();
        let mut notes = Notifications::new();
        let id = seat(&mut players, &mut notes, "alice");

        let mut cities = CityController::new();
        let mut city = City::new(1, id, "Home".to_string(), HexCoord::new(2, 2));
        city.income = Yields::new(2, 2, 3, 10, 1);
        cities.insert(city);

        players.select_technology(id, "agriculture", &catalog, &mut notes).unwrap();
        players.process_turn(&cities, &catalog, GameSpeed::Normal, &mut notes).unwrap();
        assert_eq!(players.player(id).unwrap().research_overflow, 10);

        players.process_turn(&cities, &catalog, GameSpeed::Normal, &mut notes).unwrap();
        let player = players.player(id).unwrap();
        assert!(player.has_tech("agriculture"));
        assert_eq!(player.research_overflow, 0);
        assert_eq!(player.selected_tech, None);
        assert_eq!(player.gold, 6);
        assert_eq!(player.culture, 2);
        assert_eq!(player.era, Era::Ancient);
    }

    #[test]
    fn test_era_follows_latest_technology() {
        let catalog = StaticCatalog::standard();
        let mut players = PlayerController::new();
        let mut notes = Notifications::new();
        let id = seat(&mut players, &mut notes, "alice");
        {
            let player = players.players.get_mut(&id).unwrap();
            for tech in ["agriculture", "mining", "bronze_working"] {
                player.techs.insert(tech.to_string());
            }
            player.selected_tech = Some("iron_working".to_string());
            player.research_overflow = 80;
        }
        players
            .process_turn(&CityController::new(), &catalog, GameSpeed::Normal, &mut notes)
            .unwrap();
        assert_eq!(players.player(id).unwrap().era, Era::Classical);
    }

    #[test]
    fn test_end_turn_and_reset() {
        let catalog = StaticCatalog::standard();
        let mut players = PlayerController::new();
        let mut notes = Notifications::new();
        let a = seat(&mut players, &mut notes, "alice");
        let b = seat(&mut players, &mut notes, "bob");
        notes.drain();

        let end = |p: PlayerId| PlayerCommand::new(PlayerCommandKind::EndTurn, p, vec![]);
        assert!(players.command(a, &end(b), &catalog, &mut notes).is_err());
        players.command(a, &end(a), &catalog, &mut notes).unwrap();
        assert!(!players.all_finished());
        players.command(b, &end(b), &catalog, &mut notes).unwrap();
        assert!(players.all_finished());

        players.reset_turn_state(&mut notes);
        assert!(players.players().all(|p| !p.turn_finished));
        let kinds: Vec<&str> = notes.drain().iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec!["PlayerTurnStateChanged"; 4]);
    }

    #[test]
    fn test_malformed_player_commands() {
        let catalog = StaticCatalog::standard();
        let mut players = PlayerController::new();
        let mut notes = Notifications::new();
        let id = seat(&mut players, &mut notes, "alice");
        let before = players.player(id).unwrap().clone();

        for args in [vec![], vec![json!(5)], vec![json!(null)], vec![json!("pottery")]] {
            let cmd = PlayerCommand::new(PlayerCommandKind::SelectTechnology, id, args);
            assert!(players.command(id, &cmd, &catalog, &mut notes).is_err());
        }
        let cmd = PlayerCommand::new(PlayerCommandKind::EndTurn, 9, vec![]);
        assert!(players.command(9, &cmd, &catalog, &mut notes).is_err());
        assert_eq!(players.player(id).unwrap(), &before);
    }
}
