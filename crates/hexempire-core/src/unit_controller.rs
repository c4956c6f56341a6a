//! Unit lifecycle: spawning, queued movement, commands and combat.

use crate::board_controller::BoardController;
use crate::catalog::{Catalog, UnitTemplate};
use crate::city_controller::CityController;
use crate::combat::{combat_damage, effective_strength, CombatDamage, CombatOutcome};
use crate::commands::{UnitAction, UnitCommand};
use crate::error::{CommandError, Result, SimError};
use crate::events::{ChangeEvent, Notifications};
use crate::hex::HexCoord;
use crate::pathfinding::find_path;
use crate::player_controller::PlayerController;
use crate::types::{CityId, PlayerId, TechId, UnitId};
use crate::unit::Unit;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Every unit in the session, keyed by id.
#[derive(Clone, Debug, Default)]
pub struct UnitController {
    units: BTreeMap<UnitId, Unit>,
    next_id: UnitId,
}

/// What stands on a tile a unit wants to enter or attack.
enum Target {
    Unit(UnitId),
    City(CityId),
}

impl UnitController {
    pub fn new() -> Self {
        Self {
            units: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    pub fn units_of(&self, player: PlayerId) -> impl Iterator<Item = &Unit> {
        self.units.values().filter(move |u| u.owner == player)
    }

    pub fn units_at<'a>(&'a self, coord: &'a HexCoord) -> impl Iterator<Item = &'a Unit> + 'a {
        self.units.values().filter(move |u| u.position == *coord)
    }

    /// Place a new unit on the board.
    pub fn spawn(
        &mut self,
        owner: PlayerId,
        template: &UnitTemplate,
        position: HexCoord,
        board: &BoardController,
        techs: &BTreeSet<TechId>,
        notes: &mut Notifications,
    ) -> UnitId {
        let id = self.next_id;
        self.next_id += 1;

        let mut unit = Unit::from_template(id, owner, template, position);
        if let Some(tile) = board.tile(&position) {
            unit.rebuild_commands(template, tile, techs);
        }
        debug!(unit = id, owner, template = %template.id, %position, "unit spawned");
        notes.push(ChangeEvent::UnitAdded { unit: unit.clone() });
        self.units.insert(id, unit);
        id
    }

    /// Take a unit off the board.
    pub fn remove(&mut self, id: UnitId, notes: &mut Notifications) -> Option<Unit> {
        let unit = self.units.remove(&id)?;
        info!(unit = id, owner = unit.owner, "unit removed");
        notes.push(ChangeEvent::UnitRemoved { unit: unit.clone() });
        Some(unit)
    }

    /// Walk queued paths, refresh command sets and restore movement.
    pub fn process_turn(
        &mut self,
        board: &BoardController,
        cities: &CityController,
        catalog: &dyn Catalog,
        players: &PlayerController,
        notes: &mut Notifications,
    ) -> Result<()> {
        let ids: Vec<UnitId> = self.units.keys().copied().collect();
        let no_techs = BTreeSet::new();

        for id in ids {
            self.advance(id, board, cities);

            let Some(unit) = self.units.get_mut(&id) else {
                continue;
            };
            let template = catalog.unit(&unit.template).ok_or_else(|| {
                SimError::Catalog(format!("unit {id} has unknown template {}", unit.template))
            })?;
            let techs = players.player(unit.owner).map_or(&no_techs, |p| &p.techs);
            if let Some(tile) = board.tile(&unit.position) {
                unit.rebuild_commands(template, tile, techs);
            }
            unit.reset_turn(template);
            notes.push(ChangeEvent::UnitUpdated { unit: unit.clone() });
        }
        Ok(())
    }

    /// Recompute a unit's commands for the tile it stands on.
    pub fn rebuild_commands(
        &mut self,
        id: UnitId,
        board: &BoardController,
        catalog: &dyn Catalog,
        techs: &BTreeSet<TechId>,
    ) -> std::result::Result<(), CommandError> {
        let unit = self.units.get_mut(&id).ok_or(CommandError::UnknownUnit(id))?;
        let template = catalog
            .unit(&unit.template)
            .ok_or_else(|| CommandError::UnknownTemplate(unit.template.clone()))?;
        if let Some(tile) = board.tile(&unit.position) {
            unit.rebuild_commands(template, tile, techs);
        }
        Ok(())
    }

    /// Path a unit toward `destination` and walk as far as it can this turn.
    pub fn queue_move(
        &mut self,
        id: UnitId,
        destination: HexCoord,
        board: &BoardController,
        cities: &CityController,
    ) -> std::result::Result<(), CommandError> {
        let unit = self.units.get(&id).ok_or(CommandError::UnknownUnit(id))?;
        if unit.position == destination {
            return Err(CommandError::invalid("unit is already there"));
        }
        if self.occupant(&destination, unit.owner, cities).is_some() {
            return Err(CommandError::invalid(format!("{destination} is held by an enemy")));
        }
        let path = find_path(board.board(), unit.position, destination)
            .ok_or_else(|| CommandError::invalid(format!("no path to {destination}")))?;

        if let Some(unit) = self.units.get_mut(&id) {
            unit.queue = path.steps.into();
            unit.sleeping = false;
        }
        self.advance(id, board, cities);
        Ok(())
    }

    /// Apply a command issued by `player`.
    ///
    /// `techs` are the issuing player's unlocked technologies. Nothing is
    /// modified unless the command is valid.
    #[allow(clippy::too_many_arguments)]
    pub fn command(
        &mut self,
        player: PlayerId,
        techs: &BTreeSet<TechId>,
        command: &UnitCommand,
        board: &mut BoardController,
        cities: &mut CityController,
        catalog: &dyn Catalog,
        notes: &mut Notifications,
    ) -> std::result::Result<(), CommandError> {
        let action = command.parse()?;
        let id = command.unit;
        let unit = self.units.get(&id).ok_or(CommandError::UnknownUnit(id))?;
        if unit.owner != player {
            return Err(CommandError::NotOwner {
                player,
                what: format!("unit {id}"),
            });
        }

        let template = catalog
            .unit(&unit.template)
            .ok_or_else(|| CommandError::UnknownTemplate(unit.template.clone()))?;
        let available = match board.tile(&unit.position) {
            Some(tile) => unit.available_commands(template, tile, techs),
            None => unit.commands.clone(),
        };
        if !available.contains(&command.kind) {
            return Err(CommandError::Unavailable(format!(
                "unit {id} cannot {}",
                command.kind.name()
            )));
        }
        let position = unit.position;
        let has_actions = unit.has_actions();
        let needs_action = || {
            if has_actions {
                Ok(())
            } else {
                Err(CommandError::invalid(format!("unit {id} has no actions left")))
            }
        };

        match action {
            UnitAction::Move(destination) => self.queue_move(id, destination, board, cities)?,
            UnitAction::Sleep => self.update(id, |u| {
                u.sleeping = true;
                u.clear_queue();
            }),
            UnitAction::Wake => self.update(id, |u| u.sleeping = false),
            UnitAction::Skip => self.update(id, |u| u.skipping = true),
            UnitAction::Settle(name) => {
                needs_action()?;
                cities.settle(player, position, name, board, notes)?;
                self.remove(id, notes);
                return Ok(());
            }
            UnitAction::MeleeAttack(target) => {
                self.melee_attack(id, target, board, cities, catalog, notes)?;
                if self.units.contains_key(&id) {
                    self.rebuild_commands(id, board, catalog, techs)?;
                }
                return Ok(());
            }
            UnitAction::RangedAttack(target) => {
                self.ranged_attack(id, target, board, cities, catalog, notes)?;
                if self.units.contains_key(&id) {
                    self.rebuild_commands(id, board, catalog, techs)?;
                }
                return Ok(());
            }
            UnitAction::BuildImprovement(improvement) => {
                needs_action()?;
                board.build_improvement(position, player, improvement, cities, notes)?;
                self.update(id, |u| u.actions -= 1);
            }
            UnitAction::Repair => {
                needs_action()?;
                board.repair(position, player, cities, notes)?;
                self.update(id, |u| u.actions -= 1);
            }
            UnitAction::Pillage => {
                needs_action()?;
                board.pillage(position, player, cities, notes)?;
                self.update(id, |u| u.spend_attack());
            }
            UnitAction::CleanFallout => {
                needs_action()?;
                board.clean_fallout(position, notes)?;
                self.update(id, |u| u.actions -= 1);
            }
            UnitAction::Disband => {
                self.remove(id, notes);
                return Ok(());
            }
        }

        self.rebuild_commands(id, board, catalog, techs)?;
        if let Some(unit) = self.units.get(&id) {
            notes.push(ChangeEvent::UnitUpdated { unit: unit.clone() });
        }
        Ok(())
    }

    /// Melee attack on an adjacent enemy unit or city.
    pub fn melee_attack(
        &mut self,
        attacker: UnitId,
        target: HexCoord,
        board: &BoardController,
        cities: &mut CityController,
        catalog: &dyn Catalog,
        notes: &mut Notifications,
    ) -> std::result::Result<CombatOutcome, CommandError> {
        let (unit, template) = self.ready_attacker(attacker, catalog)?;
        if board.tile(&target).is_none() {
            return Err(CommandError::invalid(format!("{target} is off the board")));
        }
        if unit.position.distance(&target) != 1 {
            return Err(CommandError::invalid(format!("{target} is not adjacent")));
        }
        let owner = unit.owner;
        let attack = effective_strength(template.combat_strength, board.tile(&unit.position));
        let health = unit.health_fraction();

        let outcome = match self.occupant(&target, owner, cities) {
            Some(Target::Unit(defender)) => {
                let defense = self.defense_of(defender, board, catalog)?;
                let damage = combat_damage(attack, defense, health);
                self.resolve_melee(attacker, defender, target, damage, notes)
            }
            Some(Target::City(city)) => {
                let defense = city_defense(city, board, cities);
                let damage = combat_damage(attack, defense, health);
                self.resolve_city_assault(attacker, city, target, damage, cities, notes)
            }
            None => return Err(CommandError::invalid(format!("nothing to attack at {target}"))),
        };
        debug!(attacker, %target, ?outcome, "melee attack");
        Ok(outcome)
    }

    /// Ranged attack on an enemy unit or city within range. The defender
    /// does not retaliate.
    pub fn ranged_attack(
        &mut self,
        attacker: UnitId,
        target: HexCoord,
        board: &BoardController,
        cities: &mut CityController,
        catalog: &dyn Catalog,
        notes: &mut Notifications,
    ) -> std::result::Result<CombatOutcome, CommandError> {
        let (unit, template) = self.ready_attacker(attacker, catalog)?;
        if board.tile(&target).is_none() {
            return Err(CommandError::invalid(format!("{target} is off the board")));
        }
        let distance = unit.position.distance(&target);
        if distance == 0 || distance > template.range {
            return Err(CommandError::invalid(format!("{target} is out of range")));
        }
        let owner = unit.owner;
        let attack = effective_strength(template.ranged_strength, board.tile(&unit.position));
        let health = unit.health_fraction();

        let outcome = match self.occupant(&target, owner, cities) {
            Some(Target::Unit(defender)) => {
                let defense = self.defense_of(defender, board, catalog)?;
                let damage = CombatDamage {
                    attacker: 0,
                    ..combat_damage(attack, defense, health)
                };
                self.update(attacker, Unit::spend_attack);
                let dead = self.units.get_mut(&defender).is_some_and(|d| {
                    d.take_damage(damage.defender);
                    d.is_dead()
                });
                if dead {
                    self.remove(defender, notes);
                    CombatOutcome::DefenderDestroyed(damage)
                } else {
                    self.notify(defender, notes);
                    CombatOutcome::Exchanged(damage)
                }
            }
            Some(Target::City(city)) => {
                let defense = city_defense(city, board, cities);
                let damage = CombatDamage {
                    attacker: 0,
                    ..combat_damage(attack, defense, health)
                };
                self.update(attacker, Unit::spend_attack);
                cities.damage(city, damage.defender, notes);
                CombatOutcome::CityDamaged(damage)
            }
            None => return Err(CommandError::invalid(format!("nothing to attack at {target}"))),
        };
        self.notify(attacker, notes);
        debug!(attacker, %target, ?outcome, "ranged attack");
        Ok(outcome)
    }

    fn ready_attacker<'a, 'c>(
        &'a self,
        id: UnitId,
        catalog: &'c dyn Catalog,
    ) -> std::result::Result<(&'a Unit, &'c UnitTemplate), CommandError> {
        let unit = self.units.get(&id).ok_or(CommandError::UnknownUnit(id))?;
        if !unit.has_actions() {
            return Err(CommandError::invalid(format!("unit {id} has no actions left")));
        }
        let template = catalog
            .unit(&unit.template)
            .ok_or_else(|| CommandError::UnknownTemplate(unit.template.clone()))?;
        Ok((unit, template))
    }

    fn defense_of(
        &self,
        id: UnitId,
        board: &BoardController,
        catalog: &dyn Catalog,
    ) -> std::result::Result<f64, CommandError> {
        let unit = self.units.get(&id).ok_or(CommandError::UnknownUnit(id))?;
        let template = catalog
            .unit(&unit.template)
            .ok_or_else(|| CommandError::UnknownTemplate(unit.template.clone()))?;
        Ok(effective_strength(template.combat_strength, board.tile(&unit.position)))
    }

    fn resolve_melee(
        &mut self,
        attacker: UnitId,
        defender: UnitId,
        target: HexCoord,
        damage: CombatDamage,
        notes: &mut Notifications,
    ) -> CombatOutcome {
        let defender_dead = self.units.get_mut(&defender).is_some_and(|d| {
            d.take_damage(damage.defender);
            d.is_dead()
        });
        let attacker_dead = self.units.get_mut(&attacker).is_some_and(|a| {
            a.take_damage(damage.attacker);
            a.spend_attack();
            a.is_dead()
        });

        if defender_dead {
            self.remove(defender, notes);
            self.update(attacker, |a| {
                a.hp = a.hp.max(1);
                a.clear_queue();
                a.step_to(target, 0);
            });
            self.notify(attacker, notes);
            CombatOutcome::DefenderDestroyed(damage)
        } else if attacker_dead {
            self.notify(defender, notes);
            self.remove(attacker, notes);
            CombatOutcome::AttackerDestroyed(damage)
        } else {
            self.notify(defender, notes);
            self.notify(attacker, notes);
            CombatOutcome::Exchanged(damage)
        }
    }

    fn resolve_city_assault(
        &mut self,
        attacker: UnitId,
        city: CityId,
        target: HexCoord,
        damage: CombatDamage,
        cities: &mut CityController,
        notes: &mut Notifications,
    ) -> CombatOutcome {
        let Some(owner) = self.units.get(&attacker).map(|u| u.owner) else {
            return CombatOutcome::CityDamaged(damage);
        };
        let hp = cities.damage(city, damage.defender, notes);
        let attacker_dead = self.units.get_mut(&attacker).is_some_and(|a| {
            a.take_damage(damage.attacker);
            a.spend_attack();
            a.is_dead()
        });

        let captured = hp.is_some_and(|hp| hp <= 1) && cities.capture(city, owner, notes).is_some();
        if attacker_dead {
            self.remove(attacker, notes);
        } else {
            if captured {
                self.update(attacker, |a| {
                    a.clear_queue();
                    a.step_to(target, 0);
                });
            }
            self.notify(attacker, notes);
        }

        match (captured, attacker_dead) {
            (true, _) => CombatOutcome::CityCaptured(damage),
            (false, true) => CombatOutcome::AttackerDestroyed(damage),
            (false, false) => CombatOutcome::CityDamaged(damage),
        }
    }

    /// Enemy unit or city standing on `coord`, from `owner`'s point of view.
    fn occupant(&self, coord: &HexCoord, owner: PlayerId, cities: &CityController) -> Option<Target> {
        if let Some(unit) = self.units.values().find(|u| u.position == *coord && u.owner != owner) {
            return Some(Target::Unit(unit.id));
        }
        cities
            .city_at(coord)
            .filter(|c| c.owner != owner)
            .map(|c| Target::City(c.id))
    }

    /// Walk a unit's queue at one movement point per step.
    ///
    /// A step onto an impassable, non-adjacent or enemy-held tile discards
    /// the rest of the queue.
    fn advance(&mut self, id: UnitId, board: &BoardController, cities: &CityController) {
        loop {
            let Some(unit) = self.units.get(&id) else {
                return;
            };
            if unit.movement == 0 {
                return;
            }
            let Some(&next) = unit.queue.front() else {
                return;
            };

            let passable = board.tile(&next).is_some_and(|t| t.is_passable());
            let adjacent = unit.position.distance(&next) == 1;
            let blocked = self.occupant(&next, unit.owner, cities).is_some();

            let Some(unit) = self.units.get_mut(&id) else {
                return;
            };
            if !passable || !adjacent || blocked {
                debug!(unit = id, %next, "queued move blocked");
                unit.clear_queue();
                return;
            }
            unit.queue.pop_front();
            unit.step_to(next, 1);
        }
    }

    fn update(&mut self, id: UnitId, f: impl FnOnce(&mut Unit)) {
        if let Some(unit) = self.units.get_mut(&id) {
            f(unit);
        }
    }

    fn notify(&self, id: UnitId, notes: &mut Notifications) {
        if let Some(unit) = self.units.get(&id) {
            notes.push(ChangeEvent::UnitUpdated { unit: unit.clone() });
        }
    }
}

/// Defensive strength of a city, including its tile's terrain bonus.
fn city_defense(city: CityId, board: &BoardController, cities: &CityController) -> f64 {
    cities
        .city(city)
        .map_or(1.0, |c| effective_strength(c.combat_strength, board.tile(&c.position)))
}
