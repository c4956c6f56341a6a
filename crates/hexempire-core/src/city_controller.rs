//! City lifecycle: settling, the per-turn economy, borders and capture.

use crate::board::Tile;
use crate::board_controller::BoardController;
use crate::catalog::Catalog;
use crate::city::{border_cost, City, GrowthOutcome, ProductionItem, BASE_CITY_HP, BASE_CITY_STRENGTH, BASE_UNHAPPINESS};
use crate::commands::{CityAction, CityCommand};
use crate::error::{CommandError, Result, SimError};
use crate::events::{ChangeEvent, Notifications};
use crate::hex::HexCoord;
use crate::random::RandomSource;
use crate::settings::GameSpeed;
use crate::types::{CityId, PlayerId, TechId, UnitTemplateId};
use crate::yields::{YieldKind, Yields};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Radius searched for new border tiles.
const BORDER_RADIUS: u32 = 3;

/// Radius used once the near ring is exhausted or the city is large.
const WIDE_BORDER_RADIUS: u32 = 5;

/// Owned-tile count from which the wide radius is always used.
const WIDE_BORDER_THRESHOLD: usize = 36;

/// A unit finished by a city, waiting to be placed on the board.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpawnRequest {
    pub owner: PlayerId,
    pub template: UnitTemplateId,
    pub position: HexCoord,
}

/// Every city in the session, keyed by id.
#[derive(Clone, Debug, Default)]
pub struct CityController {
    cities: BTreeMap<CityId, City>,
    next_id: CityId,
}

impl CityController {
    pub fn new() -> Self {
        Self {
            cities: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn city(&self, id: CityId) -> Option<&City> {
        self.cities.get(&id)
    }

    pub fn cities(&self) -> impl Iterator<Item = &City> {
        self.cities.values()
    }

    /// Cities owned by `player`, in id order.
    pub fn cities_of(&self, player: PlayerId) -> impl Iterator<Item = &City> {
        self.cities.values().filter(move |c| c.owner == player)
    }

    /// City whose center is at `coord`.
    pub fn city_at(&self, coord: &HexCoord) -> Option<&City> {
        self.cities.values().find(|c| c.position == *coord)
    }

    pub(crate) fn insert(&mut self, city: City) {
        self.next_id = self.next_id.max(city.id + 1);
        self.cities.insert(city.id, city);
    }

    /// Found a new city for `owner` at `position`.
    ///
    /// The city owns no tiles until its first turn, when its borders are
    /// drawn around it.
    pub fn settle(
        &mut self,
        owner: PlayerId,
        position: HexCoord,
        name: Option<String>,
        board: &BoardController,
        notes: &mut Notifications,
    ) -> std::result::Result<CityId, CommandError> {
        let tile = board
            .tile(&position)
            .ok_or_else(|| CommandError::invalid(format!("{position} is off the board")))?;
        if !tile.can_found_city() {
            return Err(CommandError::invalid(format!("cannot settle on {position}")));
        }
        if self.city_at(&position).is_some() {
            return Err(CommandError::invalid(format!("{position} already has a city")));
        }
        if let Some(other) = tile.owner_city.and_then(|id| self.city(id)) {
            if other.owner != owner {
                return Err(CommandError::invalid(format!(
                    "{position} belongs to {}",
                    other.name
                )));
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        let name = name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("City {id}"));
        let city = City::new(id, owner, name, position);
        info!(city = id, owner, %position, name = %city.name, "city settled");
        notes.push(ChangeEvent::CitySettled { city: city.clone() });
        self.cities.insert(id, city);
        Ok(id)
    }

    /// Run one turn for every city, returning the units they finished.
    pub fn process_turn(
        &mut self,
        board: &mut BoardController,
        catalog: &dyn Catalog,
        speed: GameSpeed,
        rng: &mut dyn RandomSource,
        notes: &mut Notifications,
    ) -> Result<Vec<SpawnRequest>> {
        let mut spawns = Vec::new();
        let ids: Vec<CityId> = self.cities.keys().copied().collect();

        for id in ids {
            let Some(city) = self.cities.get_mut(&id) else {
                continue;
            };

            city.regenerate();
            refresh_income(city, board, catalog)?;

            let building_happiness: i32 = city
                .buildings
                .iter()
                .filter_map(|b| catalog.building(b))
                .map(|b| b.happiness)
                .sum();
            city.happiness = building_happiness - BASE_UNHAPPINESS - city.population as i32;

            match city.apply_growth(city.income.food) {
                GrowthOutcome::Unchanged => {}
                outcome => {
                    debug!(city = id, population = city.population, ?outcome, "population changed");
                    assign_citizens(city, board);
                    refresh_income(city, board, catalog)?;
                }
            }

            let production = city.income.production.max(0) as u32;
            let finished = city.apply_production(production, |item| {
                catalog
                    .production_cost(item)
                    .map(|cost| speed.production_cost(cost))
            });
            match finished {
                Some(ProductionItem::Building(building)) => {
                    debug!(city = id, %building, "building completed");
                    city.buildings.insert(building);
                    refresh_defense(city, catalog)?;
                    refresh_income(city, board, catalog)?;
                }
                Some(ProductionItem::Unit(template)) => {
                    debug!(city = id, %template, "unit completed");
                    spawns.push(SpawnRequest {
                        owner: city.owner,
                        template,
                        position: city.position,
                    });
                }
                None => {}
            }

            city.culture_stored = city
                .culture_stored
                .saturating_add(city.income.culture.max(0) as u32);
            let claimed = expand_borders(city, board, rng, notes);
            if !claimed.is_empty() {
                refresh_income(city, board, catalog)?;
                notes.push(ChangeEvent::CityBorderExpanded {
                    city: city.clone(),
                    claimed,
                });
            }

            let owned = board.tiles_of_city(id).len();
            city.update_forecasts(owned);
            notes.push(ChangeEvent::CityUpdated { city: city.clone() });
        }

        Ok(spawns)
    }

    /// Reassign every citizen of `city` and refresh its income.
    pub fn assign_citizens(
        &mut self,
        city: CityId,
        board: &BoardController,
        catalog: &dyn Catalog,
    ) -> Result<()> {
        let Some(city) = self.cities.get_mut(&city) else {
            return Ok(());
        };
        assign_citizens(city, board);
        refresh_income(city, board, catalog)
    }

    /// Claim border tiles for `city` if it has the culture for it.
    pub fn expand_borders(
        &mut self,
        city: CityId,
        board: &mut BoardController,
        rng: &mut dyn RandomSource,
        notes: &mut Notifications,
    ) -> Vec<HexCoord> {
        match self.cities.get_mut(&city) {
            Some(city) => expand_borders(city, board, rng, notes),
            None => Vec::new(),
        }
    }

    /// Apply combat damage to a city. HP never drops below 1.
    pub fn damage(&mut self, city: CityId, amount: u32, notes: &mut Notifications) -> Option<u32> {
        let city = self.cities.get_mut(&city)?;
        city.take_damage(amount);
        debug!(city = city.id, amount, hp = city.hp, "city damaged");
        notes.push(ChangeEvent::CityUpdated { city: city.clone() });
        Some(city.hp)
    }

    /// Hand a city to `new_owner`, discarding its production.
    ///
    /// Returns the previous owner.
    pub fn capture(
        &mut self,
        city: CityId,
        new_owner: PlayerId,
        notes: &mut Notifications,
    ) -> Option<PlayerId> {
        let city = self.cities.get_mut(&city)?;
        let previous_owner = city.owner;
        city.owner = new_owner;
        city.queue.clear();
        city.production_overflow = 0;
        info!(city = city.id, previous_owner, new_owner, "city captured");
        notes.push(ChangeEvent::CityCaptured {
            city: city.clone(),
            previous_owner,
        });
        Some(previous_owner)
    }

    /// Apply a command issued by `player`.
    ///
    /// `techs` are the issuing player's unlocked technologies. The city is
    /// only modified once the command is known to be valid.
    pub fn command(
        &mut self,
        player: PlayerId,
        techs: &BTreeSet<TechId>,
        command: &CityCommand,
        board: &BoardController,
        catalog: &dyn Catalog,
        notes: &mut Notifications,
    ) -> std::result::Result<(), CommandError> {
        let action = command.parse()?;
        let city = self
            .cities
            .get_mut(&command.city)
            .ok_or(CommandError::UnknownCity(command.city))?;
        if city.owner != player {
            return Err(CommandError::NotOwner {
                player,
                what: format!("city {}", city.id),
            });
        }

        match action {
            CityAction::Rename(name) => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(CommandError::invalid("city name cannot be empty"));
                }
                city.name = name.to_string();
            }
            CityAction::ChangeProduction(item) => {
                check_producible(city, &item, techs, catalog)?;
                city.change_production(item);
            }
            CityAction::QueueProduction(item) => {
                check_producible(city, &item, techs, catalog)?;
                city.queue_production(item);
            }
            CityAction::CancelProduction(index) => {
                city.cancel_production(index)
                    .ok_or_else(|| CommandError::invalid(format!("no queue entry {index}")))?;
            }
            CityAction::MoveProductionUp(index) => {
                if !city.move_production_up(index) {
                    return Err(CommandError::invalid(format!("cannot move entry {index} up")));
                }
            }
            CityAction::MoveProductionDown(index) => {
                if !city.move_production_down(index) {
                    return Err(CommandError::invalid(format!("cannot move entry {index} down")));
                }
            }
            CityAction::BuyProduction => {
                debug!(city = city.id, "buying production is not supported");
                return Ok(());
            }
            CityAction::ChangeCitizenFocus(focus) => {
                city.focus = focus;
                assign_citizens(city, board);
                refresh_income(city, board, catalog)
                    .map_err(|e| CommandError::Unavailable(e.to_string()))?;
            }
        }

        notes.push(ChangeEvent::CityUpdated { city: city.clone() });
        Ok(())
    }
}

fn check_producible(
    city: &City,
    item: &ProductionItem,
    techs: &BTreeSet<TechId>,
    catalog: &dyn Catalog,
) -> std::result::Result<(), CommandError> {
    if catalog.production_cost(item).is_none() {
        return Err(CommandError::UnknownTemplate(item.id().to_string()));
    }
    if let Some(tech) = catalog.production_requirement(item) {
        if !techs.contains(tech) {
            return Err(CommandError::Unavailable(format!(
                "{} requires {tech}",
                item.id()
            )));
        }
    }
    if let ProductionItem::Building(building) = item {
        if city.has_or_queued(building) {
            return Err(CommandError::Unavailable(format!(
                "{building} is already built or queued"
            )));
        }
    }
    Ok(())
}

/// Citizen preference for a tile under the given focus.
fn citizen_score(tile: &Tile, focus: YieldKind) -> i32 {
    let yields = tile.yields();
    5 * yields.amount(focus) + yields.total()
}

/// Greedily give each citizen the best owned tile nobody works yet.
fn assign_citizens(city: &mut City, board: &BoardController) {
    let mut available: Vec<&Tile> = board.tiles_of_city(city.id);
    city.worked_tiles.clear();

    for _ in 0..city.population {
        let mut best: Option<(usize, i32)> = None;
        for (index, tile) in available.iter().enumerate() {
            let score = citizen_score(tile, city.focus);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((index, score));
            }
        }
        let Some((index, _)) = best else {
            break;
        };
        city.worked_tiles.push(available.remove(index).coord);
    }
}

/// Recompute income and strategic resources from worked tiles and buildings.
fn refresh_income(city: &mut City, board: &BoardController, catalog: &dyn Catalog) -> Result<()> {
    let mut income = Yields::zero();
    let mut strategic = BTreeMap::new();

    for coord in &city.worked_tiles {
        let Some(tile) = board.tile(coord) else {
            continue;
        };
        income += tile.yields();
        if let Some(resource) = tile.resource.filter(|r| r.is_strategic()) {
            *strategic.entry(resource).or_insert(0) += tile.resource_quantity;
        }
    }
    for id in &city.buildings {
        let building = catalog
            .building(id)
            .ok_or_else(|| SimError::Catalog(format!("city {} has unknown building {id}", city.id)))?;
        income += building.yields;
    }

    city.income = income;
    city.strategic = strategic;
    Ok(())
}

/// Recompute max HP and defensive strength from buildings.
fn refresh_defense(city: &mut City, catalog: &dyn Catalog) -> Result<()> {
    let mut hp = BASE_CITY_HP;
    let mut strength = BASE_CITY_STRENGTH;
    for id in &city.buildings {
        let building = catalog
            .building(id)
            .ok_or_else(|| SimError::Catalog(format!("city {} has unknown building {id}", city.id)))?;
        hp += building.hp_bonus;
        strength += building.defense;
    }
    city.max_hp = hp;
    city.combat_strength = strength;
    city.hp = city.hp.min(hp);
    Ok(())
}

fn border_candidates(city: &City, board: &BoardController, owned: &[HexCoord], radius: u32) -> BTreeSet<HexCoord> {
    let grid = board.board();
    owned
        .iter()
        .flat_map(|c| grid.neighbors(c))
        .filter(|n| n.distance(&city.position) <= radius)
        .filter(|n| grid.get(n).is_some_and(|t| t.owner_city.is_none()))
        .collect()
}

fn border_score(tile: &Tile, center: &HexCoord) -> i32 {
    tile.terrain.border_score()
        + tile.resource.map_or(0, |r| r.border_score())
        + tile.improvement.map_or(0, |i| i.border_score())
        + (5 - tile.coord.distance(center) as i32)
}

/// Claim border tiles for a city, returning what was claimed.
///
/// A city without tiles takes its center and the free tiles around it for
/// free. Otherwise one tile is bought once stored culture exceeds the cost.
fn expand_borders(
    city: &mut City,
    board: &mut BoardController,
    rng: &mut dyn RandomSource,
    notes: &mut Notifications,
) -> Vec<HexCoord> {
    let owned: Vec<HexCoord> = board.tiles_of_city(city.id).iter().map(|t| t.coord).collect();

    if owned.is_empty() {
        let grid = board.board();
        let mut claimed = vec![city.position];
        claimed.extend(grid.neighbors(&city.position));
        claimed.retain(|c| {
            grid.get(c)
                .is_some_and(|t| t.owner_city.map_or(true, |o| o == city.id))
        });
        claimed.sort();
        board.claim(&claimed, Some(city.id), notes);
        assign_citizens(city, board);
        debug!(city = city.id, tiles = claimed.len(), "initial borders drawn");
        return claimed;
    }

    let cost = border_cost(owned.len());
    if city.culture_stored <= cost {
        return Vec::new();
    }

    let mut candidates = BTreeSet::new();
    if owned.len() < WIDE_BORDER_THRESHOLD {
        candidates = border_candidates(city, board, &owned, BORDER_RADIUS);
    }
    if candidates.is_empty() {
        candidates = border_candidates(city, board, &owned, WIDE_BORDER_RADIUS);
    }

    let scored: Vec<(HexCoord, i32)> = candidates
        .into_iter()
        .filter_map(|c| board.tile(&c).map(|t| (c, border_score(t, &city.position))))
        .collect();
    let Some(top) = scored.iter().map(|(_, s)| *s).max() else {
        return Vec::new();
    };
    let tied: Vec<HexCoord> = scored
        .into_iter()
        .filter(|(_, s)| *s == top)
        .map(|(c, _)| c)
        .collect();
    let choice = tied[rng.index(tied.len()).min(tied.len() - 1)];

    board.claim(&[choice], Some(city.id), notes);
    city.culture_stored -= cost;
    assign_citizens(city, board);
    debug!(city = city.id, tile = %choice, cost, "border expanded");
    vec![choice]
}
