//! Cities: population, production queue, culture and their growth formulas.
//!
//! The per-turn orchestration lives in
//! [`CityController`](crate::city_controller::CityController); this module
//! holds the city record and the pure formulas it is driven by.

use crate::hex::HexCoord;
use crate::terrain::Resource;
use crate::types::{BuildingId, CityId, PlayerId, TurnEstimate, UnitTemplateId};
use crate::yields::{YieldKind, Yields};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Maximum HP of a city without buildings.
pub const BASE_CITY_HP: u32 = 20;

/// Defensive strength of a city without buildings.
pub const BASE_CITY_STRENGTH: u32 = 8;

/// Fraction of max HP regenerated each turn.
pub const HP_REGEN_FRACTION: f64 = 0.2;

/// Flat unhappiness every city suffers.
pub const BASE_UNHAPPINESS: i32 = 3;

/// Turns a forecast runs before giving up with [`TurnEstimate::FarFuture`].
pub const FORECAST_HORIZON: u32 = 999;

/// Something a city can produce.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductionItem {
    Building(BuildingId),
    Unit(UnitTemplateId),
}

impl ProductionItem {
    /// Catalog id of the item.
    pub fn id(&self) -> &str {
        match self {
            ProductionItem::Building(id) | ProductionItem::Unit(id) => id,
        }
    }
}

/// One entry of the production queue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionOrder {
    pub item: ProductionItem,
    /// Production accumulated so far.
    pub progress: u32,
}

/// Result of a turn of population growth.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrowthOutcome {
    Unchanged,
    Grew,
    Starved,
}

/// A city on the board.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub id: CityId,
    pub owner: PlayerId,
    pub name: String,
    pub position: HexCoord,
    pub population: u32,
    pub hp: u32,
    pub max_hp: u32,
    /// Defensive combat strength.
    pub combat_strength: u32,
    /// Per-turn yields from worked tiles and buildings.
    pub income: Yields,
    pub happiness: i32,
    /// Strategic resource quantities on worked tiles.
    pub strategic: BTreeMap<Resource, u32>,
    /// Food stored toward the next citizen.
    pub excess_food: i32,
    /// Culture stored toward the next border expansion.
    pub culture_stored: u32,
    /// Production carried into the next queue item.
    pub production_overflow: u32,
    /// Ordered production queue; the front item is being built.
    pub queue: Vec<ProductionOrder>,
    pub buildings: BTreeSet<BuildingId>,
    /// Tiles worked by citizens, one per population.
    pub worked_tiles: Vec<HexCoord>,
    /// Yield the citizens favour.
    pub focus: YieldKind,
    pub turns_until_growth: TurnEstimate,
    pub turns_until_border_growth: TurnEstimate,
}

impl City {
    /// Create a new city of one citizen at full health.
    pub fn new(id: CityId, owner: PlayerId, name: String, position: HexCoord) -> Self {
        Self {
            id,
            owner,
            name,
            position,
            population: 1,
            hp: BASE_CITY_HP,
            max_hp: BASE_CITY_HP,
            combat_strength: BASE_CITY_STRENGTH,
            income: Yields::zero(),
            happiness: 0,
            strategic: BTreeMap::new(),
            excess_food: 0,
            culture_stored: 0,
            production_overflow: 0,
            queue: Vec::new(),
            buildings: BTreeSet::new(),
            worked_tiles: Vec::new(),
            focus: YieldKind::Food,
            turns_until_growth: TurnEstimate::Never,
            turns_until_border_growth: TurnEstimate::Never,
        }
    }

    /// Heal a fifth of max HP, staying within `[1, max_hp]`.
    pub fn regenerate(&mut self) {
        let heal = (self.max_hp as f64 * HP_REGEN_FRACTION).round() as u32;
        self.hp = self.hp.saturating_add(heal).clamp(1, self.max_hp.max(1));
    }

    /// Take combat damage; HP never drops below 1.
    pub fn take_damage(&mut self, damage: u32) {
        self.hp = self.hp.saturating_sub(damage).max(1);
    }

    /// Whether an attacker can take the city.
    pub fn can_be_captured(&self) -> bool {
        self.hp <= 1
    }

    /// Apply one turn of food income to population.
    ///
    /// At most one citizen is gained per turn. A deficit costs a citizen
    /// while the city has more than one; a one-citizen city just empties
    /// its store.
    pub fn apply_growth(&mut self, food_income: i32) -> GrowthOutcome {
        self.excess_food += food_income - food_upkeep(self.population);

        let required = food_required(self.population) as i32;
        if self.excess_food >= required {
            self.excess_food -= required;
            self.population += 1;
            GrowthOutcome::Grew
        } else if self.excess_food < 0 {
            self.excess_food = 0;
            if self.population > 1 {
                self.population -= 1;
                GrowthOutcome::Starved
            } else {
                GrowthOutcome::Unchanged
            }
        } else {
            GrowthOutcome::Unchanged
        }
    }

    /// Feed production into the front of the queue.
    ///
    /// `cost_of` prices an item at the session's game speed. Returns the
    /// item that completed, if any; its surplus becomes overflow for the
    /// next item. With an empty queue the production is banked.
    pub fn apply_production(
        &mut self,
        production: u32,
        cost_of: impl Fn(&ProductionItem) -> Option<u32>,
    ) -> Option<ProductionItem> {
        let Some(front) = self.queue.first_mut() else {
            self.production_overflow = self.production_overflow.saturating_add(production);
            return None;
        };

        front.progress = front
            .progress
            .saturating_add(production)
            .saturating_add(self.production_overflow);
        self.production_overflow = 0;

        let cost = cost_of(&front.item)?;
        if front.progress < cost {
            return None;
        }

        let done = self.queue.remove(0);
        self.production_overflow = done.progress - cost;
        Some(done.item)
    }

    /// Whether a building is built or already queued.
    pub fn has_or_queued(&self, building: &str) -> bool {
        self.buildings.contains(building)
            || self
                .queue
                .iter()
                .any(|o| matches!(&o.item, ProductionItem::Building(id) if id == building))
    }

    /// Insert an item at the front of the queue.
    pub fn change_production(&mut self, item: ProductionItem) {
        self.queue.insert(0, ProductionOrder { item, progress: 0 });
    }

    /// Append an item to the queue.
    pub fn queue_production(&mut self, item: ProductionItem) {
        self.queue.push(ProductionOrder { item, progress: 0 });
    }

    /// Remove the item at `index`.
    pub fn cancel_production(&mut self, index: usize) -> Option<ProductionOrder> {
        (index < self.queue.len()).then(|| self.queue.remove(index))
    }

    /// Swap the item at `index` with the one before it.
    pub fn move_production_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.queue.len() {
            return false;
        }
        self.queue.swap(index, index - 1);
        true
    }

    /// Swap the item at `index` with the one after it.
    pub fn move_production_down(&mut self, index: usize) -> bool {
        let Some(next) = index.checked_add(1).filter(|&n| n < self.queue.len()) else {
            return false;
        };
        self.queue.swap(index, next);
        true
    }

    /// Culture still needed before the next border claim.
    pub fn culture_deficit(&self, owned_tiles: usize) -> i64 {
        // Stored culture must exceed the cost, not merely reach it
        border_cost(owned_tiles) as i64 + 1 - self.culture_stored as i64
    }

    /// Refresh both turn forecasts from the current income.
    pub fn update_forecasts(&mut self, owned_tiles: usize) {
        let required = food_required(self.population) as i64;
        let net_food = (self.income.food - food_upkeep(self.population)) as i64;
        self.turns_until_growth = forecast(required - self.excess_food as i64, net_food);
        self.turns_until_border_growth =
            forecast(self.culture_deficit(owned_tiles), self.income.culture as i64);
    }
}

/// Food needed to grow from `population` to the next citizen.
pub fn food_required(population: u32) -> u32 {
    let extra = population.saturating_sub(1) as f64;
    (15.0 + 6.0 * extra + extra.powf(1.8)).floor() as u32
}

/// Food eaten by every citizen beyond the first.
pub fn food_upkeep(population: u32) -> i32 {
    2 * population.saturating_sub(1) as i32
}

/// Culture needed to claim one more tile.
pub fn border_cost(owned_tiles: usize) -> u32 {
    let extra = owned_tiles.saturating_sub(1) as f64;
    (20.0 + (10.0 * extra).powf(1.1)).round() as u32
}

/// Turns until `deficit` is paid off at `income` per turn.
pub fn forecast(deficit: i64, income: i64) -> TurnEstimate {
    if income <= 0 {
        return TurnEstimate::Never;
    }
    let mut remaining = deficit;
    for turn in 0..=FORECAST_HORIZON {
        if remaining <= 0 {
            return TurnEstimate::Turns(turn);
        }
        remaining -= income;
    }
    TurnEstimate::FarFuture
}
