//! Read-only catalogs of technology, building and unit templates.
//!
//! The simulation never owns its content: a [`Catalog`] is injected into the
//! [`ControllerManager`](crate::manager::ControllerManager) and looked up by
//! id. [`StaticCatalog::standard`] provides an ancient/classical content set.

use crate::city::ProductionItem;
use crate::commands::UnitCommandKind;
use crate::error::{Result, SimError};
use crate::types::{BuildingId, Era, TechId, UnitTemplateId};
use crate::yields::Yields;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Broad unit role, used to gate commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitArchetype {
    Civilian,
    Worker,
    Melee,
    Mounted,
    Ranged,
    Siege,
}

impl UnitArchetype {
    /// Whether units of this archetype fight.
    pub const fn is_military(&self) -> bool {
        !matches!(self, UnitArchetype::Civilian | UnitArchetype::Worker)
    }
}

/// A technology in the tech tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TechTemplate {
    pub id: TechId,
    pub name: String,
    pub era: Era,
    /// Base research cost (scaled by game speed).
    pub cost: u32,
    /// Technologies required before this can be researched.
    pub prerequisites: Vec<TechId>,
}

impl TechTemplate {
    pub fn new(id: &str, name: &str, era: Era, cost: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            era,
            cost,
            prerequisites: Vec::new(),
        }
    }

    /// Add prerequisites.
    pub fn with_prerequisites(mut self, prereqs: &[&str]) -> Self {
        self.prerequisites = prereqs.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// A city building.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuildingTemplate {
    pub id: BuildingId,
    pub name: String,
    /// Base production cost (scaled by game speed).
    pub cost: u32,
    /// Flat yields added to the city every turn.
    pub yields: Yields,
    pub happiness: i32,
    /// Added to the city's combat strength.
    pub defense: u32,
    /// Added to the city's maximum HP.
    pub hp_bonus: u32,
    pub required_tech: Option<TechId>,
}

impl BuildingTemplate {
    pub fn new(id: &str, name: &str, cost: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            cost,
            yields: Yields::zero(),
            happiness: 0,
            defense: 0,
            hp_bonus: 0,
            required_tech: None,
        }
    }

    pub fn with_yields(mut self, yields: Yields) -> Self {
        self.yields = yields;
        self
    }

    pub fn with_happiness(mut self, happiness: i32) -> Self {
        self.happiness = happiness;
        self
    }

    pub fn with_defense(mut self, defense: u32, hp_bonus: u32) -> Self {
        self.defense = defense;
        self.hp_bonus = hp_bonus;
        self
    }

    pub fn requires(mut self, tech: &str) -> Self {
        self.required_tech = Some(tech.to_string());
        self
    }
}

/// Gate on one command of a unit template.
///
/// A command is available only when every condition holds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandUnlock {
    pub command: UnitCommandKind,
    pub required_tech: Option<TechId>,
    /// Archetypes allowed to use the command; empty means any.
    pub archetypes: Vec<UnitArchetype>,
    /// The unit's tile must be pillaged.
    pub requires_pillage: bool,
    /// The unit's tile must carry fallout.
    pub requires_fallout: bool,
}

impl CommandUnlock {
    pub fn always(command: UnitCommandKind) -> Self {
        Self {
            command,
            required_tech: None,
            archetypes: Vec::new(),
            requires_pillage: false,
            requires_fallout: false,
        }
    }

    pub fn for_archetypes(mut self, archetypes: &[UnitArchetype]) -> Self {
        self.archetypes = archetypes.to_vec();
        self
    }

    pub fn requires_tech(mut self, tech: &str) -> Self {
        self.required_tech = Some(tech.to_string());
        self
    }

    pub fn on_pillaged(mut self) -> Self {
        self.requires_pillage = true;
        self
    }

    pub fn on_fallout(mut self) -> Self {
        self.requires_fallout = true;
        self
    }
}

/// A unit type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitTemplate {
    pub id: UnitTemplateId,
    pub name: String,
    pub archetype: UnitArchetype,
    /// Melee/defense combat strength.
    pub combat_strength: u32,
    /// Ranged attack strength (0 if melee only).
    pub ranged_strength: u32,
    /// Attack range in hexes (0 for melee).
    pub range: u32,
    /// Movement points per turn.
    pub movement: u32,
    /// Actions per turn.
    pub actions: u32,
    pub max_hp: u32,
    pub sight: u32,
    /// Base production cost (scaled by game speed).
    pub cost: u32,
    pub required_tech: Option<TechId>,
    /// Every command the unit can ever use, with its gate.
    pub commands: Vec<CommandUnlock>,
}

impl UnitTemplate {
    pub fn new(id: &str, name: &str, archetype: UnitArchetype, cost: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            archetype,
            combat_strength: 0,
            ranged_strength: 0,
            range: 0,
            movement: 2,
            actions: 1,
            max_hp: 10,
            sight: 2,
            cost,
            required_tech: None,
            commands: standard_commands(),
        }
    }

    pub fn with_combat(mut self, combat_strength: u32) -> Self {
        self.combat_strength = combat_strength;
        self
    }

    pub fn with_ranged(mut self, ranged_strength: u32, range: u32) -> Self {
        self.ranged_strength = ranged_strength;
        self.range = range;
        self
    }

    pub fn with_movement(mut self, movement: u32) -> Self {
        self.movement = movement;
        self
    }

    pub fn requires(mut self, tech: &str) -> Self {
        self.required_tech = Some(tech.to_string());
        self
    }
}

/// The full command list every standard unit carries; archetype gates
/// narrow it per unit.
fn standard_commands() -> Vec<CommandUnlock> {
    use UnitArchetype::*;
    use UnitCommandKind as C;
    vec![
        CommandUnlock::always(C::Move),
        CommandUnlock::always(C::Sleep),
        CommandUnlock::always(C::Wake),
        CommandUnlock::always(C::Skip),
        CommandUnlock::always(C::Disband),
        CommandUnlock::always(C::Settle).for_archetypes(&[Civilian]),
        CommandUnlock::always(C::MeleeAttack).for_archetypes(&[Melee, Mounted]),
        CommandUnlock::always(C::RangedAttack).for_archetypes(&[Ranged, Siege]),
        CommandUnlock::always(C::Pillage).for_archetypes(&[Melee, Mounted]),
        CommandUnlock::always(C::BuildImprovement).for_archetypes(&[Worker]),
        CommandUnlock::always(C::Repair)
            .for_archetypes(&[Worker])
            .requires_tech("masonry")
            .on_pillaged(),
        CommandUnlock::always(C::CleanFallout)
            .for_archetypes(&[Worker])
            .on_fallout(),
    ]
}

/// Read-only lookup of templates by id.
pub trait Catalog {
    fn technology(&self, id: &str) -> Option<&TechTemplate>;
    fn building(&self, id: &str) -> Option<&BuildingTemplate>;
    fn unit(&self, id: &str) -> Option<&UnitTemplate>;

    fn technologies(&self) -> Vec<&TechTemplate>;
    fn buildings(&self) -> Vec<&BuildingTemplate>;
    fn units(&self) -> Vec<&UnitTemplate>;

    /// Base production cost of a queue item, if it names a known template.
    fn production_cost(&self, item: &ProductionItem) -> Option<u32> {
        match item {
            ProductionItem::Building(id) => self.building(id).map(|b| b.cost),
            ProductionItem::Unit(id) => self.unit(id).map(|u| u.cost),
        }
    }

    /// Tech that must be unlocked before an item can be queued.
    fn production_requirement(&self, item: &ProductionItem) -> Option<&TechId> {
        match item {
            ProductionItem::Building(id) => self.building(id)?.required_tech.as_ref(),
            ProductionItem::Unit(id) => self.unit(id)?.required_tech.as_ref(),
        }
    }
}

/// In-memory catalog.
#[derive(Clone, Debug, Default)]
pub struct StaticCatalog {
    techs: BTreeMap<TechId, TechTemplate>,
    buildings: BTreeMap<BuildingId, BuildingTemplate>,
    units: BTreeMap<UnitTemplateId, UnitTemplate>,
}

impl StaticCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_technology(mut self, tech: TechTemplate) -> Self {
        self.techs.insert(tech.id.clone(), tech);
        self
    }

    pub fn with_building(mut self, building: BuildingTemplate) -> Self {
        self.buildings.insert(building.id.clone(), building);
        self
    }

    pub fn with_unit(mut self, unit: UnitTemplate) -> Self {
        self.units.insert(unit.id.clone(), unit);
        self
    }

    /// The standard ancient and classical content set.
    pub fn standard() -> Self {
        use Era::{Ancient, Classical};
        use UnitArchetype::*;

        Self::new()
            // Ancient Era
            .with_technology(TechTemplate::new("agriculture", "Agriculture", Ancient, 20))
            .with_technology(
                TechTemplate::new("pottery", "Pottery", Ancient, 35).with_prerequisites(&["agriculture"]),
            )
            .with_technology(
                TechTemplate::new("animal_husbandry", "Animal Husbandry", Ancient, 35)
                    .with_prerequisites(&["agriculture"]),
            )
            .with_technology(
                TechTemplate::new("archery", "Archery", Ancient, 35).with_prerequisites(&["agriculture"]),
            )
            .with_technology(
                TechTemplate::new("mining", "Mining", Ancient, 35).with_prerequisites(&["agriculture"]),
            )
            .with_technology(
                TechTemplate::new("bronze_working", "Bronze Working", Ancient, 55)
                    .with_prerequisites(&["mining"]),
            )
            .with_technology(
                TechTemplate::new("writing", "Writing", Ancient, 55).with_prerequisites(&["pottery"]),
            )
            .with_technology(
                TechTemplate::new("horseback_riding", "Horseback Riding", Ancient, 55)
                    .with_prerequisites(&["animal_husbandry"]),
            )
            .with_technology(
                TechTemplate::new("masonry", "Masonry", Ancient, 55).with_prerequisites(&["mining"]),
            )
            // Classical Era
            .with_technology(
                TechTemplate::new("currency", "Currency", Classical, 80)
                    .with_prerequisites(&["bronze_working"]),
            )
            .with_technology(
                TechTemplate::new("iron_working", "Iron Working", Classical, 80)
                    .with_prerequisites(&["bronze_working"]),
            )
            .with_technology(
                TechTemplate::new("mathematics", "Mathematics", Classical, 80)
                    .with_prerequisites(&["writing", "currency"]),
            )
            .with_technology(
                TechTemplate::new("philosophy", "Philosophy", Classical, 100)
                    .with_prerequisites(&["writing"]),
            )
            .with_technology(
                TechTemplate::new("construction", "Construction", Classical, 100)
                    .with_prerequisites(&["masonry"]),
            )
            // Buildings
            .with_building(
                BuildingTemplate::new("monument", "Monument", 40).with_yields(Yields::new(0, 0, 0, 0, 2)),
            )
            .with_building(
                BuildingTemplate::new("granary", "Granary", 60)
                    .with_yields(Yields::new(2, 0, 0, 0, 0))
                    .requires("pottery"),
            )
            .with_building(
                BuildingTemplate::new("library", "Library", 75)
                    .with_yields(Yields::new(0, 0, 0, 2, 0))
                    .requires("writing"),
            )
            .with_building(
                BuildingTemplate::new("barracks", "Barracks", 75)
                    .with_yields(Yields::new(0, 1, 0, 0, 0))
                    .requires("bronze_working"),
            )
            .with_building(
                BuildingTemplate::new("walls", "Walls", 75)
                    .with_defense(5, 10)
                    .requires("masonry"),
            )
            .with_building(
                BuildingTemplate::new("market", "Market", 100)
                    .with_yields(Yields::new(0, 0, 2, 0, 0))
                    .requires("currency"),
            )
            .with_building(
                BuildingTemplate::new("temple", "Temple", 100)
                    .with_yields(Yields::new(0, 0, 0, 0, 1))
                    .with_happiness(2)
                    .requires("philosophy"),
            )
            // Units
            .with_unit(UnitTemplate::new("settler", "Settler", Civilian, 50))
            .with_unit(UnitTemplate::new("worker", "Worker", Worker, 30))
            .with_unit(UnitTemplate::new("warrior", "Warrior", Melee, 40).with_combat(8))
            .with_unit(
                UnitTemplate::new("archer", "Archer", Ranged, 50)
                    .with_combat(5)
                    .with_ranged(7, 2)
                    .requires("archery"),
            )
            .with_unit(
                UnitTemplate::new("spearman", "Spearman", Melee, 56)
                    .with_combat(11)
                    .requires("bronze_working"),
            )
            .with_unit(
                UnitTemplate::new("horseman", "Horseman", Mounted, 60)
                    .with_combat(12)
                    .with_movement(4)
                    .requires("horseback_riding"),
            )
            .with_unit(
                UnitTemplate::new("swordsman", "Swordsman", Melee, 75)
                    .with_combat(14)
                    .requires("iron_working"),
            )
            .with_unit(
                UnitTemplate::new("catapult", "Catapult", Siege, 75)
                    .with_combat(7)
                    .with_ranged(14, 2)
                    .requires("mathematics"),
            )
    }
}

impl Catalog for StaticCatalog {
    fn technology(&self, id: &str) -> Option<&TechTemplate> {
        self.techs.get(id)
    }

    fn building(&self, id: &str) -> Option<&BuildingTemplate> {
        self.buildings.get(id)
    }

    fn unit(&self, id: &str) -> Option<&UnitTemplate> {
        self.units.get(id)
    }

    fn technologies(&self) -> Vec<&TechTemplate> {
        self.techs.values().collect()
    }

    fn buildings(&self) -> Vec<&BuildingTemplate> {
        self.buildings.values().collect()
    }

    fn units(&self) -> Vec<&UnitTemplate> {
        self.units.values().collect()
    }
}

/// Check every cross-reference in a catalog.
///
/// Fails on the first reference to a missing technology, a zero cost, or a
/// prerequisite cycle.
pub fn validate_catalog(catalog: &dyn Catalog) -> Result<()> {
    let known = |id: &TechId, owner: &str| -> Result<()> {
        if catalog.technology(id).is_none() {
            return Err(SimError::Catalog(format!(
                "{} references unknown technology '{}'",
                owner, id
            )));
        }
        Ok(())
    };

    for tech in catalog.technologies() {
        if tech.cost == 0 {
            return Err(SimError::Catalog(format!("technology '{}' has no cost", tech.id)));
        }
        for prereq in &tech.prerequisites {
            known(prereq, &format!("technology '{}'", tech.id))?;
        }
    }

    for building in catalog.buildings() {
        if building.cost == 0 {
            return Err(SimError::Catalog(format!("building '{}' has no cost", building.id)));
        }
        if let Some(tech) = &building.required_tech {
            known(tech, &format!("building '{}'", building.id))?;
        }
    }

    for unit in catalog.units() {
        if unit.cost == 0 || unit.max_hp == 0 {
            return Err(SimError::Catalog(format!(
                "unit '{}' needs a cost and hit points",
                unit.id
            )));
        }
        if let Some(tech) = &unit.required_tech {
            known(tech, &format!("unit '{}'", unit.id))?;
        }
        for unlock in &unit.commands {
            if let Some(tech) = &unlock.required_tech {
                known(tech, &format!("command {:?} of unit '{}'", unlock.command, unit.id))?;
            }
        }
    }

    check_prerequisite_cycles(catalog)
}

/// Repeatedly resolve technologies whose prerequisites are all resolved;
/// anything left over sits on a cycle.
fn check_prerequisite_cycles(catalog: &dyn Catalog) -> Result<()> {
    let techs = catalog.technologies();
    let mut resolved: BTreeSet<&str> = BTreeSet::new();

    loop {
        let before = resolved.len();
        for tech in &techs {
            if !resolved.contains(tech.id.as_str())
                && tech
                    .prerequisites
                    .iter()
                    .all(|p| resolved.contains(p.as_str()))
            {
                resolved.insert(tech.id.as_str());
            }
        }
        if resolved.len() == before {
            break;
        }
    }

    match techs.iter().find(|t| !resolved.contains(t.id.as_str())) {
        Some(tech) => Err(SimError::Catalog(format!(
            "technology '{}' is part of a prerequisite cycle",
            tech.id
        ))),
        None => Ok(()),
    }
}
