//! Terrain types, features, improvements and resources for the board.

use crate::yields::Yields;
use serde::{Deserialize, Serialize};

/// Base terrain type for a tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Terrain {
    #[default]
    Grassland,
    Plains,
    Desert,
    Tundra,
    Snow,
    Coast,
    Ocean,
}

impl Terrain {
    /// Get the base yields for this terrain type.
    pub const fn base_yields(&self) -> Yields {
        match self {
            Terrain::Grassland => Yields::new(2, 0, 0, 0, 0),
            Terrain::Plains => Yields::new(1, 1, 0, 0, 0),
            Terrain::Desert => Yields::zero(),
            Terrain::Tundra => Yields::new(1, 0, 0, 0, 0),
            Terrain::Snow => Yields::zero(),
            Terrain::Coast => Yields::new(1, 0, 1, 0, 0),
            Terrain::Ocean => Yields::new(1, 0, 0, 0, 0),
        }
    }

    /// Check if this is a water terrain type.
    pub const fn is_water(&self) -> bool {
        matches!(self, Terrain::Coast | Terrain::Ocean)
    }

    /// Check if this is a land terrain type.
    pub const fn is_land(&self) -> bool {
        !self.is_water()
    }

    /// Score contribution when a city weighs this terrain for border growth.
    pub const fn border_score(&self) -> i32 {
        match self {
            Terrain::Grassland => 1,
            Terrain::Tundra => -3,
            Terrain::Snow => -4,
            Terrain::Coast | Terrain::Ocean => -1,
            Terrain::Plains | Terrain::Desert => 0,
        }
    }

    /// Get all terrain variants.
    pub const fn all() -> &'static [Terrain] {
        &[
            Terrain::Grassland,
            Terrain::Plains,
            Terrain::Desert,
            Terrain::Tundra,
            Terrain::Snow,
            Terrain::Coast,
            Terrain::Ocean,
        ]
    }
}

/// Relief features layered on top of the base terrain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Feature {
    Hills,
    Mountains,
}

impl Feature {
    /// Get the yield modifier for this feature.
    pub const fn yield_modifier(&self) -> Yields {
        match self {
            Feature::Hills => Yields::new(0, 1, 0, 0, 0),
            Feature::Mountains => Yields::zero(),
        }
    }

    /// Movement cost of a tile carrying this feature.
    pub const fn movement_cost(&self) -> u32 {
        match self {
            Feature::Hills => 2,
            Feature::Mountains => u32::MAX,
        }
    }

    /// Combat strength bonus percentage for a unit standing on this feature.
    pub const fn combat_bonus(&self) -> i32 {
        match self {
            Feature::Hills => 25,
            Feature::Mountains => 0,
        }
    }
}

/// Tile improvements.
///
/// Forest and jungle are natural cover placed by world generation; the rest
/// are built by workers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Improvement {
    Forest,
    Jungle,
    Farm,
    Mine,
    Plantation,
    Pasture,
    Camp,
    Quarry,
    TradingPost,
    Fort,
}

impl Improvement {
    /// Get the yield bonus from this improvement.
    pub const fn yield_bonus(&self) -> Yields {
        match self {
            Improvement::Forest => Yields::new(-1, 1, 0, 0, 0),
            Improvement::Jungle => Yields::new(0, -1, 0, 0, 0),
            Improvement::Farm => Yields::new(1, 0, 0, 0, 0),
            Improvement::Mine => Yields::new(0, 1, 0, 0, 0),
            Improvement::Plantation => Yields::new(0, 0, 1, 0, 0),
            Improvement::Pasture => Yields::new(0, 1, 0, 0, 0),
            Improvement::Camp => Yields::new(0, 0, 1, 0, 0),
            Improvement::Quarry => Yields::new(0, 1, 0, 0, 0),
            Improvement::TradingPost => Yields::new(0, 0, 1, 1, 0),
            Improvement::Fort => Yields::zero(),
        }
    }

    /// Whether this improvement is natural cover rather than built.
    pub const fn is_natural(&self) -> bool {
        matches!(self, Improvement::Forest | Improvement::Jungle)
    }

    /// Extra movement cost imposed by the improvement.
    pub const fn movement_cost(&self) -> u32 {
        match self {
            Improvement::Forest | Improvement::Jungle => 2,
            _ => 1,
        }
    }

    /// Combat strength bonus percentage for a unit standing on this improvement.
    pub const fn combat_bonus(&self) -> i32 {
        match self {
            Improvement::Forest | Improvement::Jungle => 25,
            _ => 0,
        }
    }

    /// Score contribution when a city weighs this improvement for border growth.
    pub const fn border_score(&self) -> i32 {
        match self {
            Improvement::Forest | Improvement::Jungle => 1,
            Improvement::Mine | Improvement::Plantation | Improvement::Farm => 2,
            _ => 0,
        }
    }

    /// Whether the improvement may exist on the given terrain and feature.
    pub const fn allowed_on(&self, terrain: Terrain, feature: Option<Feature>) -> bool {
        if terrain.is_water() {
            return false;
        }
        if matches!(feature, Some(Feature::Mountains)) {
            return false;
        }
        match self {
            Improvement::Forest | Improvement::Jungle => {
                !matches!(terrain, Terrain::Desert | Terrain::Snow)
            }
            Improvement::Farm => !matches!(terrain, Terrain::Snow),
            _ => true,
        }
    }
}

/// Resources that can appear on land tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resource {
    // Strategic resources
    Iron,
    Horses,
    Coal,
    Oil,
    Uranium,

    // Luxury resources
    Gold,
    Silver,
    Gems,
    Silk,
    Dyes,
    Spices,
    Incense,
    Wine,
    Furs,
    Ivory,
    Marble,

    // Bonus resources
    Wheat,
    Cattle,
    Sheep,
    Deer,
    Stone,
    Copper,
    Salt,
}

/// Category of a resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceCategory {
    /// Required for certain units; counted as a quantity
    Strategic,
    /// Rare goods
    Luxury,
    /// Provides extra yields
    Bonus,
}

impl Resource {
    /// Get the category of this resource.
    pub const fn category(&self) -> ResourceCategory {
        match self {
            Resource::Iron
            | Resource::Horses
            | Resource::Coal
            | Resource::Oil
            | Resource::Uranium => ResourceCategory::Strategic,

            Resource::Gold
            | Resource::Silver
            | Resource::Gems
            | Resource::Silk
            | Resource::Dyes
            | Resource::Spices
            | Resource::Incense
            | Resource::Wine
            | Resource::Furs
            | Resource::Ivory
            | Resource::Marble => ResourceCategory::Luxury,

            _ => ResourceCategory::Bonus,
        }
    }

    /// Whether this is a strategic resource.
    pub const fn is_strategic(&self) -> bool {
        matches!(self.category(), ResourceCategory::Strategic)
    }

    /// Yields the resource adds to its tile.
    ///
    /// Strategic resources give production, luxuries gold and bonus
    /// resources food, apart from a few special cases.
    pub const fn yield_bonus(&self) -> Yields {
        match self {
            Resource::Gems => Yields::new(0, 0, 3, 0, 0),
            Resource::Marble => Yields::new(0, 0, 1, 0, 1),
            Resource::Stone => Yields::new(0, 1, 0, 0, 0),
            Resource::Copper => Yields::new(0, 0, 1, 0, 0),
            Resource::Salt => Yields::new(1, 0, 1, 0, 0),
            _ => match self.category() {
                ResourceCategory::Strategic => Yields::new(0, 1, 0, 0, 0),
                ResourceCategory::Luxury => Yields::new(0, 0, 2, 0, 0),
                ResourceCategory::Bonus => Yields::new(1, 0, 0, 0, 0),
            },
        }
    }

    /// Importance tier used when scoring tiles for border growth, 0 to 4.
    pub const fn importance(&self) -> i32 {
        match self {
            Resource::Coal | Resource::Oil | Resource::Uranium => 4,
            Resource::Iron | Resource::Horses => 3,
            _ => match self.category() {
                ResourceCategory::Luxury => 2,
                _ => 0,
            },
        }
    }

    /// Border growth score: +5 for the least important resource up to +9.
    pub const fn border_score(&self) -> i32 {
        5 + self.importance()
    }

    /// Candidate resources for a land tile, by terrain and relief.
    pub fn candidates(terrain: Terrain, feature: Option<Feature>) -> &'static [Resource] {
        match (terrain, feature) {
            (_, Some(Feature::Mountains)) => &[],
            (Terrain::Grassland, Some(Feature::Hills)) => &[Resource::Iron, Resource::Gems, Resource::Sheep],
            (Terrain::Grassland, None) => &[Resource::Wheat, Resource::Cattle, Resource::Horses, Resource::Silk, Resource::Wine],
            (Terrain::Plains, Some(Feature::Hills)) => &[Resource::Iron, Resource::Copper, Resource::Stone],
            (Terrain::Plains, None) => &[Resource::Wheat, Resource::Horses, Resource::Ivory, Resource::Spices],
            (Terrain::Desert, Some(Feature::Hills)) => &[Resource::Gold, Resource::Silver, Resource::Marble],
            (Terrain::Desert, None) => &[Resource::Oil, Resource::Incense, Resource::Salt],
            (Terrain::Tundra, _) => &[Resource::Furs, Resource::Deer, Resource::Silver, Resource::Coal],
            (Terrain::Snow, _) => &[Resource::Oil, Resource::Uranium],
            (Terrain::Coast | Terrain::Ocean, _) => &[],
        }
    }
}

/// Road types that can be built on tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Road {
    Road,
    Railroad,
}

impl Road {
    /// Divisor applied to the movement cost of the tile.
    pub const fn movement_divisor(&self) -> u32 {
        match self {
            Road::Road => 2,
            Road::Railroad => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_land_and_water() {
        let water: Vec<Terrain> = Terrain::all().iter().copied().filter(|t| t.is_water()).collect();
        assert_eq!(water, vec![Terrain::Coast, Terrain::Ocean]);
        assert!(Terrain::all().iter().all(|t| t.is_land() != t.is_water()));
    }

    #[test]
    fn test_border_scores() {
        assert_eq!(Terrain::Grassland.border_score(), 1);
        assert_eq!(Terrain::Tundra.border_score(), -3);
        assert_eq!(Terrain::Snow.border_score(), -4);
        assert_eq!(Terrain::Coast.border_score(), -1);
        assert_eq!(Improvement::Jungle.border_score(), 1);
        assert_eq!(Improvement::Farm.border_score(), 2);
        assert_eq!(Improvement::Pasture.border_score(), 0);
    }

    #[test]
    fn test_resource_border_score_range() {
        for resource in [Resource::Wheat, Resource::Silk, Resource::Iron, Resource::Uranium] {
            let score = resource.border_score();
            assert!((5..=9).contains(&score));
        }
        assert_eq!(Resource::Wheat.border_score(), 5);
        assert_eq!(Resource::Horses.border_score(), 8);
        assert_eq!(Resource::Uranium.border_score(), 9);
    }

    #[test]
    fn test_yields_follow_category() {
        assert_eq!(Resource::Horses.yield_bonus(), Yields::new(0, 1, 0, 0, 0));
        assert_eq!(Resource::Silk.yield_bonus(), Yields::new(0, 0, 2, 0, 0));
        assert_eq!(Resource::Deer.yield_bonus(), Yields::new(1, 0, 0, 0, 0));
        assert_eq!(Resource::Marble.yield_bonus().culture, 1);
        assert!(Resource::Coal.is_strategic());
        assert!(!Resource::Gems.is_strategic());
    }

    #[test]
    fn test_cover_costs_and_bonuses() {
        assert_eq!(Feature::Hills.movement_cost(), 2);
        assert_eq!(Feature::Mountains.movement_cost(), u32::MAX);
        assert_eq!(Improvement::Jungle.movement_cost(), 2);
        assert_eq!(Improvement::Farm.movement_cost(), 1);
        assert_eq!(Feature::Hills.combat_bonus() + Improvement::Forest.combat_bonus(), 50);
        assert_eq!(Improvement::Fort.combat_bonus(), 0);
    }

    #[test]
    fn test_forest_not_allowed_on_desert_or_snow() {
        assert!(!Improvement::Forest.allowed_on(Terrain::Desert, None));
        assert!(!Improvement::Jungle.allowed_on(Terrain::Snow, None));
        assert!(Improvement::Forest.allowed_on(Terrain::Tundra, None));
    }

    #[test]
    fn test_no_improvement_on_mountains_or_water() {
        assert!(!Improvement::Mine.allowed_on(Terrain::Plains, Some(Feature::Mountains)));
        assert!(!Improvement::Farm.allowed_on(Terrain::Coast, None));
        assert!(Improvement::Mine.allowed_on(Terrain::Plains, Some(Feature::Hills)));
    }

    #[test]
    fn test_resource_candidates_fit_the_tile() {
        assert!(Resource::candidates(Terrain::Plains, Some(Feature::Mountains)).is_empty());
        assert!(Resource::candidates(Terrain::Ocean, None).is_empty());
        for terrain in Terrain::all().iter().filter(|t| t.is_land()) {
            assert!(!Resource::candidates(*terrain, None).is_empty());
        }
    }
}
