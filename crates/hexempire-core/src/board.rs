//! The hex board: a fixed rectangle of tiles plus spatial and region queries.

use crate::hex::{Direction, HexCoord};
use crate::terrain::{Feature, Improvement, Resource, Road, Terrain};
use crate::types::CityId;
use crate::yields::Yields;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Movement cost marking a tile that cannot be entered.
pub const IMPASSABLE: u32 = u32::MAX;

/// The game board containing all tiles, stored row-major.
///
/// Tiles are created once and only ever mutated afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Board {
    /// Board width in tiles.
    pub width: u32,
    /// Board height in tiles.
    pub height: u32,
    tiles: Vec<Tile>,
}

impl Board {
    /// Create a board of open ocean.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Terrain::Ocean)
    }

    /// Create a board filled with a single terrain type.
    pub fn filled(width: u32, height: u32, terrain: Terrain) -> Self {
        let mut tiles = Vec::with_capacity((width * height) as usize);
        for r in 0..height as i32 {
            for q in 0..width as i32 {
                tiles.push(Tile::new(HexCoord::new(q, r), terrain));
            }
        }
        Self {
            width,
            height,
            tiles,
        }
    }

    fn index(&self, coord: &HexCoord) -> Option<usize> {
        if self.in_bounds(coord) {
            Some(coord.r as usize * self.width as usize + coord.q as usize)
        } else {
            None
        }
    }

    /// Get a tile at the given coordinate; `None` off the board.
    pub fn get(&self, coord: &HexCoord) -> Option<&Tile> {
        self.index(coord).map(|i| &self.tiles[i])
    }

    /// Get a mutable reference to a tile.
    pub fn get_mut(&mut self, coord: &HexCoord) -> Option<&mut Tile> {
        self.index(coord).map(move |i| &mut self.tiles[i])
    }

    /// Check if a coordinate is within the board bounds.
    pub fn in_bounds(&self, coord: &HexCoord) -> bool {
        coord.in_bounds(self.width, self.height)
    }

    /// The neighbor of `coord` in `dir`, or `None` if it falls off the board.
    pub fn neighbor(&self, coord: &HexCoord, dir: Direction) -> Option<HexCoord> {
        let next = coord.neighbor(dir);
        self.in_bounds(&next).then_some(next)
    }

    /// On-board neighbors of a hex, in direction order.
    pub fn neighbors(&self, coord: &HexCoord) -> Vec<HexCoord> {
        coord
            .neighbors()
            .into_iter()
            .filter(|c| self.in_bounds(c))
            .collect()
    }

    /// Get all tiles within a radius of a point.
    pub fn tiles_in_radius(&self, center: &HexCoord, radius: u32) -> Vec<&Tile> {
        center
            .hexes_in_radius(radius)
            .into_iter()
            .filter_map(|c| self.get(&c))
            .collect()
    }

    /// Count total tiles on the board.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Iterate over all tiles in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Iterate over all tiles mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Tile> {
        self.tiles.iter_mut()
    }

    /// All coordinates in row-major order.
    pub fn coords(&self) -> Vec<HexCoord> {
        self.tiles.iter().map(|t| t.coord).collect()
    }

    /// Maximal connected region around `start` whose tiles satisfy `member`.
    ///
    /// Walks an explicit stack, visiting neighbors in direction order, so
    /// region size is bounded only by the board. Returns an empty region if
    /// `start` is off the board or does not qualify.
    pub fn region<F>(&self, start: HexCoord, member: F) -> Vec<HexCoord>
    where
        F: Fn(&Tile) -> bool,
    {
        let mut visited = HashSet::new();
        self.collect_region(start, &member, &mut visited)
    }

    fn collect_region<F>(
        &self,
        start: HexCoord,
        member: &F,
        visited: &mut HashSet<HexCoord>,
    ) -> Vec<HexCoord>
    where
        F: Fn(&Tile) -> bool,
    {
        let mut region = Vec::new();
        match self.get(&start) {
            Some(tile) if member(tile) => {}
            _ => return region,
        }
        if !visited.insert(start) {
            return region;
        }

        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            region.push(current);
            // Reverse push so the first direction is explored first.
            for next in current.neighbors().into_iter().rev() {
                if visited.contains(&next) {
                    continue;
                }
                if let Some(tile) = self.get(&next) {
                    if member(tile) {
                        visited.insert(next);
                        stack.push(next);
                    }
                }
            }
        }
        region
    }

    /// Partition every qualifying tile into maximal connected regions.
    pub fn regions<F>(&self, member: F) -> Vec<Vec<HexCoord>>
    where
        F: Fn(&Tile) -> bool,
    {
        let mut visited = HashSet::new();
        let mut regions = Vec::new();
        for coord in self.coords() {
            if visited.contains(&coord) {
                continue;
            }
            let region = self.collect_region(coord, &member, &mut visited);
            if !region.is_empty() {
                regions.push(region);
            }
        }
        regions
    }

    /// Connected land containing `start`.
    pub fn land_region(&self, start: HexCoord) -> Vec<HexCoord> {
        self.region(start, |t| t.terrain.is_land())
    }

    /// Connected water containing `start`.
    pub fn water_region(&self, start: HexCoord) -> Vec<HexCoord> {
        self.region(start, |t| t.terrain.is_water())
    }

    /// Connected tiles sharing the terrain of `start`.
    pub fn terrain_region(&self, start: HexCoord) -> Vec<HexCoord> {
        match self.get(&start) {
            Some(tile) => {
                let terrain = tile.terrain;
                self.region(start, move |t| t.terrain == terrain)
            }
            None => Vec::new(),
        }
    }

    /// Connected tiles sharing the feature of `start`.
    pub fn feature_region(&self, start: HexCoord) -> Vec<HexCoord> {
        match self.get(&start).and_then(|t| t.feature) {
            Some(feature) => self.region(start, move |t| t.feature == Some(feature)),
            None => Vec::new(),
        }
    }

    /// Connected tiles sharing the improvement of `start`.
    pub fn improvement_region(&self, start: HexCoord) -> Vec<HexCoord> {
        match self.get(&start).and_then(|t| t.improvement) {
            Some(improvement) => self.region(start, move |t| t.improvement == Some(improvement)),
            None => Vec::new(),
        }
    }
}

/// An improvement being built on a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Construction {
    pub improvement: Improvement,
    /// Turns of work completed so far.
    pub progress: u32,
}

/// A single tile on the board.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    /// Position on the board.
    pub coord: HexCoord,
    /// Base terrain type.
    pub terrain: Terrain,
    /// Optional relief (hills, mountains).
    pub feature: Option<Feature>,
    /// Optional resource on this tile.
    pub resource: Option<Resource>,
    /// Units of the resource; only meaningful for strategic resources.
    pub resource_quantity: u32,
    /// Improvement or natural cover.
    pub improvement: Option<Improvement>,
    /// Road/railroad on this tile.
    pub road: Option<Road>,
    /// City that owns this tile, if claimed.
    pub owner_city: Option<CityId>,
    /// Improvement has been pillaged and yields nothing until repaired.
    pub pillaged: bool,
    /// Tile is contaminated by fallout.
    pub fallout: bool,
    /// Improvement under construction.
    pub construction: Option<Construction>,
}

impl Tile {
    /// Create a new tile with just terrain.
    pub fn new(coord: HexCoord, terrain: Terrain) -> Self {
        Self {
            coord,
            terrain,
            feature: None,
            resource: None,
            resource_quantity: 0,
            improvement: None,
            road: None,
            owner_city: None,
            pillaged: false,
            fallout: false,
            construction: None,
        }
    }

    /// Calculate the total yields from this tile.
    pub fn yields(&self) -> Yields {
        if self.fallout {
            return Yields::zero();
        }

        let mut y = self.terrain.base_yields();

        if let Some(feature) = &self.feature {
            y += feature.yield_modifier();
        }

        if let Some(improvement) = &self.improvement {
            if !self.pillaged || improvement.is_natural() {
                y += improvement.yield_bonus();
            }
        }

        if let Some(resource) = &self.resource {
            y += resource.yield_bonus();
        }

        y.clamp_non_negative()
    }

    /// Get the movement cost to enter this tile, or [`IMPASSABLE`].
    pub fn movement_cost(&self) -> u32 {
        if self.terrain.is_water() {
            return IMPASSABLE;
        }

        let mut cost = 1;
        if let Some(feature) = &self.feature {
            cost = cost.max(feature.movement_cost());
        }
        if cost == IMPASSABLE {
            return IMPASSABLE;
        }
        if let Some(improvement) = &self.improvement {
            cost = cost.max(improvement.movement_cost());
        }

        match &self.road {
            Some(road) => cost.div_ceil(road.movement_divisor()).max(1),
            None => cost,
        }
    }

    /// Whether a land unit may enter the tile.
    pub fn is_passable(&self) -> bool {
        self.movement_cost() != IMPASSABLE
    }

    /// Additive combat strength bonus percentage for a unit standing here.
    pub fn combat_bonus(&self) -> i32 {
        let feature = self.feature.map_or(0, |f| f.combat_bonus());
        let cover = self.improvement.map_or(0, |i| i.combat_bonus());
        feature + cover
    }

    /// Check if the terrain allows founding a city here.
    pub fn can_found_city(&self) -> bool {
        self.terrain.is_land() && self.feature != Some(Feature::Mountains)
    }

    /// Whether a worker may start building `improvement` here.
    pub fn can_build(&self, improvement: Improvement) -> bool {
        !improvement.is_natural()
            && improvement.allowed_on(self.terrain, self.feature)
            && self.improvement != Some(improvement)
            && !self.fallout
    }

    /// Whether the tile obeys the terrain/improvement placement rules.
    pub fn is_consistent(&self) -> bool {
        let feature_ok = !(self.terrain.is_water() && self.feature.is_some());
        let improvement_ok = self
            .improvement
            .map_or(true, |i| i.allowed_on(self.terrain, self.feature));
        feature_ok && improvement_ok
    }
}

impl Default for Tile {
    fn default() -> Self {
        Self::new(HexCoord::default(), Terrain::default())
    }
}
