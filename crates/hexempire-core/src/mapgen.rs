//! Procedural world generation.
//!
//! A world is built in two stages. A world-type recipe lays out land and
//! water using random terrain spreads or value noise, then a fixed sequence
//! of feature passes decorates it. Each feature pass can be switched off in
//! [`WorldGenConfig`], where `None` means the pass does not run.
//!
//! Generation is deterministic for a given random source, so a session
//! seed always reproduces the same board.

use crate::board::{Board, Tile};
use crate::hex::{Direction, HexCoord};
use crate::noise::value_noise;
use crate::random::RandomSource;
use crate::terrain::{Feature, Improvement, Resource, Terrain};
use crate::types::{WorldSize, WorldType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// How many random directions a spread step tries before giving up.
const MAX_STEP_ATTEMPTS: usize = 24;

/// Per-step chance that a range veers 60 degrees.
const RANGE_TURN_CHANCE: f64 = 0.3;

/// Configuration for world generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldGenConfig {
    pub world_type: WorldType,
    pub world_size: WorldSize,
    /// Number of inland lakes to seed.
    pub lakes: Option<u32>,
    /// Landmasses smaller than this many tiles are sunk.
    pub min_landmass: Option<usize>,
    /// Water bodies smaller than this many tiles are filled in.
    pub min_water_body: Option<usize>,
    pub mountain_ranges: Option<u32>,
    pub hill_ranges: Option<u32>,
    pub forest_patches: Option<u32>,
    pub jungle_patches: Option<u32>,
    pub desert_patches: Option<u32>,
    /// Chance that a passable land tile receives a resource.
    pub resource_chance: Option<f64>,
    /// Rows at the top and bottom turned to snow and tundra.
    pub polar_rows: Option<u32>,
    /// Turn ocean touching land into coast.
    pub coastal_reclassification: bool,
}

impl WorldGenConfig {
    /// Defaults for a world type and size, scaled by tile count.
    pub fn for_world(world_type: WorldType, world_size: WorldSize) -> Self {
        let (width, height) = world_size.dimensions();
        let scale = (width * height) as f64 / 1000.0;
        let count = |per_thousand: f64| ((per_thousand * scale).round() as u32).max(1);

        let (mountains, hills) = match world_type {
            WorldType::Highlands => (count(9.0), count(12.0)),
            WorldType::GreatPlains => (count(1.0), count(2.0)),
            _ => (count(3.0), count(4.0)),
        };
        let lakes = match world_type {
            WorldType::Lakes => count(8.0),
            _ => count(2.0),
        };

        Self {
            world_type,
            world_size,
            lakes: Some(lakes),
            min_landmass: Some(3),
            min_water_body: Some(2),
            mountain_ranges: Some(mountains),
            hill_ranges: Some(hills),
            forest_patches: Some(count(5.0)),
            jungle_patches: Some(count(3.0)),
            desert_patches: Some(count(3.0)),
            resource_chance: Some(0.08),
            polar_rows: Some((height / 10).max(1)),
            coastal_reclassification: true,
        }
    }

    /// Layout only: every feature pass switched off.
    pub fn layout_only(world_type: WorldType, world_size: WorldSize) -> Self {
        Self {
            world_type,
            world_size,
            lakes: None,
            min_landmass: None,
            min_water_body: None,
            mountain_ranges: None,
            hill_ranges: None,
            forest_patches: None,
            jungle_patches: None,
            desert_patches: None,
            resource_chance: None,
            polar_rows: None,
            coastal_reclassification: false,
        }
    }
}

impl Default for WorldGenConfig {
    fn default() -> Self {
        Self::for_world(WorldType::default(), WorldSize::default())
    }
}

/// What a spread paints onto the tiles it reaches.
#[derive(Clone, Copy, Debug)]
enum Brush {
    Terrain(Terrain),
    Improvement(Improvement),
}

impl Brush {
    /// Paint the tile, returning whether it changed.
    fn apply(self, tile: &mut Tile) -> bool {
        match self {
            Brush::Terrain(terrain) => {
                if tile.terrain == terrain {
                    return false;
                }
                tile.terrain = terrain;
                if terrain.is_water() {
                    tile.feature = None;
                    tile.improvement = None;
                    tile.resource = None;
                    tile.resource_quantity = 0;
                }
                true
            }
            Brush::Improvement(improvement) => {
                if tile.improvement.is_some() || !improvement.allowed_on(tile.terrain, tile.feature)
                {
                    return false;
                }
                tile.improvement = Some(improvement);
                true
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Spread {
    /// Chance of taking another step after each one.
    continue_chance: f64,
    /// Also paint every neighbor of each visited tile.
    blob: bool,
    brush: Brush,
}

/// Generate a board for a world-type and world-size preset with default passes.
pub fn generate_board(
    world_type: WorldType,
    world_size: WorldSize,
    rng: &mut dyn RandomSource,
) -> Board {
    WorldGenerator::new(WorldGenConfig::for_world(world_type, world_size), rng).generate()
}

/// Builds boards from a [`WorldGenConfig`].
pub struct WorldGenerator<'a> {
    rng: &'a mut dyn RandomSource,
    config: WorldGenConfig,
}

impl<'a> WorldGenerator<'a> {
    /// Create a generator drawing from the given random source.
    pub fn new(config: WorldGenConfig, rng: &'a mut dyn RandomSource) -> Self {
        Self { rng, config }
    }

    /// Generate a complete board.
    pub fn generate(&mut self) -> Board {
        let (width, height) = self.config.world_size.dimensions();
        let mut board = if self.config.world_type.starts_as_land() {
            Board::filled(width, height, Terrain::Grassland)
        } else {
            Board::new(width, height)
        };

        // Phase 1: land and water layout
        match self.config.world_type {
            WorldType::Pangea => self.layout_pangea(&mut board),
            WorldType::Archipelago => self.layout_archipelago(&mut board),
            WorldType::Continents => self.layout_continents(&mut board),
            WorldType::Fractal => self.layout_fractal(&mut board),
            WorldType::GreatPlains => self.layout_seas(&mut board, 2, 25),
            WorldType::Highlands => self.layout_seas(&mut board, 1, 30),
            WorldType::InlandSea => self.layout_inland_sea(&mut board),
            WorldType::Lakes => {}
        }
        self.mix_plains(&mut board);

        // Phase 2: water bodies
        if let Some(lakes) = self.config.lakes {
            self.seed_lakes(&mut board, lakes);
        }
        if let Some(min) = self.config.min_landmass {
            remove_small_regions(&mut board, min, true);
        }
        if let Some(min) = self.config.min_water_body {
            remove_small_regions(&mut board, min, false);
        }

        // Phase 3: climate bands
        if let Some(rows) = self.config.polar_rows {
            apply_polar_bands(&mut board, rows);
        }
        if let Some(patches) = self.config.desert_patches {
            let temperate = temperate_band(board.height);
            let eligible = move |t: &Tile| {
                matches!(t.terrain, Terrain::Grassland | Terrain::Plains) && temperate(t)
            };
            self.scatter_patches(&mut board, patches, Brush::Terrain(Terrain::Desert), &eligible);
        }

        // Phase 4: relief and cover
        if let Some(ranges) = self.config.mountain_ranges {
            self.raise_ranges(&mut board, ranges, Feature::Mountains);
        }
        if let Some(ranges) = self.config.hill_ranges {
            self.raise_ranges(&mut board, ranges, Feature::Hills);
        }
        if let Some(patches) = self.config.forest_patches {
            let eligible = |t: &Tile| {
                t.improvement.is_none() && Improvement::Forest.allowed_on(t.terrain, t.feature)
            };
            self.scatter_patches(&mut board, patches, Brush::Improvement(Improvement::Forest), &eligible);
        }
        if let Some(patches) = self.config.jungle_patches {
            let equatorial = equatorial_band(board.height);
            let eligible = move |t: &Tile| {
                t.improvement.is_none()
                    && matches!(t.terrain, Terrain::Grassland | Terrain::Plains)
                    && Improvement::Jungle.allowed_on(t.terrain, t.feature)
                    && equatorial(t)
            };
            self.scatter_patches(&mut board, patches, Brush::Improvement(Improvement::Jungle), &eligible);
        }

        // Phase 5: shoreline, resources, cleanup
        if self.config.coastal_reclassification {
            reclassify_coast(&mut board);
        }
        if let Some(chance) = self.config.resource_chance {
            self.scatter_resources(&mut board, chance);
        }
        enforce_consistency(&mut board);

        let land = board.iter().filter(|t| t.terrain.is_land()).count();
        info!(
            world_type = ?self.config.world_type,
            width,
            height,
            land,
            "world generated"
        );
        board
    }

    /// A few large seeds near the middle grown into one landmass.
    fn layout_pangea(&mut self, board: &mut Board) {
        let (w, h) = (board.width as i32, board.height as i32);
        let seeds: Vec<HexCoord> = (0..3)
            .map(|_| {
                let q = w / 2 + self.rng.range(-(w / 8), w / 8 + 1);
                let r = h / 2 + self.rng.range(-(h / 8), h / 8 + 1);
                HexCoord::new(q, r)
            })
            .collect();
        let target = board.tile_count() * 45 / 100;
        let interior = interior(board.width, board.height, 1);
        self.grow(board, &seeds, target, land_spread(0.8, true), &interior);
    }

    /// Many small, short-lived seeds scattered over the board.
    fn layout_archipelago(&mut self, board: &mut Board) {
        let islands = (board.tile_count() / 50).max(4);
        let interior = interior(board.width, board.height, 1);
        for _ in 0..islands {
            let Some(seed) = self.pick(board, &interior) else {
                return;
            };
            let size = self.rng.range(3, 12) as usize;
            self.grow(board, &[seed], size, land_spread(0.5, false), &interior);
        }
    }

    /// Two seed clusters kept apart by a channel down the middle.
    fn layout_continents(&mut self, board: &mut Board) {
        let (w, h) = (board.width as i32, board.height as i32);
        let half = w / 2;
        let target = board.tile_count() * 20 / 100;
        let interior = interior(board.width, board.height, 1);

        for west in [true, false] {
            let center_q = if west { w / 4 } else { 3 * w / 4 };
            let seeds: Vec<HexCoord> = (0..2)
                .map(|_| {
                    let q = center_q + self.rng.range(-(w / 10), w / 10 + 1);
                    let r = h / 2 + self.rng.range(-(h / 6), h / 6 + 1);
                    HexCoord::new(q, r)
                })
                .collect();
            let side = |t: &Tile| {
                interior(t)
                    && if west {
                        t.coord.q < half - 1
                    } else {
                        t.coord.q > half
                    }
            };
            self.grow(board, &seeds, target, land_spread(0.8, true), &side);
        }
    }

    /// Thresholded value noise, then one ring of land grown outward.
    fn layout_fractal(&mut self, board: &mut Board) {
        let (w, h) = (board.width, board.height);
        let octaves = ((w.min(h) as f64).log2().floor() as u32).clamp(1, 6);
        let field = value_noise(w, h, octaves, &mut *self.rng);
        let threshold = field.quantile(0.72);

        for tile in board.iter_mut() {
            if field.get(tile.coord.q as u32, tile.coord.r as u32) > threshold {
                tile.terrain = Terrain::Grassland;
            }
        }

        let shore: Vec<HexCoord> = board
            .iter()
            .filter(|t| t.terrain.is_water() && touches_land(board, &t.coord))
            .map(|t| t.coord)
            .collect();
        for coord in shore {
            if let Some(tile) = board.get_mut(&coord) {
                tile.terrain = Terrain::Grassland;
            }
        }
    }

    /// Seas spread onto an all-land board.
    fn layout_seas(&mut self, board: &mut Board, seas: u32, tiles_per_sea_tile: usize) {
        let interior = interior(board.width, board.height, 1);
        let target = board.tile_count() / tiles_per_sea_tile;
        for _ in 0..seas {
            let Some(seed) = self.pick(board, &interior) else {
                return;
            };
            let spread = Spread {
                continue_chance: 0.6,
                blob: false,
                brush: Brush::Terrain(Terrain::Ocean),
            };
            self.grow(board, &[seed], target, spread, &interior);
        }
    }

    /// One large sea in the middle, ringed by land.
    fn layout_inland_sea(&mut self, board: &mut Board) {
        let center = HexCoord::new(board.width as i32 / 2, board.height as i32 / 2);
        let target = board.tile_count() / 4;
        let margin = interior(board.width, board.height, 2);
        let spread = Spread {
            continue_chance: 0.8,
            blob: true,
            brush: Brush::Terrain(Terrain::Ocean),
        };
        self.grow(board, &[center], target, spread, &margin);
    }

    /// Break up the base grassland with plains.
    fn mix_plains(&mut self, board: &mut Board) {
        let patches = ((board.tile_count() as f64 / 250.0).round() as u32).max(1);
        let land = |t: &Tile| t.terrain.is_land();
        self.scatter_patches(board, patches, Brush::Terrain(Terrain::Plains), &land);
    }

    /// Inland coastal spreads forming lakes.
    fn seed_lakes(&mut self, board: &mut Board, lakes: u32) {
        for _ in 0..lakes {
            let inland: Vec<HexCoord> = board
                .iter()
                .filter(|t| t.terrain.is_land() && is_inland(board, &t.coord))
                .map(|t| t.coord)
                .collect();
            if inland.is_empty() {
                return;
            }
            let seed = inland[self.rng.index(inland.len())];
            if let Some(tile) = board.get_mut(&seed) {
                Brush::Terrain(Terrain::Coast).apply(tile);
            }
            let spread = Spread {
                continue_chance: 0.5,
                blob: false,
                brush: Brush::Terrain(Terrain::Coast),
            };
            let land = |t: &Tile| t.terrain.is_land();
            let painted = self.spread(board, seed, &spread, &land);
            debug!(%seed, size = painted.len() + 1, "lake seeded");
        }
    }

    /// Seed-and-spread patches of a brush over eligible tiles.
    fn scatter_patches(
        &mut self,
        board: &mut Board,
        patches: u32,
        brush: Brush,
        eligible: &dyn Fn(&Tile) -> bool,
    ) {
        let spread = Spread {
            continue_chance: 0.75,
            blob: false,
            brush,
        };
        for _ in 0..patches {
            let Some(seed) = self.pick(board, eligible) else {
                return;
            };
            if let Some(tile) = board.get_mut(&seed) {
                brush.apply(tile);
            }
            self.spread(board, seed, &spread, eligible);
        }
    }

    /// Directed random walks laying down a relief feature.
    fn raise_ranges(&mut self, board: &mut Board, ranges: u32, feature: Feature) {
        let land = |t: &Tile| t.terrain.is_land();
        for _ in 0..ranges {
            let Some(mut current) = self.pick(board, &land) else {
                return;
            };
            let mut dir = Direction::from_index(self.rng.index(6));
            let length = self.rng.range(4, 10);

            for _ in 0..length {
                if let Some(tile) = board.get_mut(&current) {
                    if tile.terrain.is_land() && tile.feature != Some(Feature::Mountains) {
                        tile.feature = Some(feature);
                    }
                }
                if feature == Feature::Mountains && self.rng.roll(0.3) {
                    let flank = current.neighbor(Direction::from_index(self.rng.index(6)));
                    if let Some(tile) = board.get_mut(&flank) {
                        if tile.terrain.is_land() && tile.feature.is_none() {
                            tile.feature = Some(Feature::Hills);
                        }
                    }
                }

                if self.rng.roll(RANGE_TURN_CHANCE) {
                    dir = if self.rng.roll(0.5) {
                        dir.rotate_cw()
                    } else {
                        dir.rotate_ccw()
                    };
                }
                match next_on_land(board, current, dir) {
                    Some((next, heading)) => {
                        current = next;
                        dir = heading;
                    }
                    None => break,
                }
            }
        }
    }

    /// Uniform low-probability resources on passable land.
    fn scatter_resources(&mut self, board: &mut Board, chance: f64) {
        for coord in board.coords() {
            let (terrain, feature) = match board.get(&coord) {
                Some(t) if t.terrain.is_land() && t.is_passable() => (t.terrain, t.feature),
                _ => continue,
            };
            if !self.rng.roll(chance) {
                continue;
            }
            let options = Resource::candidates(terrain, feature);
            if options.is_empty() {
                continue;
            }
            let resource = options[self.rng.index(options.len())];
            let quantity = if resource.is_strategic() {
                self.rng.range(2, 7) as u32
            } else {
                1
            };
            if let Some(tile) = board.get_mut(&coord) {
                tile.resource = Some(resource);
                tile.resource_quantity = quantity;
            }
        }
    }

    /// Grow painted area from seeds until `target` tiles changed.
    ///
    /// Each walk starts from a random tile painted so far, so the region
    /// grows outward organically.
    fn grow(
        &mut self,
        board: &mut Board,
        seeds: &[HexCoord],
        target: usize,
        spread: Spread,
        allowed: &dyn Fn(&Tile) -> bool,
    ) -> usize {
        let mut frontier = Vec::new();
        let mut grown = 0;
        for seed in seeds {
            if let Some(tile) = board.get_mut(seed) {
                if allowed(tile) {
                    if spread.brush.apply(tile) {
                        grown += 1;
                    }
                    frontier.push(*seed);
                }
            }
        }
        if frontier.is_empty() {
            return grown;
        }

        let max_walks = board.tile_count() * 4;
        let mut walks = 0;
        while grown < target && walks < max_walks {
            walks += 1;
            let start = frontier[self.rng.index(frontier.len())];
            let painted = self.spread(board, start, &spread, allowed);
            grown += painted.len();
            frontier.extend(painted);
        }
        grown
    }

    /// One recursive-style spread walk from `seed`.
    ///
    /// Each step moves to a random allowed neighbor and paints it (and its
    /// neighbors for blob spreads), then continues with the spread's chance.
    /// Returns the tiles that actually changed.
    fn spread(
        &mut self,
        board: &mut Board,
        seed: HexCoord,
        spread: &Spread,
        allowed: &dyn Fn(&Tile) -> bool,
    ) -> Vec<HexCoord> {
        let mut painted = Vec::new();
        let mut current = seed;

        for _ in 0..board.tile_count() {
            let Some(next) = self.step(board, current, allowed) else {
                break;
            };

            let mut targets = vec![next];
            if spread.blob {
                targets.extend(board.neighbors(&next));
            }
            for coord in targets {
                if let Some(tile) = board.get_mut(&coord) {
                    if allowed(tile) && spread.brush.apply(tile) {
                        painted.push(coord);
                    }
                }
            }

            current = next;
            if !self.rng.roll(spread.continue_chance) {
                break;
            }
        }
        painted
    }

    /// Pick a random allowed neighbor, redrawing when a draw falls off the board.
    fn step(
        &mut self,
        board: &Board,
        from: HexCoord,
        allowed: &dyn Fn(&Tile) -> bool,
    ) -> Option<HexCoord> {
        for _ in 0..MAX_STEP_ATTEMPTS {
            let dir = Direction::from_index(self.rng.index(6));
            match board.neighbor(&from, dir).and_then(|c| board.get(&c)) {
                Some(tile) if allowed(tile) => return Some(tile.coord),
                _ => {}
            }
        }
        None
    }

    /// Uniformly random tile satisfying `filter`.
    fn pick(&mut self, board: &Board, filter: &dyn Fn(&Tile) -> bool) -> Option<HexCoord> {
        let candidates: Vec<HexCoord> = board
            .iter()
            .filter(|t| filter(t))
            .map(|t| t.coord)
            .collect();
        if candidates.is_empty() {
            None
        } else {
            Some(candidates[self.rng.index(candidates.len())])
        }
    }
}

fn land_spread(continue_chance: f64, blob: bool) -> Spread {
    Spread {
        continue_chance,
        blob,
        brush: Brush::Terrain(Terrain::Grassland),
    }
}

/// Tiles at least `margin` away from the board edge.
fn interior(width: u32, height: u32, margin: i32) -> impl Fn(&Tile) -> bool {
    let (w, h) = (width as i32, height as i32);
    move |t: &Tile| {
        t.coord.q >= margin && t.coord.r >= margin && t.coord.q < w - margin && t.coord.r < h - margin
    }
}

/// Rows away from the poles.
fn temperate_band(height: u32) -> impl Fn(&Tile) -> bool {
    let h = height as i32;
    let polar = (h / 5).max(1);
    move |t: &Tile| t.coord.r >= polar && t.coord.r < h - polar
}

/// Rows near the middle of the board.
fn equatorial_band(height: u32) -> impl Fn(&Tile) -> bool {
    let h = height as i32;
    let half_width = (h / 6).max(1);
    move |t: &Tile| (t.coord.r - h / 2).abs() <= half_width
}

fn touches_land(board: &Board, coord: &HexCoord) -> bool {
    board
        .neighbors(coord)
        .iter()
        .any(|c| board.get(c).is_some_and(|t| t.terrain.is_land()))
}

fn is_inland(board: &Board, coord: &HexCoord) -> bool {
    coord
        .neighbors()
        .iter()
        .all(|c| board.get(c).is_some_and(|t| t.terrain.is_land()))
}

/// Next land tile for a range: straight ahead, else veer either way.
fn next_on_land(board: &Board, from: HexCoord, dir: Direction) -> Option<(HexCoord, Direction)> {
    [dir, dir.rotate_cw(), dir.rotate_ccw()]
        .into_iter()
        .find_map(|heading| {
            let next = board.neighbor(&from, heading)?;
            board
                .get(&next)
                .filter(|t| t.terrain.is_land())
                .map(|_| (next, heading))
        })
}

/// Replace undersized land or water regions with the terrain around them.
fn remove_small_regions(board: &mut Board, min_size: usize, land: bool) {
    let regions = if land {
        board.regions(|t| t.terrain.is_land())
    } else {
        board.regions(|t| t.terrain.is_water())
    };

    for region in regions.into_iter().filter(|r| r.len() < min_size) {
        let Some(fill) = surrounding_terrain(board, &region) else {
            continue;
        };
        for coord in &region {
            if let Some(tile) = board.get_mut(coord) {
                Brush::Terrain(fill).apply(tile);
            }
        }
        debug!(size = region.len(), ?fill, "removed undersized region");
    }
}

/// Most common terrain bordering a region; ties go to the earlier terrain.
fn surrounding_terrain(board: &Board, region: &[HexCoord]) -> Option<Terrain> {
    let members: HashSet<HexCoord> = region.iter().copied().collect();
    let mut counts: BTreeMap<Terrain, usize> = BTreeMap::new();
    for coord in region {
        for neighbor in board.neighbors(coord) {
            if members.contains(&neighbor) {
                continue;
            }
            if let Some(tile) = board.get(&neighbor) {
                *counts.entry(tile.terrain).or_insert(0) += 1;
            }
        }
    }

    let mut best: Option<(Terrain, usize)> = None;
    for (terrain, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((terrain, count));
        }
    }
    best.map(|(terrain, _)| terrain)
}

/// Snow on the outermost polar rows, tundra on the rest of the band.
fn apply_polar_bands(board: &mut Board, rows: u32) {
    let h = board.height as i32;
    let rows = rows as i32;
    let snow_rows = (rows + 1) / 2;
    for tile in board.iter_mut() {
        if tile.terrain.is_water() {
            continue;
        }
        let from_pole = tile.coord.r.min(h - 1 - tile.coord.r);
        if from_pole < snow_rows {
            tile.terrain = Terrain::Snow;
        } else if from_pole < rows {
            tile.terrain = Terrain::Tundra;
        }
    }
}

/// Ocean tiles touching land become coast.
fn reclassify_coast(board: &mut Board) {
    let coast: Vec<HexCoord> = board
        .iter()
        .filter(|t| t.terrain == Terrain::Ocean && touches_land(board, &t.coord))
        .map(|t| t.coord)
        .collect();
    for coord in coast {
        if let Some(tile) = board.get_mut(&coord) {
            tile.terrain = Terrain::Coast;
        }
    }
}

/// Clear combinations the rules forbid: relief on water, improvements
/// where they cannot stand.
fn enforce_consistency(board: &mut Board) {
    let mut cleared = 0;
    for tile in board.iter_mut() {
        if tile.terrain.is_water() && tile.feature.take().is_some() {
            cleared += 1;
        }
        if let Some(improvement) = tile.improvement {
            if !improvement.allowed_on(tile.terrain, tile.feature) {
                tile.improvement = None;
                cleared += 1;
            }
        }
        if tile.feature == Some(Feature::Mountains) && tile.resource.is_some() {
            tile.resource = None;
            tile.resource_quantity = 0;
            cleared += 1;
        }
    }
    debug!(cleared, "consistency pass");
}

/// Find well-spaced city sites, best first.
pub fn find_starting_positions(board: &Board, count: usize) -> Vec<HexCoord> {
    let mut positions = Vec::new();
    let min_distance = (board.width.min(board.height) / (count as u32 + 1)).max(2);

    let mut candidates: Vec<(HexCoord, u32)> = board
        .iter()
        .filter(|t| t.can_found_city() && t.is_passable())
        .map(|t| (t.coord, rate_start_position(board, &t.coord)))
        .collect();

    // Best score first, then row-major for determinism
    candidates.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    for (coord, _score) in candidates {
        let far_enough = positions
            .iter()
            .all(|p: &HexCoord| coord.distance(p) >= min_distance);

        if far_enough {
            positions.push(coord);
            if positions.len() >= count {
                break;
            }
        }
    }

    positions
}

/// Rate a starting position (higher = better).
fn rate_start_position(board: &Board, coord: &HexCoord) -> u32 {
    let mut score = 0u32;

    for tile in board.tiles_in_radius(coord, 2) {
        if tile.terrain.is_land() {
            score += 2;
        }

        let yields = tile.yields();
        score += yields.food as u32 * 3;
        score += yields.production as u32 * 2;
        score += yields.gold as u32;

        if tile.resource.is_some() {
            score += 5;
        }
        if tile.feature == Some(Feature::Mountains) {
            score = score.saturating_sub(3);
        }
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{GameRng, SequenceRandom};

    fn generate(config: WorldGenConfig, seed: u64) -> Board {
        let mut rng = GameRng::seeded(seed);
        WorldGenerator::new(config, &mut rng).generate()
    }

    #[test]
    fn test_generation_determinism() {
        let config = WorldGenConfig::for_world(WorldType::Continents, WorldSize::Small);
        let a = generate(config.clone(), 42);
        let b = generate(config, 42);
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds_differ() {
        let config = WorldGenConfig::for_world(WorldType::Pangea, WorldSize::Small);
        assert_ne!(generate(config.clone(), 1), generate(config, 2));
    }

    #[test]
    fn test_dimensions_follow_size() {
        let mut rng = GameRng::seeded(5);
        let board = generate_board(WorldType::Lakes, WorldSize::Tiny, &mut rng);
        assert_eq!((board.width, board.height), (15, 10));
        assert_eq!(board.tile_count(), 150);
    }

    #[test]
    fn test_every_world_type_is_consistent() {
        for (i, world_type) in WorldType::all().iter().enumerate() {
            let board = generate(WorldGenConfig::for_world(*world_type, WorldSize::Small), i as u64);
            for tile in board.iter() {
                assert!(tile.is_consistent(), "{:?} at {}", world_type, tile.coord);
                if matches!(tile.terrain, Terrain::Desert | Terrain::Snow) {
                    assert!(!matches!(
                        tile.improvement,
                        Some(Improvement::Forest | Improvement::Jungle)
                    ));
                }
                if tile.feature == Some(Feature::Mountains) || tile.terrain.is_water() {
                    assert!(tile.improvement.is_none());
                }
            }
        }
    }

    #[test]
    fn test_sea_world_types_have_land_and_water() {
        for world_type in [
            WorldType::Pangea,
            WorldType::Archipelago,
            WorldType::Continents,
            WorldType::Fractal,
        ] {
            let board = generate(WorldGenConfig::for_world(world_type, WorldSize::Standard), 7);
            let land = board.iter().filter(|t| t.terrain.is_land()).count();
            let water = board.tile_count() - land;
            assert!(land > board.tile_count() / 20, "{:?} land {}", world_type, land);
            assert!(water > board.tile_count() / 10, "{:?} water {}", world_type, water);
        }
    }

    #[test]
    fn test_land_world_types_are_mostly_land() {
        for world_type in [
            WorldType::GreatPlains,
            WorldType::Highlands,
            WorldType::InlandSea,
            WorldType::Lakes,
        ] {
            let board = generate(WorldGenConfig::for_world(world_type, WorldSize::Small), 3);
            let land = board.iter().filter(|t| t.terrain.is_land()).count();
            assert!(land * 2 > board.tile_count(), "{:?} land {}", world_type, land);
        }
    }

    #[test]
    fn test_layout_only_skips_feature_passes() {
        let board = generate(WorldGenConfig::layout_only(WorldType::Pangea, WorldSize::Small), 9);
        assert!(board.iter().all(|t| t.feature.is_none()));
        assert!(board.iter().all(|t| t.improvement.is_none()));
        assert!(board.iter().all(|t| t.resource.is_none()));
        assert!(board.iter().all(|t| t.terrain != Terrain::Coast));
    }

    #[test]
    fn test_coast_reclassification() {
        let board = generate(WorldGenConfig::for_world(WorldType::Archipelago, WorldSize::Small), 4);
        for tile in board.iter().filter(|t| t.terrain == Terrain::Ocean) {
            assert!(!touches_land(&board, &tile.coord), "ocean next to land at {}", tile.coord);
        }
        assert!(board.iter().any(|t| t.terrain == Terrain::Coast));
    }

    #[test]
    fn test_polar_bands() {
        let mut board = Board::filled(10, 12, Terrain::Grassland);
        apply_polar_bands(&mut board, 3);
        for tile in board.iter() {
            let expected = match tile.coord.r {
                0 | 1 | 10 | 11 => Terrain::Snow,
                2 | 9 => Terrain::Tundra,
                _ => Terrain::Grassland,
            };
            assert_eq!(tile.terrain, expected, "row {}", tile.coord.r);
        }
    }

    #[test]
    fn test_small_islands_are_sunk() {
        let mut board = Board::new(10, 10);
        board.get_mut(&HexCoord::new(2, 2)).unwrap().terrain = Terrain::Grassland;
        for coord in HexCoord::new(6, 6).hexes_in_radius(1) {
            board.get_mut(&coord).unwrap().terrain = Terrain::Plains;
        }
        remove_small_regions(&mut board, 3, true);
        assert_eq!(board.get(&HexCoord::new(2, 2)).unwrap().terrain, Terrain::Ocean);
        assert_eq!(board.get(&HexCoord::new(6, 6)).unwrap().terrain, Terrain::Plains);
    }

    #[test]
    fn test_small_ponds_are_filled_with_surrounding_terrain() {
        let mut board = Board::filled(8, 8, Terrain::Plains);
        board.get_mut(&HexCoord::new(4, 4)).unwrap().terrain = Terrain::Coast;
        remove_small_regions(&mut board, 2, false);
        assert_eq!(board.get(&HexCoord::new(4, 4)).unwrap().terrain, Terrain::Plains);
    }

    #[test]
    fn test_spread_redraws_off_board_steps() {
        let mut board = Board::new(5, 5);
        // North from the corner is off the board; the second draw goes south.
        let mut rng = SequenceRandom::new(vec![0.0, 0.5, 0.9]);
        let mut generator = WorldGenerator::new(
            WorldGenConfig::layout_only(WorldType::Pangea, WorldSize::Tiny),
            &mut rng,
        );
        let spread = Spread {
            continue_chance: 0.0,
            blob: false,
            brush: Brush::Terrain(Terrain::Grassland),
        };
        let painted = generator.spread(&mut board, HexCoord::new(0, 0), &spread, &|_: &Tile| true);
        assert_eq!(painted, vec![HexCoord::new(0, 1)]);
    }

    #[test]
    fn test_range_is_contiguous() {
        let mut board = Board::filled(20, 20, Terrain::Grassland);
        let mut rng = GameRng::seeded(12);
        let mut generator = WorldGenerator::new(
            WorldGenConfig::layout_only(WorldType::Lakes, WorldSize::Small),
            &mut rng,
        );
        generator.raise_ranges(&mut board, 1, Feature::Hills);

        let hills: Vec<HexCoord> = board
            .iter()
            .filter(|t| t.feature == Some(Feature::Hills))
            .map(|t| t.coord)
            .collect();
        assert!(!hills.is_empty());
        assert_eq!(board.feature_region(hills[0]).len(), hills.len());
    }

    #[test]
    fn test_starting_positions() {
        let board = generate(WorldGenConfig::for_world(WorldType::Pangea, WorldSize::Standard), 21);
        let positions = find_starting_positions(&board, 3);
        assert_eq!(positions.len(), 3);
        for (i, a) in positions.iter().enumerate() {
            assert!(board.get(a).unwrap().can_found_city());
            for b in positions.iter().skip(i + 1) {
                assert!(a.distance(b) >= 2);
            }
        }
    }
}
