//! Tile queries, tile edits and improvement construction.

use crate::board::{Board, Construction, Tile};
use crate::city_controller::CityController;
use crate::error::CommandError;
use crate::events::Notifications;
use crate::hex::HexCoord;
use crate::terrain::Improvement;
use crate::types::{CityId, PlayerId};
use tracing::debug;

/// Turns a worker needs to finish an improvement.
///
/// Fixed regardless of [`GameSpeed`](crate::settings::GameSpeed).
pub const CONSTRUCTION_TURNS: u32 = 5;

/// Owner of the board for a session.
#[derive(Clone, Debug)]
pub struct BoardController {
    board: Board,
}

impl BoardController {
    pub fn new(board: Board) -> Self {
        Self { board }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Tile at `coord`, or `None` off the board.
    pub fn tile(&self, coord: &HexCoord) -> Option<&Tile> {
        self.board.get(coord)
    }

    /// Every tile owned by `city`, in coordinate order.
    pub fn tiles_of_city(&self, city: CityId) -> Vec<&Tile> {
        let mut tiles: Vec<&Tile> = self
            .board
            .iter()
            .filter(|t| t.owner_city == Some(city))
            .collect();
        tiles.sort_by_key(|t| t.coord);
        tiles
    }

    /// Replace tiles wholesale. Off-board tiles are ignored.
    pub fn update_tiles(&mut self, tiles: Vec<Tile>, notes: &mut Notifications) {
        let mut changed = Vec::with_capacity(tiles.len());
        for tile in tiles {
            if let Some(slot) = self.board.get_mut(&tile.coord) {
                *slot = tile.clone();
                changed.push(tile);
            }
        }
        notes.tiles(changed);
    }

    /// Set the owning city of each coordinate.
    pub(crate) fn claim(&mut self, coords: &[HexCoord], city: Option<CityId>, notes: &mut Notifications) {
        let mut changed = Vec::new();
        for coord in coords {
            if let Some(tile) = self.board.get_mut(coord) {
                tile.owner_city = city;
                changed.push(tile.clone());
            }
        }
        notes.tiles(changed);
    }

    /// Start building `improvement` on a tile the player's city owns.
    pub fn build_improvement(
        &mut self,
        coord: HexCoord,
        player: PlayerId,
        improvement: Improvement,
        cities: &CityController,
        notes: &mut Notifications,
    ) -> Result<(), CommandError> {
        let tile = self.owned_tile_mut(coord, player, cities)?;
        if !tile.can_build(improvement) {
            return Err(CommandError::invalid(format!(
                "{improvement:?} cannot be built on {coord}"
            )));
        }

        tile.construction = Some(Construction {
            improvement,
            progress: 0,
        });
        debug!(%coord, ?improvement, player, "construction started");
        let snapshot = tile.clone();
        notes.tiles(vec![snapshot]);
        Ok(())
    }

    /// Restore a pillaged improvement on the player's own tile.
    pub fn repair(
        &mut self,
        coord: HexCoord,
        player: PlayerId,
        cities: &CityController,
        notes: &mut Notifications,
    ) -> Result<(), CommandError> {
        let tile = self.owned_tile_mut(coord, player, cities)?;
        if !tile.pillaged {
            return Err(CommandError::invalid(format!("{coord} is not pillaged")));
        }
        tile.pillaged = false;
        let snapshot = tile.clone();
        notes.tiles(vec![snapshot]);
        Ok(())
    }

    /// Pillage the improvement on a tile owned by another player's city.
    pub fn pillage(
        &mut self,
        coord: HexCoord,
        player: PlayerId,
        cities: &CityController,
        notes: &mut Notifications,
    ) -> Result<(), CommandError> {
        let tile = self
            .board
            .get_mut(&coord)
            .ok_or_else(|| CommandError::invalid(format!("{coord} is off the board")))?;
        let enemy_owned = tile
            .owner_city
            .and_then(|id| cities.city(id))
            .is_some_and(|c| c.owner != player);
        let built = tile.improvement.is_some_and(|i| !i.is_natural());
        if !enemy_owned || !built || tile.pillaged {
            return Err(CommandError::invalid(format!("nothing to pillage at {coord}")));
        }
        tile.pillaged = true;
        let snapshot = tile.clone();
        notes.tiles(vec![snapshot]);
        Ok(())
    }

    /// Clear fallout from a tile.
    pub fn clean_fallout(&mut self, coord: HexCoord, notes: &mut Notifications) -> Result<(), CommandError> {
        let tile = self
            .board
            .get_mut(&coord)
            .filter(|t| t.fallout)
            .ok_or_else(|| CommandError::invalid(format!("no fallout at {coord}")))?;
        tile.fallout = false;
        let snapshot = tile.clone();
        notes.tiles(vec![snapshot]);
        Ok(())
    }

    /// Advance every construction by one turn.
    pub fn process_turn(&mut self, notes: &mut Notifications) {
        let mut finished = Vec::new();
        for tile in self.board.iter_mut() {
            let Some(construction) = tile.construction.as_mut() else {
                continue;
            };
            construction.progress += 1;
            if construction.progress >= CONSTRUCTION_TURNS {
                let improvement = construction.improvement;
                tile.improvement = Some(improvement);
                tile.construction = None;
                tile.pillaged = false;
                debug!(coord = %tile.coord, ?improvement, "construction finished");
                finished.push(tile.clone());
            }
        }
        notes.tiles(finished);
    }

    fn owned_tile_mut(
        &mut self,
        coord: HexCoord,
        player: PlayerId,
        cities: &CityController,
    ) -> Result<&mut Tile, CommandError> {
        let tile = self
            .board
            .get_mut(&coord)
            .ok_or_else(|| CommandError::invalid(format!("{coord} is off the board")))?;
        let owned = tile
            .owner_city
            .and_then(|id| cities.city(id))
            .is_some_and(|c| c.owner == player);
        if !owned {
            return Err(CommandError::NotOwner {
                player,
                what: format!("tile {coord}"),
            });
        }
        Ok(tile)
    }
}
