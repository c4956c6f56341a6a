//! Uniform-cost pathfinding over the hex board.
//!
//! Entering a tile costs that tile's movement cost; impassable tiles never
//! enter the frontier. No distance heuristic is used, so the search is a
//! plain Dijkstra expansion.

use crate::board::{Board, IMPASSABLE};
use crate::hex::HexCoord;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// Result of a pathfinding operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathResult {
    /// Steps from start to goal, excluding the start and including the goal.
    pub steps: Vec<HexCoord>,
    /// Total movement cost of the path.
    pub total_cost: u32,
}

/// Node in the search frontier.
#[derive(Clone, Eq, PartialEq)]
struct PathNode {
    coord: HexCoord,
    cost: u32,
}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap; equal costs pop in coordinate order
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.coord.cmp(&self.coord))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find the cheapest path between two hexes.
///
/// Returns `None` when the goal cannot be reached. A path from a tile to
/// itself is empty.
pub fn find_path(board: &Board, start: HexCoord, goal: HexCoord) -> Option<PathResult> {
    if start == goal {
        return Some(PathResult {
            steps: Vec::new(),
            total_cost: 0,
        });
    }
    if !board.in_bounds(&start) || entry_cost(board, &goal) == IMPASSABLE {
        return None;
    }

    let mut frontier = BinaryHeap::new();
    let mut came_from: HashMap<HexCoord, HexCoord> = HashMap::new();
    let mut costs: HashMap<HexCoord, u32> = HashMap::new();

    costs.insert(start, 0);
    frontier.push(PathNode {
        coord: start,
        cost: 0,
    });

    while let Some(current) = frontier.pop() {
        if current.coord == goal {
            return Some(PathResult {
                steps: reconstruct_path(&came_from, goal, start),
                total_cost: current.cost,
            });
        }

        // Stale entry superseded by a cheaper one
        if current.cost > *costs.get(&current.coord).unwrap_or(&u32::MAX) {
            continue;
        }

        for neighbor in board.neighbors(&current.coord) {
            let step = entry_cost(board, &neighbor);
            if step == IMPASSABLE {
                continue;
            }

            let tentative = current.cost.saturating_add(step);
            if tentative >= *costs.get(&neighbor).unwrap_or(&u32::MAX) {
                continue;
            }

            came_from.insert(neighbor, current.coord);
            costs.insert(neighbor, tentative);
            frontier.push(PathNode {
                coord: neighbor,
                cost: tentative,
            });
        }
    }

    None
}

/// Cost of entering a tile, or [`IMPASSABLE`] off the board.
fn entry_cost(board: &Board, coord: &HexCoord) -> u32 {
    board.get(coord).map_or(IMPASSABLE, |t| t.movement_cost())
}

/// Walk `came_from` back from the goal; the start itself is left out.
fn reconstruct_path(
    came_from: &HashMap<HexCoord, HexCoord>,
    goal: HexCoord,
    start: HexCoord,
) -> Vec<HexCoord> {
    let mut steps = vec![goal];
    let mut current = goal;

    while let Some(&prev) = came_from.get(&current) {
        if prev == start {
            break;
        }
        steps.push(prev);
        current = prev;
    }

    steps.reverse();
    steps
}

/// Total movement cost of walking `steps` from an adjacent starting tile.
///
/// Returns `None` if any step is impassable or not adjacent to the one before.
pub fn path_cost(board: &Board, from: HexCoord, steps: &[HexCoord]) -> Option<u32> {
    let mut total = 0u32;
    let mut previous = from;
    for coord in steps {
        if previous.distance(coord) != 1 {
            return None;
        }
        let cost = entry_cost(board, coord);
        if cost == IMPASSABLE {
            return None;
        }
        total = total.saturating_add(cost);
        previous = *coord;
    }
    Some(total)
}
