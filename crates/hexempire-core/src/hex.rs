//! Hex coordinate system for the board.
//!
//! Tiles are addressed by offset coordinates `(q, r)` where `q` is the column
//! and `r` the row. Even columns sit half a hex lower than odd ones, which
//! makes the axial form `(q, r + floor(q / 2))`. Both the neighbor offsets and
//! the distance metric are derived from that axial form, so a neighbor is
//! always exactly one step away.

use serde::{Deserialize, Serialize};

/// Offset hex coordinate.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct HexCoord {
    /// Column coordinate
    pub q: i32,
    /// Row coordinate
    pub r: i32,
}

impl PartialOrd for HexCoord {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HexCoord {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Row-major ordering for deterministic iteration
        (self.r, self.q).cmp(&(other.r, other.q))
    }
}

/// One of the six hex directions, in clockwise order starting from north.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    NorthEast,
    SouthEast,
    South,
    SouthWest,
    NorthWest,
}

impl Direction {
    /// All directions in clockwise order.
    pub const ALL: [Direction; 6] = [
        Direction::North,
        Direction::NorthEast,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::NorthWest,
    ];

    /// Index of this direction in [`Direction::ALL`].
    pub const fn index(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::NorthEast => 1,
            Direction::SouthEast => 2,
            Direction::South => 3,
            Direction::SouthWest => 4,
            Direction::NorthWest => 5,
        }
    }

    /// Direction for an index, wrapping modulo 6.
    pub const fn from_index(index: usize) -> Direction {
        Self::ALL[index % 6]
    }

    /// Rotate 60 degrees clockwise.
    pub const fn rotate_cw(self) -> Direction {
        Self::from_index(self.index() + 1)
    }

    /// Rotate 60 degrees counter-clockwise.
    pub const fn rotate_ccw(self) -> Direction {
        Self::from_index(self.index() + 5)
    }

    /// The opposite direction.
    pub const fn opposite(self) -> Direction {
        Self::from_index(self.index() + 3)
    }
}

impl HexCoord {
    /// Create a new hex coordinate.
    #[inline]
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// The adjacent coordinate in `dir`.
    ///
    /// This is the only place the column-parity offset is resolved; every
    /// other neighbor query goes through it.
    pub fn neighbor(&self, dir: Direction) -> HexCoord {
        let even = self.q.rem_euclid(2) == 0;
        let (dq, dr) = match (dir, even) {
            (Direction::North, _) => (0, -1),
            (Direction::South, _) => (0, 1),
            (Direction::NorthEast, true) => (1, 0),
            (Direction::NorthEast, false) => (1, -1),
            (Direction::SouthEast, true) => (1, 1),
            (Direction::SouthEast, false) => (1, 0),
            (Direction::SouthWest, true) => (-1, 1),
            (Direction::SouthWest, false) => (-1, 0),
            (Direction::NorthWest, true) => (-1, 0),
            (Direction::NorthWest, false) => (-1, -1),
        };
        HexCoord::new(self.q + dq, self.r + dr)
    }

    /// Get all 6 neighboring hexes in [`Direction::ALL`] order.
    pub fn neighbors(&self) -> [HexCoord; 6] {
        Direction::ALL.map(|dir| self.neighbor(dir))
    }

    /// Distance to another hex in hex steps.
    ///
    /// With `du = q2 - q1` and `dv = (r2 + floor(q2/2)) - (r1 + floor(q1/2))`
    /// the distance is `max(|du|, |dv|)` when both deltas share a sign and
    /// `|du| + |dv|` otherwise.
    ///
    /// Computed in `i64`, so any pair of coordinates is safe; distances
    /// beyond `u32::MAX` saturate.
    pub fn distance(&self, other: &HexCoord) -> u32 {
        let (u1, v1) = self.axial_wide();
        let (u2, v2) = other.axial_wide();
        let du = u2 - u1;
        let dv = v2 - v1;

        let steps = if du.signum() * dv.signum() >= 0 {
            du.abs().max(dv.abs())
        } else {
            du.abs() + dv.abs()
        };
        u32::try_from(steps).unwrap_or(u32::MAX)
    }

    fn axial_wide(&self) -> (i64, i64) {
        let q = i64::from(self.q);
        (q, i64::from(self.r) + q.div_euclid(2))
    }

    /// Convert to axial `(u, v)` coordinates, saturating at the `i32` range.
    pub fn to_axial(&self) -> (i32, i32) {
        (self.q, self.r.saturating_add(self.q.div_euclid(2)))
    }

    /// Create a HexCoord from axial coordinates.
    pub fn from_axial(u: i32, v: i32) -> Self {
        Self {
            q: u,
            r: v.saturating_sub(u.div_euclid(2)),
        }
    }

    /// Check if this coordinate is within bounds of a rectangular board.
    pub fn in_bounds(&self, width: u32, height: u32) -> bool {
        self.q >= 0 && self.r >= 0 && (self.q as u32) < width && (self.r as u32) < height
    }

    /// Get all hexes within a given radius (inclusive).
    pub fn hexes_in_radius(&self, radius: u32) -> Vec<HexCoord> {
        let mut result = Vec::new();
        let (u, v) = self.to_axial();
        let r = radius as i32;

        for du in -r..=r {
            for dv in -r..=r {
                let candidate = HexCoord::from_axial(u + du, v + dv);
                if self.distance(&candidate) <= radius {
                    result.push(candidate);
                }
            }
        }

        result
    }

    /// Get a ring of hexes at exactly the given distance.
    pub fn hex_ring(&self, radius: u32) -> Vec<HexCoord> {
        if radius == 0 {
            return vec![*self];
        }

        self.hexes_in_radius(radius)
            .into_iter()
            .filter(|h| self.distance(h) == radius)
            .collect()
    }
}

impl std::fmt::Display for HexCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}
