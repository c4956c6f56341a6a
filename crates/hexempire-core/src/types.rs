//! Core identifiers and small shared enums used throughout the crate.

use serde::{Deserialize, Serialize};

/// Player index.
pub type PlayerId = u8;

/// Unique identifier for a unit.
pub type UnitId = u64;

/// Unique identifier for a city.
pub type CityId = u64;

/// Technology identifier from the catalog.
pub type TechId = String;

/// Building identifier from the catalog.
pub type BuildingId = String;

/// Unit template identifier from the catalog.
pub type UnitTemplateId = String;

/// Opaque handle tying a connected session to exactly one player.
///
/// The core never inspects it beyond equality.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

/// Game era progression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Era {
    #[default]
    Ancient,
    Classical,
    Medieval,
    Renaissance,
    Industrial,
    Modern,
}

impl Era {
    /// Get the next era in progression.
    pub const fn next(&self) -> Option<Era> {
        match self {
            Era::Ancient => Some(Era::Classical),
            Era::Classical => Some(Era::Medieval),
            Era::Medieval => Some(Era::Renaissance),
            Era::Renaissance => Some(Era::Industrial),
            Era::Industrial => Some(Era::Modern),
            Era::Modern => None,
        }
    }
}

impl std::fmt::Display for Era {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Era::Ancient => write!(f, "Ancient Era"),
            Era::Classical => write!(f, "Classical Era"),
            Era::Medieval => write!(f, "Medieval Era"),
            Era::Renaissance => write!(f, "Renaissance Era"),
            Era::Industrial => write!(f, "Industrial Era"),
            Era::Modern => write!(f, "Modern Era"),
        }
    }
}

/// World size presets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorldSize {
    Tiny,
    Small,
    #[default]
    Standard,
    Large,
}

impl WorldSize {
    /// Get the dimensions (width, height) for this world size.
    pub const fn dimensions(&self) -> (u32, u32) {
        match self {
            WorldSize::Tiny => (15, 10),
            WorldSize::Small => (30, 20),
            WorldSize::Standard => (50, 32),
            WorldSize::Large => (80, 50),
        }
    }

    /// Get all world size variants.
    pub const fn all() -> &'static [WorldSize] {
        &[
            WorldSize::Tiny,
            WorldSize::Small,
            WorldSize::Standard,
            WorldSize::Large,
        ]
    }
}

impl std::fmt::Display for WorldSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (w, h) = self.dimensions();
        match self {
            WorldSize::Tiny => write!(f, "Tiny ({}x{})", w, h),
            WorldSize::Small => write!(f, "Small ({}x{})", w, h),
            WorldSize::Standard => write!(f, "Standard ({}x{})", w, h),
            WorldSize::Large => write!(f, "Large ({}x{})", w, h),
        }
    }
}

/// Land/sea layout recipes for world generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorldType {
    #[default]
    Pangea,
    Archipelago,
    Continents,
    Fractal,
    GreatPlains,
    Highlands,
    InlandSea,
    Lakes,
}

impl WorldType {
    /// Get all world type variants.
    pub const fn all() -> &'static [WorldType] {
        &[
            WorldType::Pangea,
            WorldType::Archipelago,
            WorldType::Continents,
            WorldType::Fractal,
            WorldType::GreatPlains,
            WorldType::Highlands,
            WorldType::InlandSea,
            WorldType::Lakes,
        ]
    }

    /// Whether generation starts from an all-land board.
    pub const fn starts_as_land(&self) -> bool {
        matches!(
            self,
            WorldType::GreatPlains | WorldType::Highlands | WorldType::InlandSea | WorldType::Lakes
        )
    }
}

/// Cached forecast of how many turns until a city reaches a threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TurnEstimate {
    /// Reached in this many turns.
    Turns(u32),
    /// Still short after the forecast horizon.
    FarFuture,
    /// The relevant income is not positive.
    #[default]
    Never,
}
