//! Change notifications raised by the controllers.
//!
//! Every state change a client would need to replicate is announced as a
//! [`ChangeEvent`] carrying a snapshot of the affected entity. Events
//! accumulate in [`Notifications`] until the host drains them.

use crate::board::Tile;
use crate::city::City;
use crate::hex::HexCoord;
use crate::player::Player;
use crate::types::PlayerId;
use crate::unit::Unit;
use serde::{Deserialize, Serialize};

/// A replicable state change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChangeEvent {
    TilesUpdated {
        tiles: Vec<Tile>,
    },
    CitySettled {
        city: City,
    },
    CityCaptured {
        city: City,
        previous_owner: PlayerId,
    },
    CityUpdated {
        city: City,
    },
    CityBorderExpanded {
        city: City,
        claimed: Vec<HexCoord>,
    },
    UnitAdded {
        unit: Unit,
    },
    UnitRemoved {
        unit: Unit,
    },
    UnitUpdated {
        unit: Unit,
    },
    PlayerAdded {
        player: Player,
    },
    PlayerRemoved {
        player: Player,
    },
    PlayerUpdated {
        player: Player,
    },
    PlayerTurnStateChanged {
        player: PlayerId,
        finished: bool,
    },
}

impl ChangeEvent {
    /// Short name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::TilesUpdated { .. } => "TilesUpdated",
            ChangeEvent::CitySettled { .. } => "CitySettled",
            ChangeEvent::CityCaptured { .. } => "CityCaptured",
            ChangeEvent::CityUpdated { .. } => "CityUpdated",
            ChangeEvent::CityBorderExpanded { .. } => "CityBorderExpanded",
            ChangeEvent::UnitAdded { .. } => "UnitAdded",
            ChangeEvent::UnitRemoved { .. } => "UnitRemoved",
            ChangeEvent::UnitUpdated { .. } => "UnitUpdated",
            ChangeEvent::PlayerAdded { .. } => "PlayerAdded",
            ChangeEvent::PlayerRemoved { .. } => "PlayerRemoved",
            ChangeEvent::PlayerUpdated { .. } => "PlayerUpdated",
            ChangeEvent::PlayerTurnStateChanged { .. } => "PlayerTurnStateChanged",
        }
    }
}

/// Pending change notifications, in the order they were raised.
#[derive(Clone, Debug, Default)]
pub struct Notifications {
    events: Vec<ChangeEvent>,
}

impl Notifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: ChangeEvent) {
        self.events.push(event);
    }

    /// Announce changed tiles; nothing is raised for an empty batch.
    pub fn tiles(&mut self, tiles: Vec<Tile>) {
        if !tiles.is_empty() {
            self.push(ChangeEvent::TilesUpdated { tiles });
        }
    }

    /// Take every pending event.
    pub fn drain(&mut self) -> Vec<ChangeEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Pending events, oldest first.
    pub fn events(&self) -> &[ChangeEvent] {
        &self.events
    }
}
