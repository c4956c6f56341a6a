//! Units: movement, actions, health and the commands they may issue.

use crate::board::Tile;
use crate::catalog::{CommandUnlock, UnitArchetype, UnitTemplate};
use crate::commands::UnitCommandKind;
use crate::hex::HexCoord;
use crate::types::{PlayerId, TechId, UnitId, UnitTemplateId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

/// A unit on the board.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Unique identifier.
    pub id: UnitId,
    /// Owning player.
    pub owner: PlayerId,
    /// Catalog template this unit was built from.
    pub template: UnitTemplateId,
    pub archetype: UnitArchetype,
    /// Current position on the board.
    pub position: HexCoord,
    /// Position before the last move.
    pub previous_position: HexCoord,
    /// Remaining movement points this turn.
    pub movement: u32,
    /// Remaining actions this turn.
    pub actions: u32,
    pub hp: u32,
    pub max_hp: u32,
    /// Sleeping units are left alone until woken.
    pub sleeping: bool,
    /// Skipping units are passed over for the rest of the turn.
    pub skipping: bool,
    /// Steps still to walk, nearest first.
    pub queue: VecDeque<HexCoord>,
    /// Commands available on the unit's current tile.
    pub commands: BTreeSet<UnitCommandKind>,
}

impl Unit {
    /// Create a fresh unit with full movement, actions and health.
    pub fn from_template(
        id: UnitId,
        owner: PlayerId,
        template: &UnitTemplate,
        position: HexCoord,
    ) -> Self {
        Self {
            id,
            owner,
            template: template.id.clone(),
            archetype: template.archetype,
            position,
            previous_position: position,
            movement: template.movement,
            actions: template.actions,
            hp: template.max_hp,
            max_hp: template.max_hp,
            sleeping: false,
            skipping: false,
            queue: VecDeque::new(),
            commands: BTreeSet::new(),
        }
    }

    /// Restore movement and actions for a new turn.
    pub fn reset_turn(&mut self, template: &UnitTemplate) {
        self.movement = template.movement;
        self.actions = template.actions;
        self.skipping = false;
    }

    /// Whether the unit may still act this turn.
    pub fn has_actions(&self) -> bool {
        self.actions > 0
    }

    /// Whether the unit has been destroyed.
    pub fn is_dead(&self) -> bool {
        self.hp == 0
    }

    /// Whether the unit is waiting on orders this turn.
    pub fn needs_orders(&self) -> bool {
        !self.sleeping && !self.skipping && self.queue.is_empty() && self.movement > 0
    }

    /// Step onto an adjacent tile, paying `cost` movement.
    pub fn step_to(&mut self, to: HexCoord, cost: u32) {
        self.previous_position = self.position;
        self.position = to;
        self.movement = self.movement.saturating_sub(cost);
    }

    /// Spend an action and end the unit's movement for the turn.
    pub fn spend_attack(&mut self) {
        self.actions = self.actions.saturating_sub(1);
        self.movement = 0;
    }

    pub fn take_damage(&mut self, damage: u32) {
        self.hp = self.hp.saturating_sub(damage);
    }

    /// Health as a fraction of maximum.
    pub fn health_fraction(&self) -> f64 {
        if self.max_hp == 0 {
            0.0
        } else {
            self.hp as f64 / self.max_hp as f64
        }
    }

    /// Clear any pending path.
    pub fn clear_queue(&mut self) {
        self.queue.clear();
    }

    /// Recompute the command set for the tile the unit stands on.
    pub fn rebuild_commands(&mut self, template: &UnitTemplate, tile: &Tile, techs: &BTreeSet<TechId>) {
        self.commands = self.available_commands(template, tile, techs);
    }

    /// Commands the unit could issue on `tile`, without storing them.
    pub fn available_commands(
        &self,
        template: &UnitTemplate,
        tile: &Tile,
        techs: &BTreeSet<TechId>,
    ) -> BTreeSet<UnitCommandKind> {
        template
            .commands
            .iter()
            .filter(|unlock| unlock_met(unlock, self.archetype, tile, techs))
            .map(|unlock| unlock.command)
            .collect()
    }

    pub fn can(&self, command: UnitCommandKind) -> bool {
        self.commands.contains(&command)
    }
}

fn unlock_met(
    unlock: &CommandUnlock,
    archetype: UnitArchetype,
    tile: &Tile,
    techs: &BTreeSet<TechId>,
) -> bool {
    if !unlock.archetypes.is_empty() && !unlock.archetypes.contains(&archetype) {
        return false;
    }
    if let Some(tech) = &unlock.required_tech {
        if !techs.contains(tech) {
            return false;
        }
    }
    if unlock.requires_pillage && !tile.pillaged {
        return false;
    }
    if unlock.requires_fallout && !tile.fallout {
        return false;
    }
    true
}
