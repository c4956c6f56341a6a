//! Combat formulas shared by unit-versus-unit and unit-versus-city fights.
//!
//! Combat is deterministic: damage depends only on the two strengths and
//! the attacker's health. Applying the result (death, capture, occupation)
//! is the [`UnitController`](crate::unit_controller::UnitController)'s job.

use crate::board::Tile;
use serde::{Deserialize, Serialize};

/// Damage dealt by an unwounded attacker at equal strength is `BASE_DAMAGE`.
pub const BASE_DAMAGE: f64 = 3.0;

/// Damage produced by one exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatDamage {
    /// Damage dealt to the defender.
    pub defender: u32,
    /// Damage dealt back to the attacker.
    pub attacker: u32,
}

/// How an attack ended, from the attacker's point of view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatOutcome {
    /// Both sides survived.
    Exchanged(CombatDamage),
    /// The defending unit was destroyed.
    DefenderDestroyed(CombatDamage),
    /// The attacking unit was destroyed.
    AttackerDestroyed(CombatDamage),
    /// A city was damaged but held.
    CityDamaged(CombatDamage),
    /// A city fell to the attacker.
    CityCaptured(CombatDamage),
}

impl CombatOutcome {
    pub fn damage(&self) -> CombatDamage {
        match self {
            CombatOutcome::Exchanged(d)
            | CombatOutcome::DefenderDestroyed(d)
            | CombatOutcome::AttackerDestroyed(d)
            | CombatOutcome::CityDamaged(d)
            | CombatOutcome::CityCaptured(d) => *d,
        }
    }
}

/// Percentage strength bonus for a combatant standing on `tile`.
///
/// Hills, forest and jungle each add 25%, stacking additively.
pub fn terrain_modifier(tile: &Tile) -> i32 {
    tile.combat_bonus()
}

/// Base strength adjusted by the terrain modifier of the combatant's tile.
pub fn effective_strength(base: u32, tile: Option<&Tile>) -> f64 {
    let modifier = tile.map_or(0, terrain_modifier);
    (base as f64 * (1.0 + modifier as f64 / 100.0)).max(1.0)
}

/// Damage exchanged between an attacker and a defender.
///
/// `attacker_health` is the attacker's current HP over max HP; a wounded
/// attacker hits softer, down to half damage at zero health.
pub fn combat_damage(attacker_strength: f64, defender_strength: f64, attacker_health: f64) -> CombatDamage {
    let ratio = attacker_strength.max(1.0) / defender_strength.max(1.0);
    let half = BASE_DAMAGE / 2.0;
    let final_damage = half + half * attacker_health.clamp(0.0, 1.0);
    CombatDamage {
        defender: (final_damage * ratio).round() as u32,
        attacker: (final_damage / ratio).round() as u32,
    }
}
