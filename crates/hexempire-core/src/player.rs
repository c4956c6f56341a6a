//! Player state: treasury, research and turn status.

use crate::terrain::Resource;
use crate::types::{Era, PlayerId, SessionId, TechId};
use crate::yields::Yields;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A player in the game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Player index.
    pub id: PlayerId,
    /// Session the player is connected through.
    pub session: SessionId,
    /// Display name.
    pub name: String,
    /// Latest era among unlocked technologies.
    pub era: Era,
    /// Unlocked technologies.
    pub techs: BTreeSet<TechId>,
    /// Technology being researched.
    pub selected_tech: Option<TechId>,
    /// Research carried toward the next technology.
    pub research_overflow: u32,
    /// Stockpiled gold.
    pub gold: i32,
    /// Stockpiled culture.
    pub culture: i32,
    /// Sum of all city incomes last turn.
    pub income: Yields,
    /// Strategic resources across all cities.
    pub strategic: BTreeMap<Resource, u32>,
    /// Whether the player has ended their turn.
    pub turn_finished: bool,
}

/// Outcome of a turn of research.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TechProgress {
    /// Nothing selected; science was banked.
    Idle,
    /// Progress made toward the selected technology.
    Researching { tech: TechId, progress: u32 },
    /// The selected technology was unlocked.
    Completed(TechId),
}

impl Player {
    pub fn new(id: PlayerId, session: SessionId, name: String) -> Self {
        Self {
            id,
            session,
            name,
            era: Era::Ancient,
            techs: BTreeSet::new(),
            selected_tech: None,
            research_overflow: 0,
            gold: 0,
            culture: 0,
            income: Yields::zero(),
            strategic: BTreeMap::new(),
            turn_finished: false,
        }
    }

    pub fn has_tech(&self, tech: &str) -> bool {
        self.techs.contains(tech)
    }

    /// Apply one turn of science toward the selected technology.
    ///
    /// `cost_of` prices a technology at the session's game speed. Progress
    /// is tracked in `research_overflow`; on completion the surplus carries
    /// over and the selection is cleared.
    pub fn apply_research(
        &mut self,
        science: u32,
        cost_of: impl Fn(&str) -> Option<u32>,
    ) -> TechProgress {
        self.research_overflow = self.research_overflow.saturating_add(science);

        let Some(tech) = self.selected_tech.clone() else {
            return TechProgress::Idle;
        };
        let Some(cost) = cost_of(&tech) else {
            return TechProgress::Researching {
                tech,
                progress: self.research_overflow,
            };
        };

        if self.research_overflow < cost {
            return TechProgress::Researching {
                tech,
                progress: self.research_overflow,
            };
        }

        self.research_overflow -= cost;
        self.techs.insert(tech.clone());
        self.selected_tech = None;
        TechProgress::Completed(tech)
    }

    /// Add a turn of income to the stockpiles.
    pub fn collect_income(&mut self, income: Yields, strategic: BTreeMap<Resource, u32>) {
        self.income = income;
        self.strategic = strategic;
        self.gold += income.gold;
        self.culture += income.culture;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_player() -> Player {
        Player::new(0, SessionId::new("session-0"), "Alice".to_string())
    }

    fn cost(tech: &str) -> Option<u32> {
        match tech {
            "agriculture" => Some(20),
            "pottery" => Some(35),
            _ => None,
        }
    }

    #[test]
    fn test_player_creation() {
        let player = create_test_player();
        assert_eq!(player.era, Era::Ancient);
        assert!(player.techs.is_empty());
        assert!(!player.turn_finished);
    }

    #[test]
    fn test_research_completes_and_carries_overflow() {
        let mut player = create_test_player();
        player.selected_tech = Some("agriculture".to_string());

        assert_eq!(
            player.apply_research(12, cost),
            TechProgress::Researching {
                tech: "agriculture".to_string(),
                progress: 12
            }
        );
        assert_eq!(
            player.apply_research(12, cost),
            TechProgress::Completed("agriculture".to_string())
        );
        assert!(player.has_tech("agriculture"));
        assert_eq!(player.research_overflow, 4);
        assert_eq!(player.selected_tech, None);
    }

    #[test]
    fn test_idle_research_banks_science() {
        let mut player = create_test_player();
        assert_eq!(player.apply_research(7, cost), TechProgress::Idle);
        assert_eq!(player.apply_research(7, cost), TechProgress::Idle);
        assert_eq!(player.research_overflow, 14);

        player.selected_tech = Some("agriculture".to_string());
        assert_eq!(
            player.apply_research(7, cost),
            TechProgress::Completed("agriculture".to_string())
        );
        assert_eq!(player.research_overflow, 1);
    }

    #[test]
    fn test_collect_income() {
        let mut player = create_test_player();
        let mut strategic = BTreeMap::new();
        strategic.insert(Resource::Iron, 2);
        player.collect_income(Yields::new(3, 2, 4, 1, 2), strategic);
        player.collect_income(Yields::new(3, 2, 4, 1, 2), BTreeMap::new());
        assert_eq!(player.gold, 8);
        assert_eq!(player.culture, 4);
        assert!(player.strategic.is_empty());
    }
}
