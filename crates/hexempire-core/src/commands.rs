//! Tagged commands addressed to cities, units and players.
//!
//! A command arrives as a kind, a target id and an opaque JSON argument
//! list. Parsing turns it into a typed action or a [`CommandError`]; the
//! controllers only ever see typed actions, so malformed input is dropped
//! before any state is touched.

use crate::city::ProductionItem;
use crate::error::CommandError;
use crate::hex::HexCoord;
use crate::terrain::Improvement;
use crate::types::{CityId, PlayerId, TechId, UnitId};
use crate::yields::YieldKind;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// City command kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CityCommandKind {
    Rename,
    /// Insert at the front of the queue.
    ChangeProduction,
    /// Append to the queue.
    QueueProduction,
    CancelProduction,
    MoveProductionUp,
    MoveProductionDown,
    /// Accepted but does nothing yet.
    BuyProduction,
    ChangeCitizenFocus,
}

/// A command addressed to a city.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CityCommand {
    pub kind: CityCommandKind,
    pub city: CityId,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// A validated city command.
#[derive(Clone, Debug, PartialEq)]
pub enum CityAction {
    Rename(String),
    ChangeProduction(ProductionItem),
    QueueProduction(ProductionItem),
    CancelProduction(usize),
    MoveProductionUp(usize),
    MoveProductionDown(usize),
    BuyProduction,
    ChangeCitizenFocus(YieldKind),
}

impl CityCommand {
    pub fn new(kind: CityCommandKind, city: CityId, args: Vec<Value>) -> Self {
        Self { kind, city, args }
    }

    /// Validate the arguments for this command kind.
    pub fn parse(&self) -> Result<CityAction, CommandError> {
        use CityCommandKind as K;
        let args = Args::new(self.kind_name(), &self.args);
        Ok(match self.kind {
            K::Rename => {
                let name = args.string(0)?;
                if name.trim().is_empty() {
                    return Err(CommandError::malformed(args.command, 0, "name is empty"));
                }
                CityAction::Rename(name)
            }
            K::ChangeProduction => CityAction::ChangeProduction(args.parse(0)?),
            K::QueueProduction => CityAction::QueueProduction(args.parse(0)?),
            K::CancelProduction => CityAction::CancelProduction(args.index(0)?),
            K::MoveProductionUp => CityAction::MoveProductionUp(args.index(0)?),
            K::MoveProductionDown => CityAction::MoveProductionDown(args.index(0)?),
            K::BuyProduction => CityAction::BuyProduction,
            K::ChangeCitizenFocus => CityAction::ChangeCitizenFocus(args.parse(0)?),
        })
    }

    fn kind_name(&self) -> &'static str {
        match self.kind {
            CityCommandKind::Rename => "Rename",
            CityCommandKind::ChangeProduction => "ChangeProduction",
            CityCommandKind::QueueProduction => "QueueProduction",
            CityCommandKind::CancelProduction => "CancelProduction",
            CityCommandKind::MoveProductionUp => "MoveProductionUp",
            CityCommandKind::MoveProductionDown => "MoveProductionDown",
            CityCommandKind::BuyProduction => "BuyProduction",
            CityCommandKind::ChangeCitizenFocus => "ChangeCitizenFocus",
        }
    }
}

/// Unit command kinds. Also the vocabulary of a unit's available command set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitCommandKind {
    Move,
    Sleep,
    Wake,
    Skip,
    Settle,
    MeleeAttack,
    RangedAttack,
    BuildImprovement,
    Repair,
    Pillage,
    CleanFallout,
    Disband,
}

impl UnitCommandKind {
    pub const fn name(&self) -> &'static str {
        match self {
            UnitCommandKind::Move => "Move",
            UnitCommandKind::Sleep => "Sleep",
            UnitCommandKind::Wake => "Wake",
            UnitCommandKind::Skip => "Skip",
            UnitCommandKind::Settle => "Settle",
            UnitCommandKind::MeleeAttack => "MeleeAttack",
            UnitCommandKind::RangedAttack => "RangedAttack",
            UnitCommandKind::BuildImprovement => "BuildImprovement",
            UnitCommandKind::Repair => "Repair",
            UnitCommandKind::Pillage => "Pillage",
            UnitCommandKind::CleanFallout => "CleanFallout",
            UnitCommandKind::Disband => "Disband",
        }
    }
}

/// A command addressed to a unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitCommand {
    pub kind: UnitCommandKind,
    pub unit: UnitId,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// A validated unit command.
#[derive(Clone, Debug, PartialEq)]
pub enum UnitAction {
    Move(HexCoord),
    Sleep,
    Wake,
    Skip,
    /// Found a city, optionally with a name.
    Settle(Option<String>),
    MeleeAttack(HexCoord),
    RangedAttack(HexCoord),
    BuildImprovement(Improvement),
    Repair,
    Pillage,
    CleanFallout,
    Disband,
}

impl UnitCommand {
    pub fn new(kind: UnitCommandKind, unit: UnitId, args: Vec<Value>) -> Self {
        Self { kind, unit, args }
    }

    /// Validate the arguments for this command kind.
    pub fn parse(&self) -> Result<UnitAction, CommandError> {
        use UnitCommandKind as K;
        let args = Args::new(self.kind.name(), &self.args);
        Ok(match self.kind {
            K::Move => UnitAction::Move(args.coord(0)?),
            K::Sleep => UnitAction::Sleep,
            K::Wake => UnitAction::Wake,
            K::Skip => UnitAction::Skip,
            K::Settle => UnitAction::Settle(args.optional_string(0)?),
            K::MeleeAttack => UnitAction::MeleeAttack(args.coord(0)?),
            K::RangedAttack => UnitAction::RangedAttack(args.coord(0)?),
            K::BuildImprovement => {
                let improvement: Improvement = args.parse(0)?;
                if improvement.is_natural() {
                    return Err(CommandError::malformed(args.command, 0, "cannot build natural cover"));
                }
                UnitAction::BuildImprovement(improvement)
            }
            K::Repair => UnitAction::Repair,
            K::Pillage => UnitAction::Pillage,
            K::CleanFallout => UnitAction::CleanFallout,
            K::Disband => UnitAction::Disband,
        })
    }
}

/// Player command kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerCommandKind {
    SelectTechnology,
    EndTurn,
}

/// A command addressed to a player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerCommand {
    pub kind: PlayerCommandKind,
    pub player: PlayerId,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// A validated player command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlayerAction {
    SelectTechnology(TechId),
    EndTurn,
}

impl PlayerCommand {
    pub fn new(kind: PlayerCommandKind, player: PlayerId, args: Vec<Value>) -> Self {
        Self { kind, player, args }
    }

    /// Validate the arguments for this command kind.
    pub fn parse(&self) -> Result<PlayerAction, CommandError> {
        match self.kind {
            PlayerCommandKind::SelectTechnology => {
                let args = Args::new("SelectTechnology", &self.args);
                Ok(PlayerAction::SelectTechnology(args.string(0)?))
            }
            PlayerCommandKind::EndTurn => Ok(PlayerAction::EndTurn),
        }
    }
}

/// Positional argument reader for one command.
struct Args<'a> {
    command: &'static str,
    values: &'a [Value],
}

impl<'a> Args<'a> {
    fn new(command: &'static str, values: &'a [Value]) -> Self {
        Self { command, values }
    }

    fn get(&self, index: usize) -> Result<&'a Value, CommandError> {
        self.values.get(index).ok_or(CommandError::MissingArgument {
            command: self.command,
            index,
        })
    }

    fn string(&self, index: usize) -> Result<String, CommandError> {
        self.get(index)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| CommandError::malformed(self.command, index, "expected a string"))
    }

    fn optional_string(&self, index: usize) -> Result<Option<String>, CommandError> {
        match self.values.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.string(index).map(Some),
        }
    }

    /// Non-negative integer position.
    fn index(&self, index: usize) -> Result<usize, CommandError> {
        self.get(index)?
            .as_u64()
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| {
                CommandError::malformed(self.command, index, "expected a non-negative integer")
            })
    }

    /// Coordinate given as `{"q": .., "r": ..}` or `[q, r]`.
    fn coord(&self, index: usize) -> Result<HexCoord, CommandError> {
        let value = self.get(index)?;
        let component = |v: Option<&Value>| v.and_then(Value::as_i64).and_then(|n| i32::try_from(n).ok());
        let parsed = match value {
            Value::Object(map) => component(map.get("q")).zip(component(map.get("r"))),
            Value::Array(items) if items.len() == 2 => component(items.first()).zip(component(items.get(1))),
            _ => None,
        };
        parsed
            .map(|(q, r)| HexCoord::new(q, r))
            .ok_or_else(|| CommandError::malformed(self.command, index, "expected a coordinate"))
    }

    /// Any serde-decodable value.
    fn parse<T: DeserializeOwned>(&self, index: usize) -> Result<T, CommandError> {
        let value = self.get(index)?;
        serde_json::from_value(value.clone())
            .map_err(|e| CommandError::malformed(self.command, index, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn city(kind: CityCommandKind, args: Vec<Value>) -> Result<CityAction, CommandError> {
        CityCommand::new(kind, 1, args).parse()
    }

    fn unit(kind: UnitCommandKind, args: Vec<Value>) -> Result<UnitAction, CommandError> {
        UnitCommand::new(kind, 1, args).parse()
    }

    #[test]
    fn test_city_commands_parse() {
        assert_eq!(
            city(CityCommandKind::Rename, vec![json!("Alexandria")]),
            Ok(CityAction::Rename("Alexandria".into()))
        );
        assert_eq!(
            city(CityCommandKind::QueueProduction, vec![json!({"unit": "warrior"})]),
            Ok(CityAction::QueueProduction(ProductionItem::Unit("warrior".into())))
        );
        assert_eq!(
            city(CityCommandKind::MoveProductionDown, vec![json!(2)]),
            Ok(CityAction::MoveProductionDown(2))
        );
        assert_eq!(
            city(CityCommandKind::ChangeCitizenFocus, vec![json!("science")]),
            Ok(CityAction::ChangeCitizenFocus(YieldKind::Science))
        );
        assert_eq!(city(CityCommandKind::BuyProduction, vec![]), Ok(CityAction::BuyProduction));
    }

    #[test]
    fn test_city_commands_reject_bad_arguments() {
        assert_eq!(
            city(CityCommandKind::Rename, vec![]),
            Err(CommandError::MissingArgument {
                command: "Rename",
                index: 0
            })
        );
        assert!(city(CityCommandKind::Rename, vec![json!(42)]).is_err());
        assert!(city(CityCommandKind::Rename, vec![json!("  ")]).is_err());
        assert!(city(CityCommandKind::CancelProduction, vec![json!(-1)]).is_err());
        assert!(city(CityCommandKind::CancelProduction, vec![json!(1.5)]).is_err());
        assert!(city(CityCommandKind::CancelProduction, vec![json!("0")]).is_err());
        assert!(city(CityCommandKind::ChangeProduction, vec![json!("warrior")]).is_err());
        assert!(city(CityCommandKind::ChangeCitizenFocus, vec![json!("happiness")]).is_err());
    }

    #[test]
    fn test_unit_coordinates() {
        assert_eq!(
            unit(UnitCommandKind::Move, vec![json!({"q": 3, "r": 4})]),
            Ok(UnitAction::Move(HexCoord::new(3, 4)))
        );
        assert_eq!(
            unit(UnitCommandKind::MeleeAttack, vec![json!([5, 6])]),
            Ok(UnitAction::MeleeAttack(HexCoord::new(5, 6)))
        );
        assert!(unit(UnitCommandKind::Move, vec![json!([5])]).is_err());
        assert!(unit(UnitCommandKind::Move, vec![json!({"q": "a", "r": 1})]).is_err());
        assert!(unit(UnitCommandKind::RangedAttack, vec![json!(null)]).is_err());
        assert!(unit(UnitCommandKind::Move, vec![json!([1, 99999999999i64])]).is_err());
    }

    #[test]
    fn test_unit_settle_name_is_optional() {
        assert_eq!(unit(UnitCommandKind::Settle, vec![]), Ok(UnitAction::Settle(None)));
        assert_eq!(
            unit(UnitCommandKind::Settle, vec![json!("Ur")]),
            Ok(UnitAction::Settle(Some("Ur".into())))
        );
        assert!(unit(UnitCommandKind::Settle, vec![json!(7)]).is_err());
    }

    #[test]
    fn test_build_improvement_rejects_natural_cover() {
        assert_eq!(
            unit(UnitCommandKind::BuildImprovement, vec![json!("farm")]),
            Ok(UnitAction::BuildImprovement(Improvement::Farm))
        );
        assert!(unit(UnitCommandKind::BuildImprovement, vec![json!("forest")]).is_err());
        assert!(unit(UnitCommandKind::BuildImprovement, vec![json!("castle")]).is_err());
    }

    #[test]
    fn test_player_commands() {
        let select = PlayerCommand::new(PlayerCommandKind::SelectTechnology, 0, vec![json!("pottery")]);
        assert_eq!(select.parse(), Ok(PlayerAction::SelectTechnology("pottery".into())));

        let bad = PlayerCommand::new(PlayerCommandKind::SelectTechnology, 0, vec![json!(3)]);
        assert!(bad.parse().is_err());

        let end = PlayerCommand::new(PlayerCommandKind::EndTurn, 0, vec![json!("ignored")]);
        assert_eq!(end.parse(), Ok(PlayerAction::EndTurn));
    }

    #[test]
    fn test_command_from_json() {
        let command: UnitCommand =
            serde_json::from_str(r#"{"kind": "move", "unit": 12, "args": [[2, 3]]}"#).unwrap();
        assert_eq!(command.unit, 12);
        assert_eq!(command.parse(), Ok(UnitAction::Move(HexCoord::new(2, 3))));

        let bare: PlayerCommand = serde_json::from_str(r#"{"kind": "end_turn", "player": 1}"#).unwrap();
        assert!(bare.args.is_empty());
    }
}
