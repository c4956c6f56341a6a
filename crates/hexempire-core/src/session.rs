//! Single-writer turn loop with an inbound command queue.
//!
//! Transports hold a cloneable [`CommandSender`] and push commands at any
//! time. Only the [`TurnLoop`] touches the simulation: each call to
//! [`TurnLoop::advance`] applies everything queued so far and then plays
//! exactly one turn.

use crate::commands::{CityCommand, PlayerCommand, UnitCommand};
use crate::error::{Result, SessionClosed};
use crate::events::ChangeEvent;
use crate::manager::ControllerManager;
use crate::types::PlayerId;
use tokio::sync::mpsc;
use tracing::debug;

/// A command waiting for the turn loop, tagged with the player who sent it.
#[derive(Clone, Debug, PartialEq)]
pub enum InboundCommand {
    City { issuer: PlayerId, command: CityCommand },
    Unit { issuer: PlayerId, command: UnitCommand },
    Player { issuer: PlayerId, command: PlayerCommand },
}

/// Handle for queueing commands into a [`TurnLoop`].
#[derive(Clone, Debug)]
pub struct CommandSender {
    tx: mpsc::UnboundedSender<InboundCommand>,
}

impl CommandSender {
    pub fn send(&self, command: InboundCommand) -> std::result::Result<(), SessionClosed> {
        self.tx.send(command).map_err(|_| SessionClosed)
    }

    pub fn city(&self, issuer: PlayerId, command: CityCommand) -> std::result::Result<(), SessionClosed> {
        self.send(InboundCommand::City { issuer, command })
    }

    pub fn unit(&self, issuer: PlayerId, command: UnitCommand) -> std::result::Result<(), SessionClosed> {
        self.send(InboundCommand::Unit { issuer, command })
    }

    pub fn player(&self, issuer: PlayerId, command: PlayerCommand) -> std::result::Result<(), SessionClosed> {
        self.send(InboundCommand::Player { issuer, command })
    }
}

/// What one call to [`TurnLoop::advance`] did.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnReport {
    /// Turn that was played.
    pub turn: u32,
    /// Queued commands that were applied.
    pub applied: usize,
    /// Queued commands that were rejected and dropped.
    pub rejected: usize,
    /// Change notifications raised by the commands and the turn.
    pub events: Vec<ChangeEvent>,
}

/// Owner of a session's [`ControllerManager`] and its command queue.
pub struct TurnLoop {
    manager: ControllerManager,
    tx: mpsc::UnboundedSender<InboundCommand>,
    rx: mpsc::UnboundedReceiver<InboundCommand>,
}

impl TurnLoop {
    pub fn new(manager: ControllerManager) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { manager, tx, rx }
    }

    /// A new handle for queueing commands.
    pub fn sender(&self) -> CommandSender {
        CommandSender {
            tx: self.tx.clone(),
        }
    }

    pub fn manager(&self) -> &ControllerManager {
        &self.manager
    }

    pub fn into_manager(self) -> ControllerManager {
        self.manager
    }

    /// Apply every queued command, then play one turn.
    pub fn advance(&mut self) -> Result<TurnReport> {
        let mut applied = 0;
        let mut rejected = 0;

        while let Ok(inbound) = self.rx.try_recv() {
            let result = match &inbound {
                InboundCommand::City { issuer, command } => self.manager.command_city(*issuer, command),
                InboundCommand::Unit { issuer, command } => self.manager.command_unit(*issuer, command),
                InboundCommand::Player { issuer, command } => {
                    self.manager.command_player(*issuer, command)
                }
            };
            match result {
                Ok(()) => applied += 1,
                Err(_) => rejected += 1,
            }
        }

        let turn = self.manager.turn();
        self.manager.process_turn()?;
        debug!(turn, applied, rejected, "turn loop advanced");

        Ok(TurnReport {
            turn,
            applied,
            rejected,
            events: self.manager.drain_events(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::catalog::StaticCatalog;
    use crate::commands::PlayerCommandKind;
    use crate::random::GameRng;
    use crate::settings::GameSettings;
    use crate::terrain::Terrain;
    use crate::types::SessionId;

    fn create_loop() -> (TurnLoop, PlayerId) {
        let mut manager = ControllerManager::new(
            GameSettings::new("Loop"),
            Box::new(StaticCatalog::standard()),
            Board::filled(10, 10, Terrain::Plains),
            Box::new(GameRng::seeded(3)),
        )
        .unwrap();
        let player = manager
            .add_player(SessionId::new("s0"), "alice".to_string())
            .unwrap();
        (TurnLoop::new(manager), player)
    }

    #[test]
    fn test_advance_counts_commands() {
        let (mut turn_loop, player) = create_loop();
        let sender = turn_loop.sender();
        sender
            .player(player, PlayerCommand::new(PlayerCommandKind::EndTurn, player, vec![]))
            .unwrap();
        sender
            .player(7, PlayerCommand::new(PlayerCommandKind::EndTurn, 7, vec![]))
            .unwrap();

        let report = turn_loop.advance().unwrap();
        assert_eq!(report.turn, 1);
        assert_eq!(report.applied, 1);
        assert_eq!(report.rejected, 1);
        assert!(report
            .events
            .iter()
            .any(|e| matches!(e, ChangeEvent::PlayerTurnStateChanged { finished: true, .. })));
        assert!(!turn_loop.manager().players().player(player).unwrap().turn_finished);

        let report = turn_loop.advance().unwrap();
        assert_eq!((report.turn, report.applied, report.rejected), (2, 0, 0));
    }

    #[tokio::test]
    async fn test_commands_from_tasks() {
        let (mut turn_loop, player) = create_loop();
        let mut handles = Vec::new();
        for _ in 0..4 {
            let sender = turn_loop.sender();
            handles.push(tokio::spawn(async move {
                sender.player(
                    player,
                    PlayerCommand::new(PlayerCommandKind::EndTurn, player, vec![]),
                )
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let report = turn_loop.advance().unwrap();
        assert_eq!(report.applied, 4);
    }

    #[test]
    fn test_sender_fails_after_loop_dropped() {
        let (turn_loop, player) = create_loop();
        let sender = turn_loop.sender();
        drop(turn_loop);
        let result = sender.player(player, PlayerCommand::new(PlayerCommandKind::EndTurn, player, vec![]));
        assert_eq!(result, Err(SessionClosed));
    }
}
