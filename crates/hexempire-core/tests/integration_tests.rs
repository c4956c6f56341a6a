//! Integration tests for complete simulation flows.
//!
//! These tests drive the crate through its public surface only:
//! - World generation for every layout
//! - Settling and multi-turn city development
//! - Command validation through the controller manager
//! - Combat between players
//! - Research from city science
//! - The queued turn loop

use hexempire_core::{
    board::Board,
    catalog::{BuildingTemplate, StaticCatalog},
    commands::{
        CityCommand, CityCommandKind, PlayerCommand, PlayerCommandKind, UnitCommand,
        UnitCommandKind,
    },
    error::{CommandError, SimError},
    events::ChangeEvent,
    hex::HexCoord,
    manager::ControllerManager,
    mapgen::{find_starting_positions, WorldGenConfig, WorldGenerator},
    random::GameRng,
    session::TurnLoop,
    settings::GameSettings,
    terrain::Terrain,
    types::{PlayerId, SessionId, UnitId, WorldSize, WorldType},
    unit::Unit,
    yields::Yields,
};
use proptest::prelude::*;
use serde_json::json;

// =============================================================================
// Test Helpers
// =============================================================================

/// Manager on a uniform board with the standard catalog.
fn create_manager(terrain: Terrain, seed: u64) -> ControllerManager {
    create_manager_with(StaticCatalog::standard(), terrain, seed)
}

fn create_manager_with(catalog: StaticCatalog, terrain: Terrain, seed: u64) -> ControllerManager {
    let settings = GameSettings {
        world_size: WorldSize::Small,
        seed,
        ..GameSettings::new("Integration Test")
    };
    ControllerManager::new(
        settings,
        Box::new(catalog),
        Board::filled(12, 12, terrain),
        Box::new(GameRng::seeded(seed)),
    )
    .unwrap()
}

fn seat(manager: &mut ControllerManager, name: &str) -> PlayerId {
    manager
        .add_player(SessionId::new(format!("session-{name}")), name.to_string())
        .unwrap()
}

fn unit_cmd(kind: UnitCommandKind, unit: UnitId, args: Vec<serde_json::Value>) -> UnitCommand {
    UnitCommand::new(kind, unit, args)
}

/// Seat a player and settle a city for them at `at`.
fn settle(manager: &mut ControllerManager, name: &str, at: HexCoord) -> PlayerId {
    let player = seat(manager, name);
    let settler = manager.spawn_unit(player, "settler", at).unwrap();
    manager
        .command_unit(
            player,
            &unit_cmd(UnitCommandKind::Settle, settler, vec![json!(name)]),
        )
        .unwrap();
    player
}

fn unit_snapshot(manager: &ControllerManager) -> Vec<Unit> {
    manager.units().units().cloned().collect()
}

// =============================================================================
// 1. World Generation
// =============================================================================

mod world_generation {
    use super::*;

    #[test]
    fn test_every_world_type_generates_consistent_boards() {
        for world_type in WorldType::all() {
            let config = WorldGenConfig::for_world(*world_type, WorldSize::Tiny);
            let mut rng = GameRng::seeded(11);
            let board = WorldGenerator::new(config, &mut rng).generate();

            let (width, height) = WorldSize::Tiny.dimensions();
            assert_eq!((board.width, board.height), (width, height));
            assert_eq!(board.tile_count(), (width * height) as usize);
            assert!(
                board.iter().all(|t| t.is_consistent()),
                "{world_type:?} produced an inconsistent tile"
            );
            assert!(board.iter().all(|t| t.owner_city.is_none()));
        }
    }

    #[test]
    fn test_same_seed_same_world() {
        for world_type in [WorldType::Continents, WorldType::Lakes] {
            let generate = || {
                let mut rng = GameRng::seeded(2024);
                WorldGenerator::new(WorldGenConfig::for_world(world_type, WorldSize::Small), &mut rng)
                    .generate()
            };
            assert_eq!(generate(), generate());
        }
    }

    #[test]
    fn test_new_game_places_starting_units_on_land() {
        let settings = GameSettings {
            world_size: WorldSize::Small,
            player_count: 3,
            seed: 99,
            ..GameSettings::new("Starts")
        };
        let manager = ControllerManager::new_game(settings, Box::new(StaticCatalog::standard())).unwrap();

        assert_eq!(manager.players().players().count(), 3);
        for unit in manager.units().units() {
            let tile = manager.board().tile(&unit.position).unwrap();
            assert!(tile.can_found_city());
            assert!(tile.is_passable());
        }
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let settings = GameSettings {
            world_size: WorldSize::Tiny,
            player_count: 8,
            ..GameSettings::new("Crowded")
        };
        let result = ControllerManager::new_game(settings, Box::new(StaticCatalog::standard()));
        assert!(matches!(result, Err(SimError::Settings(_))));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_starting_positions_are_spaced(seed in any::<u64>()) {
            let mut rng = GameRng::seeded(seed);
            let board = WorldGenerator::new(
                WorldGenConfig::for_world(WorldType::Pangea, WorldSize::Small),
                &mut rng,
            )
            .generate();

            let starts = find_starting_positions(&board, 2);
            for start in &starts {
                let tile = board.get(start).unwrap();
                prop_assert!(tile.can_found_city());
            }
            if let [a, b] = starts.as_slice() {
                prop_assert!(a.distance(b) >= 2);
            }
        }
    }
}

// =============================================================================
// 2. City Development
// =============================================================================

mod city_development {
    use super::*;

    #[test]
    fn test_first_turn_draws_borders() {
        let mut manager = create_manager(Terrain::Grassland, 1);
        let center = HexCoord::new(5, 5);
        let player = settle(&mut manager, "alice", center);
        let city = manager.cities().city_at(&center).unwrap().id;
        assert!(manager.board().tiles_of_city(city).is_empty());

        manager.process_turn().unwrap();

        let owned: Vec<HexCoord> = manager
            .board()
            .tiles_of_city(city)
            .iter()
            .map(|t| t.coord)
            .collect();
        assert_eq!(owned.len(), 7);
        assert!(owned.contains(&center));
        let city = manager.cities().city(city).unwrap();
        assert_eq!(city.owner, player);
        assert_eq!(city.worked_tiles.len(), 1);
    }

    #[test]
    fn test_settled_sessions_are_deterministic() {
        let run = || {
            let mut manager = create_manager(Terrain::Grassland, 17);
            settle(&mut manager, "alice", HexCoord::new(3, 3));
            settle(&mut manager, "bob", HexCoord::new(8, 8));
            let mut events = Vec::new();
            for _ in 0..5 {
                manager.process_turn().unwrap();
                events.extend(manager.drain_events());
            }
            let cities: Vec<(u32, u32, usize)> = manager
                .cities()
                .cities()
                .map(|c| (c.population, c.hp, manager.board().tiles_of_city(c.id).len()))
                .collect();
            (cities, events)
        };

        let (first_cities, first_events) = run();
        let (second_cities, second_events) = run();
        assert_eq!(first_cities, second_cities);
        assert_eq!(first_events, second_events);
        assert_eq!(first_cities.len(), 2);
    }

    #[test]
    fn test_production_spawns_unit_at_city() {
        let mut manager = create_manager(Terrain::Plains, 4);
        let center = HexCoord::new(6, 6);
        let player = settle(&mut manager, "alice", center);
        let city = manager.cities().city_at(&center).unwrap().id;

        manager
            .command_city(
                player,
                &CityCommand::new(
                    CityCommandKind::QueueProduction,
                    city,
                    vec![json!({ "unit": "warrior" })],
                ),
            )
            .unwrap();

        let mut spawned = false;
        for _ in 0..60 {
            manager.process_turn().unwrap();
            if manager
                .drain_events()
                .iter()
                .any(|e| matches!(e, ChangeEvent::UnitAdded { unit } if unit.template == "warrior"))
            {
                spawned = true;
                break;
            }
        }
        assert!(spawned);
        let warrior = manager.units().units_of(player).next().unwrap();
        assert_eq!(warrior.position, center);
        assert!(manager.cities().city(city).unwrap().queue.is_empty());
    }
}

// =============================================================================
// 3. Command Robustness
// =============================================================================

mod command_robustness {
    use super::*;

    #[test]
    fn test_rejected_commands_leave_state_untouched() {
        let mut manager = create_manager(Terrain::Grassland, 2);
        let alice = seat(&mut manager, "alice");
        let bob = seat(&mut manager, "bob");
        let warrior = manager.spawn_unit(alice, "warrior", HexCoord::new(2, 2)).unwrap();
        manager.drain_events();
        let before = unit_snapshot(&manager);

        let rejected = [
            (bob, unit_cmd(UnitCommandKind::Move, warrior, vec![json!([3, 3])])),
            (alice, unit_cmd(UnitCommandKind::Move, warrior, vec![json!("east")])),
            (alice, unit_cmd(UnitCommandKind::Move, warrior, vec![])),
            (alice, unit_cmd(UnitCommandKind::Move, 999, vec![json!([3, 3])])),
            (alice, unit_cmd(UnitCommandKind::Settle, warrior, vec![json!("Nope")])),
            (alice, unit_cmd(UnitCommandKind::MeleeAttack, warrior, vec![json!([3, 2])])),
            (alice, unit_cmd(UnitCommandKind::BuildImprovement, warrior, vec![json!("farm")])),
        ];
        for (issuer, command) in &rejected {
            assert!(manager.command_unit(*issuer, command).is_err(), "{command:?} accepted");
        }

        assert_eq!(unit_snapshot(&manager), before);
        assert!(manager.events().is_empty());
    }

    #[test]
    fn test_city_commands_need_the_owner() {
        let mut manager = create_manager(Terrain::Grassland, 3);
        let alice = settle(&mut manager, "alice", HexCoord::new(4, 4));
        let bob = seat(&mut manager, "bob");
        let city = manager.cities().cities_of(alice).next().unwrap().id;

        let rename = CityCommand::new(CityCommandKind::Rename, city, vec![json!("Stolen")]);
        assert!(matches!(
            manager.command_city(bob, &rename),
            Err(CommandError::NotOwner { .. })
        ));
        let unknown = CityCommand::new(CityCommandKind::Rename, city + 10, vec![json!("Nowhere")]);
        assert_eq!(
            manager.command_city(alice, &unknown),
            Err(CommandError::UnknownCity(city + 10))
        );

        let rename = CityCommand::new(CityCommandKind::Rename, city, vec![json!("Capital")]);
        manager.command_city(alice, &rename).unwrap();
        assert_eq!(manager.cities().city(city).unwrap().name, "Capital");
    }

    #[test]
    fn test_locked_production_is_rejected() {
        let mut manager = create_manager(Terrain::Grassland, 3);
        let alice = settle(&mut manager, "alice", HexCoord::new(4, 4));
        let city = manager.cities().cities_of(alice).next().unwrap().id;

        for item in [json!({ "building": "library" }), json!({ "unit": "swordsman" }), json!({ "unit": "tank" })] {
            let cmd = CityCommand::new(CityCommandKind::QueueProduction, city, vec![item]);
            assert!(manager.command_city(alice, &cmd).is_err());
        }
        assert!(manager.cities().city(city).unwrap().queue.is_empty());
    }

    #[test]
    fn test_extreme_arguments_are_rejected() {
        let mut manager = create_manager(Terrain::Plains, 4);
        let alice = settle(&mut manager, "alice", HexCoord::new(4, 4));
        let city = manager.cities().cities_of(alice).next().unwrap().id;
        let queue = CityCommand::new(
            CityCommandKind::QueueProduction,
            city,
            vec![json!({ "unit": "warrior" })],
        );
        manager.command_city(alice, &queue).unwrap();
        let warrior = manager.spawn_unit(alice, "warrior", HexCoord::new(3, 3)).unwrap();
        manager.drain_events();
        let queue_before = manager.cities().city(city).unwrap().queue.clone();
        let units_before = unit_snapshot(&manager);

        for kind in [
            CityCommandKind::MoveProductionDown,
            CityCommandKind::MoveProductionUp,
            CityCommandKind::CancelProduction,
        ] {
            let cmd = CityCommand::new(kind, city, vec![json!(u64::MAX)]);
            assert!(manager.command_city(alice, &cmd).is_err(), "{kind:?} accepted");
        }
        for target in [json!([i32::MAX, i32::MAX]), json!([i32::MIN, i32::MIN]), json!({ "q": i32::MIN, "r": i32::MAX })] {
            for kind in [UnitCommandKind::MeleeAttack, UnitCommandKind::Move] {
                let cmd = unit_cmd(kind, warrior, vec![target.clone()]);
                assert!(manager.command_unit(alice, &cmd).is_err(), "{kind:?} to {target} accepted");
            }
        }

        assert_eq!(manager.cities().city(city).unwrap().queue, queue_before);
        assert_eq!(unit_snapshot(&manager), units_before);
        assert!(manager.events().is_empty());
    }

    #[test]
    fn test_cannot_settle_next_to_foreign_city() {
        let mut manager = create_manager(Terrain::Grassland, 5);
        settle(&mut manager, "alice", HexCoord::new(4, 4));
        manager.process_turn().unwrap();

        let bob = seat(&mut manager, "bob");
        let settler = manager.spawn_unit(bob, "settler", HexCoord::new(4, 5)).unwrap();
        let cmd = unit_cmd(UnitCommandKind::Settle, settler, vec![json!("Squat")]);
        assert!(manager.command_unit(bob, &cmd).is_err());
        assert!(manager.units().unit(settler).is_some());
        assert_eq!(manager.cities().cities().count(), 1);
    }
}

// =============================================================================
// 4. Combat
// =============================================================================

mod combat_flow {
    use super::*;

    #[test]
    fn test_melee_exchange_between_players() {
        let mut manager = create_manager(Terrain::Grassland, 6);
        let alice = seat(&mut manager, "alice");
        let bob = seat(&mut manager, "bob");
        let attacker = manager.spawn_unit(alice, "warrior", HexCoord::new(4, 4)).unwrap();
        let defender = manager.spawn_unit(bob, "warrior", HexCoord::new(5, 4)).unwrap();

        let attack = unit_cmd(UnitCommandKind::MeleeAttack, attacker, vec![json!([5, 4])]);
        manager.command_unit(alice, &attack).unwrap();

        assert_eq!(manager.units().unit(attacker).unwrap().hp, 7);
        assert_eq!(manager.units().unit(defender).unwrap().hp, 7);
        assert_eq!(manager.units().unit(attacker).unwrap().position, HexCoord::new(4, 4));

        // One attack per turn
        assert!(manager.command_unit(alice, &attack).is_err());
        manager.process_turn().unwrap();
        manager.command_unit(alice, &attack).unwrap();
        assert_eq!(manager.units().unit(defender).unwrap().hp, 4);
    }

    #[test]
    fn test_attacking_own_unit_is_rejected() {
        let mut manager = create_manager(Terrain::Grassland, 6);
        let alice = seat(&mut manager, "alice");
        let attacker = manager.spawn_unit(alice, "warrior", HexCoord::new(4, 4)).unwrap();
        manager.spawn_unit(alice, "warrior", HexCoord::new(5, 4)).unwrap();

        let attack = unit_cmd(UnitCommandKind::MeleeAttack, attacker, vec![json!([5, 4])]);
        assert!(manager.command_unit(alice, &attack).is_err());
        assert_eq!(manager.units().unit(attacker).unwrap().hp, 10);
    }

    #[test]
    fn test_city_survives_one_assault() {
        let mut manager = create_manager(Terrain::Grassland, 8);
        let alice = settle(&mut manager, "alice", HexCoord::new(4, 4));
        let bob = seat(&mut manager, "bob");
        let city = manager.cities().cities_of(alice).next().unwrap().id;
        let attacker = manager.spawn_unit(bob, "warrior", HexCoord::new(5, 4)).unwrap();

        let attack = unit_cmd(UnitCommandKind::MeleeAttack, attacker, vec![json!([4, 4])]);
        manager.command_unit(bob, &attack).unwrap();

        let city = manager.cities().city(city).unwrap();
        assert_eq!(city.owner, alice);
        assert!(city.hp < city.max_hp);
        assert!(city.hp >= 1);
    }
}

// =============================================================================
// 5. Research
// =============================================================================

mod research_flow {
    use super::*;

    #[test]
    fn test_city_science_unlocks_technology() {
        let catalog = StaticCatalog::standard().with_building(
            BuildingTemplate::new("observatory", "Observatory", 10).with_yields(Yields::new(0, 0, 0, 5, 0)),
        );
        let mut manager = create_manager_with(catalog, Terrain::Plains, 9);
        let alice = settle(&mut manager, "alice", HexCoord::new(5, 5));
        let city = manager.cities().cities_of(alice).next().unwrap().id;

        manager
            .command_city(
                alice,
                &CityCommand::new(
                    CityCommandKind::QueueProduction,
                    city,
                    vec![json!({ "building": "observatory" })],
                ),
            )
            .unwrap();
        manager
            .command_player(
                alice,
                &PlayerCommand::new(PlayerCommandKind::SelectTechnology, alice, vec![json!("agriculture")]),
            )
            .unwrap();

        for _ in 0..40 {
            manager.process_turn().unwrap();
            if manager.players().player(alice).unwrap().has_tech("agriculture") {
                break;
            }
        }

        let player = manager.players().player(alice).unwrap();
        assert!(manager.cities().city(city).unwrap().buildings.contains("observatory"));
        assert!(player.has_tech("agriculture"));
        assert_eq!(player.selected_tech, None);

        let pottery = PlayerCommand::new(PlayerCommandKind::SelectTechnology, alice, vec![json!("pottery")]);
        manager.command_player(alice, &pottery).unwrap();
    }

    #[test]
    fn test_technology_gates_production() {
        let mut manager = create_manager(Terrain::Grassland, 10);
        let alice = settle(&mut manager, "alice", HexCoord::new(5, 5));
        let city = manager.cities().cities_of(alice).next().unwrap().id;
        let granary = CityCommand::new(
            CityCommandKind::QueueProduction,
            city,
            vec![json!({ "building": "granary" })],
        );
        assert!(manager.command_city(alice, &granary).is_err());

        let select = PlayerCommand::new(PlayerCommandKind::SelectTechnology, alice, vec![json!("pottery")]);
        assert!(manager.command_player(alice, &select).is_err());
    }
}

// =============================================================================
// 6. Turn Loop
// =============================================================================

mod turn_loop {
    use super::*;

    fn create_loop() -> TurnLoop {
        let settings = GameSettings {
            world_size: WorldSize::Small,
            seed: 31,
            ..GameSettings::new("Loop")
        };
        TurnLoop::new(ControllerManager::new_game(settings, Box::new(StaticCatalog::standard())).unwrap())
    }

    #[tokio::test]
    async fn test_players_end_turn_from_tasks() {
        let mut turn_loop = create_loop();
        let players: Vec<PlayerId> = turn_loop.manager().players().players().map(|p| p.id).collect();

        let mut handles = Vec::new();
        for player in players.clone() {
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
        assert_eq!(report.turn, 1);
        assert_eq!(report.applied, players.len());
        assert_eq!(report.rejected, 0);
        assert_eq!(turn_loop.manager().turn(), 2);
        assert!(turn_loop.manager().players().players().all(|p| !p.turn_finished));
    }

    #[tokio::test]
    async fn test_settle_through_queue() {
        let mut turn_loop = create_loop();
        let sender = turn_loop.sender();
        let orders: Vec<(PlayerId, UnitId)> = turn_loop
            .manager()
            .units()
            .units()
            .filter(|u| u.template == "settler")
            .map(|u| (u.owner, u.id))
            .collect();

        let task = tokio::spawn(async move {
            for (player, unit) in orders {
                sender.unit(player, unit_cmd(UnitCommandKind::Settle, unit, vec![]))?;
            }
            Ok::<_, hexempire_core::error::SessionClosed>(())
        });
        task.await.unwrap().unwrap();

        let report = turn_loop.advance().unwrap();
        assert_eq!(report.rejected, 0);
        assert!(report
            .events
            .iter()
            .any(|e| matches!(e, ChangeEvent::CitySettled { .. })));

        let manager = turn_loop.into_manager();
        assert_eq!(manager.cities().cities().count(), 2);
        for city in manager.cities().cities() {
            assert!(!manager.board().tiles_of_city(city.id).is_empty());
        }
    }
}
