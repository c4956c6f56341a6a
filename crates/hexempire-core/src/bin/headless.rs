//! Headless session runner
//!
//! Generates a world, seats the players and plays a fixed number of turns
//! with a trivial scripted opponent for every seat: settle where you stand,
//! research the cheapest available technology, keep the queue busy.

use clap::Parser;
use hexempire_core::{
    CityCommand, CityCommandKind, ControllerManager, GameSettings, PlayerCommand,
    PlayerCommandKind, StaticCatalog, TurnLoop, UnitArchetype, UnitCommand, UnitCommandKind,
    WorldSize, WorldType,
};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Headless Session Runner - plays scripted turns without any client
#[derive(Parser, Debug)]
#[command(name = "hexempire-headless")]
#[command(about = "Generate a world and play scripted turns")]
struct Args {
    /// World layout (pangea, archipelago, continents, fractal, ...)
    #[arg(long, default_value = "pangea", value_parser = parse_world_type)]
    world_type: WorldType,

    /// World size preset (tiny, small, standard, large)
    #[arg(long, default_value = "small", value_parser = parse_world_size)]
    size: WorldSize,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Number of turns to play
    #[arg(long, default_value_t = 20)]
    turns: u32,

    /// Number of players
    #[arg(long, default_value_t = 2)]
    players: u8,

    /// Settings document; overrides the world flags above
    #[arg(long)]
    settings: Option<std::path::PathBuf>,

    /// Output format: json or text
    #[arg(long, default_value = "text")]
    format: String,
}

#[derive(Serialize)]
struct PlayerSummary {
    name: String,
    era: String,
    techs: usize,
    gold: i32,
    cities: usize,
    population: u32,
    units: usize,
}

#[derive(Serialize)]
struct RunSummary {
    seed: u64,
    turns: u32,
    commands_applied: usize,
    commands_rejected: usize,
    events: usize,
    players: Vec<PlayerSummary>,
}

fn parse_world_type(value: &str) -> Result<WorldType, String> {
    serde_json::from_value(json!(value)).map_err(|_| format!("unknown world type '{value}'"))
}

fn parse_world_size(value: &str) -> Result<WorldSize, String> {
    serde_json::from_value(json!(value)).map_err(|_| format!("unknown world size '{value}'"))
}

fn load_settings(args: &Args) -> Result<GameSettings, Box<dyn std::error::Error>> {
    if let Some(path) = &args.settings {
        let text = std::fs::read_to_string(path)?;
        return Ok(GameSettings::from_json(&text)?);
    }
    Ok(GameSettings {
        world_type: args.world_type,
        world_size: args.size,
        player_count: args.players,
        seed: args.seed.unwrap_or_else(rand::random),
        ..GameSettings::new("Headless")
    })
}

/// Queue this turn's scripted orders for every seat.
fn script_orders(turn_loop: &TurnLoop) -> Result<(), Box<dyn std::error::Error>> {
    let manager = turn_loop.manager();
    let sender = turn_loop.sender();
    let catalog = manager.catalog();

    for player in manager.players().players() {
        for unit in manager.units().units_of(player.id) {
            if unit.archetype == UnitArchetype::Civilian && unit.can(UnitCommandKind::Settle) {
                let name = format!("{} {}", player.name, unit.id);
                sender.unit(
                    player.id,
                    UnitCommand::new(UnitCommandKind::Settle, unit.id, vec![json!(name)]),
                )?;
            }
        }

        if player.selected_tech.is_none() {
            let next = catalog
                .technologies()
                .into_iter()
                .filter(|t| !player.has_tech(&t.id))
                .filter(|t| t.prerequisites.iter().all(|p| player.has_tech(p)))
                .min_by_key(|t| (t.cost, t.id.clone()));
            if let Some(tech) = next {
                sender.player(
                    player.id,
                    PlayerCommand::new(
                        PlayerCommandKind::SelectTechnology,
                        player.id,
                        vec![json!(tech.id)],
                    ),
                )?;
            }
        }

        for city in manager.cities().cities_of(player.id) {
            if city.queue.is_empty() {
                sender.city(
                    player.id,
                    CityCommand::new(
                        CityCommandKind::QueueProduction,
                        city.id,
                        vec![json!({ "unit": "warrior" })],
                    ),
                )?;
            }
        }

        sender.player(
            player.id,
            PlayerCommand::new(PlayerCommandKind::EndTurn, player.id, vec![]),
        )?;
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hexempire_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = load_settings(&args)?;
    let seed = settings.seed;
    info!(seed, turns = args.turns, "starting headless session");

    let manager = ControllerManager::new_game(settings, Box::new(StaticCatalog::standard()))?;
    let mut turn_loop = TurnLoop::new(manager);

    let mut applied = 0;
    let mut rejected = 0;
    let mut events = 0;
    for _ in 0..args.turns {
        script_orders(&turn_loop)?;
        let report = turn_loop.advance()?;
        if report.rejected > 0 {
            warn!(turn = report.turn, rejected = report.rejected, "scripted orders rejected");
        }
        applied += report.applied;
        rejected += report.rejected;
        events += report.events.len();
        if args.format != "json" {
            println!(
                "turn {:>3}: {} applied, {} rejected, {} events",
                report.turn,
                report.applied,
                report.rejected,
                report.events.len()
            );
        }
    }

    let manager = turn_loop.into_manager();
    let players = manager
        .players()
        .players()
        .map(|p| PlayerSummary {
            name: p.name.clone(),
            era: p.era.to_string(),
            techs: p.techs.len(),
            gold: p.gold,
            cities: manager.cities().cities_of(p.id).count(),
            population: manager.cities().cities_of(p.id).map(|c| c.population).sum(),
            units: manager.units().units_of(p.id).count(),
        })
        .collect();
    let summary = RunSummary {
        seed,
        turns: args.turns,
        commands_applied: applied,
        commands_rejected: rejected,
        events,
        players,
    };

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("\nseed {seed}, {} turns", summary.turns);
        for p in &summary.players {
            println!(
                "  {:<10} {:<16} techs {:>2}  gold {:>4}  cities {}  pop {:>2}  units {}",
                p.name, p.era, p.techs, p.gold, p.cities, p.population, p.units
            );
        }
    }
    Ok(())
}
