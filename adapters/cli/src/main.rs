#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs the Spire Alchemist simulation headlessly.

mod scenario_transfer;

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use scenario_transfer::ScenarioSnapshot;
use spire_core::{Command, Event};
use spire_system_analytics::Analytics;
use spire_system_behavior::Behavior;
use spire_system_scrolling::Scrolling;
use spire_system_spawning::Spawning;
use spire_system_summoning::Summoning;
use spire_world::{self as world, query, GridConfig, World};

#[derive(Debug, Parser)]
#[command(name = "spire-alchemist", about = "Headless Spire Alchemist simulation")]
struct Args {
    /// Number of grid columns.
    #[arg(long, default_value_t = 9)]
    columns: u32,
    /// Number of grid rows.
    #[arg(long, default_value_t = 12)]
    rows: u32,
    /// Seed for block generation and every deterministic system; drawn from
    /// entropy when omitted.
    #[arg(long)]
    seed: Option<u64>,
    /// Number of simulation ticks to run.
    #[arg(long, default_value_t = 600)]
    ticks: u32,
    /// Simulated milliseconds per tick.
    #[arg(long, default_value_t = 100)]
    tick_ms: u64,
    /// Seconds between upward grid scrolls; zero disables scrolling.
    #[arg(long, default_value_t = 30)]
    scroll_secs: u64,
    /// Seconds between invader spawns; zero disables the waves.
    #[arg(long, default_value_t = 8)]
    spawn_secs: u64,
    /// Scenario string to restore before simulating.
    #[arg(long)]
    scenario: Option<String>,
    /// Print the scenario string for the configured setup and exit.
    #[arg(long)]
    export_scenario: bool,
}

/// Entry point for the Spire Alchemist command-line interface.
fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let scenario = match args.scenario.as_deref() {
        Some(value) => Some(ScenarioSnapshot::decode(value).context("invalid scenario string")?),
        None => None,
    };

    let seed = scenario
        .as_ref()
        .map(|snapshot| snapshot.seed)
        .or(args.seed)
        .unwrap_or_else(|| ChaCha8Rng::from_entropy().next_u64());
    let (columns, rows) = scenario
        .as_ref()
        .map_or((args.columns, args.rows), |snapshot| {
            (snapshot.columns, snapshot.rows)
        });

    let config = GridConfig::new(columns, rows, 1.0, seed);
    let mut world = World::generate(config).context("level generation failed")?;
    println!("{}", query::welcome_banner(&world));
    println!("grid {columns}x{rows}, seed {seed:#018x}");

    let mut setup_events = Vec::new();
    restore_scenario(&mut world, scenario.as_ref(), &mut setup_events);

    if args.export_scenario {
        let snapshot = export_snapshot(&world, columns, rows, seed, scenario.as_ref());
        println!("{}", snapshot.encode());
        return Ok(());
    }

    let mut scrolling = Scrolling::new(spire_system_scrolling::Config::new(
        Duration::from_secs(args.scroll_secs),
        1,
    ));
    let mut spawning = Spawning::new(spire_system_spawning::Config::new(
        Duration::from_secs(args.spawn_secs),
        seed.rotate_left(17),
    ));
    let mut behavior = Behavior::new(spire_system_behavior::Config::new(seed.rotate_left(31)));
    let mut summoning = Summoning::new();
    let mut analytics = Analytics::new();

    let dt = Duration::from_millis(args.tick_ms);
    // Events produced while applying commands feed the systems on the next
    // tick, so every batch is observed exactly once.
    let mut inbox = setup_events;

    for _ in 0..args.ticks {
        world::apply(&mut world, Command::Tick { dt }, &mut inbox);

        let mut commands = Vec::new();
        scrolling.handle(&inbox, &mut commands);
        {
            let agents = query::agent_view(&world);
            let pickups = query::pickup_view(&world);
            let tables = query::table_view(&world);
            let player = query::player(&world);
            let entrances = query::entrance_cells(&world);
            let seams = query::resource_seams(&world);
            let terrain = query::terrain_view(&world);
            let occupancy = query::occupancy_view(&world);

            spawning.handle(&inbox, &entrances, &mut commands);
            behavior.handle(
                &inbox, &agents, &pickups, &tables, player, &terrain, occupancy, &entrances,
                &seams, &mut commands,
            );
            summoning.handle(&inbox, &tables, &terrain, occupancy, player, &mut commands);
        }

        analytics.record(&inbox);
        inbox.clear();
        for command in commands {
            world::apply(&mut world, command, &mut inbox);
        }
    }
    analytics.record(&inbox);

    print_report(&world, &analytics, args.ticks, dt);
    Ok(())
}

/// Replays a scenario's mining, building, and player placement onto a
/// freshly generated world.
fn restore_scenario(
    world: &mut World,
    scenario: Option<&ScenarioSnapshot>,
    out_events: &mut Vec<Event>,
) {
    let Some(snapshot) = scenario else {
        spawn_default_player(world, out_events);
        return;
    };

    for cell in &snapshot.mined {
        world::apply(world, Command::MineCell { cell: *cell }, out_events);
    }
    for cell in &snapshot.tables {
        world::apply(world, Command::PlaceTable { cell: *cell }, out_events);
    }
    match snapshot.player {
        Some(cell) => world::apply(world, Command::SpawnPlayer { cell }, out_events),
        None => spawn_default_player(world, out_events),
    }
}

fn spawn_default_player(world: &mut World, out_events: &mut Vec<Event>) {
    let Some(cell) = query::entrance_cells(world).first().copied() else {
        return;
    };
    world::apply(world, Command::SpawnPlayer { cell }, out_events);
}

fn export_snapshot(
    world: &World,
    columns: u32,
    rows: u32,
    seed: u64,
    scenario: Option<&ScenarioSnapshot>,
) -> ScenarioSnapshot {
    ScenarioSnapshot {
        columns,
        rows,
        seed,
        mined: scenario.map(|snapshot| snapshot.mined.clone()).unwrap_or_default(),
        tables: query::table_view(world)
            .iter()
            .map(|table| table.cell)
            .collect(),
        player: query::player(world).map(|player| player.cell),
    }
}

fn print_report(world: &World, analytics: &Analytics, ticks: u32, dt: Duration) {
    let report = analytics.report();
    let simulated = dt.saturating_mul(ticks);
    let registry = query::registry(world);

    println!("simulated {ticks} ticks ({simulated:?} of game time)");
    println!("  rows scrolled:      {}", report.rows_scrolled);
    println!("  cells mined:        {}", report.cells_mined);
    println!(
        "  pickups:            {} spawned, {} collected",
        report.pickups_spawned, report.pickups_collected
    );
    println!(
        "  alchemy:            {} deliveries, {} pairs completed",
        report.resources_delivered, report.pairs_completed
    );
    println!(
        "  creatures:          {} spawned, {} died, {} displaced",
        report.agents_spawned, report.agents_died, report.agents_displaced
    );
    println!("  strikes landed:     {}", report.strikes_landed);
    println!(
        "  survivors:          {} creatures, {} pickups, {} tables",
        registry.agent_count(),
        registry.pickup_count(),
        registry.table_count()
    );
    println!(
        "  player:             {}",
        match query::player(world) {
            Some(player) => format!("alive at ({}, {})", player.cell.column(), player.cell.row()),
            None => "gone".to_owned(),
        }
    );
}
