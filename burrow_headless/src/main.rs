// Headless runner for the Burrow simulation.
//
// Builds a world from config, spawns workers at the base, and drives the
// scheduler with synthetic 60fps frame timestamps as fast as the machine
// allows. Unit events are drained every frame. Prints the scheduler metrics
// and a one-line summary per unit at the end. Useful for soak runs and for
// eyeballing behavior with `RUST_LOG=burrow_sim=debug`.
//
// Usage:
//   burrow_headless [OPTIONS]
//     --seed <N>          World seed (default: from config, else the clock)
//     --workers <N>       Workers to spawn (default: 4)
//     --seconds <S>       Game seconds to simulate at scale 1 (default: 60)
//     --config <PATH>     JSON config file (default: built-in defaults)
//     --tick-rate <N>     Scheduler ticks per second, clamped to [1, 60]
//     --time-scale <X>    Game-time multiplier, clamped to [0.1, 10]

use std::path::PathBuf;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use burrow_sim::config::SimConfig;
use burrow_sim::event::UnitEventKind;
use burrow_sim::sim::Simulation;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Synthetic frame spacing, in ms.
const FRAME_MS: f64 = 1000.0 / 60.0;

struct Args {
    seed: Option<u64>,
    workers: u32,
    seconds: f64,
    config: Option<PathBuf>,
    tick_rate: Option<u32>,
    time_scale: Option<f64>,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let args = parse_args();
    let mut config = match &args.config {
        Some(path) => SimConfig::load(path).unwrap_or_else(|e| {
            eprintln!("Failed to load {}: {e}", path.display());
            std::process::exit(1);
        }),
        None => SimConfig::default(),
    };
    match args.seed {
        Some(seed) => config.seed = seed,
        None if args.config.is_none() => config.seed = clock_seed(),
        None => {}
    }
    if let Some(rate) = args.tick_rate {
        config.scheduler.tick_rate = rate;
    }
    if let Some(scale) = args.time_scale {
        config.scheduler.time_scale = scale;
    }

    let seed = config.seed;
    let mut sim = Simulation::new(config).unwrap_or_else(|e| {
        eprintln!("Invalid config: {e}");
        std::process::exit(1);
    });
    for _ in 0..args.workers {
        sim.spawn_worker(None);
    }

    let frames = (args.seconds * 1000.0 / FRAME_MS).ceil() as u64;
    info!(seed, workers = args.workers, frames, "running");
    let started = Instant::now();
    let mut ticks = 0u64;
    let mut events = 0usize;
    let mut deposits = 0usize;
    for frame in 0..=frames {
        ticks += u64::from(sim.advance(frame as f64 * FRAME_MS));
        for event in sim.events().drain() {
            events += 1;
            if matches!(event.kind, UnitEventKind::ResourcesDeposited { .. }) {
                deposits += 1;
            }
        }
    }
    let wall = started.elapsed();

    println!("seed {seed}: {ticks} ticks in {wall:.2?}");
    match serde_json::to_string_pretty(&sim.scheduler().performance_metrics()) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Failed to serialize metrics: {e}"),
    }

    let home = sim.home();
    if let Some(base) = sim.world().base(home.id) {
        println!(
            "{} at {}: energy {:.1}, matter {:.1}",
            base.id, base.position, base.energy, base.matter
        );
    }
    for unit in sim.units() {
        let entity = unit.entity();
        println!(
            "{:>8} {:<10} at {:<16} hp {:>5.1} lvl {} cargo {:>4.1} explored {:>4} known {:>3}",
            entity.id.to_string(),
            entity.state().to_string(),
            entity.position.to_string(),
            entity.health,
            entity.level,
            entity.cargo().weight(),
            unit.fog().explored_count(),
            unit.memory().len(),
        );
    }
    println!(
        "{events} unit events, {deposits} deposits, {} dropped",
        sim.events().dropped()
    );
}

/// Seed from the wall clock when none was given.
fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Parse command-line arguments. Simple `std::env::args()` matching.
fn parse_args() -> Args {
    let mut parsed = Args {
        seed: None,
        workers: 4,
        seconds: 60.0,
        config: None,
        tick_rate: None,
        time_scale: None,
    };
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--seed" => {
                i += 1;
                parsed.seed = Some(number(&args, i, "--seed"));
            }
            "--workers" => {
                i += 1;
                parsed.workers = number(&args, i, "--workers");
            }
            "--seconds" => {
                i += 1;
                parsed.seconds = number(&args, i, "--seconds");
            }
            "--config" => {
                i += 1;
                parsed.config = args.get(i).map(PathBuf::from).or_else(|| {
                    eprintln!("--config requires a path");
                    std::process::exit(1);
                });
            }
            "--tick-rate" => {
                i += 1;
                parsed.tick_rate = Some(number(&args, i, "--tick-rate"));
            }
            "--time-scale" => {
                i += 1;
                parsed.time_scale = Some(number(&args, i, "--time-scale"));
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    parsed
}

fn number<T: std::str::FromStr>(args: &[String], i: usize, flag: &str) -> T {
    args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
        eprintln!("{flag} requires a valid number");
        std::process::exit(1);
    })
}

fn print_usage() {
    println!("Usage: burrow_headless [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --seed <N>          World seed (default: from config, else the clock)");
    println!("  --workers <N>       Workers to spawn (default: 4)");
    println!("  --seconds <S>       Game seconds to simulate at scale 1 (default: 60)");
    println!("  --config <PATH>     JSON config file (default: built-in defaults)");
    println!("  --tick-rate <N>     Scheduler ticks per second, clamped to [1, 60]");
    println!("  --time-scale <X>    Game-time multiplier, clamped to [0.1, 10]");
    println!("  --help, -h          Show this help");
}
