use std::error::Error;
use std::process;
use std::time::Duration;

use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sortie_stats::{
    DEFAULT_QUEUE_CAPACITY, EpisodeLogger, EpisodeOutcome, GathererConfig, GathererRegistry,
    Keyed,
};

/// Default base seed for deterministic runs.
const DEFAULT_SEED: u64 = 0xC0FFEE_u64 << 32 | 0x5EED_u64;
const GATHERER_NAME: &str = "episode_gatherer";
const TEAMS: [&str; 2] = ["Blue", "Red"];
const FIGHTERS_PER_TEAM: u32 = 2;
const END_REASONS: [&str; 4] = ["ELIMINATION", "PENALTY", "TIMEUP", "WITHDRAWAL"];
const AGENT_INTERVAL: u64 = 10;
const TICKS_PER_SECOND: f64 = 20.0;

#[derive(Parser, Debug)]
#[command(
    name = "simulate",
    about = "Run synthetic concurrent episode drivers against one shared gatherer."
)]
struct Args {
    /// Number of concurrent drivers
    #[arg(short = 'w', long = "workers", default_value_t = 4)]
    workers: usize,

    /// Episodes per driver
    #[arg(short = 'e', long = "episodes", default_value_t = 25)]
    episodes: usize,

    /// Base RNG seed; each driver derives its own stream
    #[arg(short = 's', long = "seed", default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Output path prefix for the CSV log
    #[arg(short = 'p', long = "prefix", default_value = "results/sortie")]
    prefix: String,

    /// Write a CSV row every N episodes
    #[arg(long = "interval", default_value_t = 1)]
    interval: u64,

    /// Rolling win-rate window
    #[arg(long = "denominator", default_value_t = 100)]
    denominator: usize,

    /// Side whose victories count as wins
    #[arg(long = "side", default_value = "Blue")]
    side: String,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    if args.workers == 0 {
        return Err("workers must be positive".into());
    }
    if !TEAMS.contains(&args.side.as_str()) {
        return Err(format!("side must be one of {TEAMS:?}, received {}", args.side).into());
    }
    let config = GathererConfig::new(args.prefix.clone())
        .with_episode_interval(args.interval)
        .with_rating_denominator(args.denominator);
    config.validate()?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let registry = GathererRegistry::new();
        let mut drivers = Vec::with_capacity(args.workers);
        for worker in 0..args.workers {
            // Every driver attaches by name; the first one spawns the gatherer.
            let handle =
                registry.get_or_spawn(GATHERER_NAME, config.clone(), DEFAULT_QUEUE_CAPACITY)?;
            let mut logger = EpisodeLogger::new(handle, args.side.clone());
            let mut rng = StdRng::seed_from_u64(mix_seed(args.seed, worker as u64, 0x5EED_15));
            let episodes = args.episodes;
            drivers.push(tokio::spawn(async move {
                let mut outcome = initial_outcome();
                for _ in 0..episodes {
                    logger.on_episode_begin(&outcome).await?;
                    let pause = rng.gen_range(1..=20);
                    tokio::time::sleep(Duration::from_millis(pause)).await;
                    outcome = play_episode(&mut rng);
                    logger.on_episode_end(&outcome).await?;
                }
                info!("driver {worker} finished {} episodes", logger.episode_counter());
                Ok::<_, sortie_stats::GathererError>(())
            }));
        }
        for driver in drivers {
            driver.await??;
        }
        let handle = registry
            .remove(GATHERER_NAME)
            .ok_or("gatherer disappeared from the registry")?;
        let summary = handle.shutdown().await?;
        println!(
            "\n{} episodes ({} steps), {} {} wins, recent win rate {:.2}%",
            summary.episode_counter,
            summary.total_steps,
            summary.win_count,
            args.side,
            summary.recent_win_rate
        );
        if let Some(path) = &summary.output_path {
            println!("Log written to {}", path.display());
        }
        Ok::<_, Box<dyn Error>>(())
    })
}

fn initial_outcome() -> EpisodeOutcome {
    EpisodeOutcome {
        winner: None,
        time: 0.0,
        tick_count: 0,
        agent_interval: AGENT_INTERVAL,
        scores: TEAMS.iter().map(|team| (*team, 0.0)).collect(),
        total_rewards: agents().map(|agent| (agent, 0.0)).collect(),
        num_alives: TEAMS.iter().map(|team| (*team, FIGHTERS_PER_TEAM)).collect(),
        end_reason: String::from("NOTYET"),
    }
}

fn agents() -> impl Iterator<Item = String> {
    TEAMS.iter().flat_map(|team| (1..=FIGHTERS_PER_TEAM).map(move |idx| format!("{team}{idx}")))
}

/// A stand-in for the combat simulator: random score swings decide the winner.
fn play_episode(rng: &mut StdRng) -> EpisodeOutcome {
    let tick_count = rng.gen_range(200..=24_000u64);
    let mut scores = Keyed::new();
    let mut num_alives = Keyed::new();
    for team in TEAMS {
        scores.insert(team, rng.gen_range(-300.0..300.0_f64).round());
        num_alives.insert(team, rng.gen_range(0..=FIGHTERS_PER_TEAM));
    }
    let total_rewards: Keyed<f64> = agents()
        .map(|agent| (agent, rng.gen_range(-1.0..1.0)))
        .collect();
    let blue = scores.get("Blue").copied().unwrap_or(0.0);
    let red = scores.get("Red").copied().unwrap_or(0.0);
    let winner = if blue > red {
        Some(String::from("Blue"))
    } else if red > blue {
        Some(String::from("Red"))
    } else {
        None
    };
    EpisodeOutcome {
        winner,
        time: tick_count as f64 / TICKS_PER_SECOND,
        tick_count,
        agent_interval: AGENT_INTERVAL,
        scores,
        total_rewards,
        num_alives,
        end_reason: END_REASONS[rng.gen_range(0..END_REASONS.len())].to_string(),
    }
}

fn mix_seed(base: u64, a: u64, b: u64) -> u64 {
    let mut z =
        base ^ (a.wrapping_mul(0x9E37_79B97F4A7C15)) ^ (b.wrapping_mul(0xBF58_476D1CE4E5B9));
    z ^= z >> 12;
    z ^= z << 25;
    z ^= z >> 27;
    z
}
