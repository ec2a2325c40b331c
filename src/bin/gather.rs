use std::error::Error;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::{info, warn};

use sortie_stats::{
    DEFAULT_QUEUE_CAPACITY, EpisodeRecord, EpisodeStatsGatherer, GathererConfig, GathererHandle,
};

#[derive(Parser, Debug)]
#[command(
    name = "gather",
    about = "Feed JSON-lines episode records through a gatherer and write its CSV log."
)]
struct Args {
    /// JSON file with prefix / episodeInterval / ratingDenominator
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Output path prefix (overrides the config file)
    #[arg(short = 'p', long = "prefix")]
    prefix: Option<String>,

    /// Write a CSV row every N episodes (overrides the config file)
    #[arg(long = "interval")]
    interval: Option<u64>,

    /// Rolling win-rate window (overrides the config file)
    #[arg(long = "denominator")]
    denominator: Option<usize>,

    /// Bounded queue size between reader and gatherer task
    #[arg(long = "queue", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue: usize,

    /// Suppress the per-episode progress line
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    /// Input file of records, one JSON object per line; `end` events by
    /// default, `{"begin": {...}}` wraps a begin event. Reads stdin when omitted.
    input: Option<PathBuf>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
enum Tagged {
    Begin(EpisodeRecord),
    End(EpisodeRecord),
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
    let mut config = match &args.config {
        Some(path) => GathererConfig::from_json_str(&fs::read_to_string(path)?)?,
        None => GathererConfig::default(),
    };
    if let Some(prefix) = args.prefix.clone() {
        config.prefix = prefix;
    }
    if let Some(interval) = args.interval {
        config.episode_interval = interval;
    }
    if let Some(denominator) = args.denominator {
        config.rating_denominator = denominator;
    }

    let mut gatherer = EpisodeStatsGatherer::new(config)?;
    if args.quiet {
        gatherer = gatherer.quiet();
    }

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let runtime = tokio::runtime::Runtime::new()?;
    let (fed, summary) = runtime.block_on(async move {
        let handle = GathererHandle::spawn_with(gatherer, args.queue)?;
        let fed = feed(&handle, reader).await;
        // Shut down on every path so the log is closed and counters survive.
        let summary = handle.shutdown().await;
        Ok::<_, Box<dyn Error>>((fed, summary))
    })?;
    let summary = summary?;

    info!("gathered {} episodes", summary.episode_counter);
    match &summary.output_path {
        Some(path) => println!(
            "\n{} episodes, {} wins, recent win rate {:.2}% -> {}",
            summary.episode_counter,
            summary.win_count,
            summary.recent_win_rate,
            path.display()
        ),
        None => println!("\nNo episodes completed; no log written."),
    }
    if summary.rejected_records > 0 {
        warn!(
            "{} records rejected; last: {}",
            summary.rejected_records,
            summary.last_rejection.as_deref().unwrap_or("unknown")
        );
        println!("{} records rejected", summary.rejected_records);
    }
    fed
}

async fn feed(handle: &GathererHandle, reader: Box<dyn BufRead>) -> Result<(), Box<dyn Error>> {
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let parsed = match serde_json::from_str::<Tagged>(&line) {
            Ok(tagged) => tagged,
            Err(_) => Tagged::End(
                EpisodeRecord::from_json_str(&line)
                    .map_err(|err| format!("line {}: {err}", idx + 1))?,
            ),
        };
        match parsed {
            Tagged::Begin(record) => handle.on_episode_begin(record).await?,
            Tagged::End(record) => handle.on_episode_end(record).await?,
        }
    }
    Ok(())
}
