use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use log::{debug, info};

use crate::config::GathererConfig;
use crate::error::GathererError;
use crate::format::{py_dict, py_repr};
use crate::record::{EpisodeRecord, Keyed};
use crate::schema::ColumnSchema;
use crate::window::RollingWindow;

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// The CSV file of one gatherer together with the columns frozen at creation.
struct CsvLog {
    path: PathBuf,
    schema: ColumnSchema,
    writer: BufWriter<File>,
}

impl CsvLog {
    fn create(prefix: &str, first: &EpisodeRecord) -> Result<Self, GathererError> {
        let path = PathBuf::from(format!(
            "{prefix}_{}.csv",
            Local::now().format(TIMESTAMP_FORMAT)
        ));
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let schema = ColumnSchema::capture(first);
        let mut log = Self {
            writer: BufWriter::new(File::create(&path)?),
            path,
            schema,
        };
        let header = log.schema.header();
        log.write_line(&header)?;
        info!("episode log opened at {}", log.path.display());
        Ok(log)
    }

    /// Every line reaches the OS before returning.
    fn write_line(&mut self, line: &str) -> Result<(), GathererError> {
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Counters observable from outside the gatherer.
#[derive(Clone, Debug, PartialEq)]
pub struct GathererSnapshot {
    pub episode_counter: u64,
    pub total_steps: u64,
    pub win_count: u64,
    pub recent_outcomes: Vec<f64>,
    pub recent_win_rate: f64,
    pub output_path: Option<PathBuf>,
    /// End records refused without touching the counters.
    pub rejected_records: u64,
    pub last_rejection: Option<String>,
}

/// Result of one completed episode; its `Display` is the console progress line.
#[derive(Clone, Debug, PartialEq)]
pub struct EpisodeProgress {
    pub episode: u64,
    pub win_count: u64,
    pub recent_win_rate: f64,
    pub row_written: bool,
    pub end_reason: String,
    pub finished_time: f64,
    pub scores: Keyed<f64>,
    pub total_rewards: Keyed<f64>,
    pub calc_time: f64,
}

impl fmt::Display for EpisodeProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Episodes=( {} / {} ), recent winning rate= {} , endReason= {} finished at t= {} , \
             with  score= {}  and totalRewards= {}  in  {}  seconds.",
            self.win_count,
            self.episode,
            py_repr(self.recent_win_rate),
            self.end_reason,
            py_repr(self.finished_time),
            py_dict(self.scores.iter()),
            py_dict(self.total_rewards.iter()),
            py_repr(self.calc_time)
        )
    }
}

/// Aggregates episode statistics into running totals, a rolling win rate and
/// an append-only CSV log.
///
/// The CSV file is created on the first completed episode, so its timestamp
/// names the first finished episode rather than the construction time.
pub struct EpisodeStatsGatherer {
    config: GathererConfig,
    episode_counter: u64,
    total_steps: u64,
    win_count: u64,
    window: RollingWindow,
    log: Option<CsvLog>,
    output_path: Option<PathBuf>,
    rejected_records: u64,
    last_rejection: Option<String>,
    closed: bool,
    echo: bool,
}

impl fmt::Debug for EpisodeStatsGatherer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EpisodeStatsGatherer")
            .field("config", &self.config)
            .field("episode_counter", &self.episode_counter)
            .field("win_count", &self.win_count)
            .field("output_path", &self.output_path())
            .finish()
    }
}

impl EpisodeStatsGatherer {
    pub fn new(config: GathererConfig) -> Result<Self, GathererError> {
        config.validate()?;
        Ok(Self {
            window: RollingWindow::new(config.rating_denominator),
            config,
            episode_counter: 0,
            total_steps: 0,
            win_count: 0,
            log: None,
            output_path: None,
            rejected_records: 0,
            last_rejection: None,
            closed: false,
            echo: true,
        })
    }

    /// Suppress the stdout progress line.
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    pub fn config(&self) -> &GathererConfig {
        &self.config
    }

    pub fn episode_counter(&self) -> u64 {
        self.episode_counter
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    pub fn win_count(&self) -> u64 {
        self.win_count
    }

    pub fn window(&self) -> &RollingWindow {
        &self.window
    }

    /// Path of the CSV log, still reported after `close`.
    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    pub fn snapshot(&self) -> GathererSnapshot {
        GathererSnapshot {
            episode_counter: self.episode_counter,
            total_steps: self.total_steps,
            win_count: self.win_count,
            recent_outcomes: self.window.outcomes().to_vec(),
            recent_win_rate: self.window.rate_percent(),
            output_path: self.output_path().map(Path::to_path_buf),
            rejected_records: self.rejected_records,
            last_rejection: self.last_rejection.clone(),
        }
    }

    /// Accepted for symmetry with `on_episode_end`; touches no state.
    pub fn on_episode_begin(&mut self, _record: &EpisodeRecord) {}

    /// Fold one completed episode into the statistics. A failure is confined
    /// to this call: it is counted in the snapshot and the gatherer keeps
    /// accepting records.
    pub fn on_episode_end(&mut self, record: &EpisodeRecord) -> Result<EpisodeProgress, GathererError> {
        let result = self.apply_episode_end(record);
        if let Err(err) = &result {
            self.rejected_records += 1;
            self.last_rejection = Some(err.to_string());
        }
        result
    }

    pub fn rejected_records(&self) -> u64 {
        self.rejected_records
    }

    fn apply_episode_end(&mut self, record: &EpisodeRecord) -> Result<EpisodeProgress, GathererError> {
        if self.closed {
            return Err(GathererError::Closed);
        }
        match self.log.as_ref().map(|log| log.schema.check(record)) {
            Some(checked) => checked?,
            None => {
                let log = CsvLog::create(&self.config.prefix, record)?;
                self.output_path = Some(log.path.clone());
                self.log = Some(log);
            }
        }

        self.episode_counter += 1;
        self.total_steps += record.num_steps;
        if record.win_lose {
            self.win_count += 1;
        }
        self.window.record(record.win_lose);
        let rate = self.window.rate_percent();

        let row_written = self.episode_counter % self.config.episode_interval == 0;
        if row_written {
            self.append_row(record, rate)?;
        }

        let progress = EpisodeProgress {
            episode: self.episode_counter,
            win_count: self.win_count,
            recent_win_rate: rate,
            row_written,
            end_reason: record.end_reason.clone(),
            finished_time: record.finished_time,
            scores: record.scores.clone(),
            total_rewards: record.total_rewards.clone(),
            calc_time: record.calc_time,
        };
        if self.echo {
            println!("{progress}");
        }
        Ok(progress)
    }

    fn append_row(&mut self, record: &EpisodeRecord, rate: f64) -> Result<(), GathererError> {
        let log = self.log.as_mut().ok_or(GathererError::Closed)?;
        let row = log.schema.row(self.episode_counter, self.win_count, rate, record);
        log.write_line(&row)?;
        debug!("episode {} row appended", self.episode_counter);
        Ok(())
    }

    /// Flush and release the CSV file. Counters stay readable.
    pub fn close(&mut self) -> Result<(), GathererError> {
        self.closed = true;
        if let Some(mut log) = self.log.take() {
            log.writer.flush()?;
            info!(
                "episode log closed at {} after {} episodes",
                log.path.display(),
                self.episode_counter
            );
        }
        Ok(())
    }
}
