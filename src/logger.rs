use std::time::Instant;

use crate::error::GathererError;
use crate::handle::GathererHandle;
use crate::record::{EpisodeRecord, Keyed, TeamId};

/// Final (or initial) state of an episode as seen by the simulation driver.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EpisodeOutcome {
    pub winner: Option<TeamId>,
    /// Simulation clock in seconds.
    pub time: f64,
    pub tick_count: u64,
    /// Ticks per agent decision step.
    pub agent_interval: u64,
    pub scores: Keyed<f64>,
    pub total_rewards: Keyed<f64>,
    pub num_alives: Keyed<u32>,
    pub end_reason: String,
}

impl EpisodeOutcome {
    pub fn num_steps(&self) -> u64 {
        self.tick_count / self.agent_interval.max(1)
    }
}

/// Driver-side companion of a shared gatherer: times each episode and turns
/// simulation outcomes into records from the point of view of one side.
#[derive(Debug)]
pub struct EpisodeLogger {
    side: TeamId,
    gatherer: GathererHandle,
    episode_counter: u64,
    win_lose: bool,
    finished_time: f64,
    started: Option<Instant>,
}

impl EpisodeLogger {
    pub fn new(gatherer: GathererHandle, side: impl Into<TeamId>) -> Self {
        Self {
            side: side.into(),
            gatherer,
            episode_counter: 0,
            win_lose: false,
            finished_time: 0.0,
            started: None,
        }
    }

    pub fn side(&self) -> &str {
        &self.side
    }

    /// Sides may swap between episodes.
    pub fn set_side(&mut self, side: impl Into<TeamId>) {
        self.side = side.into();
    }

    /// Episodes this logger has reported, independent of the shared counter.
    pub fn episode_counter(&self) -> u64 {
        self.episode_counter
    }

    /// Start the compute timer. The begin record repeats the previous
    /// episode's result with zero compute time.
    pub fn begin_record(&mut self, outcome: &EpisodeOutcome) -> EpisodeRecord {
        self.started = Some(Instant::now());
        EpisodeRecord {
            win_lose: self.win_lose,
            finished_time: self.finished_time,
            num_steps: outcome.num_steps(),
            calc_time: 0.0,
            scores: outcome.scores.clone(),
            total_rewards: outcome.total_rewards.clone(),
            num_alives: outcome.num_alives.clone(),
            end_reason: outcome.end_reason.clone(),
        }
    }

    pub fn end_record(&mut self, outcome: &EpisodeOutcome) -> EpisodeRecord {
        self.episode_counter += 1;
        self.win_lose = outcome.winner.as_deref() == Some(self.side.as_str());
        self.finished_time = outcome.time;
        let calc_time = self
            .started
            .take()
            .map(|start| start.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        EpisodeRecord {
            win_lose: self.win_lose,
            finished_time: self.finished_time,
            num_steps: outcome.num_steps(),
            calc_time,
            scores: outcome.scores.clone(),
            total_rewards: outcome.total_rewards.clone(),
            num_alives: outcome.num_alives.clone(),
            end_reason: outcome.end_reason.clone(),
        }
    }

    pub async fn on_episode_begin(&mut self, outcome: &EpisodeOutcome) -> Result<(), GathererError> {
        let record = self.begin_record(outcome);
        self.gatherer.on_episode_begin(record).await
    }

    pub async fn on_episode_end(&mut self, outcome: &EpisodeOutcome) -> Result<(), GathererError> {
        let record = self.end_record(outcome);
        self.gatherer.on_episode_end(record).await
    }
}
