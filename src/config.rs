use serde::{Deserialize, Serialize};

use crate::error::GathererError;

pub const DEFAULT_EPISODE_INTERVAL: u64 = 1;
pub const DEFAULT_RATING_DENOMINATOR: usize = 100;

/// Construction-time options of a gatherer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct GathererConfig {
    /// Path and filename prefix of the CSV log.
    pub prefix: String,
    /// A data row is written on every `episode_interval`-th completed episode.
    pub episode_interval: u64,
    /// Window size of the rolling win rate.
    pub rating_denominator: usize,
}

impl Default for GathererConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            episode_interval: DEFAULT_EPISODE_INTERVAL,
            rating_denominator: DEFAULT_RATING_DENOMINATOR,
        }
    }
}

impl GathererConfig {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    pub fn with_episode_interval(mut self, episode_interval: u64) -> Self {
        self.episode_interval = episode_interval;
        self
    }

    pub fn with_rating_denominator(mut self, rating_denominator: usize) -> Self {
        self.rating_denominator = rating_denominator;
        self
    }

    /// Parse a JSON object; absent keys fall back to the defaults.
    pub fn from_json_str(json: &str) -> Result<Self, GathererError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GathererError> {
        if self.episode_interval == 0 {
            return Err(GathererError::InvalidConfiguration(
                "episodeInterval must be positive",
            ));
        }
        if self.rating_denominator == 0 {
            return Err(GathererError::InvalidConfiguration(
                "ratingDenominator must be positive",
            ));
        }
        Ok(())
    }
}
