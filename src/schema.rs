use crate::error::{GathererError, KeyedField};
use crate::format::sci;
use crate::record::{EpisodeRecord, Keyed};

/// Team and agent identifiers frozen from the first record of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnSchema {
    pub teams: Vec<String>,
    pub agents: Vec<String>,
    pub alive_teams: Vec<String>,
}

impl ColumnSchema {
    pub fn capture(record: &EpisodeRecord) -> Self {
        Self {
            teams: record.scores.key_list(),
            agents: record.total_rewards.key_list(),
            alive_teams: record.num_alives.key_list(),
        }
    }

    pub fn header(&self) -> String {
        let mut row = vec![String::from("Episode")];
        row.extend(self.teams.iter().map(|team| format!("score[{team}]")));
        row.extend(self.agents.iter().map(|agent| format!("totalReward[{agent}]")));
        row.extend(
            [
                "finishedTime[s]",
                "numSteps",
                "calcTime[s]",
                "BlueWin",
                "WinCount",
                "WinRate[%]",
            ]
            .map(String::from),
        );
        row.extend(
            self.alive_teams
                .iter()
                .map(|team| format!("numAlives[{team}]")),
        );
        row.push(String::from("endReason"));
        row.join(",")
    }

    /// Reject a record whose keyed fields differ from the captured ones,
    /// either in membership or in order.
    pub fn check(&self, record: &EpisodeRecord) -> Result<(), GathererError> {
        check_keys(KeyedField::Scores, &self.teams, &record.scores)?;
        check_keys(KeyedField::TotalRewards, &self.agents, &record.total_rewards)?;
        check_keys(KeyedField::NumAlives, &self.alive_teams, &record.num_alives)
    }

    pub fn row(&self, episode: u64, win_count: u64, win_rate: f64, record: &EpisodeRecord) -> String {
        let mut row = vec![episode.to_string()];
        row.extend(record.scores.values().map(|s| sci(*s)));
        row.extend(record.total_rewards.values().map(|t| sci(*t)));
        row.push(sci(record.finished_time));
        row.push(record.num_steps.to_string());
        row.push(sci(record.calc_time));
        row.push(String::from(if record.win_lose { "1" } else { "0" }));
        row.push(win_count.to_string());
        row.push(sci(win_rate));
        row.extend(record.num_alives.values().map(|n| sci(f64::from(*n))));
        row.push(record.end_reason.clone());
        row.join(",")
    }
}

fn check_keys<T>(field: KeyedField, expected: &[String], found: &Keyed<T>) -> Result<(), GathererError> {
    if found.keys().eq(expected.iter().map(String::as_str)) {
        return Ok(());
    }
    Err(GathererError::SchemaDrift {
        field,
        expected: expected.to_vec(),
        found: found.key_list(),
    })
}
