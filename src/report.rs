//! Reading gatherer CSV logs back for summaries and charts.

use std::fs;
use std::path::Path;

use crate::error::GathererError;

/// One data row of a gatherer log.
#[derive(Clone, Debug, PartialEq)]
pub struct ReportRow {
    pub episode: u64,
    pub win_count: u64,
    pub win_rate: f64,
    pub end_reason: String,
    pub cells: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    pub columns: Vec<String>,
    pub rows: Vec<ReportRow>,
}

impl Report {
    pub fn parse(text: &str) -> Result<Self, GathererError> {
        let mut lines = text.lines().filter(|line| !line.trim().is_empty());
        let header = lines
            .next()
            .ok_or_else(|| GathererError::Report(String::from("missing header")))?;
        let columns: Vec<String> = header.split(',').map(str::to_string).collect();
        let episode_col = find(&columns, "Episode")?;
        let win_count_col = find(&columns, "WinCount")?;
        let win_rate_col = find(&columns, "WinRate[%]")?;
        let reason_col = find(&columns, "endReason")?;

        let mut rows = Vec::new();
        for (idx, line) in lines.enumerate() {
            let cells: Vec<String> = line.split(',').map(str::to_string).collect();
            if cells.len() != columns.len() {
                return Err(GathererError::Report(format!(
                    "row {} has {} cells, header has {}",
                    idx + 1,
                    cells.len(),
                    columns.len()
                )));
            }
            rows.push(ReportRow {
                episode: parse_cell(&cells[episode_col], idx)?,
                win_count: parse_cell(&cells[win_count_col], idx)?,
                win_rate: parse_cell(&cells[win_rate_col], idx)?,
                end_reason: cells[reason_col].clone(),
                cells,
            });
        }
        Ok(Self { columns, rows })
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// `(episode, value)` pairs of a numeric column.
    pub fn series(&self, name: &str) -> Result<Vec<(u64, f64)>, GathererError> {
        let col = find(&self.columns, name)?;
        self.rows
            .iter()
            .enumerate()
            .map(|(idx, row)| Ok((row.episode, parse_cell(&row.cells[col], idx)?)))
            .collect()
    }
}

pub fn read_report(path: &Path) -> Result<Report, GathererError> {
    Report::parse(&fs::read_to_string(path)?)
}

fn find(columns: &[String], name: &str) -> Result<usize, GathererError> {
    columns
        .iter()
        .position(|c| c == name)
        .ok_or_else(|| GathererError::Report(format!("missing column {name}")))
}

fn parse_cell<T: std::str::FromStr>(cell: &str, row: usize) -> Result<T, GathererError> {
    cell.trim()
        .parse()
        .map_err(|_| GathererError::Report(format!("row {}: cannot parse '{cell}'", row + 1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "Episode,score[Blue],finishedTime[s],numSteps,calcTime[s],BlueWin,WinCount,WinRate[%],endReason\n\
        2,+1.0000000000000000e+00,+1.2000000000000000e+03,240,+5.0000000000000000e-01,1,1,+5.0000000000000000e+01,TIMEUP\n\
        4,-2.0000000000000000e+00,+6.0000000000000000e+02,120,+2.5000000000000000e-01,0,2,+5.0000000000000000e+01,ELIMINATION\n";

    #[test]
    fn parses_rows_and_named_columns() {
        let report = Report::parse(LOG).expect("valid report");
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[1].episode, 4);
        assert_eq!(report.rows[1].win_count, 2);
        assert_eq!(report.rows[0].win_rate, 50.0);
        assert_eq!(report.rows[1].end_reason, "ELIMINATION");
        assert_eq!(
            report.series("score[Blue]").expect("numeric column"),
            vec![(2, 1.0), (4, -2.0)]
        );
    }

    #[test]
    fn short_rows_are_rejected() {
        let broken = format!("{LOG}6,+1.0e+00\n");
        assert!(matches!(Report::parse(&broken), Err(GathererError::Report(_))));
    }

    #[test]
    fn missing_columns_are_rejected() {
        assert!(Report::parse("Episode,endReason\n").is_err());
        assert!(Report::parse("").is_err());
    }
}
