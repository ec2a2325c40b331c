use thiserror::Error;

/// Keyed column group of an episode record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyedField {
    Scores,
    TotalRewards,
    NumAlives,
}

impl std::fmt::Display for KeyedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            KeyedField::Scores => "scores",
            KeyedField::TotalRewards => "totalRewards",
            KeyedField::NumAlives => "numAlives",
        };
        f.write_str(name)
    }
}

/// Errors raised while gathering or reading episode statistics.
#[derive(Debug, Error)]
pub enum GathererError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("{field} keys changed mid-run: expected {expected:?}, found {found:?}")]
    SchemaDrift {
        field: KeyedField,
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("malformed report: {0}")]
    Report(String),
    #[error("gatherer is closed")]
    Closed,
}
