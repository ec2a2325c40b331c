use crate::format::win_rate_percent;

/// Fixed-capacity circular buffer of recent win (1.0) / lose (0.0) outcomes.
///
/// The buffer grows until it holds `capacity` entries; after that the `n`-th
/// recorded outcome (1-based) overwrites slot `(n - 1) % capacity`.
#[derive(Clone, Debug, PartialEq)]
pub struct RollingWindow {
    capacity: usize,
    recorded: u64,
    outcomes: Vec<f64>,
}

impl RollingWindow {
    /// A zero `capacity` is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            recorded: 0,
            outcomes: Vec::with_capacity(capacity.min(4096)),
        }
    }

    pub fn record(&mut self, won: bool) {
        let outcome = if won { 1.0 } else { 0.0 };
        let slot = (self.recorded % self.capacity as u64) as usize;
        if self.outcomes.len() < self.capacity {
            self.outcomes.push(outcome);
        } else {
            self.outcomes[slot] = outcome;
        }
        self.recorded += 1;
    }

    /// Outcomes recorded so far, including overwritten ones.
    pub fn recorded(&self) -> u64 {
        self.recorded
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn outcomes(&self) -> &[f64] {
        &self.outcomes
    }

    pub fn wins(&self) -> f64 {
        self.outcomes.iter().sum()
    }

    pub fn rate_percent(&self) -> f64 {
        win_rate_percent(&self.outcomes)
    }
}
