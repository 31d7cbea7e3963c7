//! Named per-tick statistics (insertions, candidates, overlaps, ...)

use std::collections::HashMap;

/// One statistic across ticks: last value, running total and peak.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterStat {
    pub last: usize,
    pub total: usize,
    pub peak: usize,
    pub samples: usize,
}

impl CounterStat {
    fn record(&mut self, value: usize) {
        self.last = value;
        self.total = self.total.saturating_add(value);
        self.peak = self.peak.max(value);
        self.samples += 1;
    }

    /// Mean value per recorded tick.
    pub fn mean(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.total as f64 / self.samples as f64
        }
    }
}

/// Statistics keyed by static names, recorded once per tick.
#[derive(Debug, Default)]
pub struct Counter {
    stats: HashMap<&'static str, CounterStat>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record this tick's value of `name`.
    pub fn record(&mut self, name: &'static str, value: usize) {
        self.stats.entry(name).or_default().record(value);
    }

    /// Value from the most recent tick, 0 if never recorded.
    pub fn get(&self, name: &str) -> usize {
        self.stats.get(name).map_or(0, |s| s.last)
    }

    pub fn total(&self, name: &str) -> usize {
        self.stats.get(name).map_or(0, |s| s.total)
    }

    pub fn peak(&self, name: &str) -> usize {
        self.stats.get(name).map_or(0, |s| s.peak)
    }

    pub fn stat(&self, name: &str) -> Option<CounterStat> {
        self.stats.get(name).copied()
    }

    pub fn reset_all(&mut self) {
        self.stats.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, CounterStat)> + '_ {
        self.stats.iter().map(|(name, stat)| (*name, *stat))
    }
}
