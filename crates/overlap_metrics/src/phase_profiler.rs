//! Per-phase profiler with rolling averages

use super::ring_buffer::RingBuffer;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Times named phases of a tick and keeps a rolling window per phase.
pub struct PhaseProfiler {
    window: usize,
    timings: HashMap<&'static str, RingBuffer<Duration>>,
}

impl PhaseProfiler {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            timings: HashMap::new(),
        }
    }

    pub fn time_phase<F, R>(&mut self, name: &'static str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        self.record(name, start.elapsed());
        result
    }

    pub fn record(&mut self, name: &'static str, elapsed: Duration) {
        let window = self.window;
        self.timings
            .entry(name)
            .or_insert_with(|| RingBuffer::new(window))
            .push(elapsed);
    }

    /// Duration of the most recent run of `name`.
    pub fn last(&self, name: &str) -> Duration {
        self.timings
            .get(name)
            .and_then(|samples| samples.latest().copied())
            .unwrap_or(Duration::ZERO)
    }

    /// Rolling average of `name` over the window.
    pub fn average(&self, name: &str) -> Duration {
        self.timings
            .get(name)
            .map(|samples| samples.average())
            .unwrap_or(Duration::ZERO)
    }

    pub fn reset(&mut self) {
        self.timings.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Duration)> + '_ {
        self.timings
            .iter()
            .map(|(name, samples)| (*name, samples.average()))
    }
}

impl Default for PhaseProfiler {
    fn default() -> Self {
        Self::new(60)
    }
}
