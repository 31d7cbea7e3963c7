//! Wall-clock timing of simulation ticks against a tick budget

use super::ring_buffer::RingBuffer;
use std::time::{Duration, Instant};

/// Rolling window of tick durations plus lifetime totals.
///
/// `end` without a matching `begin` records nothing.
pub struct TickTimer {
    tick_start: Option<Instant>,
    window: RingBuffer<Duration>,
    ticks: u64,
    total: Duration,
    slowest: Duration,
}

impl TickTimer {
    pub fn new(window: usize) -> Self {
        Self {
            tick_start: None,
            window: RingBuffer::new(window),
            ticks: 0,
            total: Duration::ZERO,
            slowest: Duration::ZERO,
        }
    }

    pub fn begin(&mut self) {
        self.tick_start = Some(Instant::now());
    }

    /// Close the current tick and return its duration.
    pub fn end(&mut self) -> Duration {
        let Some(start) = self.tick_start.take() else {
            return Duration::ZERO;
        };
        let elapsed = start.elapsed();
        self.record(elapsed);
        elapsed
    }

    /// Record a tick measured elsewhere.
    pub fn record(&mut self, elapsed: Duration) {
        self.window.push(elapsed);
        self.ticks += 1;
        self.total += elapsed;
        self.slowest = self.slowest.max(elapsed);
    }

    /// Ticks recorded over the timer's lifetime.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn total_time(&self) -> Duration {
        self.total
    }

    /// Slowest tick over the timer's lifetime.
    pub fn slowest(&self) -> Duration {
        self.slowest
    }

    pub fn ticks_per_second(&self) -> f64 {
        let avg = self.window.average().as_secs_f64();
        if avg > 0.0 {
            1.0 / avg
        } else {
            0.0
        }
    }

    pub fn tick_time_ms(&self) -> f64 {
        self.window.average().as_secs_f64() * 1000.0
    }

    pub fn tick_time_range_ms(&self) -> (f64, f64) {
        let (min, max) = self.window.min_max();
        (min.as_secs_f64() * 1000.0, max.as_secs_f64() * 1000.0)
    }

    pub fn tick_time_std_dev_ms(&self) -> f64 {
        self.window.variance_ms().sqrt()
    }

    /// Ticks in the window that took longer than `budget`.
    pub fn over_budget(&self, budget: Duration) -> usize {
        self.window.iter().filter(|&&d| d > budget).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorded_ticks() {
        let mut timer = TickTimer::new(2);
        timer.record(Duration::from_millis(10));
        timer.record(Duration::from_millis(30));
        timer.record(Duration::from_millis(20));

        assert_eq!(timer.ticks(), 3);
        assert_eq!(timer.total_time(), Duration::from_millis(60));
        assert_eq!(timer.slowest(), Duration::from_millis(30));
        // Window holds the last two ticks only.
        assert!((timer.tick_time_ms() - 25.0).abs() < 1e-9);
        assert_eq!(timer.over_budget(Duration::from_millis(25)), 1);
        assert!((timer.ticks_per_second() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_end_without_begin_is_ignored() {
        let mut timer = TickTimer::new(4);
        assert_eq!(timer.end(), Duration::ZERO);
        assert_eq!(timer.ticks(), 0);

        timer.begin();
        timer.end();
        assert_eq!(timer.ticks(), 1);
    }
}
