//! Overlap Runtime
//!
//! Spawns a deterministic crowd, runs the collision step over it once per
//! configured mode and logs how each mode performed.
//!
//! Usage: `overlap [settings.json]`. Log level comes from `RUST_LOG`.

mod scenario;
mod settings;

use anyhow::Result;
use overlap_core::{StepDriver, StepPhase};
use overlap_metrics::TickTimer;
use scenario::Crowd;
use settings::{RunMode, Settings};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Overlap Engine v{}", overlap_core::VERSION);

    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let settings = Settings::load(path.as_deref())?;
    tracing::info!(
        entities = settings.population.count,
        radius = settings.population.radius,
        spawn = ?settings.population.spawn,
        ticks = settings.run.ticks,
        "settings loaded"
    );

    let mut finals: Vec<(RunMode, Crowd)> = Vec::with_capacity(settings.run.modes.len());
    for &mode in &settings.run.modes {
        let crowd = run_mode(&settings, mode)?;
        finals.push((mode, crowd));
    }

    if let Some(((reference_mode, reference), rest)) = finals.split_first() {
        for (mode, crowd) in rest {
            tracing::info!(
                mode = %mode.label(),
                reference = %reference_mode.label(),
                max_deviation = reference.max_deviation(crowd),
                "final positions compared"
            );
        }
    }

    Ok(())
}

fn run_mode(settings: &Settings, mode: RunMode) -> Result<Crowd> {
    let mut crowd = Crowd::spawn(&settings.population);
    let mut driver = StepDriver::new(settings.step_config(mode))?;
    let mut timer = TickTimer::new(settings.run.ticks.max(1) as usize);
    let radius = settings.population.radius;
    let label = mode.label();

    for _ in 0..settings.run.ticks {
        timer.begin();
        let report = driver.tick(&mut crowd, radius)?;
        timer.end();

        let every = settings.run.report_every;
        if every > 0 && report.tick % u64::from(every) == 0 {
            tracing::info!(
                mode = %label,
                tick = report.tick,
                candidates = report.candidates,
                overlaps = report.overlaps,
                moved = report.moved,
                "progress"
            );
        }
    }

    let (min_ms, max_ms) = timer.tick_time_range_ms();
    tracing::info!(
        mode = %label,
        avg_ms = format_args!("{:.3}", timer.tick_time_ms()),
        min_ms = format_args!("{:.3}", min_ms),
        max_ms = format_args!("{:.3}", max_ms),
        std_dev_ms = format_args!("{:.3}", timer.tick_time_std_dev_ms()),
        slowest_ms = format_args!("{:.3}", timer.slowest().as_secs_f64() * 1000.0),
        ticks_per_second = format_args!("{:.1}", timer.ticks_per_second()),
        "tick timing"
    );

    let profiler = driver.profiler();
    for phase in StepPhase::ALL {
        tracing::debug!(
            mode = %label,
            phase = phase.name(),
            avg_ms = profiler.average(phase.name()).as_secs_f64() * 1000.0,
            "phase timing"
        );
    }

    let stats = driver.grid_stats();
    let (mean, variance) = crowd.spread();
    tracing::info!(
        mode = %label,
        entities = crowd.positions().len(),
        insertions = stats.insertions,
        occupied_buckets = stats.occupied_buckets,
        max_bucket_len = stats.max_bucket_len,
        spread_mean = mean,
        spread_variance = variance,
        "final state"
    );

    Ok(crowd)
}
