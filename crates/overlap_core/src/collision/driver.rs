//! Per-tick orchestration of the collision step.
//!
//! A tick runs four phases with a hard barrier between each:
//!
//! 1. **Snapshot** - copy identities, positions and radii into reused buffers
//! 2. **BuildHash** - clear the grid, count every insertion, prefix-sum, scatter
//! 3. **ResolveAll** - for each entity gather candidates and average the pushes
//! 4. **Commit** - hand the corrected positions back to the caller
//!
//! The resolve phase reads only the frozen snapshot and the finished grid and
//! writes only its own output slot, so it runs in any order or in parallel
//! with bit-identical results. A tick that fails commits nothing.

use super::config::{BroadPhase, Execution, NonFinitePolicy, StepConfig};
use super::error::StepError;
use super::exhaustive;
use super::grid::{GridStats, SpatialHashGrid};
use super::query::NeighborQuery;
use super::resolve::PenetrationResolver;
use super::snapshot::{Population, Snapshot};
use crate::entity::Entity;
use glam::Vec2;
use overlap_metrics::{Counter, PhaseProfiler};
use rayon::prelude::*;
use serde::Serialize;

/// Smallest chunk of entities handed to one worker.
const PAR_MIN_LEN: usize = 256;

/// Ticks of phase history kept by the profiler.
const PROFILE_WINDOW: usize = 120;

/// The four phases of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StepPhase {
    Snapshot,
    BuildHash,
    ResolveAll,
    Commit,
}

impl StepPhase {
    pub const ALL: [StepPhase; 4] = [
        StepPhase::Snapshot,
        StepPhase::BuildHash,
        StepPhase::ResolveAll,
        StepPhase::Commit,
    ];

    /// Name used for profiler keys and log fields.
    pub fn name(self) -> &'static str {
        match self {
            StepPhase::Snapshot => "snapshot",
            StepPhase::BuildHash => "build_hash",
            StepPhase::ResolveAll => "resolve_all",
            StepPhase::Commit => "commit",
        }
    }
}

/// Summary of the last successful tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub tick: u64,
    pub entities: usize,
    /// (entity, cell) insertions into the grid; zero for the exhaustive path.
    pub insertions: usize,
    /// Candidate indices examined, self included.
    pub candidates: usize,
    /// Overlapping (entity, neighbor) pairs, each unordered pair counted twice.
    pub overlaps: usize,
    pub moved: usize,
    /// Entities left in place because their position was not finite.
    pub skipped: Vec<Entity>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    candidates: usize,
    overlaps: usize,
    moved: usize,
}

impl Tally {
    fn merge(self, other: Tally) -> Tally {
        Tally {
            candidates: self.candidates + other.candidates,
            overlaps: self.overlaps + other.overlaps,
            moved: self.moved + other.moved,
        }
    }
}

/// Query scratch owned by one resolve worker, kept across ticks.
#[derive(Debug, Default)]
struct Worker {
    query: NeighborQuery,
    candidates: Vec<u32>,
}

/// Read-only view shared by every resolve task.
struct ResolvePass<'a> {
    broad_phase: BroadPhase,
    resolver: &'a PenetrationResolver,
    snapshot: &'a Snapshot,
    grid: &'a SpatialHashGrid,
}

impl ResolvePass<'_> {
    fn resolve_into(
        &self,
        index: usize,
        slot: &mut Vec2,
        worker: &mut Worker,
    ) -> Tally {
        if !self.snapshot.is_active(index) {
            return Tally::default();
        }

        let (displacement, candidates) = match self.broad_phase {
            BroadPhase::SpatialHash => {
                let body = self.snapshot.body(index);
                let found = &mut worker.candidates;
                worker
                    .query
                    .query_sphere(self.grid, body.position, body.radius, found);
                let candidates = found.iter().map(|&other| other as usize);
                let displacement = self.resolver.resolve(self.snapshot, index, candidates);
                (displacement, found.len())
            }
            BroadPhase::Exhaustive => (
                exhaustive::resolve_entity(self.resolver, self.snapshot, index),
                self.snapshot.len(),
            ),
        };

        let push = displacement.resolve();
        *slot += push;
        Tally {
            candidates,
            overlaps: displacement.weight() as usize,
            moved: usize::from(push != Vec2::ZERO),
        }
    }

    fn resolve_chunk(&self, base: usize, chunk: &mut [Vec2], worker: &mut Worker) -> Tally {
        chunk
            .iter_mut()
            .enumerate()
            .fold(Tally::default(), |tally, (i, slot)| {
                tally.merge(self.resolve_into(base + i, slot, worker))
            })
    }

    /// Resolve every entity into `output`.
    ///
    /// The parallel arm hands each rayon thread one contiguous chunk and one
    /// worker from `workers`.
    fn run(
        &self,
        execution: Execution,
        output: &mut Vec<Vec2>,
        workers: &mut Vec<Worker>,
    ) -> Tally {
        output.clear();
        output.extend_from_slice(self.snapshot.positions());

        match execution {
            Execution::Sequential => {
                if workers.is_empty() {
                    workers.push(Worker::default());
                }
                self.resolve_chunk(0, output, &mut workers[0])
            }
            Execution::Parallel => {
                let threads = rayon::current_num_threads().max(1);
                if workers.len() < threads {
                    workers.resize_with(threads, Worker::default);
                }
                // At most `threads` chunks, so every chunk gets a worker.
                let chunk_len = output.len().div_ceil(threads).max(PAR_MIN_LEN);
                output
                    .par_chunks_mut(chunk_len)
                    .zip(workers.par_iter_mut())
                    .enumerate()
                    .map(|(c, (chunk, worker))| self.resolve_chunk(c * chunk_len, chunk, worker))
                    .reduce(Tally::default, Tally::merge)
            }
        }
    }
}

fn build_grid(
    grid: &mut SpatialHashGrid,
    snapshot: &Snapshot,
    execution: Execution,
) -> Result<usize, StepError> {
    grid.clear();
    grid.insert_batch(snapshot.grid_entries(), execution)?;
    grid.build();
    Ok(grid.total_entries())
}

fn check_radius(radius: f32) -> Result<(), StepError> {
    if !radius.is_finite() || radius < 0.0 {
        return Err(StepError::invalid_argument(format!(
            "radius must be finite and non-negative, got {radius}"
        )));
    }
    Ok(())
}

fn check_population(len: usize) -> Result<(), StepError> {
    if u32::try_from(len).is_err() {
        return Err(StepError::invalid_argument(format!(
            "{len} entities exceed the u32 index range"
        )));
    }
    Ok(())
}

/// Owns every buffer the step needs and runs ticks against them.
pub struct StepDriver {
    config: StepConfig,
    resolver: PenetrationResolver,
    grid: SpatialHashGrid,
    snapshot: Snapshot,
    output: Vec<Vec2>,
    workers: Vec<Worker>,
    profiler: PhaseProfiler,
    counters: Counter,
    ticks: u64,
    report: StepReport,
}

impl StepDriver {
    /// Validate `config` and allocate the grid.
    pub fn new(config: StepConfig) -> Result<Self, StepError> {
        let grid = SpatialHashGrid::new(config.grid)?;

        let resolver = config.resolver;
        if !resolver.epsilon.is_finite() || resolver.epsilon < 0.0 {
            return Err(StepError::invalid_argument(format!(
                "epsilon must be finite and non-negative, got {}",
                resolver.epsilon
            )));
        }
        if !resolver.coincident_nudge.is_finite() {
            return Err(StepError::invalid_argument(format!(
                "coincident_nudge must be finite, got {}",
                resolver.coincident_nudge
            )));
        }

        tracing::debug!(
            broad_phase = ?config.broad_phase,
            execution = ?config.execution,
            cell_size = config.grid.cell_size,
            table_size = config.grid.table_size,
            max_entries = config.grid.max_entries,
            "step driver created"
        );

        Ok(Self {
            config,
            resolver: PenetrationResolver::new(resolver),
            workers: vec![Worker {
                query: NeighborQuery::for_grid(&grid),
                candidates: Vec::new(),
            }],
            grid,
            snapshot: Snapshot::new(),
            output: Vec::new(),
            profiler: PhaseProfiler::new(PROFILE_WINDOW),
            counters: Counter::new(),
            ticks: 0,
            report: StepReport::default(),
        })
    }

    pub fn config(&self) -> &StepConfig {
        &self.config
    }

    /// Number of successful ticks so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn last_report(&self) -> &StepReport {
        &self.report
    }

    /// Occupancy of the grid as built by the last tick.
    pub fn grid_stats(&self) -> GridStats {
        self.grid.stats()
    }

    /// Corrected positions from the last successful tick.
    pub fn output(&self) -> &[Vec2] {
        &self.output
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn profiler(&self) -> &PhaseProfiler {
        &self.profiler
    }

    pub fn counters(&self) -> &Counter {
        &self.counters
    }

    /// Resolve one tick for entities sharing `radius`. The input is left
    /// untouched; the corrected positions are returned.
    pub fn step(&mut self, positions: &[Vec2], radius: f32) -> Result<&[Vec2], StepError> {
        check_radius(radius)?;
        check_population(positions.len())?;

        let snapshot = &mut self.snapshot;
        overlap_metrics::time_scope!(self.profiler, StepPhase::Snapshot.name(), {
            snapshot.fill_uniform(positions, radius)
        });
        self.run()?;
        Ok(&self.output)
    }

    /// Resolve one tick with a radius per entity.
    pub fn step_with_radii(
        &mut self,
        positions: &[Vec2],
        radii: &[f32],
    ) -> Result<&[Vec2], StepError> {
        if positions.len() != radii.len() {
            return Err(StepError::invalid_argument(format!(
                "{} positions but {} radii",
                positions.len(),
                radii.len()
            )));
        }
        radii.iter().try_for_each(|&r| check_radius(r))?;
        check_population(positions.len())?;

        let snapshot = &mut self.snapshot;
        overlap_metrics::time_scope!(self.profiler, StepPhase::Snapshot.name(), {
            snapshot.fill_with_radii(positions, radii)
        });
        self.run()?;
        Ok(&self.output)
    }

    /// Resolve one tick and write the result over `positions`. On error the
    /// slice is not modified.
    pub fn step_in_place(
        &mut self,
        positions: &mut [Vec2],
        radius: f32,
    ) -> Result<StepReport, StepError> {
        self.step(positions, radius)?;

        let output = &self.output;
        overlap_metrics::time_scope!(self.profiler, StepPhase::Commit.name(), {
            positions.copy_from_slice(output)
        });
        Ok(self.report.clone())
    }

    /// Resolve one tick for a host population and write moved entities back
    /// through [`Population::set_position`].
    pub fn tick<P: Population + ?Sized>(
        &mut self,
        host: &mut P,
        radius: f32,
    ) -> Result<StepReport, StepError> {
        check_radius(radius)?;
        check_population(host.len())?;

        let snapshot = &mut self.snapshot;
        overlap_metrics::time_scope!(self.profiler, StepPhase::Snapshot.name(), {
            snapshot.capture(&*host, radius)
        });
        self.run()?;

        let snapshot = &self.snapshot;
        let output = &self.output;
        overlap_metrics::time_scope!(self.profiler, StepPhase::Commit.name(), {
            for (i, &corrected) in output.iter().enumerate() {
                if snapshot.is_active(i) && corrected != snapshot.position(i) {
                    host.set_position(i, corrected);
                }
            }
        });
        Ok(self.report.clone())
    }

    /// Build and resolve phases over the current snapshot.
    fn run(&mut self) -> Result<(), StepError> {
        let tick = self.ticks + 1;

        if let Some(&index) = self.snapshot.skipped().first() {
            if self.config.non_finite == NonFinitePolicy::Abort {
                let entity = self.snapshot.entity(index);
                tracing::error!(tick, %entity, index, "tick aborted: non-finite position");
                return Err(StepError::InvalidEntityState { entity, index });
            }
            for &i in self.snapshot.skipped() {
                tracing::warn!(
                    tick,
                    entity = %self.snapshot.entity(i),
                    index = i,
                    "skipping entity with non-finite position"
                );
            }
        }

        let execution = self.config.execution;
        let insertions = match self.config.broad_phase {
            BroadPhase::SpatialHash => {
                let grid = &mut self.grid;
                let snapshot = &self.snapshot;
                let built = overlap_metrics::time_scope!(
                    self.profiler,
                    StepPhase::BuildHash.name(),
                    { build_grid(grid, snapshot, execution) }
                );
                match built {
                    Ok(insertions) => insertions,
                    Err(err) => {
                        tracing::error!(tick, error = %err, "tick aborted while building the grid");
                        return Err(err);
                    }
                }
            }
            BroadPhase::Exhaustive => 0,
        };
        tracing::trace!(tick, phase = StepPhase::BuildHash.name(), insertions);

        let pass = ResolvePass {
            broad_phase: self.config.broad_phase,
            resolver: &self.resolver,
            snapshot: &self.snapshot,
            grid: &self.grid,
        };
        let output = &mut self.output;
        let workers = &mut self.workers;
        let tally = overlap_metrics::time_scope!(self.profiler, StepPhase::ResolveAll.name(), {
            pass.run(execution, output, workers)
        });
        tracing::trace!(tick, phase = StepPhase::ResolveAll.name(), candidates = tally.candidates);

        self.ticks = tick;
        let report = &mut self.report;
        report.tick = tick;
        report.entities = self.snapshot.len();
        report.insertions = insertions;
        report.candidates = tally.candidates;
        report.overlaps = tally.overlaps;
        report.moved = tally.moved;
        report.skipped.clear();
        report
            .skipped
            .extend(self.snapshot.skipped().iter().map(|&i| self.snapshot.entity(i)));

        overlap_metrics::metrics! {
            self.counters.record("entities", report.entities);
            self.counters.record("insertions", report.insertions);
            self.counters.record("candidates", report.candidates);
            self.counters.record("overlaps", report.overlaps);
            self.counters.record("moved", report.moved);
            self.counters.record("skipped", report.skipped.len());
        }

        tracing::debug!(
            tick,
            entities = report.entities,
            insertions = report.insertions,
            candidates = report.candidates,
            overlaps = report.overlaps,
            moved = report.moved,
            skipped = report.skipped.len(),
            "collision step"
        );
        Ok(())
    }
}
