//! Uniform-grid spatial hash rebuilt every tick by counting sort.
//!
//! The table is three flat arrays sized once at construction:
//!
//! - `counts[bucket]` - insertions per bucket
//! - `sums[bucket]` - inclusive prefix sums, decremented during scatter until
//!   each slot holds the start of its bucket's range
//! - `sorted` - entity indices grouped contiguously by bucket
//!
//! An entity is inserted into every cell its circle overlaps, so a single
//! index can appear in several buckets. Queries deduplicate.

use super::config::{Execution, SpatialHashConfig};
use super::error::GridError;
use super::hash::{bucket_of, CellRange};
use glam::{IVec3, Vec2};
use rayon::prelude::*;
use serde::Serialize;
use std::ops::Range;
use std::sync::atomic::{AtomicU32, Ordering};

/// One pending insertion: a snapshot index and the circle it covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridEntry {
    pub index: u32,
    pub position: Vec2,
    pub radius: f32,
}

impl GridEntry {
    pub fn new(index: u32, position: Vec2, radius: f32) -> Self {
        Self {
            index,
            position,
            radius,
        }
    }

    #[inline]
    fn cells(&self, cell_size: f32) -> CellRange {
        CellRange::covering(self.position, self.radius, cell_size)
    }
}

/// Occupancy summary of a built grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GridStats {
    pub entities: usize,
    pub insertions: usize,
    pub occupied_buckets: usize,
    pub max_bucket_len: usize,
}

/// Spatial hash grid.
pub struct SpatialHashGrid {
    config: SpatialHashConfig,
    counts: Vec<AtomicU32>,
    sums: Vec<u32>,
    sorted: Vec<u32>,
    /// Insertions in order; the scatter pass replays them.
    entries: Vec<GridEntry>,
    total: usize,
    index_bound: usize,
    built: bool,
}

impl SpatialHashGrid {
    /// Create a grid with all buffers sized for `config`.
    pub fn new(config: SpatialHashConfig) -> Result<Self, GridError> {
        config.validate()?;
        Ok(Self {
            config,
            counts: (0..config.table_size).map(|_| AtomicU32::new(0)).collect(),
            sums: vec![0; config.table_size],
            sorted: Vec::with_capacity(config.max_entries),
            entries: Vec::new(),
            total: 0,
            index_bound: 0,
            built: false,
        })
    }

    pub fn config(&self) -> &SpatialHashConfig {
        &self.config
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.config.cell_size
    }

    #[inline]
    pub fn table_size(&self) -> usize {
        self.config.table_size
    }

    /// Insertion capacity (entity × covered cell).
    pub fn capacity(&self) -> usize {
        self.config.max_entries
    }

    /// Number of inserted entities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of (entity, cell) insertions.
    pub fn total_entries(&self) -> usize {
        self.total
    }

    /// One past the largest inserted entity index.
    pub fn index_bound(&self) -> usize {
        self.index_bound
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Drop all entries and zero the table. Capacity is kept.
    pub fn clear(&mut self) {
        for count in &mut self.counts {
            *count.get_mut() = 0;
        }
        self.sums.fill(0);
        self.sorted.clear();
        self.entries.clear();
        self.total = 0;
        self.index_bound = 0;
        self.built = false;
    }

    /// Count one entity into every bucket its circle covers.
    pub fn insert(&mut self, index: u32, position: Vec2, radius: f32) -> Result<(), GridError> {
        self.insert_batch(
            std::iter::once(GridEntry::new(index, position, radius)),
            Execution::Sequential,
        )
        .map(|_| ())
    }

    /// Count a batch of entities, in parallel when asked.
    ///
    /// Fails without touching the counts if the batch would overflow the
    /// insertion capacity. Returns the number of entities inserted.
    pub fn insert_batch<I>(&mut self, batch: I, execution: Execution) -> Result<usize, GridError>
    where
        I: IntoIterator<Item = GridEntry>,
    {
        let start = self.entries.len();
        self.entries.extend(batch);

        let cell_size = self.config.cell_size;
        let table_size = self.config.table_size;
        let pending = &self.entries[start..];

        let fan_out = match execution {
            Execution::Sequential => pending
                .iter()
                .map(|entry| entry.cells(cell_size).len())
                .fold(0usize, usize::saturating_add),
            Execution::Parallel => pending
                .par_iter()
                .map(|entry| entry.cells(cell_size).len())
                .reduce(|| 0, usize::saturating_add),
        };

        let required = self.total.saturating_add(fan_out);
        if required > self.config.max_entries {
            self.entries.truncate(start);
            return Err(GridError::CapacityExceeded {
                required,
                capacity: self.config.max_entries,
            });
        }

        let counts = &self.counts;
        let count_entry = |entry: &GridEntry| {
            for cell in entry.cells(cell_size).iter() {
                counts[bucket_of(cell, table_size)].fetch_add(1, Ordering::Relaxed);
            }
        };
        match execution {
            Execution::Sequential => pending.iter().for_each(count_entry),
            Execution::Parallel => pending.par_iter().for_each(count_entry),
        }

        let inserted = pending.len();
        if let Some(bound) = pending.iter().map(|e| e.index as usize + 1).max() {
            self.index_bound = self.index_bound.max(bound);
        }
        self.total = required;
        self.built = false;
        Ok(inserted)
    }

    /// Turn counts into prefix sums, then scatter every insertion into its
    /// bucket's range by replaying the entries in insertion order.
    pub fn build(&mut self) {
        let mut running = 0u32;
        for (sum, count) in self.sums.iter_mut().zip(self.counts.iter_mut()) {
            running += *count.get_mut();
            *sum = running;
        }
        debug_assert_eq!(running as usize, self.total);

        // Within capacity, so this never reallocates.
        self.sorted.clear();
        self.sorted.resize(self.total, u32::MAX);

        let cell_size = self.config.cell_size;
        let table_size = self.config.table_size;
        for entry in &self.entries {
            for cell in entry.cells(cell_size).iter() {
                let bucket = bucket_of(cell, table_size);
                self.sums[bucket] -= 1;
                self.sorted[self.sums[bucket] as usize] = entry.index;
            }
        }
        self.built = true;
    }

    /// Bucket index for a cell in this table.
    #[inline]
    pub fn bucket_for(&self, cell: IVec3) -> usize {
        bucket_of(cell, self.config.table_size)
    }

    #[inline]
    fn bucket_range(&self, bucket: usize) -> Range<usize> {
        let start = self.sums[bucket] as usize;
        let end = if bucket + 1 == self.sums.len() {
            self.total
        } else {
            self.sums[bucket + 1] as usize
        };
        start..end
    }

    /// Entity indices stored in `bucket`. Empty until the grid is built.
    #[inline]
    pub fn bucket(&self, bucket: usize) -> &[u32] {
        if !self.built || bucket >= self.sums.len() {
            return &[];
        }
        &self.sorted[self.bucket_range(bucket)]
    }

    /// Entity indices sharing the bucket of `cell`, including entries from
    /// other cells that collide into the same bucket.
    #[inline]
    pub fn query_cell(&self, cell: IVec3) -> &[u32] {
        self.bucket(self.bucket_for(cell))
    }

    /// Number of insertions counted into `bucket`.
    pub fn bucket_len(&self, bucket: usize) -> usize {
        self.counts
            .get(bucket)
            .map_or(0, |count| count.load(Ordering::Relaxed) as usize)
    }

    pub fn stats(&self) -> GridStats {
        let (occupied_buckets, max_bucket_len) = self
            .counts
            .iter()
            .map(|count| count.load(Ordering::Relaxed) as usize)
            .filter(|&len| len > 0)
            .fold((0, 0), |(occupied, max), len| (occupied + 1, max.max(len)));
        GridStats {
            entities: self.entries.len(),
            insertions: self.total,
            occupied_buckets,
            max_bucket_len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::DeterministicRng;

    fn grid(table_size: usize) -> SpatialHashGrid {
        SpatialHashGrid::new(SpatialHashConfig::new(1.5, table_size)).expect("valid config")
    }

    #[test]
    fn empty_grid_has_empty_buckets() {
        let mut g = grid(64);
        g.build();
        assert!(g.is_built());
        assert!(g.is_empty());
        assert!((0..64).all(|b| g.bucket(b).is_empty()));
        assert_eq!(g.stats(), GridStats::default());
    }

    #[test]
    fn single_cell_insertion() {
        let mut g = grid(64);
        g.insert(0, Vec2::ZERO, 0.1).unwrap();
        g.build();
        assert_eq!(g.total_entries(), 1);
        assert_eq!(g.query_cell(IVec3::ZERO), &[0]);
    }

    #[test]
    fn unbuilt_grid_reads_empty() {
        let mut g = grid(64);
        g.insert(3, Vec2::ZERO, 0.1).unwrap();
        assert!(g.query_cell(IVec3::ZERO).is_empty());
    }

    #[test]
    fn boundary_entity_lands_in_every_covered_cell() {
        let mut g = grid(16_384);
        g.insert(7, Vec2::new(0.75, 0.0), 0.1).unwrap();
        g.build();
        assert_eq!(g.total_entries(), 2);
        assert!(g.query_cell(IVec3::new(0, 0, 0)).contains(&7));
        assert!(g.query_cell(IVec3::new(1, 0, 0)).contains(&7));
        assert_eq!(g.index_bound(), 8);
    }

    #[test]
    fn counting_sort_places_every_insertion_once() {
        let mut rng = DeterministicRng::new(99);
        let positions = rng.scatter(500, Vec2::new(20.0, 20.0));
        let mut g = grid(1024);
        for (i, p) in positions.iter().enumerate() {
            g.insert(i as u32, *p, 0.4).unwrap();
        }
        g.build();

        let mut seen = vec![0usize; positions.len()];
        let mut stored = 0;
        for b in 0..g.table_size() {
            assert_eq!(g.bucket(b).len(), g.bucket_len(b));
            for &idx in g.bucket(b) {
                seen[idx as usize] += 1;
                stored += 1;
            }
        }
        assert_eq!(stored, g.total_entries());
        for (i, p) in positions.iter().enumerate() {
            let fan_out = CellRange::covering(*p, 0.4, 1.5).len();
            assert_eq!(seen[i], fan_out, "entity {i} stored {} times", seen[i]);
        }
    }

    #[test]
    fn parallel_count_matches_sequential() {
        let mut rng = DeterministicRng::new(5);
        let positions = rng.scatter(2_000, Vec2::new(30.0, 30.0));
        let entries: Vec<GridEntry> = positions
            .iter()
            .enumerate()
            .map(|(i, p)| GridEntry::new(i as u32, *p, 0.1))
            .collect();

        let mut seq = grid(4096);
        seq.insert_batch(entries.iter().copied(), Execution::Sequential).unwrap();
        seq.build();

        let mut par = grid(4096);
        par.insert_batch(entries.iter().copied(), Execution::Parallel).unwrap();
        par.build();

        assert_eq!(seq.stats(), par.stats());
        for b in 0..4096 {
            assert_eq!(seq.bucket(b), par.bucket(b));
        }
    }

    #[test]
    fn capacity_overflow_fails_fast() {
        let config = SpatialHashConfig::new(1.5, 64).with_max_entries(2);
        let mut g = SpatialHashGrid::new(config).unwrap();
        g.insert(0, Vec2::ZERO, 0.1).unwrap();
        g.insert(1, Vec2::new(10.0, 0.0), 0.1).unwrap();

        let err = g.insert(2, Vec2::new(20.0, 0.0), 0.1).unwrap_err();
        assert_eq!(
            err,
            GridError::CapacityExceeded {
                required: 3,
                capacity: 2
            }
        );
        assert_eq!(g.len(), 2);
        assert_eq!(g.total_entries(), 2);
    }

    #[test]
    fn clear_resets_for_next_tick() {
        let mut g = grid(64);
        g.insert(0, Vec2::ZERO, 0.1).unwrap();
        g.build();
        g.clear();
        assert!(!g.is_built());
        assert_eq!(g.total_entries(), 0);
        g.build();
        assert!(g.query_cell(IVec3::ZERO).is_empty());
    }

    #[test]
    fn stats_report_occupancy() {
        let mut g = grid(16_384);
        g.insert(0, Vec2::ZERO, 0.1).unwrap();
        g.insert(1, Vec2::new(0.2, 0.0), 0.1).unwrap();
        g.insert(2, Vec2::new(15.0, 0.0), 0.1).unwrap();
        g.build();
        let stats = g.stats();
        assert_eq!(stats.entities, 3);
        assert_eq!(stats.insertions, 3);
        assert_eq!(stats.occupied_buckets, 2);
        assert_eq!(stats.max_bucket_len, 2);
    }
}
