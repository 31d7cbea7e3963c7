//! Neighbor queries against a built [`SpatialHashGrid`].

use super::grid::SpatialHashGrid;
use super::hash::CellRange;
use glam::{IVec3, Vec2};

/// Reusable scratch for circle queries.
///
/// Visited buckets and already-yielded entities are tracked with
/// generation stamps, so a query never allocates once the stamp arrays
/// have grown to the grid's size. Keep one per worker thread.
#[derive(Debug, Clone, Default)]
pub struct NeighborQuery {
    bucket_stamps: Vec<u32>,
    entity_stamps: Vec<u32>,
    stamp: u32,
}

impl NeighborQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scratch pre-sized for `grid`.
    pub fn for_grid(grid: &SpatialHashGrid) -> Self {
        Self {
            bucket_stamps: vec![0; grid.table_size()],
            entity_stamps: vec![0; grid.index_bound()],
            stamp: 0,
        }
    }

    fn begin(&mut self, grid: &SpatialHashGrid) {
        if self.bucket_stamps.len() < grid.table_size() {
            self.bucket_stamps.resize(grid.table_size(), 0);
        }
        if self.entity_stamps.len() < grid.index_bound() {
            self.entity_stamps.resize(grid.index_bound(), 0);
        }
        self.stamp = self.stamp.wrapping_add(1);
        if self.stamp == 0 {
            self.bucket_stamps.fill(0);
            self.entity_stamps.fill(0);
            self.stamp = 1;
        }
    }

    /// Collect candidate indices for a circle into `out`.
    ///
    /// Walks every cell covering the circle, skips buckets already visited
    /// by this query and yields each entity index at most once. The result
    /// may hold entities farther than `radius` (bucket membership is coarse);
    /// it never misses an entity inserted with a radius at least `radius`
    /// whose circle reaches `center`. Returns the number of buckets visited.
    pub fn query_sphere(
        &mut self,
        grid: &SpatialHashGrid,
        center: Vec2,
        radius: f32,
        out: &mut Vec<u32>,
    ) -> usize {
        out.clear();
        self.begin(grid);

        let stamp = self.stamp;
        let mut visited = 0;
        for cell in CellRange::covering(center, radius, grid.cell_size()).iter() {
            let bucket = grid.bucket_for(cell);
            if self.bucket_stamps[bucket] == stamp {
                continue;
            }
            self.bucket_stamps[bucket] = stamp;
            visited += 1;

            for &index in grid.bucket(bucket) {
                let seen = &mut self.entity_stamps[index as usize];
                if *seen == stamp {
                    continue;
                }
                *seen = stamp;
                out.push(index);
            }
        }
        visited
    }

    /// Candidates of [`query_sphere`](Self::query_sphere) filtered to those
    /// whose circle actually reaches the query circle.
    pub fn query_within(
        &mut self,
        grid: &SpatialHashGrid,
        center: Vec2,
        radius: f32,
        positions: &[Vec2],
        radii: &[f32],
        out: &mut Vec<u32>,
    ) {
        self.query_sphere(grid, center, radius, out);
        out.retain(|&index| {
            let i = index as usize;
            let reach = radius + radii[i];
            positions[i].distance_squared(center) <= reach * reach
        });
    }

    /// Entity indices in the bucket of a single cell.
    pub fn query_cell<'g>(&self, grid: &'g SpatialHashGrid, cell: IVec3) -> &'g [u32] {
        grid.query_cell(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::config::SpatialHashConfig;
    use crate::math::DeterministicRng;

    fn build(positions: &[Vec2], radius: f32, cell_size: f32, table_size: usize) -> SpatialHashGrid {
        let mut grid = SpatialHashGrid::new(SpatialHashConfig::new(cell_size, table_size)).unwrap();
        for (i, p) in positions.iter().enumerate() {
            grid.insert(i as u32, *p, radius).unwrap();
        }
        grid.build();
        grid
    }

    #[test]
    fn finds_close_neighbor() {
        let positions = [Vec2::ZERO, Vec2::new(0.15, 0.0), Vec2::new(9.0, 9.0)];
        let grid = build(&positions, 0.1, 1.5, 1024);
        let mut query = NeighborQuery::for_grid(&grid);
        let mut out = Vec::new();

        query.query_sphere(&grid, positions[0], 0.1, &mut out);
        assert!(out.contains(&0));
        assert!(out.contains(&1));
        assert!(!out.contains(&2));
    }

    #[test]
    fn multi_cell_entity_is_yielded_once() {
        // Entity 0 straddles four cells; a wide query covers all of them.
        let positions = [Vec2::new(0.75, 0.75)];
        let grid = build(&positions, 0.1, 1.5, 16_384);
        assert_eq!(grid.total_entries(), 4);

        let mut query = NeighborQuery::new();
        let mut out = Vec::new();
        let visited = query.query_sphere(&grid, Vec2::new(0.75, 0.75), 1.0, &mut out);
        assert_eq!(out, vec![0]);
        assert_eq!(visited, 4);
    }

    #[test]
    fn colliding_buckets_are_visited_once() {
        // With a single bucket every cell collides.
        let positions = [Vec2::ZERO, Vec2::new(3.0, 0.0), Vec2::new(-3.0, 3.0)];
        let grid = build(&positions, 0.1, 1.5, 1);
        let mut query = NeighborQuery::for_grid(&grid);
        let mut out = Vec::new();

        let visited = query.query_sphere(&grid, Vec2::ZERO, 5.0, &mut out);
        assert_eq!(visited, 1);
        let mut sorted = out.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2]);
    }

    #[test]
    fn no_false_negatives_within_radius() {
        let radius = 0.3;
        let mut rng = DeterministicRng::new(2024);
        let positions = rng.scatter(800, Vec2::new(12.0, 12.0));
        let grid = build(&positions, radius, 1.0, 4096);
        let mut query = NeighborQuery::for_grid(&grid);
        let mut out = Vec::new();

        for (i, p) in positions.iter().enumerate() {
            query.query_sphere(&grid, *p, radius, &mut out);
            for (j, q) in positions.iter().enumerate() {
                if p.distance(*q) <= radius {
                    assert!(out.contains(&(j as u32)), "entity {i} missed neighbor {j}");
                }
            }
        }
    }

    #[test]
    fn query_within_drops_far_candidates() {
        // Same bucket (single-slot table) but far apart.
        let positions = [Vec2::ZERO, Vec2::new(0.15, 0.0), Vec2::new(4.0, 0.0)];
        let radii = [0.1; 3];
        let grid = build(&positions, 0.1, 1.5, 1);
        let mut query = NeighborQuery::for_grid(&grid);
        let mut out = Vec::new();

        query.query_within(&grid, Vec2::ZERO, 0.1, &positions, &radii, &mut out);
        out.sort_unstable();
        assert_eq!(out, vec![0, 1]);
    }

    #[test]
    fn query_cell_reads_bucket() {
        let positions = [Vec2::new(3.0, 3.0)];
        let grid = build(&positions, 0.1, 1.5, 1024);
        let query = NeighborQuery::new();
        assert_eq!(query.query_cell(&grid, IVec3::new(2, 2, 0)), &[0]);
    }
}
