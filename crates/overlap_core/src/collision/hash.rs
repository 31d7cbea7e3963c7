//! Cell and bucket indexing for the uniform grid.
//!
//! Positions map to integer cells by rounding `position / cell_size`
//! (ties round half away from zero). Cells map to buckets by multiplying
//! each axis with a large prime, XOR-ing the products and reducing the
//! non-negative result modulo the table size. Distinct cells may share a
//! bucket; callers re-check distances instead of trusting bucket equality.

use glam::{IVec3, Vec2};

const PRIME_X: i32 = 9_997_007;
const PRIME_Y: i32 = 9_997_997;
const PRIME_Z: i32 = 9_998_977;

/// Find the cell a position falls in.
///
/// The z axis is always 0: partitioning is 2D. Non-finite input saturates
/// and must be filtered out by the caller.
#[inline]
pub fn cell_of(position: Vec2, cell_size: f32) -> IVec3 {
    let scaled = position / cell_size;
    IVec3::new(scaled.x.round() as i32, scaled.y.round() as i32, 0)
}

/// Bucket index of a cell in a table of `table_size` slots.
#[inline]
pub fn bucket_of(cell: IVec3, table_size: usize) -> usize {
    let hash = cell.x.wrapping_mul(PRIME_X)
        ^ cell.y.wrapping_mul(PRIME_Y)
        ^ cell.z.wrapping_mul(PRIME_Z);
    (hash & i32::MAX) as usize % table_size
}

/// Bucket index of the cell containing `position`.
#[inline]
pub fn bucket_of_position(position: Vec2, cell_size: f32, table_size: usize) -> usize {
    bucket_of(cell_of(position, cell_size), table_size)
}

/// Inclusive rectangle of cells covering a circle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub min: IVec3,
    pub max: IVec3,
}

impl CellRange {
    /// Cells from `cell_of(center - radius)` to `cell_of(center + radius)`.
    #[inline]
    pub fn covering(center: Vec2, radius: f32, cell_size: f32) -> Self {
        let extent = Vec2::splat(radius);
        Self {
            min: cell_of(center - extent, cell_size),
            max: cell_of(center + extent, cell_size),
        }
    }

    /// Number of cells in the range, saturating on absurd extents.
    #[inline]
    pub fn len(&self) -> usize {
        let width = self.max.x as i64 - self.min.x as i64 + 1;
        let height = self.max.y as i64 - self.min.y as i64 + 1;
        if width <= 0 || height <= 0 {
            return 0;
        }
        usize::try_from(width.saturating_mul(height)).unwrap_or(usize::MAX)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn contains(&self, cell: IVec3) -> bool {
        cell.x >= self.min.x && cell.x <= self.max.x && cell.y >= self.min.y && cell.y <= self.max.y
    }

    /// Cells in row-major order (x outer, y inner).
    pub fn iter(&self) -> impl Iterator<Item = IVec3> {
        let Self { min, max } = *self;
        (min.x..=max.x).flat_map(move |x| (min.y..=max.y).map(move |y| IVec3::new(x, y, 0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(cell_of(Vec2::new(0.75, -0.75), 1.5), IVec3::new(1, -1, 0));
        assert_eq!(cell_of(Vec2::new(0.74, -0.74), 1.5), IVec3::new(0, 0, 0));
        assert_eq!(cell_of(Vec2::new(3.0, -4.4), 1.5), IVec3::new(2, -3, 0));
    }

    #[test]
    fn bucket_matches_reference_values() {
        let table = 16_384;
        assert_eq!(bucket_of(IVec3::ZERO, table), 0);
        assert_eq!(bucket_of(IVec3::new(1, 0, 0), table), 2767);
        assert_eq!(bucket_of(IVec3::new(-1, 0, 0), table), 13617);
        assert_eq!(bucket_of(IVec3::new(0, -1, 0), table), 12627);
        assert_eq!(bucket_of(IVec3::new(3, -7, 0), table), 14632);
        assert_eq!(bucket_of(IVec3::new(-1, -1, 0), table), 1122);
    }

    #[test]
    fn bucket_is_always_in_range() {
        for table in [1usize, 7, 64, 16_384] {
            for x in -50..50 {
                for y in -50..50 {
                    let b = bucket_of(IVec3::new(x * 977, y * 31, 0), table);
                    assert!(b < table);
                }
            }
            assert!(bucket_of(IVec3::new(i32::MIN, i32::MAX, 0), table) < table);
        }
    }

    #[test]
    fn bucket_is_stable() {
        let p = Vec2::new(-12.3, 45.6);
        assert_eq!(bucket_of_position(p, 1.5, 1024), bucket_of_position(p, 1.5, 1024));
    }

    #[test]
    fn covering_range_spans_cell_boundary() {
        let inside = CellRange::covering(Vec2::ZERO, 0.1, 1.5);
        assert_eq!(inside.len(), 1);
        assert!(inside.contains(IVec3::ZERO));

        let straddling = CellRange::covering(Vec2::new(0.75, 0.75), 0.1, 1.5);
        assert_eq!(straddling.len(), 4);
        let cells: Vec<IVec3> = straddling.iter().collect();
        assert_eq!(
            cells,
            vec![
                IVec3::new(0, 0, 0),
                IVec3::new(0, 1, 0),
                IVec3::new(1, 0, 0),
                IVec3::new(1, 1, 0),
            ]
        );
    }

    #[test]
    fn saturated_positions_cover_one_cell() {
        let range = CellRange::covering(Vec2::new(1e30, -1e30), 0.1, 1.5);
        assert_eq!(range.len(), 1);
        assert_eq!(range.iter().count(), 1);
    }
}
