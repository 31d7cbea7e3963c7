//! Deterministic math utilities
//!
//! Re-exports glam with a reproducible random source for scenarios,
//! benchmarks and tests.

pub use glam::*;

/// Deterministic random number generator (LCG).
///
/// Not suitable for anything statistical; it exists so the same seed always
/// spawns the same population on every platform.
#[derive(Debug, Clone)]
pub struct DeterministicRng {
    seed: u64,
    state: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self { seed, state: seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn next_u32(&mut self) -> u32 {
        // LCG constants
        const A: u64 = 1664525;
        const C: u64 = 1013904223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        self.state as u32
    }

    /// Uniform in `[0, 1]`.
    pub fn next_f32(&mut self) -> f32 {
        self.next_u32() as f32 / u32::MAX as f32
    }

    /// Uniform in `[min, max]`.
    pub fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.next_f32()
    }

    /// Point inside the axis-aligned rectangle `[min, max]`.
    pub fn point_in(&mut self, min: Vec2, max: Vec2) -> Vec2 {
        let x = self.range_f32(min.x, max.x);
        let y = self.range_f32(min.y, max.y);
        Vec2::new(x, y)
    }

    /// `count` points scattered over a `size` rectangle centred on the origin.
    pub fn scatter(&mut self, count: usize, size: Vec2) -> Vec<Vec2> {
        let half = size * 0.5;
        (0..count).map(|_| self.point_in(-half, half)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = DeterministicRng::new(7);
        let mut b = DeterministicRng::new(7);
        for _ in 0..100 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
        assert_eq!(a.seed(), 7);
    }

    #[test]
    fn scatter_stays_in_bounds() {
        let mut rng = DeterministicRng::new(1234);
        let points = rng.scatter(1_000, Vec2::new(30.0, 10.0));
        assert_eq!(points.len(), 1_000);
        for p in points {
            assert!(p.x >= -15.0 && p.x <= 15.0, "x out of bounds: {p}");
            assert!(p.y >= -5.0 && p.y <= 5.0, "y out of bounds: {p}");
        }
    }
}
