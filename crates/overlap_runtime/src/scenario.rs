//! Deterministic test population driven by the harness.

use crate::settings::{PopulationSettings, Spawn};
use overlap_core::glam::Vec2;
use overlap_core::math::DeterministicRng;
use overlap_core::{Entity, Population};

/// A flat crowd of entities owned by the host.
#[derive(Debug, Clone)]
pub struct Crowd {
    ids: Vec<Entity>,
    positions: Vec<Vec2>,
}

impl Crowd {
    pub fn spawn(settings: &PopulationSettings) -> Self {
        let positions = match settings.spawn {
            Spawn::Origin => vec![Vec2::ZERO; settings.count],
            Spawn::Scatter => {
                let mut rng = DeterministicRng::new(settings.seed);
                rng.scatter(settings.count, Vec2::from(settings.area))
            }
        };
        Self {
            ids: (0..settings.count as u64).map(Entity::from_raw).collect(),
            positions,
        }
    }

    pub fn positions(&self) -> &[Vec2] {
        &self.positions
    }

    pub fn centroid(&self) -> Vec2 {
        if self.positions.is_empty() {
            return Vec2::ZERO;
        }
        self.positions.iter().copied().sum::<Vec2>() / self.positions.len() as f32
    }

    /// Mean and variance of the distance from the centroid.
    pub fn spread(&self) -> (f32, f32) {
        if self.positions.is_empty() {
            return (0.0, 0.0);
        }
        let centroid = self.centroid();
        let n = self.positions.len() as f32;
        let mean = self.positions.iter().map(|p| p.distance(centroid)).sum::<f32>() / n;
        let variance = self
            .positions
            .iter()
            .map(|p| {
                let d = p.distance(centroid) - mean;
                d * d
            })
            .sum::<f32>()
            / n;
        (mean, variance)
    }

    /// Largest distance between matching entities of two crowds.
    pub fn max_deviation(&self, other: &Crowd) -> f32 {
        self.positions
            .iter()
            .zip(&other.positions)
            .map(|(a, b)| a.distance(*b))
            .fold(0.0, f32::max)
    }
}

impl Population for Crowd {
    fn len(&self) -> usize {
        self.positions.len()
    }

    fn entity(&self, index: usize) -> Entity {
        self.ids[index]
    }

    fn position(&self, index: usize) -> Vec2 {
        self.positions[index]
    }

    fn set_position(&mut self, index: usize, position: Vec2) {
        self.positions[index] = position;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlap_core::{StepConfig, StepDriver};

    fn settings(spawn: Spawn, count: usize) -> PopulationSettings {
        PopulationSettings {
            count,
            spawn,
            ..PopulationSettings::default()
        }
    }

    #[test]
    fn scatter_is_reproducible() {
        let a = Crowd::spawn(&settings(Spawn::Scatter, 200));
        let b = Crowd::spawn(&settings(Spawn::Scatter, 200));
        assert_eq!(a.positions(), b.positions());
        assert_eq!(a.max_deviation(&b), 0.0);
        assert_eq!(a.entity(199), Entity::from_raw(199));
    }

    #[test]
    fn origin_pile_spreads_along_y_only() {
        let mut crowd = Crowd::spawn(&settings(Spawn::Origin, 64));
        assert_eq!(crowd.spread(), (0.0, 0.0));

        let mut driver = StepDriver::new(StepConfig::default()).unwrap();
        driver.tick(&mut crowd, 0.1).unwrap();

        // Coincident pairs split along y by index, so the pile becomes a
        // vertical line ordered bottom to top.
        let ys: Vec<f32> = crowd.positions().iter().map(|p| p.y).collect();
        assert!(ys.windows(2).all(|w| w[0] < w[1]));
        assert!(ys[0] < 0.0 && ys[63] > 0.0);

        for _ in 0..9 {
            driver.tick(&mut crowd, 0.1).unwrap();
        }
        assert!(crowd.positions().iter().all(|p| p.x == 0.0));
        let (mean, _) = crowd.spread();
        assert!(mean > 0.0);
    }

    #[test]
    fn odd_pile_keeps_middle_entity_in_place() {
        let mut crowd = Crowd::spawn(&settings(Spawn::Origin, 3));
        let mut driver = StepDriver::new(StepConfig::default()).unwrap();
        for _ in 0..5 {
            driver.tick(&mut crowd, 0.1).unwrap();
        }

        let p = crowd.positions();
        assert_eq!(p[1], Vec2::ZERO);
        assert_eq!(p[0], -p[2]);
        assert!(p[2].y > 0.0);
    }
}
