//! Pairwise penetration rule and displacement averaging.

use super::config::ResolverConfig;
use super::snapshot::Snapshot;
use glam::Vec2;

/// A circle at a snapshot index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub index: usize,
    pub position: Vec2,
    pub radius: f32,
}

impl Body {
    pub fn new(index: usize, position: Vec2, radius: f32) -> Self {
        Self {
            index,
            position,
            radius,
        }
    }
}

/// Running sum of pushes on one entity and the number of overlapping
/// neighbors that produced them.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Displacement {
    sum: Vec2,
    weight: u32,
}

impl Displacement {
    pub const NONE: Self = Self {
        sum: Vec2::ZERO,
        weight: 0,
    };

    #[inline]
    pub fn push(&mut self, contribution: Vec2) {
        self.sum += contribution;
        self.weight += 1;
    }

    pub fn sum(&self) -> Vec2 {
        self.sum
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Average push, or zero when nothing overlapped.
    #[inline]
    pub fn resolve(&self) -> Vec2 {
        if self.weight == 0 {
            Vec2::ZERO
        } else {
            self.sum / self.weight as f32
        }
    }
}

/// Applies the penetration rule to candidate pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PenetrationResolver {
    config: ResolverConfig,
}

impl PenetrationResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Push `other` exerts on `this`, or `None` if they don't overlap.
    ///
    /// Touching circles (distance exactly equal to the radius sum) still
    /// count as overlapping and contribute a zero push. Coincident circles
    /// are separated along the y axis: the lower snapshot index goes down,
    /// the higher goes up.
    #[inline]
    pub fn contribution(&self, this: &Body, other: &Body) -> Option<Vec2> {
        if this.index == other.index {
            return None;
        }

        let towards = this.position - other.position;
        let dist_sq = towards.length_squared();
        let radius_sum = this.radius + other.radius;
        if dist_sq > radius_sum * radius_sum {
            return None;
        }

        let distance = dist_sq.sqrt();
        if distance < self.config.epsilon {
            let nudge = self.config.coincident_nudge;
            let dir = if this.index < other.index { -1.0 } else { 1.0 };
            return Some(Vec2::new(0.0, dir * nudge));
        }

        let penetration = (radius_sum - distance) / distance;
        Some(towards * penetration)
    }

    /// Fold one candidate into `acc`. Returns true if it overlapped.
    #[inline]
    pub fn accumulate(&self, acc: &mut Displacement, this: &Body, other: &Body) -> bool {
        match self.contribution(this, other) {
            Some(push) => {
                acc.push(push);
                true
            }
            None => false,
        }
    }

    /// Displacement of entity `index` against `candidates`, read from the
    /// frozen snapshot. Inactive entities neither move nor push.
    pub fn resolve<I>(&self, snapshot: &Snapshot, index: usize, candidates: I) -> Displacement
    where
        I: IntoIterator<Item = usize>,
    {
        let mut acc = Displacement::NONE;
        if !snapshot.is_active(index) {
            return acc;
        }

        let this = snapshot.body(index);
        for other in candidates {
            if !snapshot.is_active(other) {
                continue;
            }
            self.accumulate(&mut acc, &this, &snapshot.body(other));
        }
        acc
    }
}
