//! Frozen per-tick copy of entity state.
//!
//! The snapshot is the only thing the build and resolve phases read. Its
//! buffers are cleared and refilled every tick, so after warm-up no tick
//! allocates.

use super::grid::GridEntry;
use super::resolve::Body;
use crate::entity::Entity;
use glam::Vec2;

/// Host-side collection of entities the driver can read and write back to.
pub trait Population {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entity(&self, index: usize) -> Entity;

    fn position(&self, index: usize) -> Vec2;

    fn set_position(&mut self, index: usize, position: Vec2);
}

/// Identities, positions and radii at the start of a tick.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entities: Vec<Entity>,
    positions: Vec<Vec2>,
    radii: Vec<f32>,
    active: Vec<bool>,
    skipped: Vec<usize>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entities: Vec::with_capacity(capacity),
            positions: Vec::with_capacity(capacity),
            radii: Vec::with_capacity(capacity),
            active: Vec::with_capacity(capacity),
            skipped: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.positions.clear();
        self.radii.clear();
        self.active.clear();
        self.skipped.clear();
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Append one entity. Non-finite positions are recorded but inactive.
    pub fn push(&mut self, entity: Entity, position: Vec2, radius: f32) {
        let index = self.positions.len();
        let finite = position.is_finite();
        if !finite {
            self.skipped.push(index);
        }
        self.entities.push(entity);
        self.positions.push(position);
        self.radii.push(radius);
        self.active.push(finite);
    }

    /// Refill from a flat slice; identities are the slice indices.
    pub fn fill_uniform(&mut self, positions: &[Vec2], radius: f32) {
        self.clear();
        for (i, &p) in positions.iter().enumerate() {
            self.push(Entity::from_raw(i as u64), p, radius);
        }
    }

    /// Refill from parallel slices of positions and radii of equal length.
    pub fn fill_with_radii(&mut self, positions: &[Vec2], radii: &[f32]) {
        debug_assert_eq!(positions.len(), radii.len());
        self.clear();
        for (i, (&p, &r)) in positions.iter().zip(radii).enumerate() {
            self.push(Entity::from_raw(i as u64), p, r);
        }
    }

    /// Refill from a host population.
    pub fn capture<P: Population + ?Sized>(&mut self, host: &P, radius: f32) {
        self.clear();
        for i in 0..host.len() {
            self.push(host.entity(i), host.position(i), radius);
        }
    }

    #[inline]
    pub fn entity(&self, index: usize) -> Entity {
        self.entities[index]
    }

    #[inline]
    pub fn position(&self, index: usize) -> Vec2 {
        self.positions[index]
    }

    #[inline]
    pub fn radius(&self, index: usize) -> f32 {
        self.radii[index]
    }

    pub fn positions(&self) -> &[Vec2] {
        &self.positions
    }

    pub fn radii(&self) -> &[f32] {
        &self.radii
    }

    #[inline]
    pub fn is_active(&self, index: usize) -> bool {
        self.active[index]
    }

    #[inline]
    pub fn body(&self, index: usize) -> Body {
        Body::new(index, self.positions[index], self.radii[index])
    }

    /// Indices of entities left out of this tick.
    pub fn skipped(&self) -> &[usize] {
        &self.skipped
    }

    /// Grid insertions for every active entity, each covering its own radius.
    pub fn grid_entries(&self) -> impl Iterator<Item = GridEntry> + '_ {
        self.positions
            .iter()
            .zip(&self.radii)
            .enumerate()
            .filter(|(i, _)| self.active[*i])
            .map(|(i, (&p, &r))| GridEntry::new(i as u32, p, r))
    }
}
