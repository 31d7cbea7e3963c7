//! Brute-force candidate source: every entity against every other.
//!
//! Quadratic, so only practical for small populations, but it needs no grid
//! and serves as the reference the spatial hash is checked against.

use super::resolve::{Displacement, PenetrationResolver};
use super::snapshot::Snapshot;
use glam::Vec2;

/// Displacement of entity `index` against the whole snapshot.
#[inline]
pub fn resolve_entity(
    resolver: &PenetrationResolver,
    snapshot: &Snapshot,
    index: usize,
) -> Displacement {
    resolver.resolve(snapshot, index, 0..snapshot.len())
}

/// Resolved positions for the whole snapshot, sequentially.
pub fn resolve_all(resolver: &PenetrationResolver, snapshot: &Snapshot) -> Vec<Vec2> {
    (0..snapshot.len())
        .map(|i| snapshot.position(i) + resolve_entity(resolver, snapshot, i).resolve())
        .collect()
}
