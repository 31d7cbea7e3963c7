//! Entity identity as seen by the collision step.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity handle (opaque ID owned by the host runtime).
///
/// The collision step only carries identities through the snapshot so
/// reports can name entities; it never allocates or mutates them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Entity(u64);

impl Entity {
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub const fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
