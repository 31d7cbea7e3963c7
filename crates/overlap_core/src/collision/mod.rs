//! Collision step: spatial hash broad phase and penetration resolution.
//!
//! Each tick the driver snapshots entity positions, rebuilds a uniform-grid
//! hash from that snapshot, gathers neighbor candidates for every entity and
//! pushes overlapping entities apart by their averaged penetration.

mod config;
mod driver;
mod error;
pub mod exhaustive;
mod grid;
pub mod hash;
mod query;
mod resolve;
mod snapshot;

pub use config::{
    BroadPhase, Execution, NonFinitePolicy, ResolverConfig, SpatialHashConfig, StepConfig,
    DEFAULT_CELL_SIZE, DEFAULT_TABLE_SIZE,
};
pub use driver::{StepDriver, StepPhase, StepReport};
pub use error::{GridError, StepError};
pub use grid::{GridEntry, GridStats, SpatialHashGrid};
pub use hash::CellRange;
pub use query::NeighborQuery;
pub use resolve::{Body, Displacement, PenetrationResolver};
pub use snapshot::{Population, Snapshot};
