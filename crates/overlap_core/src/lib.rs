//! Overlap Engine Core
//!
//! Pushes overlapping circular entities apart once per simulation tick:
//! - Uniform-grid spatial hash broad phase (counting-sort rebuild)
//! - Neighbor queries with bucket deduplication
//! - Penetration resolver applying the averaged displacement
//! - Step driver with exhaustive/spatial and sequential/parallel strategies

pub mod collision;
pub mod entity;
pub mod math;

pub use collision::{
    BroadPhase, Execution, NonFinitePolicy, Population, ResolverConfig, SpatialHashConfig,
    StepConfig, StepDriver, StepError, StepPhase, StepReport,
};
pub use entity::Entity;
pub use glam;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
