//! Step configuration values, fixed when the driver is constructed.

use super::error::GridError;
use serde::{Deserialize, Serialize};

/// Default grid cell edge length in world units.
pub const DEFAULT_CELL_SIZE: f32 = 1.5;

/// Default bucket count: the next power of two at or above 10 000.
pub const DEFAULT_TABLE_SIZE: usize = 10_000usize.next_power_of_two();

/// Candidate source for the resolve phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadPhase {
    /// Uniform-grid spatial hash, O(N) on average.
    SpatialHash,
    /// Every entity against every other entity, O(N²).
    Exhaustive,
}

/// How the build and resolve phases are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Execution {
    Sequential,
    /// Data-parallel over the rayon pool.
    Parallel,
}

/// What to do with an entity whose position is NaN or infinite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonFinitePolicy {
    /// Leave the entity where it is and list it in the step report.
    Skip,
    /// Fail the whole tick.
    Abort,
}

/// Configuration for the spatial hash grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialHashConfig {
    /// Edge length of a grid cell (in world units).
    pub cell_size: f32,
    /// Number of hash buckets.
    pub table_size: usize,
    /// Upper bound on (entity × covered cell) insertions per tick.
    pub max_entries: usize,
}

impl SpatialHashConfig {
    /// Create a config; entry capacity defaults to four insertions per bucket.
    pub fn new(cell_size: f32, table_size: usize) -> Self {
        Self {
            cell_size,
            table_size,
            max_entries: table_size.saturating_mul(4),
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn validate(&self) -> Result<(), GridError> {
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(GridError::InvalidConfig {
                reason: format!("cell_size must be finite and positive, got {}", self.cell_size),
            });
        }
        if self.table_size == 0 {
            return Err(GridError::InvalidConfig {
                reason: "table_size must be non-zero".to_string(),
            });
        }
        if self.max_entries > u32::MAX as usize {
            return Err(GridError::InvalidConfig {
                reason: format!("max_entries {} does not fit in u32", self.max_entries),
            });
        }
        Ok(())
    }
}

impl Default for SpatialHashConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE, DEFAULT_TABLE_SIZE)
    }
}

/// Constants of the pairwise penetration rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Distances below this are treated as coincident.
    pub epsilon: f32,
    /// Push applied along ±y to each entity of a coincident pair.
    pub coincident_nudge: f32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-4,
            coincident_nudge: 0.01,
        }
    }
}

/// Everything the step driver needs, passed once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepConfig {
    pub broad_phase: BroadPhase,
    pub execution: Execution,
    pub grid: SpatialHashConfig,
    pub resolver: ResolverConfig,
    pub non_finite: NonFinitePolicy,
}

impl StepConfig {
    pub fn with_broad_phase(mut self, broad_phase: BroadPhase) -> Self {
        self.broad_phase = broad_phase;
        self
    }

    pub fn with_execution(mut self, execution: Execution) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_grid(mut self, grid: SpatialHashConfig) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_non_finite(mut self, policy: NonFinitePolicy) -> Self {
        self.non_finite = policy;
        self
    }
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            broad_phase: BroadPhase::SpatialHash,
            execution: Execution::Parallel,
            grid: SpatialHashConfig::default(),
            resolver: ResolverConfig::default(),
            non_finite: NonFinitePolicy::Skip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_size_is_power_of_two() {
        assert_eq!(DEFAULT_TABLE_SIZE, 16_384);
        let config = SpatialHashConfig::default();
        assert_eq!(config.max_entries, 65_536);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_degenerate_grid() {
        assert!(matches!(
            SpatialHashConfig::new(0.0, 64).validate(),
            Err(GridError::InvalidConfig { .. })
        ));
        assert!(matches!(
            SpatialHashConfig::new(f32::NAN, 64).validate(),
            Err(GridError::InvalidConfig { .. })
        ));
        assert!(matches!(
            SpatialHashConfig::new(1.0, 0).validate(),
            Err(GridError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn deserializes_partial_json() {
        let json = r#"{ "broad_phase": "exhaustive", "grid": { "cell_size": 2.0 } }"#;
        let config: StepConfig = serde_json::from_str(json).expect("valid config");
        assert_eq!(config.broad_phase, BroadPhase::Exhaustive);
        assert_eq!(config.execution, Execution::Parallel);
        assert_eq!(config.grid.cell_size, 2.0);
        assert_eq!(config.grid.table_size, DEFAULT_TABLE_SIZE);
    }
}
