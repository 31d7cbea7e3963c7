//! Settings management

use anyhow::{Context, Result};
use overlap_core::{BroadPhase, Execution, StepConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Harness settings, read from an optional JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub population: PopulationSettings,
    pub run: RunSettings,
    /// Base step config; each run mode overrides broad phase and execution.
    pub step: StepConfig,
}

/// Where entities start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spawn {
    /// Everyone on the origin; the first ticks fan the pile out.
    Origin,
    /// Uniformly over `area`, centred on the origin.
    Scatter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationSettings {
    pub count: usize,
    pub radius: f32,
    pub spawn: Spawn,
    pub area: [f32; 2],
    pub seed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMode {
    pub broad_phase: BroadPhase,
    pub execution: Execution,
}

impl RunMode {
    pub fn label(&self) -> String {
        format!("{:?}/{:?}", self.broad_phase, self.execution)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub ticks: u32,
    /// Log a progress line every N ticks; 0 disables it.
    pub report_every: u32,
    pub modes: Vec<RunMode>,
}

impl Default for PopulationSettings {
    fn default() -> Self {
        Self {
            count: 10_000,
            radius: 0.1,
            spawn: Spawn::Scatter,
            area: [30.0, 30.0],
            seed: 1,
        }
    }
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            ticks: 30,
            report_every: 10,
            modes: vec![
                RunMode {
                    broad_phase: BroadPhase::SpatialHash,
                    execution: Execution::Sequential,
                },
                RunMode {
                    broad_phase: BroadPhase::SpatialHash,
                    execution: Execution::Parallel,
                },
                RunMode {
                    broad_phase: BroadPhase::Exhaustive,
                    execution: Execution::Parallel,
                },
            ],
        }
    }
}

impl Settings {
    /// Defaults when `path` is `None`, otherwise the parsed file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.run.modes.is_empty(), "at least one run mode is required");
        let [w, h] = self.population.area;
        anyhow::ensure!(
            w.is_finite() && h.is_finite() && w >= 0.0 && h >= 0.0,
            "population area must be finite and non-negative, got {w}x{h}"
        );
        Ok(())
    }

    /// Step config for one run mode.
    pub fn step_config(&self, mode: RunMode) -> StepConfig {
        self.step
            .with_broad_phase(mode.broad_phase)
            .with_execution(mode.execution)
    }
}
