use std::path::Path;

use anyhow::{ensure, Context, Result};
use glam::DVec3;
use serde::{Deserialize, Serialize};

use pf_core::{CflSettings, FluidParams, SolverConfig};

/// Scenario file of the simulator.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub solver: SolverConfig,
    pub time: TimeConfig,
    pub fluid: FluidParams,
    pub scene: SceneConfig,
    /// Log a progress line every this many ticks; 0 disables progress lines.
    pub log_every: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    pub step_size: f64,
    pub steps: u64,
    pub cfl: Option<CflSettings>,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            step_size: 0.001,
            steps: 500,
            cfl: None,
        }
    }
}

/// Dam break: a block of fluid in the corner of a closed box.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Lower corner of the fluid block.
    pub fluid_min: DVec3,
    /// Particles along each axis of the fluid block.
    pub fluid_extent: [u32; 3],
    pub container_min: DVec3,
    pub container_max: DVec3,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            fluid_min: DVec3::splat(0.05),
            fluid_extent: [10, 15, 10],
            container_min: DVec3::ZERO,
            container_max: DVec3::new(1.5, 1.0, 0.6),
        }
    }
}

impl SimConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        let config: Self =
            toml::from_str(&raw).with_context(|| format!("parsing scenario {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.solver.validate()?;
        self.fluid.validate()?;
        ensure!(
            self.time.step_size > 0.0 && self.time.step_size.is_finite(),
            "time.step_size must be positive, got {}",
            self.time.step_size
        );
        ensure!(
            self.scene.container_min.cmplt(self.scene.container_max).all(),
            "scene.container_min must lie below container_max"
        );
        Ok(())
    }
}
