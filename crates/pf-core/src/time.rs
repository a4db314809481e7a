use serde::{Deserialize, Serialize};

use crate::error::{PfError, Result};

/// Courant-Friedrichs-Lewy step size adaptation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CflSettings {
    pub factor: f64,
    pub min_step: f64,
    pub max_step: f64,
}

impl Default for CflSettings {
    fn default() -> Self {
        Self {
            factor: 0.5,
            min_step: 1.0e-4,
            max_step: 0.005,
        }
    }
}

/// Simulation clock: current time and step size.
#[derive(Clone, Debug)]
pub struct TimeManager {
    time: f64,
    step_size: f64,
    cfl: Option<CflSettings>,
}

impl TimeManager {
    pub fn new(step_size: f64) -> Result<Self> {
        if !(step_size > 0.0 && step_size.is_finite()) {
            return Err(PfError::InvalidParameter {
                name: "step_size",
                value: step_size,
            });
        }
        Ok(Self {
            time: 0.0,
            step_size,
            cfl: None,
        })
    }

    pub fn with_cfl(mut self, cfl: CflSettings) -> Self {
        self.cfl = Some(cfl);
        self
    }

    #[inline]
    pub fn time(&self) -> f64 {
        self.time
    }

    #[inline]
    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    #[inline]
    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    pub fn set_step_size(&mut self, step_size: f64) {
        self.step_size = step_size;
    }

    pub fn cfl(&self) -> Option<&CflSettings> {
        self.cfl.as_ref()
    }

    /// Adapt the step size to the fastest particle.
    ///
    /// `h = factor · 0.4 · (2r) / max_speed`, clamped to `[min_step, max_step]`.
    /// Leaves the step size alone when CFL is disabled or nothing moves.
    pub fn update_step_size(&mut self, max_speed: f64, particle_radius: f64) {
        let Some(cfl) = self.cfl else {
            return;
        };
        if !(max_speed > 1.0e-9) {
            return;
        }
        let diameter = 2.0 * particle_radius;
        let h = cfl.factor * 0.4 * diameter / max_speed;
        self.step_size = h.clamp(cfl.min_step, cfl.max_step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_positive_step() {
        assert!(TimeManager::new(0.0).is_err());
        assert!(TimeManager::new(-1.0).is_err());
        assert!(TimeManager::new(f64::NAN).is_err());
    }

    #[test]
    fn test_cfl_clamps_step() {
        let mut tm = TimeManager::new(0.001).unwrap().with_cfl(CflSettings::default());
        tm.update_step_size(1000.0, 0.025);
        assert_eq!(tm.step_size(), 1.0e-4);
        tm.update_step_size(1.0e-3, 0.025);
        assert_eq!(tm.step_size(), 0.005);
        tm.update_step_size(5.0, 0.025);
        assert!((tm.step_size() - 0.5 * 0.4 * 0.05 / 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_without_cfl_step_is_fixed() {
        let mut tm = TimeManager::new(0.002).unwrap();
        tm.update_step_size(100.0, 0.025);
        assert_eq!(tm.step_size(), 0.002);
    }
}
