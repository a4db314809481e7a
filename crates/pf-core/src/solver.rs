use glam::DVec3;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::cg::{self, CgStatus};
use crate::config::SolverConfig;
use crate::error::Result;
use crate::model::FluidModel;
use crate::state::SolverState;
use crate::system::ProjectiveSystem;
use crate::time::TimeManager;

/// Stages of one tick, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepStage {
    ClearAccelerations,
    PredictPositions,
    NeighborRefresh,
    SolveConstraints,
    ReconstructVelocity,
    ApplyExternalForces,
    AdvanceTime,
}

impl StepStage {
    pub const SEQUENCE: [StepStage; 7] = [
        StepStage::ClearAccelerations,
        StepStage::PredictPositions,
        StepStage::NeighborRefresh,
        StepStage::SolveConstraints,
        StepStage::ReconstructVelocity,
        StepStage::ApplyExternalForces,
        StepStage::AdvanceTime,
    ];
}

/// What the last tick did.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepStats {
    /// Outer (Picard) iterations run.
    pub outer_iterations: u32,
    /// Conjugate-gradient iterations summed over all outer iterations.
    pub cg_iterations: usize,
    /// Status of the last conjugate-gradient solve.
    pub last_status: Option<CgStatus>,
    /// Whether the particle store was resorted this tick.
    pub resorted: bool,
}

/// Projective fluids time integrator.
///
/// Each tick predicts positions with the current velocity and acceleration,
/// then alternates a nonlinear local density projection with a global
/// conjugate-gradient solve for a fixed number of outer iterations, and
/// finally derives velocities from the position change before adding the
/// non-pressure accelerations explicitly.
pub struct Solver<M: FluidModel> {
    pub model: M,
    pub time: TimeManager,
    config: SolverConfig,
    state: SolverState,
    stats: StepStats,
}

impl<M: FluidModel> Solver<M> {
    pub fn new(model: M, time: TimeManager, config: SolverConfig) -> Result<Self> {
        config.validate()?;
        let state = SolverState::init(&model);
        log::info!(
            "projective fluids solver: {} particles, max {} outer iterations",
            model.num_particles(),
            config.max_iterations
        );
        Ok(Self {
            model,
            time,
            config,
            state,
            stats: StepStats::default(),
        })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn state(&self) -> &SolverState {
        &self.state
    }

    pub fn last_stats(&self) -> StepStats {
        self.stats
    }

    /// Advance the simulation by one tick of the current step size.
    pub fn step(&mut self) {
        let h = self.time.step_size();
        self.state.resize(self.model.num_particles());
        self.stats = StepStats::default();

        for stage in StepStage::SEQUENCE {
            log::trace!("stage {:?}", stage);
            match stage {
                StepStage::ClearAccelerations => self.model.clear_accelerations(),
                StepStage::PredictPositions => self.predict_positions(h),
                StepStage::NeighborRefresh => self.refresh_neighborhoods(),
                StepStage::SolveConstraints => self.solve_constraints(h),
                StepStage::ReconstructVelocity => self.update_positions_and_velocities(h),
                StepStage::ApplyExternalForces => {
                    self.model.compute_non_pressure_forces(h);
                    self.add_acceleration_to_velocity(h);
                }
                StepStage::AdvanceTime => {
                    let max_speed = self.max_speed(self.time.step_size());
                    self.time.update_step_size(max_speed, self.model.particle_radius());
                    self.time.set_time(self.time.time() + h);
                }
            }
        }

        log::debug!(
            "t = {:.5}: {} outer iterations, {} cg iterations, last status {:?}",
            self.time.time(),
            self.stats.outer_iterations,
            self.stats.cg_iterations,
            self.stats.last_status
        );
    }

    /// Clear the solver state and counters. The particle store and the
    /// clock belong to the caller and are left untouched.
    pub fn reset(&mut self) {
        self.state.resize(self.model.num_particles());
        self.state.reset();
        self.stats = StepStats::default();
        log::info!("projective fluids solver reset");
    }

    /// `x* = x + h·v + h²·a`; the old position is kept for the velocity
    /// update and `x*` becomes the momentum target.
    fn predict_positions(&mut self, h: f64) {
        let model = &self.model;
        let n = model.num_particles();
        let predicted: Vec<(DVec3, DVec3)> = par_range!(0..n)
            .map(|i| {
                let x = model.position(i);
                (x, x + h * model.velocity(i) + (h * h) * model.acceleration(i))
            })
            .collect();

        for (i, (old, new)) in predicted.into_iter().enumerate() {
            self.state.set_old_position(i, old);
            self.model.set_position(i, new);
            self.state.set_predicted(i, new);
        }
    }

    fn refresh_neighborhoods(&mut self) {
        if self.state.resort_due() {
            if let Some(perm) = self.model.sort_particles() {
                log::debug!("resorted {} particles", perm.len());
                self.state.apply_permutation(&perm);
                self.stats.resorted = true;
            }
        }
        self.model.update_neighborhoods();
    }

    /// Outer projective loop: a fixed budget of conjugate-gradient solves,
    /// each against a right-hand side projected from the current unknowns.
    /// Stops early only when a solve starts out already solved.
    fn solve_constraints(&mut self, h: f64) {
        self.state.prepare_solve(&self.model);

        let n = self.model.num_particles();
        let (predicted, fluid_neighbor_count, unknowns) = self.state.split_for_solve();
        let system = ProjectiveSystem::new(&self.model, predicted, fluid_neighbor_count, h);

        for _ in 0..self.config.max_iterations {
            let report = cg::solve(&system, unknowns.as_mut_slice(), 3 * n);
            log::trace!(
                "cg {:?} after {} iterations, |r|² = {:e}",
                report.status,
                report.iterations,
                report.residual_sq
            );
            self.stats.outer_iterations += 1;
            self.stats.cg_iterations += report.iterations;
            self.stats.last_status = Some(report.status);
            if report.status == CgStatus::AlreadySolved {
                break;
            }
        }
    }

    /// Write the solved unknowns back as positions; `v = (x − x_old) / h`.
    fn update_positions_and_velocities(&mut self, h: f64) {
        let state = &self.state;
        let n = self.model.num_particles();
        let updated: Vec<(DVec3, DVec3)> = par_range!(0..n)
            .map(|i| {
                let x = state.unknowns().block(i);
                (x, (x - state.old_position(i)) / h)
            })
            .collect();

        for (i, (x, v)) in updated.into_iter().enumerate() {
            self.model.set_position(i, x);
            self.model.set_velocity(i, v);
        }
    }

    fn add_acceleration_to_velocity(&mut self, h: f64) {
        let model = &self.model;
        let n = model.num_particles();
        let velocities: Vec<DVec3> = par_range!(0..n)
            .map(|i| model.velocity(i) + h * model.acceleration(i))
            .collect();

        for (i, v) in velocities.into_iter().enumerate() {
            self.model.set_velocity(i, v);
        }
    }

    /// Largest `|v + h·a|` over all particles, for CFL.
    fn max_speed(&self, h: f64) -> f64 {
        let model = &self.model;
        let n = model.num_particles();
        par_range!(0..n)
            .map(|i| (model.velocity(i) + h * model.acceleration(i)).length())
            .max_by(|a, b| a.total_cmp(b))
            .unwrap_or(0.0)
    }
}
