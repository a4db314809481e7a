//! Projective fluids: an implicit position-based integrator for
//! incompressible SPH fluids.
//!
//! Every tick solves a matrix-free, symmetric positive-definite system with
//! conjugate gradients. Its right-hand side comes from a nonlinear,
//! per-particle projection onto a one-sided density constraint, and the
//! outer loop re-linearises a fixed number of times.

#[macro_use]
mod par;

pub mod cg;
pub mod config;
pub mod constraints;
pub mod error;
pub mod fluids;
pub mod grid;
pub mod math;
pub mod model;
pub mod particle;
pub mod solver;
pub mod state;
pub mod system;
pub mod time;

pub use cg::{CgReport, CgStatus, LinearSystem};
pub use config::SolverConfig;
pub use error::{PfError, Result};
pub use model::{FluidModel, FluidParams, SphModel};
pub use particle::NeighborRef;
pub use solver::{Solver, StepStage, StepStats};
pub use state::SolverState;
pub use time::{CflSettings, TimeManager};
