#![allow(dead_code)]

use glam::DVec3;
use pf_core::fluids::CubicSplineKernel;
use pf_core::particle::ParticleSet;
use pf_core::{FluidParams, SphModel};

/// Parameters without gravity or viscosity, so only the solver moves particles.
pub fn quiet_params() -> FluidParams {
    FluidParams {
        gravity: DVec3::ZERO,
        viscosity: 0.0,
        ..FluidParams::default()
    }
}

/// Fluid-only model with explicit masses and rest density.
pub fn model_with_masses(
    positions: Vec<DVec3>,
    mass: f64,
    density0: f64,
) -> SphModel<CubicSplineKernel> {
    let params = FluidParams {
        density0,
        ..quiet_params()
    };
    let kernel = CubicSplineKernel::new(params.support_radius());
    let particles = ParticleSet::from_positions(positions, mass);
    SphModel::with_kernel(params, kernel, particles, vec![]).unwrap()
}

/// Cubic block of `n³` particles with lower corner `origin`.
pub fn block(origin: DVec3, n: usize, spacing: f64) -> Vec<DVec3> {
    let mut out = Vec::with_capacity(n * n * n);
    for x in 0..n {
        for y in 0..n {
            for z in 0..n {
                out.push(origin + DVec3::new(x as f64, y as f64, z as f64) * spacing);
            }
        }
    }
    out
}

/// Hollow box surface sampled on a lattice of `spacing`.
pub fn box_walls(min: DVec3, max: DVec3, spacing: f64) -> Vec<DVec3> {
    let cells = ((max - min) / spacing).round();
    let (nx, ny, nz) = (cells.x as i64, cells.y as i64, cells.z as i64);
    let mut out = Vec::new();
    for x in 0..=nx {
        for y in 0..=ny {
            for z in 0..=nz {
                let on_face = x == 0 || x == nx || y == 0 || y == ny || z == 0 || z == nz;
                if on_face {
                    out.push(min + DVec3::new(x as f64, y as f64, z as f64) * spacing);
                }
            }
        }
    }
    out
}
