#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::fluids::SmoothingKernel;
use crate::grid::SpatialHashGrid;
use crate::particle::{BoundarySet, NeighborRef, ParticleSet};

/// Table size for the per-boundary-set grids.
const BOUNDARY_TABLE_SIZE: usize = 65536;

/// Compute the SPH density of every fluid particle.
///
/// `ρ_i = m_i W(0) + Σ_fluid m_j W(x_i − x_j) + Σ_boundary ψ_j W(x_i − x_j)`,
/// using the neighbour lists from the last neighbourhood search.
pub fn compute_densities<K: SmoothingKernel>(
    particles: &mut ParticleSet,
    boundaries: &[BoundarySet],
    neighbors: &[Vec<NeighborRef>],
    kernel: &K,
) {
    let ParticleSet {
        position,
        mass,
        density,
        ..
    } = particles;
    let position = &*position;
    let mass = &*mass;

    par_iter_mut!(density).enumerate().for_each(|(i, rho)| {
        let xi = position[i];
        let mut sum = mass[i] * kernel.w_zero();
        for nb in &neighbors[i] {
            if nb.is_fluid() {
                sum += mass[nb.index()] * kernel.w(xi - position[nb.index()]);
            } else {
                let set = &boundaries[nb.point_set_id as usize - 1];
                sum += set.psi[nb.index()] * kernel.w(xi - set.position[nb.index()]);
            }
        }
        *rho = sum;
    });
}

/// Compute the boundary pseudo-masses of one boundary set (Akinci 2012).
///
/// `ψ_b = ρ0 / Σ_k W(x_b − x_k)` where the sum runs over the particles of the
/// same boundary set within the support radius, `b` itself included.
pub fn compute_boundary_psi<K: SmoothingKernel>(boundary: &mut BoundarySet, kernel: &K, density0: f64) {
    let radius = kernel.radius();
    let mut grid = SpatialHashGrid::new(radius, BOUNDARY_TABLE_SIZE, boundary.len());
    grid.build(&boundary.position);

    let BoundarySet { position, psi } = boundary;
    let position = &*position;
    let grid = &grid;

    par_iter_mut!(psi).enumerate().for_each(|(b, psi_b)| {
        let xb = position[b];
        let mut delta = 0.0;
        grid.query_radius(position, xb, radius, |k| {
            delta += kernel.w(xb - position[k]);
        });
        *psi_b = if delta > 0.0 { density0 / delta } else { 0.0 };
    });
}
