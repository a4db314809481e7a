use glam::DVec3;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::fluids::SmoothingKernel;
use crate::particle::{NeighborRef, ParticleSet};

/// Add XSPH viscosity to fluid particle accelerations.
///
/// XSPH smooths velocities by blending each particle's velocity toward
/// the weighted average of its neighbours' velocities. Expressed as an
/// acceleration over one time step `h`:
///
/// `a_i += (c / h) Σ_j (m_j / ρ_j) (v_j − v_i) W(x_i − x_j)`
///
/// Only fluid neighbours contribute. Densities must be current.
pub fn apply_xsph_viscosity<K: SmoothingKernel>(
    particles: &mut ParticleSet,
    neighbors: &[Vec<NeighborRef>],
    kernel: &K,
    viscosity: f64,
    h: f64,
) {
    if viscosity == 0.0 || h <= 0.0 {
        return;
    }
    let inv_h = 1.0 / h;
    let ParticleSet {
        position,
        velocity,
        acceleration,
        mass,
        density,
        ..
    } = particles;
    let (position, velocity, mass, density) = (&*position, &*velocity, &*mass, &*density);

    par_iter_mut!(acceleration).enumerate().for_each(|(i, acc)| {
        let xi = position[i];
        let vi = velocity[i];
        let mut sum = DVec3::ZERO;
        for nb in neighbors[i].iter().filter(|nb| nb.is_fluid()) {
            let j = nb.index();
            let rho_j = density[j].max(1e-6);
            sum += (mass[j] / rho_j) * (velocity[j] - vi) * kernel.w(xi - position[j]);
        }
        *acc += inv_h * viscosity * sum;
    });
}
