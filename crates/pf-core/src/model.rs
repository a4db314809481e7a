use glam::DVec3;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{PfError, Result};
use crate::fluids::density::{compute_boundary_psi, compute_densities};
use crate::fluids::viscosity::apply_xsph_viscosity;
use crate::fluids::{CubicSplineKernel, SmoothingKernel};
use crate::grid::SpatialHashGrid;
use crate::particle::{BoundarySet, NeighborRef, ParticleSet};

/// Hash table size of the fluid neighbourhood grid (2^17).
const GRID_TABLE_SIZE: usize = 131072;

/// Particle store consumed by the projective fluids solver.
///
/// The solver only reads and writes particles through this interface. Fluid
/// particles are addressed by index; boundary particles by `(point_set_id,
/// index)` with `point_set_id >= 1`. Implementations must be `Sync` because
/// per-particle work runs on the rayon pool.
pub trait FluidModel: Sync {
    fn num_particles(&self) -> usize;

    fn position(&self, i: usize) -> DVec3;
    fn set_position(&mut self, i: usize, x: DVec3);
    fn velocity(&self, i: usize) -> DVec3;
    fn set_velocity(&mut self, i: usize, v: DVec3);
    fn acceleration(&self, i: usize) -> DVec3;
    fn mass(&self, i: usize) -> f64;

    /// Rest density ρ0.
    fn density0(&self) -> f64;
    fn stiffness(&self) -> f64;
    fn support_radius(&self) -> f64;
    fn particle_radius(&self) -> f64;

    fn num_neighbors(&self, i: usize) -> usize;
    fn neighbor(&self, i: usize, k: usize) -> NeighborRef;

    fn boundary_position(&self, point_set_id: u32, i: usize) -> DVec3;
    /// Boundary pseudo-mass ψ.
    fn boundary_psi(&self, point_set_id: u32, i: usize) -> f64;

    fn kernel(&self, r: DVec3) -> f64;
    fn kernel_gradient(&self, r: DVec3) -> DVec3;
    fn kernel_zero(&self) -> f64;

    /// Reset accelerations to the external body force (gravity).
    fn clear_accelerations(&mut self);

    /// Rebuild the neighbour lists from the current positions.
    fn update_neighborhoods(&mut self);

    /// Reorder particles for memory locality.
    ///
    /// Returns the permutation applied (`perm[new] = old`) so per-particle
    /// data held elsewhere can follow, or `None` if nothing moved.
    fn sort_particles(&mut self) -> Option<Vec<usize>> {
        None
    }

    /// Refresh accelerations from the non-pressure forces (densities,
    /// surface tension, viscosity). Called once per tick after the positions
    /// and velocities of the tick are final.
    fn compute_non_pressure_forces(&mut self, _h: f64) {}
}

/// Physical parameters of the reference SPH fluid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FluidParams {
    pub particle_radius: f64,
    pub density0: f64,
    pub stiffness: f64,
    pub viscosity: f64,
    pub gravity: DVec3,
}

impl Default for FluidParams {
    fn default() -> Self {
        Self {
            particle_radius: 0.025,
            density0: 1000.0,
            stiffness: 50000.0,
            viscosity: 0.01,
            gravity: DVec3::new(0.0, -9.81, 0.0),
        }
    }
}

impl FluidParams {
    /// Support radius: four particle radii.
    pub fn support_radius(&self) -> f64 {
        4.0 * self.particle_radius
    }

    /// Mass of a fluid particle sampled on a cubic lattice of spacing `2r`
    /// with a packing factor of 0.8.
    pub fn particle_mass(&self) -> f64 {
        let diam = 2.0 * self.particle_radius;
        0.8 * diam * diam * diam * self.density0
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("particle_radius", self.particle_radius),
            ("density0", self.density0),
        ];
        for (name, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(PfError::InvalidParameter { name, value });
            }
        }
        let non_negative = [("stiffness", self.stiffness), ("viscosity", self.viscosity)];
        for (name, value) in non_negative {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(PfError::InvalidParameter { name, value });
            }
        }
        Ok(())
    }
}

/// Reference particle store: one fluid and any number of static boundary
/// sets, grid-based neighbourhood search and XSPH viscosity.
pub struct SphModel<K: SmoothingKernel = CubicSplineKernel> {
    pub particles: ParticleSet,
    pub boundaries: Vec<BoundarySet>,
    params: FluidParams,
    kernel: K,
    grid: SpatialHashGrid,
    boundary_grids: Vec<SpatialHashGrid>,
    neighbors: Vec<Vec<NeighborRef>>,
}

impl SphModel<CubicSplineKernel> {
    /// Fluid at rest at `fluid_positions` with lattice masses, surrounded by
    /// the given boundary sets. Uses the cubic spline kernel.
    pub fn new(
        params: FluidParams,
        fluid_positions: Vec<DVec3>,
        boundaries: Vec<Vec<DVec3>>,
    ) -> Result<Self> {
        params.validate()?;
        let kernel = CubicSplineKernel::new(params.support_radius());
        let particles = ParticleSet::from_positions(fluid_positions, params.particle_mass());
        Self::with_kernel(params, kernel, particles, boundaries)
    }
}

impl<K: SmoothingKernel> SphModel<K> {
    /// Build a model around an explicit kernel and particle set. The
    /// kernel's radius is the support radius.
    pub fn with_kernel(
        params: FluidParams,
        kernel: K,
        particles: ParticleSet,
        boundaries: Vec<Vec<DVec3>>,
    ) -> Result<Self> {
        params.validate()?;
        let radius = kernel.radius();
        if !(radius > 0.0 && radius.is_finite()) {
            return Err(PfError::InvalidParameter {
                name: "support_radius",
                value: radius,
            });
        }
        let n = particles.count;
        for (what, len) in [
            ("position", particles.position.len()),
            ("velocity", particles.velocity.len()),
            ("acceleration", particles.acceleration.len()),
            ("mass", particles.mass.len()),
            ("density", particles.density.len()),
        ] {
            if len != n {
                return Err(PfError::LengthMismatch {
                    what,
                    expected: n,
                    actual: len,
                });
            }
        }

        let mut boundary_sets: Vec<BoundarySet> = boundaries.into_iter().map(BoundarySet::new).collect();
        let mut boundary_grids = Vec::with_capacity(boundary_sets.len());
        for set in boundary_sets.iter_mut() {
            compute_boundary_psi(set, &kernel, params.density0);
            let mut grid = SpatialHashGrid::new(radius, GRID_TABLE_SIZE, set.len());
            grid.build(&set.position);
            boundary_grids.push(grid);
        }
        log::debug!(
            "sph model: {} fluid particles, {} boundary sets, support radius {}",
            n,
            boundary_sets.len(),
            radius
        );

        let mut model = Self {
            particles,
            boundaries: boundary_sets,
            params,
            kernel,
            grid: SpatialHashGrid::new(radius, GRID_TABLE_SIZE, n),
            boundary_grids,
            neighbors: vec![Vec::new(); n],
        };
        model.update_neighborhoods();
        Ok(model)
    }

    pub fn params(&self) -> &FluidParams {
        &self.params
    }

    pub fn kernel_fn(&self) -> &K {
        &self.kernel
    }

    pub fn neighbors(&self, i: usize) -> &[NeighborRef] {
        &self.neighbors[i]
    }

    /// Largest fluid particle speed.
    pub fn max_speed(&self) -> f64 {
        self.particles
            .velocity
            .iter()
            .map(|v| v.length())
            .fold(0.0, f64::max)
    }
}

impl<K: SmoothingKernel> FluidModel for SphModel<K> {
    #[inline]
    fn num_particles(&self) -> usize {
        self.particles.count
    }

    #[inline]
    fn position(&self, i: usize) -> DVec3 {
        self.particles.position[i]
    }

    #[inline]
    fn set_position(&mut self, i: usize, x: DVec3) {
        self.particles.position[i] = x;
    }

    #[inline]
    fn velocity(&self, i: usize) -> DVec3 {
        self.particles.velocity[i]
    }

    #[inline]
    fn set_velocity(&mut self, i: usize, v: DVec3) {
        self.particles.velocity[i] = v;
    }

    #[inline]
    fn acceleration(&self, i: usize) -> DVec3 {
        self.particles.acceleration[i]
    }

    #[inline]
    fn mass(&self, i: usize) -> f64 {
        self.particles.mass[i]
    }

    fn density0(&self) -> f64 {
        self.params.density0
    }

    fn stiffness(&self) -> f64 {
        self.params.stiffness
    }

    fn support_radius(&self) -> f64 {
        self.kernel.radius()
    }

    fn particle_radius(&self) -> f64 {
        self.params.particle_radius
    }

    #[inline]
    fn num_neighbors(&self, i: usize) -> usize {
        self.neighbors[i].len()
    }

    #[inline]
    fn neighbor(&self, i: usize, k: usize) -> NeighborRef {
        self.neighbors[i][k]
    }

    #[inline]
    fn boundary_position(&self, point_set_id: u32, i: usize) -> DVec3 {
        self.boundaries[point_set_id as usize - 1].position[i]
    }

    #[inline]
    fn boundary_psi(&self, point_set_id: u32, i: usize) -> f64 {
        self.boundaries[point_set_id as usize - 1].psi[i]
    }

    #[inline]
    fn kernel(&self, r: DVec3) -> f64 {
        self.kernel.w(r)
    }

    #[inline]
    fn kernel_gradient(&self, r: DVec3) -> DVec3 {
        self.kernel.grad_w(r)
    }

    #[inline]
    fn kernel_zero(&self) -> f64 {
        self.kernel.w_zero()
    }

    fn clear_accelerations(&mut self) {
        let g = self.params.gravity;
        self.particles.acceleration.iter_mut().for_each(|a| *a = g);
    }

    fn update_neighborhoods(&mut self) {
        let positions = &self.particles.position;
        self.grid.build(positions);

        let radius = self.kernel.radius();
        let grid = &self.grid;
        let boundaries = &self.boundaries;
        let boundary_grids = &self.boundary_grids;

        self.neighbors = par_range!(0..self.particles.count)
            .map(|i| {
                let xi = positions[i];
                let mut list = Vec::new();
                grid.query_radius(positions, xi, radius, |j| {
                    if j != i {
                        list.push(NeighborRef::fluid(j));
                    }
                });
                for (b, (set, bgrid)) in boundaries.iter().zip(boundary_grids).enumerate() {
                    bgrid.query_radius(&set.position, xi, radius, |k| {
                        list.push(NeighborRef::boundary(b, k));
                    });
                }
                list
            })
            .collect();
    }

    fn sort_particles(&mut self) -> Option<Vec<usize>> {
        if self.particles.count == 0 {
            return None;
        }
        self.grid.build(&self.particles.position);
        let perm: Vec<usize> = self.grid.sorted_indices().iter().map(|&i| i as usize).collect();
        self.particles.permute(&perm);
        Some(perm)
    }

    fn compute_non_pressure_forces(&mut self, h: f64) {
        compute_densities(&mut self.particles, &self.boundaries, &self.neighbors, &self.kernel);
        self.particles.acceleration.iter_mut().for_each(|a| *a = DVec3::ZERO);
        apply_xsph_viscosity(
            &mut self.particles,
            &self.neighbors,
            &self.kernel,
            self.params.viscosity,
            h,
        );
    }
}
