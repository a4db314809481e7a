use glam::DVec3;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::cg::LinearSystem;
use crate::constraints::density::project_particle;
use crate::math::{as_blocks, as_blocks_mut, AtomicAccumulator};
use crate::model::FluidModel;

/// The coupled pressure/momentum system of one tick, evaluated matrix-free.
///
/// `A·x = h²k·L(x) + M·x` where `L` accumulates each particle's own block
/// plus one more copy of every fluid neighbour's block per adjacency, and
/// `b = h²k·L(P(x)) + M·S` where `P` is the local density projection and `S`
/// the predicted positions. `A` is symmetric positive-definite.
pub struct ProjectiveSystem<'a, M: FluidModel> {
    model: &'a M,
    predicted: &'a [DVec3],
    fluid_neighbor_count: &'a [u32],
    /// `h² · stiffness`
    system_scale: f64,
}

impl<'a, M: FluidModel> ProjectiveSystem<'a, M> {
    pub fn new(model: &'a M, predicted: &'a [DVec3], fluid_neighbor_count: &'a [u32], h: f64) -> Self {
        Self {
            model,
            predicted,
            fluid_neighbor_count,
            system_scale: h * h * model.stiffness(),
        }
    }

    /// `result[i] = h²k·acc[i] + m_i·v[i]` over all particles.
    fn combine(&self, accumulator: AtomicAccumulator, v: &[DVec3], result: &mut [f64]) {
        let acc = accumulator.into_values();
        let acc = as_blocks(&acc);
        let model = self.model;
        let scale = self.system_scale;
        par_iter_mut!(as_blocks_mut(result))
            .enumerate()
            .for_each(|(i, out)| *out = scale * acc[i] + model.mass(i) * v[i]);
    }
}

impl<M: FluidModel> LinearSystem for ProjectiveSystem<'_, M> {
    fn apply(&self, x: &[f64], out: &mut [f64]) {
        let model = self.model;
        let n = model.num_particles();
        let x = as_blocks(x);
        let accumulator = AtomicAccumulator::with_blocks(n);

        par_range!(0..n).for_each(|i| {
            accumulator.add_block(i, x[i]);
            for k in 0..model.num_neighbors(i) {
                let nb = model.neighbor(i, k);
                if nb.is_fluid() {
                    accumulator.add_block(nb.index(), x[nb.index()]);
                }
            }
        });

        self.combine(accumulator, x, out);
    }

    fn rhs(&self, x: &[f64], out: &mut [f64]) {
        let model = self.model;
        let n = model.num_particles();
        let positions = as_blocks(x);
        let fluid_neighbor_count = self.fluid_neighbor_count;
        let accumulator = AtomicAccumulator::with_blocks(n);

        par_range!(0..n).for_each(|i| {
            let projection = project_particle(model, positions, fluid_neighbor_count, i);
            accumulator.add_block(i, projection.points[0]);
            for k in 0..model.num_neighbors(i) {
                let nb = model.neighbor(i, k);
                if nb.is_fluid() {
                    accumulator.add_block(nb.index(), projection.points[k + 1]);
                }
            }
        });

        self.combine(accumulator, self.predicted, out);
    }
}
