use glam::DVec3;

use crate::model::FluidModel;

/// Projection stops once `|C|` falls below this value.
pub const CONSTRAINT_GOAL: f64 = 1e-14;

/// Hard cap on Gauss-Newton steps per particle.
pub const MAX_PROJECTION_STEPS: u32 = 100;

/// Added to `‖∇C‖²` so the step never divides by zero.
const REGULARIZATION: f64 = 1e-6;

/// Neighbourhood of particle `i` projected onto the density constraint.
///
/// `points[0]` is the particle itself; `points[k + 1]` is its `k`-th
/// neighbour in the model's neighbour order. Boundary points are never moved.
#[derive(Clone, Debug)]
pub struct LocalProjection {
    pub points: Vec<DVec3>,
    /// Constraint value after the last evaluation (clamped, `>= 0`).
    pub constraint: f64,
    /// Gauss-Newton steps taken.
    pub steps: u32,
}

/// One-sided density constraint of a single particle's neighbourhood.
///
/// `C = max(ρ / ρ0 − 1, 0)` with
/// `ρ = m_i W(0) + Σ_fluid m_j W(p0 − pj) + Σ_boundary ψ_j W(p0 − pj)`.
/// Only compression is resisted.
pub struct DensityConstraint<'a, M: FluidModel> {
    model: &'a M,
    particle: usize,
    inv_density0: f64,
    /// Mass (fluid) or pseudo-mass (boundary) of every neighbour.
    weights: Vec<f64>,
    fluid: Vec<bool>,
}

impl<'a, M: FluidModel> DensityConstraint<'a, M> {
    pub fn new(model: &'a M, particle: usize) -> Self {
        let n = model.num_neighbors(particle);
        let mut weights = Vec::with_capacity(n);
        let mut fluid = Vec::with_capacity(n);
        for k in 0..n {
            let nb = model.neighbor(particle, k);
            if nb.is_fluid() {
                weights.push(model.mass(nb.index()));
                fluid.push(true);
            } else {
                weights.push(model.boundary_psi(nb.point_set_id, nb.index()));
                fluid.push(false);
            }
        }
        Self {
            model,
            particle,
            inv_density0: 1.0 / model.density0(),
            weights,
            fluid,
        }
    }

    /// Gather `[self, neighbours]`: fluid points from `positions`, boundary
    /// points from the model's fixed store.
    pub fn gather_points(&self, positions: &[DVec3]) -> Vec<DVec3> {
        let n = self.weights.len();
        let mut p = Vec::with_capacity(n + 1);
        p.push(positions[self.particle]);
        for k in 0..n {
            let nb = self.model.neighbor(self.particle, k);
            if nb.is_fluid() {
                p.push(positions[nb.index()]);
            } else {
                p.push(self.model.boundary_position(nb.point_set_id, nb.index()));
            }
        }
        p
    }

    pub fn density(&self, p: &[DVec3]) -> f64 {
        let xi = p[0];
        let mut density = self.model.mass(self.particle) * self.model.kernel_zero();
        for (w, xj) in self.weights.iter().zip(&p[1..]) {
            density += w * self.model.kernel(xi - *xj);
        }
        density
    }

    /// Clamped constraint value.
    pub fn value(&self, p: &[DVec3]) -> f64 {
        let c = self.density(p) * self.inv_density0 - 1.0;
        c.max(0.0)
    }

    /// Per-point gradient `∇C`. The self entry is the negated sum of the
    /// neighbour entries, so the internal corrections conserve momentum.
    pub fn gradient(&self, p: &[DVec3], grad: &mut Vec<DVec3>) {
        grad.clear();
        grad.push(DVec3::ZERO);
        let xi = p[0];
        let mut self_grad = DVec3::ZERO;
        for (w, xj) in self.weights.iter().zip(&p[1..]) {
            let g = (-self.inv_density0 * w) * self.model.kernel_gradient(xi - *xj);
            self_grad -= g;
            grad.push(g);
        }
        grad[0] = self_grad;
    }

    /// Project `p` onto `C = 0` with regularised Gauss-Newton steps.
    ///
    /// Fluid point `k` moves by `Δ · fluid_neighbor_count[k] · ∇C_k` with
    /// `Δ = −C / (‖∇C‖² + 1e-6)`. Stops when `|C| <= 1e-14`, when the gradient
    /// vanishes, or after [`MAX_PROJECTION_STEPS`] steps.
    pub fn project(&self, mut p: Vec<DVec3>, fluid_neighbor_count: &[u32]) -> LocalProjection {
        let mut grad = Vec::with_capacity(p.len());
        let mut c = self.value(&p);
        let mut steps = 0;

        while c.abs() > CONSTRAINT_GOAL && steps < MAX_PROJECTION_STEPS {
            steps += 1;
            self.gradient(&p, &mut grad);
            let dg: f64 = grad.iter().map(|g| g.length_squared()).sum();
            if dg == 0.0 {
                // minimum: no direction reduces C
                break;
            }
            let delta = -c / (dg + REGULARIZATION);

            p[0] += (delta * fluid_neighbor_count[self.particle] as f64) * grad[0];
            for k in 0..self.weights.len() {
                if !self.fluid[k] {
                    continue;
                }
                let j = self.model.neighbor(self.particle, k).index();
                p[k + 1] += (delta * fluid_neighbor_count[j] as f64) * grad[k + 1];
            }

            if steps < MAX_PROJECTION_STEPS {
                c = self.value(&p);
            }
        }

        LocalProjection {
            points: p,
            constraint: c,
            steps,
        }
    }
}

/// Gather and project the neighbourhood of particle `i` in one call.
pub fn project_particle<M: FluidModel>(
    model: &M,
    positions: &[DVec3],
    fluid_neighbor_count: &[u32],
    i: usize,
) -> LocalProjection {
    let constraint = DensityConstraint::new(model, i);
    let points = constraint.gather_points(positions);
    constraint.project(points, fluid_neighbor_count)
}
