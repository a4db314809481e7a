//! Preconditioner-free conjugate gradient over a matrix-free operator.

use crate::math::{axpy, dot, squared_norm, sub_from, xpby};

/// Absolute tolerance on the squared residual norm.
pub const ABSOLUTE_TOLERANCE: f64 = 1e-10;

/// Tolerance on the squared residual norm relative to the initial one.
pub const RELATIVE_TOLERANCE: f64 = 1e-8;

/// Every this many iterations the residual is recomputed as `b − A·x`
/// instead of being updated incrementally.
pub const RESIDUAL_REFRESH_INTERVAL: usize = 50;

/// Symmetric positive-definite system `A·x = b` given only by its action.
pub trait LinearSystem: Sync {
    /// `out = A·x`
    fn apply(&self, x: &[f64], out: &mut [f64]);

    /// Right-hand side for a solve starting from `x`. Evaluated once per
    /// solve; `b` may depend on the starting point.
    fn rhs(&self, x: &[f64], out: &mut [f64]);
}

/// Terminal state of a solve. While iterating the solver is running; it
/// always ends in one of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CgStatus {
    /// The starting point already met the tolerance; zero iterations ran.
    AlreadySolved,
    Converged,
    /// The iteration budget ran out. `x` holds the best iterate so far.
    MaxIterationsReached,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CgReport {
    pub status: CgStatus,
    pub iterations: usize,
    /// Squared residual norm when the solve returned.
    pub residual_sq: f64,
}

#[inline]
fn within_tolerance(delta: f64, delta_0: f64) -> bool {
    delta < ABSOLUTE_TOLERANCE || delta < RELATIVE_TOLERANCE * delta_0
}

/// Solve `system` in place starting from `x`, for at most `max_iterations`
/// iterations.
///
/// Scratch vectors live only for the duration of the call.
pub fn solve<S: LinearSystem>(system: &S, x: &mut [f64], max_iterations: usize) -> CgReport {
    let n = x.len();
    let mut b = vec![0.0; n];
    let mut r = vec![0.0; n];
    let mut q = vec![0.0; n];

    // r = b - A x
    system.rhs(x, &mut b);
    system.apply(x, &mut r);
    sub_from(&b, &mut r);

    let mut delta_new = squared_norm(&r);
    let delta_0 = delta_new;
    if within_tolerance(delta_new, delta_0) {
        return CgReport {
            status: CgStatus::AlreadySolved,
            iterations: 0,
            residual_sq: delta_new,
        };
    }

    let mut d = r.clone();
    for it in 0..max_iterations {
        system.apply(&d, &mut q);
        let dq = dot(&d, &q);
        if !(dq > 0.0) {
            // breakdown: operator not positive along d, keep the current iterate
            log::trace!("cg breakdown at iteration {it}: dᵀAd = {dq}");
            return CgReport {
                status: CgStatus::MaxIterationsReached,
                iterations: it,
                residual_sq: delta_new,
            };
        }
        let alpha = delta_new / dq;
        axpy(alpha, &d, x);

        if (it + 1) % RESIDUAL_REFRESH_INTERVAL == 0 {
            system.apply(x, &mut r);
            sub_from(&b, &mut r);
        } else {
            axpy(-alpha, &q, &mut r);
        }

        let delta_old = delta_new;
        delta_new = squared_norm(&r);
        if within_tolerance(delta_new, delta_0) {
            return CgReport {
                status: CgStatus::Converged,
                iterations: it + 1,
                residual_sq: delta_new,
            };
        }

        let beta = delta_new / delta_old;
        xpby(&r, beta, &mut d);
    }

    CgReport {
        status: CgStatus::MaxIterationsReached,
        iterations: max_iterations,
        residual_sq: delta_new,
    }
}
