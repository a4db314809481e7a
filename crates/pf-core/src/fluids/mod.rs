pub mod density;
pub mod viscosity;

use glam::DVec3;
use std::f64::consts::PI;

/// SPH smoothing kernel with compact support.
pub trait SmoothingKernel: Send + Sync {
    /// Support radius.
    fn radius(&self) -> f64;

    /// Kernel value `W(r)`.
    fn w(&self, r: DVec3) -> f64;

    /// Kernel gradient `∇W(r)` with respect to `r`.
    fn grad_w(&self, r: DVec3) -> DVec3;

    /// `W(0)`, the self contribution to a density sum.
    fn w_zero(&self) -> f64;
}

/// Cubic spline kernel (Monaghan), the standard SPH density kernel.
///
/// `W(q) = k (6q³ − 6q² + 1)` for `q ≤ 1/2`, `W(q) = 2k (1 − q)³` for
/// `1/2 < q ≤ 1`, with `q = |r| / h` and `k = 8 / (π h³)`.
#[derive(Clone, Copy, Debug)]
pub struct CubicSplineKernel {
    radius: f64,
    k: f64,
    l: f64,
    w_zero: f64,
}

impl CubicSplineKernel {
    pub fn new(radius: f64) -> Self {
        let h3 = radius * radius * radius;
        let k = 8.0 / (PI * h3);
        let l = 48.0 / (PI * h3);
        Self {
            radius,
            k,
            l,
            w_zero: k,
        }
    }
}

impl SmoothingKernel for CubicSplineKernel {
    #[inline]
    fn radius(&self) -> f64 {
        self.radius
    }

    #[inline]
    fn w(&self, r: DVec3) -> f64 {
        let q = r.length() / self.radius;
        if q > 1.0 {
            return 0.0;
        }
        if q <= 0.5 {
            let q2 = q * q;
            let q3 = q2 * q;
            self.k * (6.0 * q3 - 6.0 * q2 + 1.0)
        } else {
            let f = 1.0 - q;
            self.k * 2.0 * f * f * f
        }
    }

    #[inline]
    fn grad_w(&self, r: DVec3) -> DVec3 {
        let rl = r.length();
        let q = rl / self.radius;
        if rl <= 1e-9 || q > 1.0 {
            return DVec3::ZERO;
        }
        let grad_q = r / (rl * self.radius);
        if q <= 0.5 {
            self.l * q * (3.0 * q - 2.0) * grad_q
        } else {
            let f = 1.0 - q;
            self.l * (-f * f) * grad_q
        }
    }

    #[inline]
    fn w_zero(&self) -> f64 {
        self.w_zero
    }
}

/// Poly6 kernel with its analytic gradient.
///
/// `W(r, h) = 315 / (64 π h⁹) (h² − r²)³` when `r < h`, `0` otherwise.
#[derive(Clone, Copy, Debug)]
pub struct Poly6Kernel {
    radius: f64,
    coeff: f64,
}

impl Poly6Kernel {
    pub fn new(radius: f64) -> Self {
        let h2 = radius * radius;
        let h9 = h2 * h2 * h2 * h2 * radius;
        Self {
            radius,
            coeff: 315.0 / (64.0 * PI * h9),
        }
    }
}

impl SmoothingKernel for Poly6Kernel {
    #[inline]
    fn radius(&self) -> f64 {
        self.radius
    }

    #[inline]
    fn w(&self, r: DVec3) -> f64 {
        let r2 = r.length_squared();
        let h2 = self.radius * self.radius;
        if r2 >= h2 {
            return 0.0;
        }
        let diff = h2 - r2;
        self.coeff * diff * diff * diff
    }

    #[inline]
    fn grad_w(&self, r: DVec3) -> DVec3 {
        let r2 = r.length_squared();
        let h2 = self.radius * self.radius;
        if r2 >= h2 {
            return DVec3::ZERO;
        }
        let diff = h2 - r2;
        r * (-6.0 * self.coeff * diff * diff)
    }

    #[inline]
    fn w_zero(&self) -> f64 {
        let h2 = self.radius * self.radius;
        self.coeff * h2 * h2 * h2
    }
}
