use std::sync::atomic::{AtomicUsize, Ordering};

use pf_core::cg::{self, RESIDUAL_REFRESH_INTERVAL};
use pf_core::{CgStatus, LinearSystem};

/// Symmetric tridiagonal matrix with constant diagonal and off-diagonal.
struct Tridiagonal {
    diag: f64,
    off: f64,
    b: Vec<f64>,
    applies: AtomicUsize,
}

impl Tridiagonal {
    fn new(n: usize, diag: f64, off: f64, b: Vec<f64>) -> Self {
        assert_eq!(b.len(), n);
        Self {
            diag,
            off,
            b,
            applies: AtomicUsize::new(0),
        }
    }

    fn multiply(&self, x: &[f64], out: &mut [f64]) {
        let n = x.len();
        for i in 0..n {
            let mut v = self.diag * x[i];
            if i > 0 {
                v += self.off * x[i - 1];
            }
            if i + 1 < n {
                v += self.off * x[i + 1];
            }
            out[i] = v;
        }
    }

    fn true_residual_sq(&self, x: &[f64]) -> f64 {
        let mut ax = vec![0.0; x.len()];
        self.multiply(x, &mut ax);
        ax.iter().zip(&self.b).map(|(a, b)| (b - a) * (b - a)).sum()
    }
}

impl LinearSystem for Tridiagonal {
    fn apply(&self, x: &[f64], out: &mut [f64]) {
        self.applies.fetch_add(1, Ordering::Relaxed);
        self.multiply(x, out);
    }

    fn rhs(&self, _x: &[f64], out: &mut [f64]) {
        out.copy_from_slice(&self.b);
    }
}

fn rhs_for(system_diag: f64, system_off: f64, solution: &[f64]) -> Vec<f64> {
    let probe = Tridiagonal::new(solution.len(), system_diag, system_off, vec![0.0; solution.len()]);
    let mut b = vec![0.0; solution.len()];
    probe.multiply(solution, &mut b);
    b
}

#[test]
fn test_converges_to_known_solution() {
    let n = 12;
    let expected: Vec<f64> = (0..n).map(|i| (i as f64 * 0.9).sin() + 0.5).collect();
    let system = Tridiagonal::new(n, 4.0, -1.0, rhs_for(4.0, -1.0, &expected));

    let mut x = vec![0.0; n];
    let report = cg::solve(&system, &mut x, 3 * n);

    assert_eq!(report.status, CgStatus::Converged);
    assert!(report.iterations >= 1 && report.iterations <= n);
    for (got, want) in x.iter().zip(&expected) {
        assert!((got - want).abs() < 1e-3, "x = {got}, expected {want}");
    }
}

#[test]
fn test_already_solved_leaves_x_untouched() {
    let n = 8;
    let solution: Vec<f64> = (0..n).map(|i| i as f64 - 3.5).collect();
    let system = Tridiagonal::new(n, 4.0, -1.0, rhs_for(4.0, -1.0, &solution));

    let mut x = solution.clone();
    let report = cg::solve(&system, &mut x, 3 * n);

    assert_eq!(report.status, CgStatus::AlreadySolved);
    assert_eq!(report.iterations, 0);
    assert_eq!(x, solution);
}

#[test]
fn test_budget_exhaustion_reports_max_iterations() {
    // Diagonal system with distinct eigenvalues needs more than one step.
    let n = 12;
    let system = Tridiagonal::new(n, 1.0, 0.0, vec![1.0; n]);
    struct Scaled(Tridiagonal);
    impl LinearSystem for Scaled {
        fn apply(&self, x: &[f64], out: &mut [f64]) {
            for (i, (o, v)) in out.iter_mut().zip(x).enumerate() {
                *o = (i + 1) as f64 * v;
            }
        }
        fn rhs(&self, x: &[f64], out: &mut [f64]) {
            self.0.rhs(x, out);
        }
    }
    let system = Scaled(system);

    let mut x = vec![0.0; n];
    let report = cg::solve(&system, &mut x, 1);
    assert_eq!(report.status, CgStatus::MaxIterationsReached);
    assert_eq!(report.iterations, 1);
    assert!(x.iter().all(|v| *v > 0.0), "one step moves along b");

    let mut y = vec![0.0; n];
    let report = cg::solve(&system, &mut y, 0);
    assert_eq!(report.status, CgStatus::MaxIterationsReached);
    assert_eq!(report.iterations, 0);
    assert!(y.iter().all(|v| *v == 0.0));
}

#[test]
fn test_residual_refresh_keeps_true_residual() {
    // Poorly conditioned: needs well over one refresh interval.
    let n = 200;
    let b: Vec<f64> = (0..n).map(|i| (i as f64 * 1.7).sin()).collect();
    let b_norm_sq: f64 = b.iter().map(|v| v * v).sum();
    let system = Tridiagonal::new(n, 2.0001, -1.0, b);

    let mut x = vec![0.0; n];
    let report = cg::solve(&system, &mut x, 3 * n);
    assert_eq!(report.status, CgStatus::Converged);

    let refreshes = report.iterations / RESIDUAL_REFRESH_INTERVAL;
    assert_eq!(
        system.applies.load(Ordering::Relaxed),
        1 + report.iterations + refreshes,
        "one initial product, one per iteration, one per refresh"
    );

    let true_residual = system.true_residual_sq(&x);
    assert!(
        true_residual <= 1e-6 * b_norm_sq,
        "|b - Ax|² = {true_residual}, |b|² = {b_norm_sq}"
    );
}

#[test]
fn test_indefinite_operator_breaks_down_without_moving() {
    struct Negative;
    impl LinearSystem for Negative {
        fn apply(&self, x: &[f64], out: &mut [f64]) {
            for (o, v) in out.iter_mut().zip(x) {
                *o = -v;
            }
        }
        fn rhs(&self, _x: &[f64], out: &mut [f64]) {
            out.fill(1.0);
        }
    }

    let mut x = vec![0.0; 4];
    let report = cg::solve(&Negative, &mut x, 10);
    assert_eq!(report.status, CgStatus::MaxIterationsReached);
    assert_eq!(report.iterations, 0);
    assert_eq!(x, vec![0.0; 4]);
}
