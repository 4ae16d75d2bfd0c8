//! Matrix-free conjugate gradient, used for the inner Gauss-Newton solve.
//!
//! The outer loop never forms `JᵀJ`. It wraps the Jacobian in a
//! [`DenseOperator`], wraps that in a [`NormalOperator`] which applies
//! `v ↦ Jᵀ(J v)`, and hands the result to [`conjugate_gradient`].
use std::cell::RefCell;

use faer::{ColRef, Mat};

use crate::moments::{dot, l2_norm};

/// Something that behaves like a matrix, but only through products with vectors.
pub trait LinearOperator {
    /// Length of the output of [`LinearOperator::apply`].
    fn nrows(&self) -> usize;
    /// Length of the input of [`LinearOperator::apply`].
    fn ncols(&self) -> usize;
    /// `out = A x`.
    fn apply(&self, x: &[f64], out: &mut [f64]);
    /// `out = Aᵀ x`.
    fn apply_transpose(&self, x: &[f64], out: &mut [f64]);
}

/// A dense faer matrix as an operator.
#[derive(Clone, Copy)]
pub struct DenseOperator<'a> {
    mat: &'a Mat<f64>,
}

impl<'a> DenseOperator<'a> {
    /// Borrow this matrix as an operator.
    pub fn new(mat: &'a Mat<f64>) -> Self {
        Self { mat }
    }
}

impl LinearOperator for DenseOperator<'_> {
    fn nrows(&self) -> usize {
        self.mat.nrows()
    }

    fn ncols(&self) -> usize {
        self.mat.ncols()
    }

    fn apply(&self, x: &[f64], out: &mut [f64]) {
        debug_assert_eq!(x.len(), self.ncols());
        debug_assert_eq!(out.len(), self.nrows());
        let ax = self.mat.as_ref() * ColRef::from_slice(x);
        out.iter_mut().zip(ax.iter()).for_each(|(o, v)| *o = *v);
    }

    fn apply_transpose(&self, x: &[f64], out: &mut [f64]) {
        debug_assert_eq!(x.len(), self.nrows());
        debug_assert_eq!(out.len(), self.ncols());
        let atx = self.mat.transpose() * ColRef::from_slice(x);
        out.iter_mut().zip(atx.iter()).for_each(|(o, v)| *o = *v);
    }
}

/// The normal-equations operator `AᵀA`, applied as `Aᵀ(A v)`.
/// It is symmetric positive semi-definite for any `A`, so CG applies.
pub struct NormalOperator<'a, A> {
    inner: &'a A,
    /// Holds `A v` between the two products.
    scratch: RefCell<Vec<f64>>,
}

impl<'a, A: LinearOperator> NormalOperator<'a, A> {
    /// Wrap `A`.
    pub fn new(inner: &'a A) -> Self {
        Self {
            inner,
            scratch: RefCell::new(vec![0.0; inner.nrows()]),
        }
    }
}

impl<A: LinearOperator> LinearOperator for NormalOperator<'_, A> {
    fn nrows(&self) -> usize {
        self.inner.ncols()
    }

    fn ncols(&self) -> usize {
        self.inner.ncols()
    }

    fn apply(&self, x: &[f64], out: &mut [f64]) {
        let mut av = self.scratch.borrow_mut();
        self.inner.apply(x, &mut av);
        self.inner.apply_transpose(&av, out);
    }

    fn apply_transpose(&self, x: &[f64], out: &mut [f64]) {
        self.apply(x, out);
    }
}

/// When conjugate gradient should give up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CgSettings {
    /// Stop once `‖b - A x‖ <= tolerance * ‖b‖`.
    pub tolerance: f64,
    /// Stop after this many iterations regardless.
    pub max_iterations: usize,
}

impl CgSettings {
    /// Relative tolerance, with the usual cap of 10 iterations per unknown.
    pub fn new(tolerance: f64, dim: usize) -> Self {
        Self {
            tolerance,
            max_iterations: 10 * dim,
        }
    }
}

/// How an inner solve went.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CgReport {
    /// How many CG iterations ran.
    pub iterations: usize,
    /// `‖b - A x‖` at the returned `x`, as tracked by the recurrence.
    pub residual_norm: f64,
    /// Did it reach the tolerance? If not, `x` is still the best estimate found.
    pub converged: bool,
}

/// Solve `A x = b` for symmetric positive (semi-)definite `A`, starting from `x = 0`.
///
/// Never fails. If the iteration cap is reached, or the operator turns out not
/// to be positive definite along the search direction, the current iterate is
/// left in `x` and the report says `converged: false`.
pub fn conjugate_gradient<A: LinearOperator>(
    op: &A,
    rhs: &[f64],
    x: &mut [f64],
    settings: CgSettings,
) -> CgReport {
    debug_assert_eq!(op.nrows(), op.ncols(), "CG needs a square operator");
    debug_assert_eq!(rhs.len(), op.nrows());
    debug_assert_eq!(x.len(), op.ncols());

    x.fill(0.0);
    let rhs_norm = l2_norm(rhs);
    if rhs_norm == 0.0 {
        // x = 0 solves it exactly.
        return CgReport {
            iterations: 0,
            residual_norm: 0.0,
            converged: true,
        };
    }
    let threshold = settings.tolerance * rhs_norm;

    let mut r = rhs.to_vec();
    let mut p = r.clone();
    let mut ap = vec![0.0; p.len()];
    let mut rr = dot(&r, &r);
    if rr.sqrt() <= threshold {
        return CgReport {
            iterations: 0,
            residual_norm: rr.sqrt(),
            converged: true,
        };
    }

    for iteration in 1..=settings.max_iterations {
        op.apply(&p, &mut ap);
        let pap = dot(&p, &ap);
        if !(pap > 0.0 && pap.is_finite()) {
            // Zero or negative curvature: no further progress along p.
            return CgReport {
                iterations: iteration - 1,
                residual_norm: rr.sqrt(),
                converged: false,
            };
        }
        let alpha = rr / pap;
        for ((xi, ri), (&pi, &api)) in x.iter_mut().zip(r.iter_mut()).zip(p.iter().zip(&ap)) {
            *xi += alpha * pi;
            *ri -= alpha * api;
        }

        let rr_next = dot(&r, &r);
        if rr_next.sqrt() <= threshold {
            return CgReport {
                iterations: iteration,
                residual_norm: rr_next.sqrt(),
                converged: true,
            };
        }
        let beta = rr_next / rr;
        for (pi, &ri) in p.iter_mut().zip(&r) {
            *pi = ri + beta * *pi;
        }
        rr = rr_next;
    }

    CgReport {
        iterations: settings.max_iterations,
        residual_norm: rr.sqrt(),
        converged: false,
    }
}

/// One Gauss-Newton increment: solve `(JᵀJ) δ = Jᵀ r` matrix-free, writing `δ` into `step`.
pub fn gauss_newton_step(
    jac: &Mat<f64>,
    residual: &[f64],
    settings: CgSettings,
    step: &mut [f64],
) -> CgReport {
    let j = DenseOperator::new(jac);
    let mut rhs = vec![0.0; j.ncols()];
    j.apply_transpose(residual, &mut rhs);
    conjugate_gradient(&NormalOperator::new(&j), &rhs, step, settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::assert_nearly_eq;

    /// The 1D Poisson matrix, tridiag(-1, 2, -1). SPD, and never stored.
    struct Laplacian {
        n: usize,
    }

    impl LinearOperator for Laplacian {
        fn nrows(&self) -> usize {
            self.n
        }
        fn ncols(&self) -> usize {
            self.n
        }
        fn apply(&self, x: &[f64], out: &mut [f64]) {
            for i in 0..self.n {
                let left = if i > 0 { x[i - 1] } else { 0.0 };
                let right = if i + 1 < self.n { x[i + 1] } else { 0.0 };
                out[i] = 2.0 * x[i] - left - right;
            }
        }
        fn apply_transpose(&self, x: &[f64], out: &mut [f64]) {
            self.apply(x, out);
        }
    }

    /// Diagonal operator, handy for exact answers.
    struct Diagonal(Vec<f64>);

    impl LinearOperator for Diagonal {
        fn nrows(&self) -> usize {
            self.0.len()
        }
        fn ncols(&self) -> usize {
            self.0.len()
        }
        fn apply(&self, x: &[f64], out: &mut [f64]) {
            for ((o, &d), &xi) in out.iter_mut().zip(&self.0).zip(x) {
                *o = d * xi;
            }
        }
        fn apply_transpose(&self, x: &[f64], out: &mut [f64]) {
            self.apply(x, out);
        }
    }

    #[test]
    fn solves_diagonal_system() {
        let op = Diagonal(vec![1.0, 4.0, 10.0]);
        let mut x = [0.0; 3];
        let report = conjugate_gradient(&op, &[2.0, 8.0, -5.0], &mut x, CgSettings::new(1e-12, 3));
        assert!(report.converged);
        assert!(report.iterations <= 3);
        assert_nearly_eq(x[0], 2.0);
        assert_nearly_eq(x[1], 2.0);
        assert_nearly_eq(x[2], -0.5);
    }

    #[test]
    fn solves_laplacian_matrix_free() {
        let n = 20;
        let op = Laplacian { n };
        // Pick a solution, make its rhs, and check we get it back.
        let expected: Vec<f64> = (0..n).map(|i| (i as f64 * 0.3).sin()).collect();
        let mut rhs = vec![0.0; n];
        op.apply(&expected, &mut rhs);
        let mut x = vec![0.0; n];
        let report = conjugate_gradient(&op, &rhs, &mut x, CgSettings::new(1e-12, n));
        assert!(report.converged, "{report:?}");
        for (actual, expected) in x.iter().zip(&expected) {
            assert!((actual - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn zero_rhs_is_solved_by_zero() {
        let op = Laplacian { n: 4 };
        let mut x = [7.0; 4];
        let report = conjugate_gradient(&op, &[0.0; 4], &mut x, CgSettings::new(1e-7, 4));
        assert_eq!(
            report,
            CgReport {
                iterations: 0,
                residual_norm: 0.0,
                converged: true
            }
        );
        assert_eq!(x, [0.0; 4]);
    }

    #[test]
    fn iteration_cap_keeps_best_estimate() {
        let n = 50;
        let op = Laplacian { n };
        let rhs = vec![1.0; n];
        let mut x = vec![0.0; n];
        let settings = CgSettings {
            tolerance: 1e-14,
            max_iterations: 3,
        };
        let report = conjugate_gradient(&op, &rhs, &mut x, settings);
        assert!(!report.converged);
        assert_eq!(report.iterations, 3);
        // The estimate is kept, and the reported residual really is its residual.
        assert!(x.iter().any(|&v| v != 0.0));
        let mut ax = vec![0.0; n];
        op.apply(&x, &mut ax);
        let actual: Vec<f64> = rhs.iter().zip(&ax).map(|(b, ax)| b - ax).collect();
        let actual_norm = l2_norm(&actual);
        assert!(
            (actual_norm - report.residual_norm).abs() <= 1e-9 * actual_norm.max(1.0),
            "tracked {} but recomputed {actual_norm}",
            report.residual_norm
        );
    }

    #[test]
    fn stops_on_zero_curvature() {
        // Singular and the rhs is in the null space: p·Ap = 0 on the first step.
        let op = Diagonal(vec![0.0, 1.0]);
        let mut x = [0.0; 2];
        let report = conjugate_gradient(&op, &[1.0, 0.0], &mut x, CgSettings::new(1e-10, 2));
        assert!(!report.converged);
        assert_eq!(report.iterations, 0);
        assert_eq!(x, [0.0, 0.0]);
    }

    #[test]
    fn dense_operator_products() {
        let m = Mat::from_fn(3, 2, |i, j| (i * 2 + j) as f64);
        // [[0, 1], [2, 3], [4, 5]]
        let op = DenseOperator::new(&m);
        let mut out = [0.0; 3];
        op.apply(&[1.0, -1.0], &mut out);
        assert_eq!(out, [-1.0, -1.0, -1.0]);
        let mut out_t = [0.0; 2];
        op.apply_transpose(&[1.0, 1.0, 1.0], &mut out_t);
        assert_eq!(out_t, [6.0, 9.0]);

        let normal = NormalOperator::new(&op);
        let mut ata = [0.0; 2];
        normal.apply(&[1.0, 0.0], &mut ata);
        // First column of AᵀA is [0+4+16, 0+6+20].
        assert_eq!(ata, [20.0, 26.0]);
    }

    #[test]
    fn normal_operator_reuses_its_scratch() {
        let m = Mat::from_fn(3, 2, |i, j| (i * 2 + j) as f64);
        let op = DenseOperator::new(&m);
        let normal = NormalOperator::new(&op);
        let scratch = normal.scratch.borrow().as_ptr();
        let mut first = [0.0; 2];
        let mut second = [0.0; 2];
        normal.apply(&[1.0, 0.0], &mut first);
        normal.apply(&[0.0, 1.0], &mut second);
        // Still the buffer built in `new`, and an old `A v` doesn't leak into the next product.
        assert_eq!(normal.scratch.borrow().as_ptr(), scratch);
        assert_eq!(normal.scratch.borrow().len(), 3);
        assert_eq!(first, [20.0, 26.0]);
        assert_eq!(second, [26.0, 35.0]);
    }

    #[test]
    fn least_squares_via_normal_equations() {
        // Overdetermined but consistent:
        // x + y = 3
        // x - y = 1
        // 2x + y = 5
        let j = Mat::from_fn(3, 2, |i, k| [[1.0, 1.0], [1.0, -1.0], [2.0, 1.0]][i][k]);
        let r = [3.0, 1.0, 5.0];
        let mut step = [0.0; 2];
        let report = gauss_newton_step(&j, &r, CgSettings::new(1e-12, 2), &mut step);
        assert!(report.converged);
        assert_nearly_eq(step[0], 2.0);
        assert_nearly_eq(step[1], 1.0);
    }
}
