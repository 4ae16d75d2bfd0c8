//! Partial derivatives of the achieved moments with respect to every unknown.
//!
//! Columns `0..n` are the nodes, columns `n..2n` are the weights.
//! Row `k` is moment `k`.
use faer::Mat;

/// Allocate a zeroed Jacobian for `n` nodes.
pub fn empty_jacobian(n: usize) -> Mat<f64> {
    let m = crate::moments::num_moments(n);
    Mat::zeros(m, 2 * n)
}

/// Overwrite `jac` with the Jacobian at the current nodes and weights.
///
/// Node block: `∂/∂x_i Σ w x^k = k w_i x_i^(k-1)`, and row 0 is exactly zero
/// because `w x^0` doesn't move when `x` does.
/// Weight block: `∂/∂w_i Σ w x^k = x_i^k`.
pub fn refresh_jacobian(nodes: &[f64], weights: &[f64], jac: &mut Mat<f64>) {
    let n = nodes.len();
    debug_assert_eq!(weights.len(), n);
    debug_assert_eq!(jac.ncols(), 2 * n, "Jacobian has the wrong number of columns");
    debug_assert_eq!(jac.nrows(), 2 * n, "Jacobian has the wrong number of rows");

    for i in 0..n {
        let (x, w) = (nodes[i], weights[i]);
        jac[(0, i)] = 0.0;
        jac[(0, n + i)] = 1.0;
        // Walk the powers up instead of calling powi per entry.
        // `x_pow` is x^(k-1) at the top of each iteration.
        let mut x_pow = 1.0;
        for k in 1..jac.nrows() {
            jac[(k, i)] = k as f64 * w * x_pow;
            x_pow *= x;
            jac[(k, n + i)] = x_pow;
        }
    }

    #[cfg(feature = "dbg-jac")]
    eprintln!("{jac:?}");
}
