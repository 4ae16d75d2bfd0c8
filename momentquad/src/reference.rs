//! Classic Gauss-Legendre rules and polynomials, for checking solved rules against.
//! The solver itself never uses anything in here.

use std::f64::consts::PI;

use crate::datatypes::{Interval, QuadratureRule};

/// Newton iterations per root. Converges in far fewer from the Chebyshev-like guess.
const MAX_NEWTON_STEPS: usize = 100;

/// The `n`-point Gauss-Legendre rule on `[-1, 1]`, nodes ascending.
///
/// Roots of `P_n` are found by Newton's method on the three-term recurrence,
/// one per symmetric pair, and weights are `2 / ((1 - x²) P_n'(x)²)`.
pub fn gauss_legendre(n: usize) -> QuadratureRule {
    if n == 0 {
        return QuadratureRule::default();
    }
    let mut nodes = vec![0.0; n];
    let mut weights = vec![0.0; n];
    let nf = n as f64;

    for i in 0..n.div_ceil(2) {
        let mut z = if 2 * i + 1 == n {
            // Middle root of an odd rule.
            0.0
        } else {
            (PI * (i as f64 + 0.75) / (nf + 0.5)).cos()
        };
        for _ in 0..MAX_NEWTON_STEPS {
            let (p, dp) = legendre_and_derivative(n, z);
            let dz = p / dp;
            z -= dz;
            if dz.abs() <= f64::EPSILON * z.abs().max(1.0) {
                break;
            }
        }
        let (_, dp) = legendre_and_derivative(n, z);
        let weight = 2.0 / ((1.0 - z * z) * dp * dp);

        // Largest roots come first, fill from both ends.
        nodes[i] = -z;
        nodes[n - 1 - i] = z;
        weights[i] = weight;
        weights[n - 1 - i] = weight;
    }
    QuadratureRule { nodes, weights }
}

/// The `n`-point Gauss-Legendre rule mapped affinely onto `interval`.
pub fn gauss_legendre_on(interval: Interval, n: usize) -> QuadratureRule {
    let rule = gauss_legendre(n);
    let half_width = 0.5 * interval.width();
    let mid = interval.midpoint();
    QuadratureRule {
        nodes: rule.nodes.iter().map(|x| mid + half_width * x).collect(),
        weights: rule.weights.iter().map(|w| half_width * w).collect(),
    }
}

/// `(P_n(x), P_n'(x))` via `k P_k = (2k - 1) x P_{k-1} - (k - 1) P_{k-2}`.
fn legendre_and_derivative(n: usize, x: f64) -> (f64, f64) {
    let mut p_prev = 1.0;
    let mut p = x;
    for k in 2..=n {
        let kf = k as f64;
        let p_next = ((2.0 * kf - 1.0) * x * p - (kf - 1.0) * p_prev) / kf;
        p_prev = p;
        p = p_next;
    }
    if n == 0 {
        return (1.0, 0.0);
    }
    // Roots are strictly inside (-1, 1), so this never divides by zero there.
    let dp = n as f64 * (x * p - p_prev) / (x * x - 1.0);
    (p, dp)
}

/// A polynomial in the monomial basis.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Polynomial {
    /// `coefficients[k]` multiplies `x^k`.
    pub coefficients: Vec<f64>,
}

impl Polynomial {
    /// Coefficients in increasing order of degree.
    pub fn new(coefficients: Vec<f64>) -> Self {
        Self { coefficients }
    }

    /// The monomial `x^k`.
    pub fn monomial(k: usize) -> Self {
        let mut coefficients = vec![0.0; k + 1];
        coefficients[k] = 1.0;
        Self { coefficients }
    }

    /// Highest power with a nonzero coefficient. The zero polynomial has degree 0.
    pub fn degree(&self) -> usize {
        self.coefficients
            .iter()
            .rposition(|&c| c != 0.0)
            .unwrap_or(0)
    }

    /// Evaluate with Horner's scheme.
    pub fn eval(&self, x: f64) -> f64 {
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * x + c)
    }

    /// Exact `∫_a^b p(x) dx`, from the antiderivative.
    pub fn integrate(&self, a: f64, b: f64) -> f64 {
        let antiderivative = |x: f64| {
            self.coefficients
                .iter()
                .enumerate()
                .rev()
                .fold(0.0, |acc, (k, &c)| acc * x + c / (k + 1) as f64)
                * x
        };
        antiderivative(b) - antiderivative(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::assert_nearly_eq;

    #[test]
    fn small_rules_match_closed_forms() {
        let one = gauss_legendre(1);
        assert_eq!(one.nodes, vec![0.0]);
        assert_nearly_eq(one.weights[0], 2.0);

        let two = gauss_legendre(2);
        let x = 1.0 / 3.0_f64.sqrt();
        assert_nearly_eq(two.nodes[0], -x);
        assert_nearly_eq(two.nodes[1], x);
        assert_nearly_eq(two.weights[0], 1.0);
        assert_nearly_eq(two.weights[1], 1.0);

        let three = gauss_legendre(3);
        let x = (3.0_f64 / 5.0).sqrt();
        assert_nearly_eq(three.nodes[0], -x);
        assert_eq!(three.nodes[1], 0.0);
        assert_nearly_eq(three.nodes[2], x);
        assert_nearly_eq(three.weights[0], 5.0 / 9.0);
        assert_nearly_eq(three.weights[1], 8.0 / 9.0);
    }

    #[test]
    fn nodes_ascend_and_weights_sum_to_two() {
        for n in 1..=12 {
            let rule = gauss_legendre(n);
            assert_eq!(rule.len(), n);
            assert!(rule.nodes.windows(2).all(|w| w[0] < w[1]), "n = {n}");
            let sum: f64 = rule.weights.iter().sum();
            assert!((sum - 2.0).abs() < 1e-13, "n = {n}, sum = {sum}");
        }
    }

    #[test]
    fn mapped_rule_is_exact_on_the_new_interval() {
        let interval = Interval::new(1.0, 4.0).unwrap();
        let rule = gauss_legendre_on(interval, 4);
        // Degree 7 is the highest a 4-point rule integrates exactly.
        let p = Polynomial::new(vec![1.0, -2.0, 0.5, 0.0, 0.0, 0.0, 0.0, 0.01]);
        let exact = p.integrate(1.0, 4.0);
        let approx = rule.integrate(|x| p.eval(x));
        assert!(((approx - exact) / exact).abs() < 1e-12);
    }

    #[test]
    fn polynomial_basics() {
        let p = Polynomial::new(vec![1.0, 0.0, 3.0, 0.0]);
        assert_eq!(p.degree(), 2);
        assert_eq!(p.eval(2.0), 13.0);
        // ∫_0^1 1 + 3x² dx = 2
        assert_nearly_eq(p.integrate(0.0, 1.0), 2.0);
        assert_eq!(Polynomial::default().degree(), 0);
        assert_eq!(Polynomial::monomial(4).degree(), 4);
        assert_nearly_eq(Polynomial::monomial(3).integrate(-1.0, 2.0), 15.0 / 4.0);
    }
}
