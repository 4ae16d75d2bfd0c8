//! Monomial moments: the exact ones we want, and the ones a rule achieves.
//!
//! The degrees matched are always `0..2n`, one moment per unknown.

use faer::ColRef;

use crate::datatypes::Interval;

/// How many moments (and unknowns) a rule with `n` nodes has.
#[inline(always)]
pub fn num_moments(n: usize) -> usize {
    2 * n
}

/// Exact `∫ x^k dx` over the interval, for `k` in `0..2n`.
pub fn moment_targets(interval: Interval, n: usize) -> Vec<f64> {
    let (a, b) = (interval.a(), interval.b());
    (0..num_moments(n))
        .map(|k| {
            let p = k as i32 + 1;
            (b.powi(p) - a.powi(p)) / f64::from(p)
        })
        .collect()
}

/// `out[k] = Σ_i w_i x_i^k`.
/// `powi(0)` is 1 even at `x = 0`, which is the convention we want.
pub fn achieved_moments(nodes: &[f64], weights: &[f64], out: &mut [f64]) {
    debug_assert_eq!(nodes.len(), weights.len());
    for (k, moment) in out.iter_mut().enumerate() {
        *moment = nodes
            .iter()
            .zip(weights)
            .map(|(&x, &w)| w * x.powi(k as i32))
            .sum();
    }
}

/// `out = targets - achieved`.
pub fn residual(targets: &[f64], nodes: &[f64], weights: &[f64], out: &mut [f64]) {
    debug_assert_eq!(targets.len(), out.len());
    achieved_moments(nodes, weights, out);
    for (r, &t) in out.iter_mut().zip(targets) {
        *r = t - *r;
    }
}

/// Euclidean norm.
pub fn l2_norm(v: &[f64]) -> f64 {
    ColRef::from_slice(v).norm_l2()
}

#[inline]
pub(crate) fn dot(l: &[f64], r: &[f64]) -> f64 {
    ColRef::from_slice(l).transpose() * ColRef::from_slice(r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::assert_nearly_eq;

    #[test]
    fn targets_on_reference_interval() {
        let targets = moment_targets(Interval::REFERENCE, 2);
        assert_eq!(targets.len(), 4);
        assert_nearly_eq(targets[0], 2.0);
        assert_nearly_eq(targets[1], 0.0);
        assert_nearly_eq(targets[2], 2.0 / 3.0);
        assert_nearly_eq(targets[3], 0.0);
    }

    #[test]
    fn targets_on_shifted_interval() {
        let interval = Interval::new(1.0, 3.0).unwrap();
        let targets = moment_targets(interval, 2);
        assert_nearly_eq(targets[0], 2.0);
        assert_nearly_eq(targets[1], 4.0);
        assert_nearly_eq(targets[2], 26.0 / 3.0);
        assert_nearly_eq(targets[3], 20.0);
    }

    #[test]
    fn zeroth_power_of_zero_is_one() {
        let mut out = [0.0; 3];
        achieved_moments(&[0.0], &[1.5], &mut out);
        assert_eq!(out, [1.5, 0.0, 0.0]);
    }

    #[test]
    fn two_point_gauss_has_zero_residual() {
        let x = 1.0 / 3.0_f64.sqrt();
        let targets = moment_targets(Interval::REFERENCE, 2);
        let mut r = [0.0; 4];
        residual(&targets, &[-x, x], &[1.0, 1.0], &mut r);
        assert!(l2_norm(&r) < 1e-15, "residual was {r:?}");
    }

    #[test]
    fn norm_and_dot() {
        assert_nearly_eq(l2_norm(&[3.0, 4.0]), 5.0);
        assert_eq!(l2_norm(&[]), 0.0);
        assert_nearly_eq(dot(&[1.0, 2.0, 3.0], &[4.0, -5.0, 6.0]), 12.0);
    }

    #[test]
    fn residual_is_target_minus_achieved() {
        let targets = moment_targets(Interval::REFERENCE, 1);
        let mut r = [0.0; 2];
        residual(&targets, &[0.5], &[1.0], &mut r);
        // Achieved is [1.0, 0.5], targets are [2.0, 0.0].
        assert_nearly_eq(r[0], 1.0);
        assert_nearly_eq(r[1], -0.5);
        assert_nearly_eq(l2_norm(&r), 1.25_f64.sqrt());
    }
}
