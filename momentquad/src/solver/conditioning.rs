//! How close the Jacobian is to singular.
//! Colliding nodes, or nodes wandering far outside the interval, make it so.
use faer::Mat;

use crate::{Error, analysis::JacobianAnalysis, solver::MomentSystem};

/// Above this, treat the Jacobian as numerically singular.
pub(crate) const ILL_CONDITIONED: f64 = 1e12;

/// Singular values of `jac`, largest first.
pub(crate) fn singular_values(jac: &Mat<f64>) -> Result<Vec<f64>, Error> {
    // SVD decomposes `J` into `J = UΣVᵀ`.
    let svd = jac.svd().map_err(Error::FaerSvd)?;
    let sigma_diags = svd.S();
    let mut sigma: Vec<f64> = sigma_diags.column_vector().iter().copied().collect();
    sigma.sort_by(|l, r| r.total_cmp(l));
    Ok(sigma)
}

/// `σ_max / σ_min`. Infinite if the matrix is exactly singular.
pub(crate) fn condition_number(jac: &Mat<f64>) -> Result<f64, Error> {
    let sigma = singular_values(jac)?;
    Ok(ratio(&sigma))
}

fn ratio(sigma: &[f64]) -> f64 {
    let largest = sigma.iter().copied().reduce(libm::fmax).unwrap_or(0.0);
    let smallest = sigma.iter().copied().reduce(libm::fmin).unwrap_or(0.0);
    if smallest == 0.0 {
        f64::INFINITY
    } else {
        largest / smallest
    }
}

impl JacobianAnalysis {
    /// What we report when there is no usable spectrum at all.
    fn singular() -> Self {
        Self {
            condition_number: f64::INFINITY,
            singular_values: Vec::new(),
            is_ill_conditioned: true,
        }
    }
}

impl MomentSystem {
    /// Refresh the Jacobian at this iterate and look at its spectrum.
    ///
    /// A Jacobian faer can't decompose (non-finite entries, or an SVD that
    /// fails to converge) is reported as infinitely ill-conditioned, so the
    /// finished solve is still returned.
    pub fn jacobian_analysis(
        &mut self,
        nodes: &[f64],
        weights: &[f64],
    ) -> Result<JacobianAnalysis, Error> {
        if nodes.iter().chain(weights).any(|v| !v.is_finite()) {
            return Ok(JacobianAnalysis::singular());
        }
        crate::jacobian::refresh_jacobian(nodes, weights, &mut self.jac);
        let jac = &self.jac;
        let overflowed = (0..jac.ncols())
            .any(|col| (0..jac.nrows()).any(|row| !jac[(row, col)].is_finite()));
        if overflowed {
            log::warn!("final Jacobian has non-finite entries, skipping its SVD");
            return Ok(JacobianAnalysis::singular());
        }
        let singular_values = match singular_values(&self.jac) {
            Ok(sigma) => sigma,
            Err(e) => {
                log::warn!("{e}, treating the final Jacobian as singular");
                return Ok(JacobianAnalysis::singular());
            }
        };
        let condition_number = ratio(&singular_values);
        Ok(JacobianAnalysis {
            condition_number,
            is_ill_conditioned: !(condition_number <= ILL_CONDITIONED),
            singular_values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_perfectly_conditioned() {
        let eye = Mat::from_fn(4, 4, |i, j| if i == j { 1.0 } else { 0.0 });
        let cond = condition_number(&eye).unwrap();
        assert!((cond - 1.0).abs() < 1e-12);
    }

    #[test]
    fn diagonal_condition_number() {
        let d = Mat::from_fn(3, 3, |i, j| if i == j { [2.0, 8.0, 0.5][i] } else { 0.0 });
        let sigma = singular_values(&d).unwrap();
        assert!((sigma[0] - 8.0).abs() < 1e-12);
        assert!((sigma[2] - 0.5).abs() < 1e-12);
        assert!((condition_number(&d).unwrap() - 16.0).abs() < 1e-10);
    }

    #[test]
    fn colliding_nodes_are_ill_conditioned() {
        use crate::datatypes::Interval;
        let mut system = MomentSystem::new(Interval::REFERENCE, 3);
        let analysis = system
            .jacobian_analysis(&[0.2, 0.2, 0.7], &[0.5, 0.5, 1.0])
            .unwrap();
        assert!(analysis.is_ill_conditioned, "{analysis:?}");

        let healthy = system
            .jacobian_analysis(&[-0.7, 0.0, 0.7], &[0.6, 0.8, 0.6])
            .unwrap();
        assert!(!healthy.is_ill_conditioned, "{healthy:?}");
        assert!(healthy.condition_number.is_finite());
    }

    #[test]
    fn overflowing_jacobian_is_singular() {
        use crate::datatypes::Interval;
        // Finite nodes, but 1e200^5 is not.
        let mut system = MomentSystem::new(Interval::REFERENCE, 3);
        let analysis = system
            .jacobian_analysis(&[1e200, -1e200, 3.0], &[1e-300, 1.0, 1.0])
            .unwrap();
        assert!(analysis.is_ill_conditioned);
        assert_eq!(analysis.condition_number, f64::INFINITY);
        assert!(analysis.singular_values.is_empty());
    }
}
