use crate::{Warning, datatypes::Interval, datatypes::QuadratureRule};

/// Where the Gauss-Newton loop ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// The residual norm dropped below the convergence floor.
    Converged,
    /// Hit the iteration cap (or the iterate stopped being finite) first.
    /// The nodes and weights are still the best estimate found.
    Stopped,
}

/// Data from a finished solve. Returned whether or not it converged,
/// check [`SolveOutcome::status`].
#[derive(Debug)]
#[cfg_attr(not(feature = "unstable-exhaustive"), non_exhaustive)]
pub struct SolveOutcome {
    pub(crate) interval: Interval,
    /// Final node positions, in the order the initial nodes were given.
    pub(crate) nodes: Vec<f64>,
    /// Final weights, same indexing as the nodes.
    pub(crate) weights: Vec<f64>,
    /// How many Gauss-Newton updates were applied?
    pub(crate) iterations: usize,
    /// Norm of the last residual evaluated.
    pub(crate) residual_norm: f64,
    pub(crate) status: Status,
    /// Residual norm at every evaluation, last one included.
    pub(crate) history: Vec<f64>,
    /// Anything suspicious either in the problem or during solving it.
    pub(crate) warnings: Vec<Warning>,
}

impl SolveOutcome {
    /// Final node positions, in the order the initial nodes were given.
    pub fn nodes(&self) -> &[f64] {
        &self.nodes
    }

    /// Final weights, same indexing as the nodes.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// How many Gauss-Newton updates were applied?
    /// If converged, this is the iteration where the residual first dropped below the floor.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Norm of the last residual evaluated.
    pub fn residual_norm(&self) -> f64 {
        self.residual_norm
    }

    /// Whether the run converged or stopped at the cap.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Did the residual get below the convergence floor?
    pub fn is_converged(&self) -> bool {
        self.status == Status::Converged
    }

    /// Residual norm at every evaluation, last one included.
    pub fn history(&self) -> &[f64] {
        &self.history
    }

    /// Anything suspicious either in the problem or during solving it.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// The interval this rule was solved on.
    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Copy the final nodes and weights out as a rule.
    pub fn rule(&self) -> QuadratureRule {
        QuadratureRule {
            nodes: self.nodes.clone(),
            weights: self.weights.clone(),
        }
    }

    /// Approximate `∫ f` over the interval with the final rule.
    pub fn integrate<F: Fn(f64) -> f64>(&self, f: F) -> f64 {
        self.nodes
            .iter()
            .zip(&self.weights)
            .map(|(&x, &w)| w * f(x))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn getters() {
        let outcome = SolveOutcome {
            interval: Interval::REFERENCE,
            nodes: vec![-0.5, 0.5],
            weights: vec![1.0, 1.0],
            iterations: 4,
            residual_norm: 0.1,
            status: Status::Stopped,
            history: vec![1.0, 0.5, 0.3, 0.2, 0.1],
            warnings: Vec::new(),
        };
        assert!(!outcome.is_converged());
        assert_eq!(outcome.rule().len(), 2);
        assert_eq!(outcome.integrate(|x| x * x), 0.5);
        assert_eq!(outcome.history().last(), Some(&outcome.residual_norm()));
    }
}
