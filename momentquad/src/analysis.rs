use crate::{Error, SolveOutcome, solver::MomentSystem};

/// Extra, possibly expensive, numeric analysis run on the final iterate.
pub(crate) trait Analysis: Sized {
    fn analyze(system: &mut MomentSystem, nodes: &[f64], weights: &[f64]) -> Result<Self, Error>;
}

#[derive(Default, Debug)]
pub(crate) struct NoAnalysis;

impl Analysis for NoAnalysis {
    fn analyze(_: &mut MomentSystem, _: &[f64], _: &[f64]) -> Result<Self, Error> {
        Ok(Self)
    }
}

/// Spectrum of the Jacobian at the final nodes and weights.
///
/// A huge condition number means the rule sits somewhere the Gauss-Newton
/// step is unreliable: nodes have collided, or drifted far outside the
/// interval. This is how an ill-conditioned solve shows up; the solver
/// itself never refuses to step.
#[derive(Clone, Debug, PartialEq)]
pub struct JacobianAnalysis {
    /// `σ_max / σ_min`. Infinite for an exactly singular Jacobian.
    pub condition_number: f64,
    /// All singular values, largest first.
    pub singular_values: Vec<f64>,
    /// Is the condition number above 1e12?
    pub is_ill_conditioned: bool,
}

impl Analysis for JacobianAnalysis {
    fn analyze(system: &mut MomentSystem, nodes: &[f64], weights: &[f64]) -> Result<Self, Error> {
        system.jacobian_analysis(nodes, weights)
    }
}

/// A [`SolveOutcome`] plus the analysis of its Jacobian.
#[derive(Debug)]
pub struct SolveOutcomeAnalysis {
    /// Extra analysis for the system.
    pub analysis: JacobianAnalysis,
    /// Other data.
    pub outcome: SolveOutcome,
}

impl AsRef<SolveOutcome> for SolveOutcomeAnalysis {
    fn as_ref(&self) -> &SolveOutcome {
        &self.outcome
    }
}
