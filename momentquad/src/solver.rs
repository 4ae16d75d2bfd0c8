use faer::Mat;

use crate::{
    Error,
    datatypes::Interval,
    jacobian::empty_jacobian,
    krylov::CgReport,
    moments::{self, moment_targets, num_moments},
};

mod conditioning;
mod gauss_newton;

pub(crate) use gauss_newton::Run;

/// Knobs for the solver. Defaults match the classic experiment:
/// 100 outer iterations, stop below 1e-15, inner tolerance at most 1e-7.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub struct Config {
    /// Give up after this many Gauss-Newton updates.
    pub max_iterations: usize,
    /// The rule has converged once the residual norm drops strictly below this.
    pub convergence_floor: f64,
    /// The inner CG tolerance is `min(inner_tolerance_ceiling, residual_norm)`,
    /// so inner solves get tighter as the rule improves.
    pub inner_tolerance_ceiling: f64,
    /// Cap on CG iterations per inner solve. `None` means 10 per unknown.
    pub cg_max_iterations: Option<usize>,
    /// Compute cond(J) with an SVD every iteration and report it.
    /// Slow, only useful for diagnostics.
    pub track_condition_number: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            convergence_floor: 1e-15,
            inner_tolerance_ceiling: 1e-7,
            cg_max_iterations: None,
            track_condition_number: false,
        }
    }
}

impl Config {
    /// Set the outer iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
    /// Set the residual norm that counts as converged.
    pub fn with_convergence_floor(mut self, convergence_floor: f64) -> Self {
        self.convergence_floor = convergence_floor;
        self
    }
    /// Set the loosest tolerance an inner solve may use.
    pub fn with_inner_tolerance_ceiling(mut self, inner_tolerance_ceiling: f64) -> Self {
        self.inner_tolerance_ceiling = inner_tolerance_ceiling;
        self
    }
    /// Set the per-solve CG iteration cap.
    pub fn with_cg_max_iterations(mut self, cg_max_iterations: usize) -> Self {
        self.cg_max_iterations = Some(cg_max_iterations);
        self
    }
    /// Turn per-iteration condition numbers on or off.
    pub fn with_condition_tracking(mut self, enabled: bool) -> Self {
        self.track_condition_number = enabled;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.max_iterations == 0 {
            return Err(Error::ZeroIterationCap);
        }
        // Written so that NaN fails too.
        if !(self.convergence_floor >= 0.0) {
            return Err(Error::InvalidTolerance {
                name: "convergence_floor",
                requirement: "a non-negative number",
                value: self.convergence_floor,
            });
        }
        if !(self.inner_tolerance_ceiling > 0.0) {
            return Err(Error::InvalidTolerance {
                name: "inner_tolerance_ceiling",
                requirement: "a positive number",
                value: self.inner_tolerance_ceiling,
            });
        }
        Ok(())
    }

    pub(crate) fn cg_cap(&self, num_unknowns: usize) -> usize {
        self.cg_max_iterations.unwrap_or(10 * num_unknowns)
    }
}

/// What happened in one outer iteration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IterationStats {
    /// 0-based outer iteration.
    pub iteration: usize,
    /// Euclidean norm of the moment residual at the start of this iteration.
    pub residual_norm: f64,
    /// cond(J), if [`Config::track_condition_number`] is set.
    pub condition_number: Option<f64>,
    /// The inner solve, if this iteration took a step.
    /// `None` on the final iteration, where the residual was only checked.
    pub inner_solve: Option<InnerSolve>,
}

/// The inner CG solve for one Gauss-Newton step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InnerSolve {
    /// Relative tolerance that CG was asked for.
    pub tolerance: f64,
    /// How it went.
    pub report: CgReport,
}

/// Gets told about every iteration. Use it for logging or plotting convergence;
/// it can't influence the solve.
pub trait Reporter {
    /// Called once per residual evaluation.
    fn iteration(&mut self, stats: &IterationStats);
}

impl<F> Reporter for F
where
    F: FnMut(&IterationStats),
{
    fn iteration(&mut self, stats: &IterationStats) {
        self(stats);
    }
}

/// Reporter that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Reporter for Silent {
    fn iteration(&mut self, _stats: &IterationStats) {}
}

/// The moment-matching system for one interval and node count.
/// Owns every buffer the outer loop needs. Each CG solve allocates its
/// own work vectors once, up front.
pub(crate) struct MomentSystem {
    /// Exact moments. Never changes after construction.
    targets: Vec<f64>,
    /// `targets - achieved`, refreshed every iteration.
    residual: Vec<f64>,
    /// Dense 2n × 2n Jacobian, refreshed every iteration.
    jac: Mat<f64>,
    /// Gauss-Newton increment, nodes then weights.
    step: Vec<f64>,
}

impl MomentSystem {
    pub fn new(interval: Interval, n: usize) -> Self {
        let m = num_moments(n);
        Self {
            targets: moment_targets(interval, n),
            residual: vec![0.0; m],
            jac: empty_jacobian(n),
            step: vec![0.0; 2 * n],
        }
    }

    /// Number of nodes.
    pub fn n(&self) -> usize {
        self.step.len() / 2
    }

    /// Recompute the residual buffer and return its norm.
    pub fn refresh_residual(&mut self, nodes: &[f64], weights: &[f64]) -> f64 {
        moments::residual(&self.targets, nodes, weights, &mut self.residual);
        moments::l2_norm(&self.residual)
    }

    #[cfg(test)]
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }
}
