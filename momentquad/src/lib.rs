//! Gaussian quadrature by moment matching.
//!
//! Finds `n` nodes and `n` weights on `[a, b]` that integrate every monomial
//! `x^0 .. x^(2n-1)` exactly, by running Gauss-Newton on the moment residual.
//! Each Gauss-Newton step is solved matrix-free with conjugate gradient.
//!
//! ```
//! use momentquad::{Config, datatypes::{Interval, Problem}};
//!
//! let problem = Problem::evenly_spaced(Interval::REFERENCE, 3).unwrap();
//! let outcome = momentquad::solve(&problem, Config::default()).unwrap();
//! assert!(outcome.is_converged());
//! let exact = 2.0 / 5.0;
//! assert!((outcome.integrate(|x| x.powi(4)) - exact).abs() < 1e-13);
//! ```

pub use crate::analysis::{JacobianAnalysis, SolveOutcomeAnalysis};
pub use crate::error::Error;
pub use crate::moments::moment_targets;
pub use crate::reference::{Polynomial, gauss_legendre, gauss_legendre_on};
pub use crate::solve_outcome::{SolveOutcome, Status};
pub use crate::solver::{Config, InnerSolve, IterationStats, Reporter, Silent};
pub use crate::warnings::{Warning, WarningContent, lint};

use crate::analysis::{Analysis, NoAnalysis};
use crate::datatypes::Problem;
use crate::solver::MomentSystem;

/// Optional numeric analysis of the final Jacobian.
mod analysis;
/// Intervals, problems and finished rules.
pub mod datatypes;
mod error;
/// Derivatives of the moments with respect to nodes and weights.
pub mod jacobian;
/// Conjugate gradient on abstract linear operators.
pub mod krylov;
/// Exact and achieved moments, and the residual between them.
pub mod moments;
/// Gauss-Legendre rules to compare against.
pub mod reference;
mod solve_outcome;
/// The Gauss-Newton loop.
mod solver;
/// Things worth telling the user that don't stop the solve.
mod warnings;

/// Find a quadrature rule, starting from the problem's initial nodes and weights.
///
/// Running out of iterations is not an error. The outcome carries
/// [`Status::Stopped`], the last iterate and its residual norm.
pub fn solve(problem: &Problem, config: Config) -> Result<SolveOutcome, Error> {
    solve_inner::<NoAnalysis, _>(problem, config, &mut Silent).map(|(outcome, _)| outcome)
}

/// Like [`solve`], but tells `reporter` about every iteration.
pub fn solve_with_reporter<R: Reporter + ?Sized>(
    problem: &Problem,
    config: Config,
    reporter: &mut R,
) -> Result<SolveOutcome, Error> {
    solve_inner::<NoAnalysis, _>(problem, config, reporter).map(|(outcome, _)| outcome)
}

/// Like [`solve`], but also decomposes the final Jacobian to see how well-posed
/// the rule is. This costs an SVD, so it's optional.
///
/// Errors only where [`solve`] would. A Jacobian that can't be decomposed is
/// reported as infinitely ill-conditioned.
pub fn solve_with_analysis(
    problem: &Problem,
    config: Config,
) -> Result<SolveOutcomeAnalysis, Error> {
    let (mut outcome, analysis) =
        solve_inner::<JacobianAnalysis, _>(problem, config, &mut Silent)?;
    if analysis.is_ill_conditioned {
        outcome.warnings.push(Warning {
            about_node: None,
            content: WarningContent::IllConditioned {
                condition_number: analysis.condition_number,
            },
        });
    }
    Ok(SolveOutcomeAnalysis { analysis, outcome })
}

fn solve_inner<A: Analysis, R: Reporter + ?Sized>(
    problem: &Problem,
    config: Config,
    reporter: &mut R,
) -> Result<(SolveOutcome, A), Error> {
    problem.validate()?;
    config.validate()?;

    let interval = problem.interval();
    let n = problem.num_nodes();
    let mut warnings = lint(problem);
    let mut nodes = problem.nodes().to_vec();
    let mut weights = problem.weights().to_vec();

    log::info!("solving for a {n}-node rule on {interval}");
    let mut system = MomentSystem::new(interval, n);
    let run = system.solve_gauss_newton(&mut nodes, &mut weights, config, reporter);
    match run.status {
        Status::Converged => log::info!(
            "converged after {} iterations, residual = {:e}",
            run.iterations,
            run.residual_norm
        ),
        Status::Stopped => log::warn!(
            "stopped after {} iterations without converging, residual = {:e}",
            run.iterations,
            run.residual_norm
        ),
    }
    warnings.extend(warnings::lint_run(&run));

    let analysis = A::analyze(&mut system, &nodes, &weights)?;
    let outcome = SolveOutcome {
        interval,
        nodes,
        weights,
        iterations: run.iterations,
        residual_norm: run.residual_norm,
        status: run.status,
        history: run.history,
        warnings,
    };
    Ok((outcome, analysis))
}
