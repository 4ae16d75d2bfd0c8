use crate::{datatypes::Problem, solver::Run};

/// Something suspicious about a problem or a solve, which didn't stop it.
#[derive(Debug, Clone)]
#[cfg_attr(test, derive(PartialEq))]
pub struct Warning {
    /// Which node this is about, if it's about one in particular.
    pub about_node: Option<usize>,
    /// What's wrong.
    pub content: WarningContent,
}

/// The kinds of [`Warning`].
#[derive(Debug, Clone)]
#[cfg_attr(test, derive(PartialEq))]
#[non_exhaustive]
pub enum WarningContent {
    /// An initial node lies outside `[a, b]`.
    NodeOutsideInterval {
        /// The offending node position.
        node: f64,
    },
    /// Two initial nodes sit on top of each other, so the Jacobian is singular.
    NodesCoincide {
        /// The other node of the pair.
        other: usize,
    },
    /// Initial weights don't sum to `b - a`, so the zeroth moment starts off wrong.
    WeightSumMismatch {
        /// What they do sum to.
        sum: f64,
        /// `b - a`.
        expected: f64,
    },
    /// The iteration cap was reached above the convergence floor.
    DidNotConverge {
        /// Iterations used, i.e. the cap.
        iterations: usize,
        /// Residual norm where the solver stopped.
        residual_norm: f64,
    },
    /// The residual norm went up several iterations in a row.
    ResidualIncreased {
        /// Outer iteration where the run of increases ended.
        iteration: usize,
        /// How many increases in a row.
        consecutive: usize,
    },
    /// An inner CG solve stopped before reaching its tolerance.
    InnerSolveStalled {
        /// Outer iteration it happened in.
        iteration: usize,
        /// CG iterations it ran for.
        cg_iterations: usize,
    },
    /// The Jacobian at the final iterate is numerically singular.
    IllConditioned {
        /// Its condition number.
        condition_number: f64,
    },
    /// Nodes or weights became NaN or infinite, so the solve stopped.
    NonFiniteIterate {
        /// Outer iteration where it was noticed.
        iteration: usize,
    },
}

/// More than this many consecutive residual increases gets a warning.
const MAX_CONSECUTIVE_INCREASES: usize = 2;

/// Look over a problem before solving it.
pub fn lint(problem: &Problem) -> Vec<Warning> {
    let mut warnings = Vec::default();
    let interval = problem.interval();
    let width = interval.width();

    for (i, &node) in problem.nodes().iter().enumerate() {
        if !interval.contains(node) {
            warnings.push(Warning {
                about_node: Some(i),
                content: WarningContent::NodeOutsideInterval { node },
            });
        }
    }

    let nodes = problem.nodes();
    for i in 0..nodes.len() {
        for j in (i + 1)..nodes.len() {
            if nearly_eq(nodes[i], nodes[j], width) {
                warnings.push(Warning {
                    about_node: Some(i),
                    content: WarningContent::NodesCoincide { other: j },
                });
            }
        }
    }

    let sum: f64 = problem.weights().iter().sum();
    if (sum - width).abs() > 1e-8 * width {
        warnings.push(Warning {
            about_node: None,
            content: WarningContent::WeightSumMismatch {
                sum,
                expected: width,
            },
        });
    }
    warnings
}

/// Everything worth flagging about a finished run.
pub(crate) fn lint_run(run: &Run) -> Vec<Warning> {
    let mut warnings = residual_increases(&run.history);
    warnings.extend(
        run.stalled_inner_solves
            .iter()
            .map(|&(iteration, cg_iterations)| Warning {
                about_node: None,
                content: WarningContent::InnerSolveStalled {
                    iteration,
                    cg_iterations,
                },
            }),
    );
    if let Some(iteration) = run.non_finite_at {
        warnings.push(Warning {
            about_node: None,
            content: WarningContent::NonFiniteIterate { iteration },
        });
    } else if run.status == crate::Status::Stopped {
        warnings.push(Warning {
            about_node: None,
            content: WarningContent::DidNotConverge {
                iterations: run.iterations,
                residual_norm: run.residual_norm,
            },
        });
    }
    warnings
}

/// Flag every run of more than two consecutive residual increases.
/// The residual should trend down; a long climb usually means a broken Jacobian
/// or a start too far from any rule.
pub(crate) fn residual_increases(history: &[f64]) -> Vec<Warning> {
    let mut warnings = Vec::new();
    let mut consecutive = 0;
    for (i, pair) in history.windows(2).enumerate() {
        if pair[1] > pair[0] {
            consecutive += 1;
        } else {
            if consecutive > MAX_CONSECUTIVE_INCREASES {
                warnings.push(increase_warning(i, consecutive));
            }
            consecutive = 0;
        }
    }
    if consecutive > MAX_CONSECUTIVE_INCREASES {
        warnings.push(increase_warning(history.len() - 1, consecutive));
    }
    warnings
}

fn increase_warning(iteration: usize, consecutive: usize) -> Warning {
    Warning {
        about_node: None,
        content: WarningContent::ResidualIncreased {
            iteration,
            consecutive,
        },
    }
}

impl std::fmt::Display for WarningContent {
    #[mutants::skip]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WarningContent::NodeOutsideInterval { node } => write!(
                f,
                "Initial node {node} is outside the interval. The solver will still try, but the Jacobian may be badly scaled."
            ),
            WarningContent::NodesCoincide { other } => write!(
                f,
                "This node practically overlaps node {other}, which makes the Jacobian singular. Spread your initial nodes out."
            ),
            WarningContent::WeightSumMismatch { sum, expected } => write!(
                f,
                "Initial weights sum to {sum} but the interval has width {expected}"
            ),
            WarningContent::DidNotConverge {
                iterations,
                residual_norm,
            } => write!(
                f,
                "Did not converge in {iterations} iterations, stopped at residual {residual_norm:e}. Check whether that's good enough for you."
            ),
            WarningContent::ResidualIncreased {
                iteration,
                consecutive,
            } => write!(
                f,
                "Residual increased {consecutive} times in a row, up to iteration {iteration}"
            ),
            WarningContent::InnerSolveStalled {
                iteration,
                cg_iterations,
            } => write!(
                f,
                "Conjugate gradient stopped short of its tolerance after {cg_iterations} iterations, in iteration {iteration}"
            ),
            WarningContent::IllConditioned { condition_number } => write!(
                f,
                "The final Jacobian is ill-conditioned (cond = {condition_number:e}), nodes may have collided"
            ),
            WarningContent::NonFiniteIterate { iteration } => write!(
                f,
                "Nodes or weights became NaN or infinite in iteration {iteration}"
            ),
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.about_node {
            Some(i) => write!(f, "node {i}: {}", self.content),
            None => self.content.fmt(f),
        }
    }
}

fn nearly_eq(a: f64, b: f64, width: f64) -> bool {
    (a - b).abs() <= 1e-12 * width
}
