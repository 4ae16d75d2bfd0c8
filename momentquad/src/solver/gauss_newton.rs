use crate::{
    Config, Status,
    jacobian::refresh_jacobian,
    krylov::{CgSettings, gauss_newton_step},
};

use super::{InnerSolve, IterationStats, MomentSystem, Reporter, conditioning};

/// Everything the outer loop found out, before it's turned into a public outcome.
#[derive(Debug)]
pub(crate) struct Run {
    pub status: Status,
    /// Number of Gauss-Newton updates applied.
    pub iterations: usize,
    /// Norm of the last residual evaluated.
    pub residual_norm: f64,
    /// Residual norm of every evaluation, in order. Never empty.
    pub history: Vec<f64>,
    /// `(outer iteration, CG iterations)` for every inner solve that hit its cap
    /// or broke down.
    pub stalled_inner_solves: Vec<(usize, usize)>,
    /// Set if nodes or weights stopped being finite numbers.
    pub non_finite_at: Option<usize>,
}

impl MomentSystem {
    /// Gauss-Newton on the moment residual, updating `nodes` and `weights` in place.
    ///
    /// Each iteration: residual, convergence check, Jacobian, inner CG solve for
    /// `(JᵀJ) δ = Jᵀ r`, then `x += δ[..n]` and `w += δ[n..]`.
    /// Hitting the iteration cap is not an error; the last iterate is kept.
    #[inline(never)]
    pub fn solve_gauss_newton<R: Reporter + ?Sized>(
        &mut self,
        nodes: &mut [f64],
        weights: &mut [f64],
        config: Config,
        reporter: &mut R,
    ) -> Run {
        let n = self.n();
        debug_assert_eq!(nodes.len(), n);
        debug_assert_eq!(weights.len(), n);
        let cg_cap = config.cg_cap(2 * n);

        let mut history = Vec::with_capacity(config.max_iterations.min(1024) + 1);
        let mut stalled_inner_solves = Vec::new();

        for this_iteration in 0..config.max_iterations {
            let residual_norm = self.refresh_residual(nodes, weights);
            history.push(residual_norm);

            // Convergence check: the rule reproduces every moment to within the floor.
            if residual_norm < config.convergence_floor {
                reporter.iteration(&IterationStats {
                    iteration: this_iteration,
                    residual_norm,
                    condition_number: None,
                    inner_solve: None,
                });
                return Run {
                    status: Status::Converged,
                    iterations: this_iteration,
                    residual_norm,
                    history,
                    stalled_inner_solves,
                    non_finite_at: None,
                };
            }
            if !residual_norm.is_finite() {
                log::warn!(
                    "iteration {this_iteration}: residual is {residual_norm}, the iterate has blown up"
                );
                reporter.iteration(&IterationStats {
                    iteration: this_iteration,
                    residual_norm,
                    condition_number: None,
                    inner_solve: None,
                });
                return Run {
                    status: Status::Stopped,
                    iterations: this_iteration,
                    residual_norm,
                    history,
                    stalled_inner_solves,
                    non_finite_at: Some(this_iteration),
                };
            }

            refresh_jacobian(nodes, weights, &mut self.jac);
            let condition_number = if config.track_condition_number {
                conditioning::condition_number(&self.jac).ok()
            } else {
                None
            };

            // Tighten the inner solve as the outer residual shrinks.
            let tolerance = config.inner_tolerance_ceiling.min(residual_norm);
            let report = gauss_newton_step(
                &self.jac,
                &self.residual,
                CgSettings {
                    tolerance,
                    max_iterations: cg_cap,
                },
                &mut self.step,
            );
            log::debug!(
                "iteration {this_iteration}: residual = {residual_norm:e}, cg iterations = {}, cg converged = {}{}",
                report.iterations,
                report.converged,
                condition_number
                    .map(|c| format!(", cond(J) = {c:e}"))
                    .unwrap_or_default(),
            );
            if !report.converged {
                stalled_inner_solves.push((this_iteration, report.iterations));
            }
            reporter.iteration(&IterationStats {
                iteration: this_iteration,
                residual_norm,
                condition_number,
                inner_solve: Some(InnerSolve { tolerance, report }),
            });

            let (dx, dw) = self.step.split_at(n);
            nodes.iter_mut().zip(dx).for_each(|(x, d)| *x += d);
            weights.iter_mut().zip(dw).for_each(|(w, d)| *w += d);
        }

        // Out of iterations. Still report where the last update landed.
        let residual_norm = self.refresh_residual(nodes, weights);
        history.push(residual_norm);
        reporter.iteration(&IterationStats {
            iteration: config.max_iterations,
            residual_norm,
            condition_number: None,
            inner_solve: None,
        });
        let status = if residual_norm < config.convergence_floor {
            Status::Converged
        } else {
            Status::Stopped
        };
        Run {
            status,
            iterations: config.max_iterations,
            residual_norm,
            history,
            stalled_inner_solves,
            non_finite_at: (!residual_norm.is_finite()).then_some(config.max_iterations),
        }
    }
}
