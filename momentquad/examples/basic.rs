//! A basic example for how to find a quadrature rule.
use momentquad::{
    Config, IterationStats, Status,
    datatypes::{Interval, Problem},
    gauss_legendre_on, solve_with_reporter,
};

fn main() {
    // Integrate over [0, 2] with 4 nodes.
    let interval = Interval::new(0.0, 2.0).unwrap();

    // Start from evenly spaced nodes, all with the same weight.
    let problem = Problem::evenly_spaced(interval, 4).unwrap();

    // Moments of [0, 2] reach 2^8 / 8, so ask for a slightly looser floor than the default.
    let config = Config::default().with_convergence_floor(1e-13);

    // Run the solver, printing progress as it goes.
    let outcome = solve_with_reporter(&problem, config, &mut |stats: &IterationStats| {
        println!("iteration {}: residual = {:e}", stats.iteration, stats.residual_norm);
    })
    .unwrap();

    // Check the outcome.
    match outcome.status() {
        Status::Converged => println!("Converged in {} iterations", outcome.iterations()),
        Status::Stopped => println!("Gave up, residual is {:e}", outcome.residual_norm()),
    }
    print!("{}", outcome.rule());

    // It should be the Gauss-Legendre rule.
    let reference = gauss_legendre_on(interval, 4);
    for ((x, w), (gx, gw)) in outcome.rule().sorted_pairs().into_iter().zip(reference.sorted_pairs()) {
        println!("|x - x_gl| = {:e}, |w - w_gl| = {:e}", (x - gx).abs(), (w - gw).abs());
    }
}
