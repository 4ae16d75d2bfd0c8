use std::{path::PathBuf, time::Duration};

use clap::Parser;
use log::LevelFilter;
use momentquad::{
    Config, IterationStats, Polynomial, SolveOutcome, Status, Warning,
    datatypes::{Interval, Problem, QuadratureRule},
    gauss_legendre_on,
};
use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, StandardNormal};

mod visualize;

/// Exit code when the problem or config was rejected.
const EXIT_INVALID_CONFIG: i32 = 1;
/// Exit code when the run stopped at the iteration cap.
const EXIT_NOT_CONVERGED: i32 = 2;
/// Exit code when the results couldn't be written out, e.g. the plot.
const EXIT_OUTPUT_FAILED: i32 = 3;

#[derive(Parser)]
#[command(name = "momentquad", version, about, long_about = None)]
struct Cli {
    /// Number of quadrature nodes.
    #[arg(short = 'n', long, default_value_t = 5)]
    nodes: usize,

    /// Lower end of the interval.
    #[arg(short = 'a', default_value_t = -1.0, allow_negative_numbers = true)]
    a: f64,

    /// Upper end of the interval.
    #[arg(short = 'b', default_value_t = 1.0, allow_negative_numbers = true)]
    b: f64,

    /// Give up after this many Gauss-Newton iterations.
    #[arg(long, default_value_t = Config::default().max_iterations)]
    max_iterations: usize,

    /// Stop once the residual norm drops below this.
    #[arg(long, default_value_t = Config::default().convergence_floor)]
    floor: f64,

    /// Loosest tolerance for the inner conjugate gradient solves.
    #[arg(long = "inner-tol", default_value_t = Config::default().inner_tolerance_ceiling)]
    inner_tol: f64,

    /// Also print cond(J) every iteration. Costs an SVD per iteration.
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Don't print per-iteration progress.
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    quiet: bool,

    /// Seed for the random polynomial used to spot-check the rule.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Save a plot of the rule and its distance from Gauss-Legendre as a PNG.
    #[arg(short = 'o', long)]
    plot: Option<PathBuf>,

    /// Print the final nodes and weights.
    #[arg(long = "show-rule")]
    show_rule: bool,
}

impl Cli {
    fn config(&self) -> Config {
        Config::default()
            .with_max_iterations(self.max_iterations)
            .with_convergence_floor(self.floor)
            .with_inner_tolerance_ceiling(self.inner_tol)
            .with_condition_tracking(self.verbose)
    }

    fn problem(&self) -> Result<Problem, momentquad::Error> {
        Problem::evenly_spaced(Interval::new(self.a, self.b)?, self.nodes)
    }

    fn chart_name(&self) -> String {
        format!("{}-node rule on [{}, {}]", self.nodes, self.a, self.b)
    }

    fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else if self.quiet {
            LevelFilter::Error
        } else {
            LevelFilter::Warn
        }
    }
}

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();

    let run = match main_inner(&cli) {
        Ok(run) => run,
        Err(e) => {
            print_failure_output(&e);
            std::process::exit(EXIT_INVALID_CONFIG);
        }
    };
    let output = handle_output(&run, &cli);
    if let Err(ref e) = output {
        eprintln!("Error: {e}");
    }
    if let Some(code) = exit_code(&run, &output) {
        std::process::exit(code);
    }
}

/// Nonzero exit code for a run that was solved, if anything went wrong.
/// Failing to write output wins over not converging.
fn exit_code(run: &Run, output: &anyhow::Result<()>) -> Option<i32> {
    if output.is_err() {
        Some(EXIT_OUTPUT_FAILED)
    } else if run.outcome.status() == Status::Stopped {
        Some(EXIT_NOT_CONVERGED)
    } else {
        None
    }
}

/// One solve plus everything computed to judge it.
struct Run {
    outcome: SolveOutcome,
    reference: QuadratureRule,
    spot_check: SpotCheck,
    duration: Duration,
}

/// A random polynomial the rule should integrate exactly.
struct SpotCheck {
    polynomial: Polynomial,
    exact: f64,
    approx: f64,
}

impl SpotCheck {
    /// Degree `2n - 2` with standard normal coefficients.
    fn new(outcome: &SolveOutcome, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let degree = (2 * outcome.nodes().len()).saturating_sub(2);
        let coefficients: Vec<f64> = (0..=degree)
            .map(|_| StandardNormal.sample(&mut rng))
            .collect();
        let polynomial = Polynomial::new(coefficients);
        let interval = outcome.interval();
        let exact = polynomial.integrate(interval.a(), interval.b());
        let approx = outcome.integrate(|x| polynomial.eval(x));
        Self {
            polynomial,
            exact,
            approx,
        }
    }

    fn relative_error(&self) -> f64 {
        (self.approx - self.exact).abs() / self.exact.abs().max(f64::MIN_POSITIVE)
    }
}

fn main_inner(cli: &Cli) -> Result<Run, momentquad::Error> {
    let problem = cli.problem()?;
    let config = cli.config();
    let quiet = cli.quiet;
    let verbose = cli.verbose;

    let now = std::time::Instant::now();
    let outcome = momentquad::solve_with_reporter(&problem, config, &mut |stats: &IterationStats| {
        if !quiet {
            print_iteration(stats, verbose);
        }
    })?;
    let duration = now.elapsed();

    let reference = gauss_legendre_on(problem.interval(), problem.num_nodes());
    let spot_check = SpotCheck::new(&outcome, cli.seed);
    Ok(Run {
        outcome,
        reference,
        spot_check,
        duration,
    })
}

fn print_iteration(stats: &IterationStats, verbose: bool) {
    let IterationStats {
        iteration,
        residual_norm,
        condition_number,
        ..
    } = stats;
    match condition_number {
        Some(cond) if verbose => {
            println!("iteration = {iteration}: residual = {residual_norm:e}, cond(J) = {cond:e}")
        }
        _ => println!("iteration = {iteration}: residual = {residual_norm:e}"),
    }
}

fn handle_output(run: &Run, cli: &Cli) -> anyhow::Result<()> {
    print_output(run, cli.show_rule);
    if let Some(ref p) = cli.plot {
        let output_path = p.display().to_string();
        visualize::save_png(&cli.chart_name(), &run.outcome, &run.reference, &output_path)?;
    }
    Ok(())
}

/// Prints the output nicely to stdout.
fn print_output(run: &Run, show_rule: bool) {
    use colored::Colorize;
    let Run {
        outcome,
        reference,
        spot_check,
        duration,
    } = run;
    print_warnings(outcome.warnings());

    let done = format!(
        "done: # iters. = {}, res. = {:e}",
        outcome.iterations(),
        outcome.residual_norm()
    );
    if outcome.is_converged() {
        println!("{}", done.green());
    } else {
        println!("{}", done.red());
    }
    println!("Solved in {}μs", duration.as_micros());

    let (dx, dw) = max_errors(&outcome.rule(), reference);
    println!("Compared to Gauss-Legendre:");
    println!("\tmax |x - x_gl| = {dx:e}");
    println!("\tmax |w - w_gl| = {dw:e}");

    println!(
        "Random polynomial of degree {}:",
        spot_check.polynomial.degree()
    );
    println!("\texact integral = {:.17e}", spot_check.exact);
    println!("\trule gives     = {:.17e}", spot_check.approx);
    let rel = format!("{:e}", spot_check.relative_error());
    if spot_check.relative_error() <= 1e-10 {
        println!("\trelative error = {rel}");
    } else {
        println!("\trelative error = {}", rel.yellow());
    }

    if show_rule {
        print!("{}", outcome.rule());
    }
}

/// Largest node and weight differences, after sorting both rules by node.
fn max_errors(rule: &QuadratureRule, reference: &QuadratureRule) -> (f64, f64) {
    rule.sorted_pairs()
        .into_iter()
        .zip(reference.sorted_pairs())
        .fold((0.0_f64, 0.0_f64), |(dx, dw), ((x, w), (gx, gw))| {
            (libm::fmax(dx, (x - gx).abs()), libm::fmax(dw, (w - gw).abs()))
        })
}

fn print_warnings(warnings: &[Warning]) {
    use colored::Colorize;
    if !warnings.is_empty() {
        println!("Warnings:");
        for warning in warnings {
            println!("\t{}", warning.to_string().yellow());
        }
    }
}

fn print_failure_output(error: &momentquad::Error) {
    use colored::Colorize;
    eprintln!("{}: {}", "Invalid configuration".red(), error);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(nodes: usize, a: f64, b: f64) -> Cli {
        Cli {
            nodes,
            a,
            b,
            max_iterations: 100,
            floor: 1e-15,
            inner_tol: 1e-7,
            verbose: false,
            quiet: true,
            seed: 7,
            plot: None,
            show_rule: true,
        }
    }

    #[test]
    fn args_parse() {
        let parsed = Cli::try_parse_from(["momentquad", "-n", "3", "-a", "-2", "-b", "0.5"]).unwrap();
        assert_eq!(parsed.nodes, 3);
        assert_eq!(parsed.a, -2.0);
        assert_eq!(parsed.b, 0.5);
        assert_eq!(parsed.config(), Config::default());
        assert!(Cli::try_parse_from(["momentquad", "--verbose", "--quiet"]).is_err());
    }

    #[test]
    fn default_run() {
        let cli = cli(5, -1.0, 1.0);
        let run = main_inner(&cli).unwrap();
        assert!(run.outcome.is_converged());
        let (dx, dw) = max_errors(&run.outcome.rule(), &run.reference);
        assert!(dx < 1e-12 && dw < 1e-12);
        assert_eq!(run.spot_check.polynomial.coefficients.len(), 9);
        assert!(run.spot_check.relative_error() < 1e-10);
        handle_output(&run, &cli).unwrap();
    }

    #[test]
    fn spot_check_is_reproducible() {
        let cli = cli(3, -1.0, 1.0);
        let first = main_inner(&cli).unwrap();
        let second = main_inner(&cli).unwrap();
        assert_eq!(
            first.spot_check.polynomial,
            second.spot_check.polynomial
        );
    }

    #[test]
    fn invalid_configuration() {
        assert!(matches!(
            main_inner(&cli(0, -1.0, 1.0)),
            Err(momentquad::Error::NoNodes)
        ));
        assert!(matches!(
            main_inner(&cli(3, 1.0, 1.0)),
            Err(momentquad::Error::EmptyInterval { .. })
        ));
    }

    #[test]
    fn exit_codes() {
        let converged = main_inner(&cli(3, -1.0, 1.0)).unwrap();
        assert_eq!(exit_code(&converged, &Ok(())), None);
        assert_eq!(
            exit_code(&converged, &Err(anyhow::anyhow!("disk full"))),
            Some(EXIT_OUTPUT_FAILED)
        );

        let mut capped = cli(5, -1.0, 1.0);
        capped.max_iterations = 1;
        let stopped = main_inner(&capped).unwrap();
        assert_eq!(exit_code(&stopped, &Ok(())), Some(EXIT_NOT_CONVERGED));
        assert_eq!(
            exit_code(&stopped, &Err(anyhow::anyhow!("disk full"))),
            Some(EXIT_OUTPUT_FAILED)
        );

        // Writing the plot into a directory that doesn't exist is an output failure.
        let mut unwritable = cli(3, -1.0, 1.0);
        unwritable.plot = Some(PathBuf::from("/nonexistent-momentquad-dir/plot.png"));
        let run = main_inner(&unwritable).unwrap();
        let output = handle_output(&run, &unwritable);
        assert_eq!(exit_code(&run, &output), Some(EXIT_OUTPUT_FAILED));
    }

    #[test]
    fn plot_to_png() {
        let mut cli = cli(4, 0.0, 2.0);
        cli.floor = 1e-13;
        cli.plot = Some(std::env::temp_dir().join("momentquad_test_plot.png"));
        let run = main_inner(&cli).unwrap();
        // Text rendering needs a system font, which a bare CI box may lack.
        if let Err(e) = handle_output(&run, &cli) {
            eprintln!("could not draw plot: {e}");
        }
    }
}
