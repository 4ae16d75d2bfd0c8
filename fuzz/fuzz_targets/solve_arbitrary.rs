#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use momentquad::{Config, datatypes::Problem};

/// Larger rules are out of scope and just slow the fuzzer down.
const MAX_NODES: usize = 8;

fuzz_target!(|setup: Setup| {
    if setup.problem.num_nodes() > MAX_NODES {
        return;
    }
    let config = Config {
        max_iterations: setup.config.max_iterations % 50,
        cg_max_iterations: setup.config.cg_max_iterations.map(|cap| cap % 200),
        ..setup.config
    };
    // Invalid problems must be rejected, not panic.
    let _ = momentquad::solve(&setup.problem, config);
    if setup.analyze {
        let _ = momentquad::solve_with_analysis(&setup.problem, config);
    }
});

#[derive(Debug, Arbitrary)]
struct Setup {
    problem: Problem,
    config: Config,
    analyze: bool,
}
