/// Inputs to the solver.
pub mod inputs;
/// Results of the solver.
pub mod outputs;

pub use inputs::{Interval, Problem};
pub use outputs::QuadratureRule;
