use faer::linalg::svd::SvdError;

/// Errors that stop a solve before it starts, or that come out of the
/// optional numeric analysis afterwards.
///
/// Running out of iterations is not in here, the solver still
/// returns its best estimate, see [`crate::Status::Stopped`].
#[derive(thiserror::Error, Debug)]
#[cfg_attr(not(feature = "unstable-exhaustive"), non_exhaustive)]
pub enum Error {
    /// A rule needs at least one node.
    #[error("Cannot build a quadrature rule with zero nodes")]
    NoNodes,
    /// The interval must satisfy `a < b`.
    #[error("The interval [{a}, {b}] is empty, the lower bound must be strictly below the upper bound")]
    EmptyInterval {
        /// Lower bound.
        a: f64,
        /// Upper bound.
        b: f64,
    },
    /// Interval bounds must be finite numbers.
    #[error("The interval bounds must be finite, but got [{a}, {b}]")]
    NonFiniteBounds {
        /// Lower bound.
        a: f64,
        /// Upper bound.
        b: f64,
    },
    /// Every node needs exactly one weight.
    #[error(
        "There should be exactly 1 weight per node, but you supplied {nodes} nodes and {weights} weights"
    )]
    MismatchedLengths {
        /// How many initial nodes were given.
        nodes: usize,
        /// How many initial weights were given.
        weights: usize,
    },
    /// An initial node or weight was NaN or infinite.
    #[error("Initial value at index {index} is not a finite number")]
    NonFiniteStart {
        /// Index into the node set, or `n + i` for weight `i`.
        index: usize,
    },
    /// A tolerance in the [`crate::Config`] can't be used.
    #[error("Tolerance {name} must be {requirement}, but was {value}")]
    InvalidTolerance {
        /// Which config field.
        name: &'static str,
        /// What the field has to be, e.g. "a positive number".
        requirement: &'static str,
        /// What it was set to.
        value: f64,
    },
    /// The outer loop must be allowed at least one iteration.
    #[error("The iteration cap must be at least 1")]
    ZeroIterationCap,
    /// Faer: could not decompose Jacobian.
    #[error("Something went wrong doing SVD in faer")]
    FaerSvd(SvdError),
}
