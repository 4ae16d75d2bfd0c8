//! What the solver is given: an interval and a starting guess for the rule.

use crate::Error;

/// The closed interval `[a, b]` a rule integrates over.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub struct Interval {
    pub(crate) a: f64,
    pub(crate) b: f64,
}

impl Interval {
    /// `[-1, 1]`, where Gauss-Legendre rules are usually tabulated.
    pub const REFERENCE: Self = Self { a: -1.0, b: 1.0 };

    /// Create a new interval. Fails unless `a < b` and both are finite.
    pub fn new(a: f64, b: f64) -> Result<Self, Error> {
        let interval = Self { a, b };
        interval.validate()?;
        Ok(interval)
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        let Self { a, b } = *self;
        if !a.is_finite() || !b.is_finite() {
            return Err(Error::NonFiniteBounds { a, b });
        }
        if a >= b {
            return Err(Error::EmptyInterval { a, b });
        }
        Ok(())
    }

    /// Lower bound.
    #[inline(always)]
    pub fn a(&self) -> f64 {
        self.a
    }

    /// Upper bound.
    #[inline(always)]
    pub fn b(&self) -> f64 {
        self.b
    }

    /// `b - a`. Also the exact zeroth moment.
    #[inline(always)]
    pub fn width(&self) -> f64 {
        self.b - self.a
    }

    /// Midpoint of the interval.
    #[inline(always)]
    pub fn midpoint(&self) -> f64 {
        0.5 * (self.a + self.b)
    }

    /// Is `x` inside `[a, b]`?
    pub fn contains(&self, x: f64) -> bool {
        self.a <= x && x <= self.b
    }

    /// `n` evenly spaced points from `a` to `b` inclusive.
    /// A single point sits at the midpoint.
    pub fn linspace(&self, n: usize) -> Vec<f64> {
        match n {
            0 => Vec::new(),
            1 => vec![self.midpoint()],
            _ => {
                let step = self.width() / (n - 1) as f64;
                (0..n)
                    .map(|i| {
                        // Pin the last point so rounding never pushes it past `b`.
                        if i == n - 1 {
                            self.b
                        } else {
                            self.a + step * i as f64
                        }
                    })
                    .collect()
            }
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.a, self.b)
    }
}

/// One run of the solver: where to integrate, and where to start searching.
/// The node count `n` is implied by the length of the initial sets.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub struct Problem {
    pub(crate) interval: Interval,
    pub(crate) nodes: Vec<f64>,
    pub(crate) weights: Vec<f64>,
}

impl Problem {
    /// Start from explicit initial nodes and weights.
    pub fn new(interval: Interval, nodes: Vec<f64>, weights: Vec<f64>) -> Result<Self, Error> {
        let problem = Self {
            interval,
            nodes,
            weights,
        };
        problem.validate()?;
        Ok(problem)
    }

    /// The usual starting point: `n` evenly spaced nodes, each with weight `(b - a) / n`,
    /// so the weights already sum to the zeroth moment.
    pub fn evenly_spaced(interval: Interval, n: usize) -> Result<Self, Error> {
        let weight = interval.width() / n as f64;
        Self::new(interval, interval.linspace(n), vec![weight; n])
    }

    /// Check everything that must hold before the first iteration.
    pub(crate) fn validate(&self) -> Result<(), Error> {
        self.interval.validate()?;
        if self.nodes.len() != self.weights.len() {
            return Err(Error::MismatchedLengths {
                nodes: self.nodes.len(),
                weights: self.weights.len(),
            });
        }
        if self.nodes.is_empty() {
            return Err(Error::NoNodes);
        }
        if let Some(index) = self
            .nodes
            .iter()
            .chain(self.weights.iter())
            .position(|v| !v.is_finite())
        {
            return Err(Error::NonFiniteStart { index });
        }
        Ok(())
    }

    /// Interval to integrate over.
    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Number of nodes (and of weights).
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Initial node positions.
    pub fn nodes(&self) -> &[f64] {
        &self.nodes
    }

    /// Initial weights.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}
