//! A finished quadrature rule.

/// Nodes and weights, ready to integrate with.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct QuadratureRule {
    /// Abscissas, in whatever order the solver left them.
    pub nodes: Vec<f64>,
    /// One weight per node, same indexing as `nodes`.
    pub weights: Vec<f64>,
}

impl QuadratureRule {
    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Does the rule have no nodes at all?
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Approximate the integral of `f` as `Σ w_i f(x_i)`.
    pub fn integrate<F: Fn(f64) -> f64>(&self, f: F) -> f64 {
        self.nodes
            .iter()
            .zip(&self.weights)
            .map(|(&x, &w)| w * f(x))
            .sum()
    }

    /// Node/weight pairs sorted by node position.
    /// The solver never reorders nodes, so use this before comparing rules.
    pub fn sorted_pairs(&self) -> Vec<(f64, f64)> {
        let mut pairs: Vec<_> = self
            .nodes
            .iter()
            .copied()
            .zip(self.weights.iter().copied())
            .collect();
        pairs.sort_by(|l, r| l.0.total_cmp(&r.0));
        pairs
    }
}

impl std::fmt::Display for QuadratureRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:>24} {:>24}", "node", "weight")?;
        for (x, w) in self.sorted_pairs() {
            writeln!(f, "{x:>24.17e} {w:>24.17e}")?;
        }
        Ok(())
    }
}
