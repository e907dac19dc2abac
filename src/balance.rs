// This file has code from https://github.com/LIHPC-Computational-Geometry/coupe
use num_traits::ToPrimitive;
use crate::hypergraph::Hypergraph;

/// Calculates the total weight of each block, per weight dimension, for a given solution.
pub fn compute_block_balance(vertex_weights: &[Vec<f64>], solution: &[usize], num_parts: usize) -> Vec<Vec<f64>> {
    debug_assert_eq!(vertex_weights.len(), solution.len());

    let dimensions = vertex_weights.first().map_or(0, Vec::len);
    let mut block_balance = vec![vec![0.0; dimensions]; num_parts];

    for (&block, weight) in solution.iter().zip(vertex_weights) {
        if block < num_parts {
            block_balance[block]
                .iter_mut()
                .zip(weight)
                .for_each(|(total, w)| *total += w);
        }
    }

    block_balance
}

/// Total weight of all the vertices, per weight dimension.
pub fn total_vertex_weight(vertex_weights: &[Vec<f64>]) -> Vec<f64> {
    let dimensions = vertex_weights.first().map_or(0, Vec::len);
    let mut total = vec![0.0; dimensions];
    for weight in vertex_weights {
        total.iter_mut().zip(weight).for_each(|(t, w)| *t += w);
    }
    total
}

/// Compute imbalance after passing block loads.
///
/// The imbalance is the largest relative overload of a block, over every weight dimension.
pub fn compute_imbalance_from_block_balance(num_parts: usize, block_balance: &[Vec<f64>]) -> f64 {
    let dimensions = block_balance.first().map_or(0, Vec::len);

    (0..dimensions)
        .map(|dimension| {
            let total_weight: f64 = block_balance.iter().map(|block| block[dimension]).sum();
            let ideal_block_weight = total_weight / num_parts.to_f64().unwrap_or(1.0);
            if ideal_block_weight == 0.0 {
                return 0.0;
            }

            block_balance
                .iter()
                .map(|block| (block[dimension] - ideal_block_weight) / ideal_block_weight)
                .fold(0.0f64, |acc, dev| acc.max(dev))
        })
        .fold(0.0f64, |acc, dev| acc.max(dev))
}

/// Compute the imbalance of the given solution.
pub fn imbalance(num_parts: usize, solution: &[usize], vertex_weights: &[Vec<f64>]) -> f64 {
    if num_parts == 0 {
        return 0.0;
    }

    let block_balance = compute_block_balance(vertex_weights, solution, num_parts);

    compute_imbalance_from_block_balance(num_parts, &block_balance)
}

/// Per-block, per-dimension bounds the block balance has to stay within.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceBounds {
    /// Maximum weight of each block, indexed by `[block][dimension]`.
    pub upper: Vec<Vec<f64>>,

    /// Minimum weight of each block, indexed by `[block][dimension]`.
    pub lower: Vec<Vec<f64>>,
}

impl BalanceBounds {
    /// Bounds allowing every block to deviate from the ideal weight by a factor `balance_factor`.
    ///
    /// With a balance factor of lambda, a block weighs at most `(1+lambda)*(total weight)/(number of parts)`
    /// and at least `(1-lambda)*(total weight)/(number of parts)`, floored at zero.
    pub fn from_balance_factor(hgraph: &Hypergraph, num_parts: usize, balance_factor: f64) -> Self {
        let total = total_vertex_weight(&hgraph.vertex_weights);
        let num_parts_f64 = num_parts.to_f64().unwrap_or(1.0).max(1.0);

        let upper_block: Vec<f64> = total
            .iter()
            .map(|t| (1.0 + balance_factor) * t / num_parts_f64)
            .collect();
        let lower_block: Vec<f64> = total
            .iter()
            .map(|t| ((1.0 - balance_factor) * t / num_parts_f64).max(0.0))
            .collect();

        Self {
            upper: vec![upper_block; num_parts],
            lower: vec![lower_block; num_parts],
        }
    }

    /// The number of blocks the bounds are defined for.
    pub fn num_parts(&self) -> usize {
        self.upper.len()
    }

    /// Whether every block and every dimension of `block_balance` lies within the bounds.
    pub fn contains(&self, block_balance: &[Vec<f64>]) -> bool {
        block_balance.len() == self.upper.len()
            && block_balance
                .iter()
                .zip(self.upper.iter().zip(&self.lower))
                .all(|(balance, (upper, lower))| {
                    balance
                        .iter()
                        .zip(upper.iter().zip(lower))
                        .all(|(b, (u, l))| l <= b && b <= u)
                })
    }
}
