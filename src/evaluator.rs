// Cost model consumed by the refiners.
//
// The refiners never compute a cost themselves. They ask an `Evaluator` how the cost of a
// hyperedge changes when its vertices spread over other blocks, and how much a timing path
// costs under the path weighting factors.

use rayon::iter::{IntoParallelIterator, ParallelIterator as _};
use crate::hypergraph::Hypergraph;

/// Cost of a timing path under some block assignment, split into its two terms.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PathCost {
    /// Cost of the block boundaries the path crosses.
    pub crossing: f64,

    /// Cost of the path leaving a block and coming back to it later.
    pub snaking: f64,
}

pub trait Evaluator: Sync {
    /// Weighted sum of the vertex weights of a hyperedge. Used to break ties
    /// between moves of equal gain.
    fn hyperedge_vertex_weight_sum(&self, hgraph: &Hypergraph, hyperedge: usize) -> f64;

    /// Cost paid while the hyperedge is cut.
    fn hyperedge_cost(&self, hgraph: &Hypergraph, hyperedge: usize) -> f64;

    /// Cost of a timing path, given the block of every vertex along it.
    fn path_cost(&self, hgraph: &Hypergraph, path_id: usize, blocks: &[usize]) -> PathCost;

    /// Change in the cost of a hyperedge when its number of vertices per block goes from
    /// `old_degrees` to `new_degrees`. Positive when the cost grows.
    ///
    /// The default is the cut-net metric: the hyperedge costs `hyperedge_cost` while it
    /// spans more than one block, and nothing otherwise.
    fn hyperedge_cost_delta(&self,
                            hgraph: &Hypergraph,
                            hyperedge: usize,
                            old_degrees: &[usize],
                            new_degrees: &[usize]) -> f64 {
        match (spans_several_blocks(old_degrees), spans_several_blocks(new_degrees)) {
            (true, false) => -self.hyperedge_cost(hgraph, hyperedge),
            (false, true) => self.hyperedge_cost(hgraph, hyperedge),
            _ => 0.0,
        }
    }

    /// Scalar cost of a timing path from its two terms.
    fn weighted_path_cost(&self, cost: PathCost, path_wt_factor: f64, snaking_wt_factor: f64) -> f64 {
        path_wt_factor * cost.crossing + snaking_wt_factor * cost.snaking
    }

    /// Total cost of the hyperedges cut by the solution. Evaluators that change
    /// `hyperedge_cost_delta` override it to match.
    fn cut_cost(&self, hgraph: &Hypergraph, solution: &[usize]) -> f64 {
        debug_assert_eq!(hgraph.num_vertices(), solution.len());

        (0..hgraph.num_hyperedges())
            .into_par_iter()
            .filter(|&hyperedge| hgraph.is_cut(hyperedge, solution))
            .map(|hyperedge| self.hyperedge_cost(hgraph, hyperedge))
            .sum()
    }
}

/// Whether a hyperedge with these block degrees has vertices in more than one block.
pub fn spans_several_blocks(degrees: &[usize]) -> bool {
    degrees.iter().filter(|&&degree| degree > 0).count() > 1
}

/// Evaluator that scores weight vectors with a dot product against per-dimension factors.
///
/// A timing path costs its weight once per block boundary it crosses, and once more
/// for every re-entry into a block it already visited.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedEvaluator {
    /// Factor applied to each dimension of the vertex weights.
    pub vertex_weight_factors: Vec<f64>,

    /// Factor applied to each dimension of the hyperedge weights.
    pub hyperedge_weight_factors: Vec<f64>,
}

impl WeightedEvaluator {
    /// Evaluator giving every weight dimension of the hypergraph a factor of one.
    pub fn uniform(hgraph: &Hypergraph) -> Self {
        Self {
            vertex_weight_factors: vec![1.0; hgraph.vertex_dimensions()],
            hyperedge_weight_factors: vec![1.0; hgraph.hyperedge_dimensions()],
        }
    }
}

fn dot(factors: &[f64], weights: &[f64]) -> f64 {
    factors.iter().zip(weights).map(|(factor, weight)| factor * weight).sum()
}

impl Evaluator for WeightedEvaluator {
    fn hyperedge_vertex_weight_sum(&self, hgraph: &Hypergraph, hyperedge: usize) -> f64 {
        hgraph
            .vertices(hyperedge)
            .iter()
            .map(|&vertex| dot(&self.vertex_weight_factors, &hgraph.vertex_weights[vertex]))
            .sum()
    }

    fn hyperedge_cost(&self, hgraph: &Hypergraph, hyperedge: usize) -> f64 {
        dot(&self.hyperedge_weight_factors, &hgraph.hyperedge_weights[hyperedge])
    }

    fn path_cost(&self, hgraph: &Hypergraph, path_id: usize, blocks: &[usize]) -> PathCost {
        // Sequence of blocks the path runs through, consecutive repeats collapsed.
        let mut block_sequence: Vec<usize> = Vec::with_capacity(blocks.len());
        for &block in blocks {
            if block_sequence.last() != Some(&block) {
                block_sequence.push(block);
            }
        }

        if block_sequence.len() <= 1 {
            return PathCost::default();
        }

        let path_weight = hgraph.path_weights[path_id];
        let crossings = block_sequence.len() - 1;

        let mut distinct_blocks = block_sequence.clone();
        distinct_blocks.sort_unstable();
        distinct_blocks.dedup();
        let reentries = block_sequence.len() - distinct_blocks.len();

        PathCost {
            crossing: path_weight * crossings as f64,
            snaking: path_weight * reentries as f64,
        }
    }
}
