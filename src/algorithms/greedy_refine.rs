// K-way hyperedge greedy refinement.
//
// Different from the FM refinement, the greedy refinement only accepts moves that do
// not increase the cost. One pass sweeps the hyperedges in ascending order and moves
// every cut hyperedge to its best legal block.

use log::debug;
use crate::algorithms::{Error, HyperedgeGain, RefineMetadata, RefinePass, Refiner};
use crate::balance::BalanceBounds;
use crate::evaluator::Evaluator;
use crate::hypergraph::Hypergraph;
use crate::state::RefineState;
use crate::Partition;

/// Greedy Refiner
///
/// A strict hill climber: it never accepts a move with a negative gain.
///
/// # Example
///
/// ```rust
/// use HyperCut::algorithms::{GreedyRefine, Refiner};
/// use HyperCut::balance::BalanceBounds;
/// use HyperCut::evaluator::WeightedEvaluator;
/// use HyperCut::gen_weights::gen_uniform_weights;
/// use HyperCut::hypergraph::Hypergraph;
/// use HyperCut::Partition;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
///
///     let hyperedges = vec![vec![0, 1, 2], vec![2, 3]];
///     let hgraph = Hypergraph::new(gen_uniform_weights(4, 1), &hyperedges, gen_uniform_weights(2, 1))?;
///     let bounds = BalanceBounds::from_balance_factor(&hgraph, 2, 0.5);
///     let refiner = Refiner::new(2, 10, 1.0, 1.0, 100, WeightedEvaluator::uniform(&hgraph));
///     let mut partition = vec![0, 1, 0, 1];
///
///     GreedyRefine::new(refiner).partition(&mut partition, (&hgraph, &bounds))?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct GreedyRefine<E> {
    pub refiner: Refiner<E>,
}

impl<E: Evaluator> GreedyRefine<E> {
    pub fn new(refiner: Refiner<E>) -> Self {
        Self { refiner }
    }

    // Best legal move of the hyperedge, among the moves that do not increase the cost.
    fn best_move(&self,
                 hyperedge: usize,
                 hgraph: &Hypergraph,
                 bounds: &BalanceBounds,
                 state: &RefineState) -> Option<HyperedgeGain> {
        let mut best_gain_hyperedge: Option<HyperedgeGain> = None;

        for destination in 0..self.refiner.num_parts {
            if !self.refiner.check_move_legality(hyperedge, destination, hgraph, state, bounds) {
                continue;
            }

            let gain_hyperedge = self.refiner.calculate_gain(hyperedge, destination, hgraph, state);
            let displaces_best = match &best_gain_hyperedge {
                None => gain_hyperedge.gain >= 0.0,
                Some(best) => self.refiner.prefers(hgraph, &gain_hyperedge, best),
            };
            if displaces_best {
                best_gain_hyperedge = Some(gain_hyperedge);
            }
        }

        best_gain_hyperedge
    }
}

impl<E: Evaluator> RefinePass for GreedyRefine<E> {
    fn pass(&self,
            hgraph: &Hypergraph,
            bounds: &BalanceBounds,
            state: &mut RefineState,
            visited_vertices: &mut [bool]) -> f64 {
        self.refiner.check_pass_inputs(hgraph, bounds, state, visited_vertices);

        let mut total_gain = 0.0;
        let mut num_moves = 0;

        for hyperedge in 0..hgraph.num_hyperedges() {
            // Hyperedges fully within one block have nothing to gain.
            if !state.is_cut(hyperedge) {
                continue;
            }

            if num_moves >= self.refiner.max_move {
                debug!("greedy pass reached {num_moves} moves at hyperedge {hyperedge}, gain {total_gain:.3}");
                return total_gain;
            }

            if let Some(best_gain_hyperedge) = self.best_move(hyperedge, hgraph, bounds, state) {
                self.refiner.accept_move(&best_gain_hyperedge, hgraph, &mut total_gain, state, visited_vertices);
                num_moves += 1;
            }
        }

        debug!("greedy pass accepted {num_moves} moves, gain {total_gain:.3}");
        total_gain
    }
}

impl<'a, E: Evaluator> Partition<(&'a Hypergraph, &'a BalanceBounds)> for GreedyRefine<E> {
    type Metadata = RefineMetadata;
    type Error = Error;

    fn partition(
        &mut self,
        part_ids: &mut [usize],
        (hgraph, bounds): (&'a Hypergraph, &'a BalanceBounds),
    ) -> Result<Self::Metadata, Self::Error> {
        let policy = &*self;
        policy.refiner.refine(policy, part_ids, hgraph, bounds)
    }
}
