// K-way hyperedge FM refinement.
//
// Moves are drawn from a priority queue holding the best move of every cut hyperedge.
// Unlike the greedy refinement, moves with a slightly negative gain are accepted, in the
// hope that they open the way to better moves. A vertex moves at most once per pass,
// which prevents oscillations.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use log::debug;
use rayon::prelude::*;
use crate::algorithms::{Error, HyperedgeGain, RefineMetadata, RefinePass, Refiner};
use crate::balance::BalanceBounds;
use crate::evaluator::Evaluator;
use crate::hypergraph::Hypergraph;
use crate::state::RefineState;
use crate::Partition;

#[derive(Debug, Clone)]
struct QueuedMove {
    candidate: HyperedgeGain,

    // Vertex weight sum of the hyperedge, used to break ties.
    weight_sum: f64,

    // Number of moves accepted in the pass when the candidate was computed.
    epoch: usize,
}

impl Ord for QueuedMove {
    // Higher gain first, then lighter hyperedge, lower hyperedge id, lower block, most recent evaluation.
    fn cmp(&self, other: &Self) -> Ordering {
        self.candidate
            .gain
            .total_cmp(&other.candidate.gain)
            .then_with(|| other.weight_sum.total_cmp(&self.weight_sum))
            .then_with(|| other.candidate.hyperedge.cmp(&self.candidate.hyperedge))
            .then_with(|| other.candidate.destination.cmp(&self.candidate.destination))
            .then_with(|| self.epoch.cmp(&other.epoch))
    }
}

impl PartialOrd for QueuedMove {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedMove {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedMove {}

/// FM Refiner
///
/// Accepts moves whose gain is at least `-max_negative_gain`. The gain returned by a pass
/// can therefore be negative; callers going through [`Partition`] get the solution back
/// as it was before such a pass.
#[derive(Debug, Clone)]
pub struct FmRefine<E> {
    pub refiner: Refiner<E>,

    // Magnitude of the most negative gain a move may have to be accepted.
    pub max_negative_gain: f64,
}

impl<E: Evaluator> FmRefine<E> {
    pub fn new(refiner: Refiner<E>, max_negative_gain: f64) -> Self {
        Self {
            refiner,
            max_negative_gain,
        }
    }

    // Best legal move of a cut hyperedge that leaves the visited vertices in place.
    fn best_move(&self,
                 hyperedge: usize,
                 hgraph: &Hypergraph,
                 bounds: &BalanceBounds,
                 state: &RefineState,
                 visited_vertices: &[bool]) -> Option<HyperedgeGain> {
        if !state.is_cut(hyperedge) {
            return None;
        }

        let mut best_gain_hyperedge: Option<HyperedgeGain> = None;

        for destination in 0..self.refiner.num_parts {
            let moves_visited_vertex = hgraph
                .vertices(hyperedge)
                .iter()
                .any(|&vertex| visited_vertices[vertex] && state.solution[vertex] != destination);
            if moves_visited_vertex
                || !self.refiner.check_move_legality(hyperedge, destination, hgraph, state, bounds) {
                continue;
            }

            let gain_hyperedge = self.refiner.calculate_gain(hyperedge, destination, hgraph, state);
            if gain_hyperedge.gain < -self.max_negative_gain {
                continue;
            }

            let displaces_best = match &best_gain_hyperedge {
                None => true,
                Some(best) => self.refiner.prefers(hgraph, &gain_hyperedge, best),
            };
            if displaces_best {
                best_gain_hyperedge = Some(gain_hyperedge);
            }
        }

        best_gain_hyperedge
    }

    fn queued(&self, hgraph: &Hypergraph, candidate: HyperedgeGain, epoch: usize) -> QueuedMove {
        QueuedMove {
            weight_sum: self.refiner.evaluator.hyperedge_vertex_weight_sum(hgraph, candidate.hyperedge),
            candidate,
            epoch,
        }
    }
}

impl<E: Evaluator> RefinePass for FmRefine<E> {
    fn pass(&self,
            hgraph: &Hypergraph,
            bounds: &BalanceBounds,
            state: &mut RefineState,
            visited_vertices: &mut [bool]) -> f64 {
        self.refiner.check_pass_inputs(hgraph, bounds, state, visited_vertices);

        let mut total_gain = 0.0;
        let mut num_moves = 0;

        // The initial evaluation only reads the state, so the hyperedges are scored in parallel.
        let initial_moves: Vec<HyperedgeGain> = {
            let state: &RefineState = state;
            let visited_vertices: &[bool] = visited_vertices;
            (0..hgraph.num_hyperedges())
                .into_par_iter()
                .filter_map(|hyperedge| self.best_move(hyperedge, hgraph, bounds, state, visited_vertices))
                .collect()
        };
        let mut queue: BinaryHeap<QueuedMove> = initial_moves
            .into_iter()
            .map(|candidate| self.queued(hgraph, candidate, num_moves))
            .collect();

        while let Some(queued_move) = queue.pop() {
            if num_moves >= self.refiner.max_move {
                debug!("fm pass reached {num_moves} moves with {} queued, gain {total_gain:.3}", queue.len() + 1);
                break;
            }

            let hyperedge = queued_move.candidate.hyperedge;

            // Moves evaluated before the last accepted move are out of date.
            if queued_move.epoch != num_moves {
                if let Some(candidate) = self.best_move(hyperedge, hgraph, bounds, state, visited_vertices) {
                    queue.push(self.queued(hgraph, candidate, num_moves));
                }
                continue;
            }

            let destination = queued_move.candidate.destination;
            let moved_vertices: Vec<usize> = hgraph
                .vertices(hyperedge)
                .iter()
                .copied()
                .filter(|&vertex| state.solution[vertex] != destination)
                .collect();

            self.refiner.accept_move(&queued_move.candidate, hgraph, &mut total_gain, state, visited_vertices);
            num_moves += 1;

            let mut neighbor_hyperedges: Vec<usize> = moved_vertices
                .iter()
                .flat_map(|&vertex| hgraph.edges(vertex).iter().copied())
                .collect();
            neighbor_hyperedges.sort_unstable();
            neighbor_hyperedges.dedup();

            for neighbor_hyperedge in neighbor_hyperedges {
                if let Some(candidate) = self.best_move(neighbor_hyperedge, hgraph, bounds, state, visited_vertices) {
                    queue.push(self.queued(hgraph, candidate, num_moves));
                }
            }
        }

        debug!("fm pass accepted {num_moves} moves, gain {total_gain:.3}");
        total_gain
    }
}

impl<'a, E: Evaluator> Partition<(&'a Hypergraph, &'a BalanceBounds)> for FmRefine<E> {
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

#[cfg(test)]
mod tests {
    use approx::{assert_abs_diff_eq, assert_ulps_eq};
    use itertools::assert_equal;
    use crate::evaluator::WeightedEvaluator;
    use crate::gen_weights::{gen_random_hypergraph, gen_random_timing_paths};
    use super::*;

    // Greedy is stuck on this hypergraph: moving the cut hyperedge {1, 2} cuts a heavier one.
    // Moving vertex 2 first and then vertex 3 leaves nothing cut.
    fn local_optimum() -> (Hypergraph, BalanceBounds) {
        let hyperedges = vec![vec![1, 2], vec![0, 1], vec![2, 3]];
        let hyperedge_weights = vec![vec![1.0], vec![2.0], vec![2.0]];
        let hgraph = Hypergraph::new(vec![vec![1.0]; 4], &hyperedges, hyperedge_weights).unwrap();
        let bounds = BalanceBounds {
            upper: vec![vec![4.0]; 2],
            lower: vec![vec![0.0]; 2],
        };
        (hgraph, bounds)
    }

    fn build_fm(hgraph: &Hypergraph, num_parts: usize, max_move: usize, max_negative_gain: f64) -> FmRefine<WeightedEvaluator> {
        let refiner = Refiner::new(num_parts, 10, 1.0, 1.0, max_move, WeightedEvaluator::uniform(hgraph));
        FmRefine::new(refiner, max_negative_gain)
    }

    #[test]
    fn test_queued_move_order() {
        // Arrange
        let candidate = |hyperedge, gain| HyperedgeGain { hyperedge, destination: 0, gain, paths_cost: vec![] };
        let mut queue = BinaryHeap::new();
        queue.push(QueuedMove { candidate: candidate(0, 1.0), weight_sum: 3.0, epoch: 0 });
        queue.push(QueuedMove { candidate: candidate(1, 2.0), weight_sum: 5.0, epoch: 0 });
        queue.push(QueuedMove { candidate: candidate(2, 1.0), weight_sum: 2.0, epoch: 0 });
        queue.push(QueuedMove { candidate: candidate(3, -1.0), weight_sum: 1.0, epoch: 0 });

        // Act
        let order: Vec<usize> = std::iter::from_fn(|| queue.pop())
            .map(|queued_move| queued_move.candidate.hyperedge)
            .collect();

        // Assert
        assert_eq!(order, vec![1, 2, 0, 3]);
    }

    #[test]
    fn test_pass_escapes_local_optimum() {
        // Arrange
        let (hgraph, bounds) = local_optimum();
        let fm = build_fm(&hgraph, 2, 100, 1.0);
        let mut state = fm.refiner.init_state(&hgraph, vec![0, 0, 1, 1]).unwrap();
        let mut visited_vertices = vec![false; 4];

        // Act
        let gain = fm.pass(&hgraph, &bounds, &mut state, &mut visited_vertices);

        // Assert
        assert_ulps_eq!(gain, 1.0);
        assert_equal(state.solution.iter().copied(), [0, 0, 0, 0]);
        assert_equal(visited_vertices.iter().copied(), [false, false, true, true]);
        assert_eq!(state, fm.refiner.init_state(&hgraph, state.solution.clone()).unwrap());
    }

    #[test]
    fn test_pass_respects_negative_gain_bound() {
        // Arrange
        let (hgraph, bounds) = local_optimum();
        let fm = build_fm(&hgraph, 2, 100, 0.5);
        let mut state = fm.refiner.init_state(&hgraph, vec![0, 0, 1, 1]).unwrap();
        let state_before = state.clone();
        let mut visited_vertices = vec![false; 4];

        // Act
        let gain = fm.pass(&hgraph, &bounds, &mut state, &mut visited_vertices);

        // Assert
        assert_eq!(gain, 0.0);
        assert_eq!(state, state_before);
    }

    #[test]
    fn test_pass_stops_at_max_move() {
        // Arrange
        let (hgraph, bounds) = local_optimum();
        let fm = build_fm(&hgraph, 2, 1, 1.0);
        let mut state = fm.refiner.init_state(&hgraph, vec![0, 0, 1, 1]).unwrap();
        let mut visited_vertices = vec![false; 4];

        // Act
        let gain = fm.pass(&hgraph, &bounds, &mut state, &mut visited_vertices);

        // Assert
        assert_ulps_eq!(gain, -1.0);
        assert_equal(state.solution.iter().copied(), [0, 0, 0, 1]);
    }

    #[test]
    fn test_pass_keeps_invariants() {
        // Arrange
        let hgraph = gen_random_hypergraph(60, 90, 5, Some(17)).unwrap();
        let bounds = BalanceBounds::from_balance_factor(&hgraph, 3, 0.1);
        let evaluator = WeightedEvaluator::uniform(&hgraph);
        let fm = build_fm(&hgraph, 3, 1000, 2.0);
        let solution: Vec<usize> = (0..60).map(|vertex| vertex % 3).collect();
        let mut state = fm.refiner.init_state(&hgraph, solution.clone()).unwrap();
        let mut visited_vertices = vec![false; 60];

        // Act
        let gain = fm.pass(&hgraph, &bounds, &mut state, &mut visited_vertices);

        // Assert
        let cut_cost_before = evaluator.cut_cost(&hgraph, &solution);
        let cut_cost_after = evaluator.cut_cost(&hgraph, &state.solution);
        assert_abs_diff_eq!(cut_cost_before - cut_cost_after, gain, epsilon = 1e-9);
        assert!(bounds.contains(&state.block_balance));
        assert_eq!(state, fm.refiner.init_state(&hgraph, state.solution.clone()).unwrap());
        for vertex in 0..60 {
            if solution[vertex] != state.solution[vertex] {
                assert!(visited_vertices[vertex]);
            }
        }
    }

    #[test]
    fn test_pass_with_timing_paths_keeps_path_costs() {
        // Arrange
        let hgraph = gen_random_hypergraph(60, 90, 5, Some(31)).unwrap();
        let (paths, path_weights) = gen_random_timing_paths(60, 30, 8, Some(31));
        let hgraph = hgraph.with_timing_paths(paths, path_weights).unwrap();
        let bounds = BalanceBounds::from_balance_factor(&hgraph, 3, 0.1);
        let evaluator = WeightedEvaluator::uniform(&hgraph);
        let refiner = Refiner::new(3, 10, 1.0, 0.5, 1000, WeightedEvaluator::uniform(&hgraph));
        let fm = FmRefine::new(refiner, 2.0);
        let solution: Vec<usize> = (0..60).map(|vertex| vertex % 3).collect();
        let mut state = fm.refiner.init_state(&hgraph, solution).unwrap();
        let cost_before = evaluator.cut_cost(&hgraph, &state.solution) + state.paths_cost.iter().sum::<f64>();
        let mut visited_vertices = vec![false; 60];

        // Act
        let gain = fm.pass(&hgraph, &bounds, &mut state, &mut visited_vertices);

        // Assert
        let fresh_state = fm.refiner.init_state(&hgraph, state.solution.clone()).unwrap();
        let cost_after = evaluator.cut_cost(&hgraph, &state.solution) + fresh_state.paths_cost.iter().sum::<f64>();
        assert_abs_diff_eq!(cost_before - cost_after, gain, epsilon = 1e-9);
        assert!(bounds.contains(&state.block_balance));
        assert_eq!(state, fresh_state);
    }

    #[test]
    fn test_pass_is_deterministic() {
        // Arrange
        let hgraph = gen_random_hypergraph(60, 90, 5, Some(23)).unwrap();
        let bounds = BalanceBounds::from_balance_factor(&hgraph, 3, 0.1);
        let fm = build_fm(&hgraph, 3, 1000, 1.0);
        let solution: Vec<usize> = (0..60).map(|vertex| vertex % 3).collect();
        let mut first_state = fm.refiner.init_state(&hgraph, solution).unwrap();
        let mut second_state = first_state.clone();

        // Act
        let first_gain = fm.pass(&hgraph, &bounds, &mut first_state, &mut vec![false; 60]);
        let second_gain = fm.pass(&hgraph, &bounds, &mut second_state, &mut vec![false; 60]);

        // Assert
        assert_eq!(first_gain, second_gain);
        assert_eq!(first_state, second_state);
    }

    #[test]
    fn test_partition_keeps_improving_pass() {
        // Arrange
        let (hgraph, bounds) = local_optimum();
        let mut fm = build_fm(&hgraph, 2, 100, 1.0);
        let mut partition = vec![0, 0, 1, 1];

        // Act
        let metadata = fm.partition(&mut partition, (&hgraph, &bounds)).unwrap();

        // Assert
        assert_eq!(partition, vec![0, 0, 0, 0]);
        assert_eq!(metadata.passes, 2);
        assert_ulps_eq!(metadata.total_gain, 1.0);
    }

    #[test]
    fn test_partition_discards_losing_pass() {
        // Arrange
        let (hgraph, bounds) = local_optimum();
        let mut fm = build_fm(&hgraph, 2, 1, 1.0);
        let mut partition = vec![0, 0, 1, 1];

        // Act
        let metadata = fm.partition(&mut partition, (&hgraph, &bounds)).unwrap();

        // Assert
        assert_eq!(partition, vec![0, 0, 1, 1]);
        assert_eq!(metadata.passes, 1);
        assert_eq!(metadata.total_gain, 0.0);
    }
}
