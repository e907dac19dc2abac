// Primitives shared by every refinement policy: move legality, gain computation,
// comparison of candidate moves and application of a move to the refinement state.
//
// A move relocates all the vertices of a hyperedge that are not yet in the destination
// block, so that the hyperedge ends up entirely inside that block.

use log::info;
use rustc_hash::FxHashMap;
use crate::algorithms::Error;
use crate::balance::BalanceBounds;
use crate::evaluator::Evaluator;
use crate::hypergraph::Hypergraph;
use crate::state::RefineState;

/// A candidate move: bring every vertex of `hyperedge` into block `destination`.
#[derive(Debug, Clone, PartialEq)]
pub struct HyperedgeGain {
    /// The hyperedge whose vertices are moved.
    pub hyperedge: usize,

    /// The block the vertices are moved to.
    pub destination: usize,

    /// Decrease in total cost if the move is applied. Negative when the cost increases.
    pub gain: f64,

    /// Cost of every timing path affected by the move, as it will be once the move is applied.
    pub paths_cost: Vec<(usize, f64)>,
}

/// Diagnostic data returned by a refinement run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RefineMetadata {
    /// Number of passes that ran.
    pub passes: u32,

    /// Sum of the gains of the kept passes.
    pub total_gain: f64,
}

/// A refinement policy. One call to `pass` sweeps the hypergraph once and returns the
/// total gain of the moves it accepted.
pub trait RefinePass {
    fn pass(&self,
            hgraph: &Hypergraph,
            bounds: &BalanceBounds,
            state: &mut RefineState,
            visited_vertices: &mut [bool]) -> f64;
}

#[derive(Debug, Clone)]
pub struct Refiner<E> {
    // Number of blocks of the partition.
    pub num_parts: usize,

    // Maximum number of passes a refinement run performs.
    pub refiner_iters: u32,

    // Factor applied to the crossing cost of the timing paths.
    pub path_wt_factor: f64,

    // Factor applied to the snaking cost of the timing paths.
    pub snaking_wt_factor: f64,

    // Maximum number of moves accepted in a single pass.
    pub max_move: usize,

    // Cost model.
    pub evaluator: E,
}

impl<E: Evaluator> Refiner<E> {

    pub fn new(num_parts: usize,
               refiner_iters: u32,
               path_wt_factor: f64,
               snaking_wt_factor: f64,
               max_move: usize,
               evaluator: E) -> Self {
        Self {
            num_parts,
            refiner_iters,
            path_wt_factor,
            snaking_wt_factor,
            max_move,
            evaluator,
        }
    }

    /// Build the refinement state of a solution: block balance, net degrees and path costs.
    pub fn init_state(&self, hgraph: &Hypergraph, solution: Vec<usize>) -> Result<RefineState, Error> {
        let mut state = RefineState::with_solution(hgraph, solution, self.num_parts)?;

        let paths_cost: Vec<f64> = (0..hgraph.num_paths())
            .map(|path_id| self.path_cost(hgraph, path_id, |vertex| state.solution[vertex]))
            .collect();
        state.paths_cost = paths_cost;

        Ok(state)
    }

    /// Weighted cost of a timing path when each vertex sits in the block given by `block_of`.
    pub fn path_cost(&self, hgraph: &Hypergraph, path_id: usize, block_of: impl Fn(usize) -> usize) -> f64 {
        let blocks: Vec<usize> = hgraph.path(path_id).iter().map(|&vertex| block_of(vertex)).collect();
        let cost = self.evaluator.path_cost(hgraph, path_id, &blocks);

        self.evaluator.weighted_path_cost(cost, self.path_wt_factor, self.snaking_wt_factor)
    }

    /// Whether moving the hyperedge to `destination` keeps the balance within bounds.
    ///
    /// The destination block must stay under its upper bound and every block losing
    /// vertices must stay over its lower bound, in every weight dimension.
    pub fn check_move_legality(&self,
                               hyperedge: usize,
                               destination: usize,
                               hgraph: &Hypergraph,
                               state: &RefineState,
                               bounds: &BalanceBounds) -> bool {
        let mut destination_balance = state.block_balance[destination].clone();
        let mut sources_balance: FxHashMap<usize, Vec<f64>> = FxHashMap::default();

        for &vertex in hgraph.vertices(hyperedge) {
            let source = state.solution[vertex];
            if source == destination {
                continue;
            }

            let weight = &hgraph.vertex_weights[vertex];
            destination_balance.iter_mut().zip(weight).for_each(|(b, w)| *b += w);
            sources_balance
                .entry(source)
                .or_insert_with(|| state.block_balance[source].clone())
                .iter_mut()
                .zip(weight)
                .for_each(|(b, w)| *b -= w);
        }

        let exceeds_upper = destination_balance
            .iter()
            .zip(&bounds.upper[destination])
            .any(|(balance, upper)| balance > upper);
        if exceeds_upper {
            return false;
        }

        sources_balance.iter().all(|(&source, balance)| {
            balance
                .iter()
                .zip(&bounds.lower[source])
                .all(|(balance, lower)| balance >= lower)
        })
    }

    /// Gain of moving the hyperedge to `destination`.
    ///
    /// Every hyperedge touching a moved vertex contributes the decrease of its cost as
    /// reported by the evaluator. Every timing path through a moved vertex contributes the
    /// decrease of its weighted cost.
    pub fn calculate_gain(&self,
                          hyperedge: usize,
                          destination: usize,
                          hgraph: &Hypergraph,
                          state: &RefineState) -> HyperedgeGain {
        // Sorted, since the vertices of a hyperedge are.
        let moved_vertices: Vec<usize> = hgraph
            .vertices(hyperedge)
            .iter()
            .copied()
            .filter(|&vertex| state.solution[vertex] != destination)
            .collect();

        // Source block of every moved vertex, grouped by the hyperedges it belongs to.
        let mut departures: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
        for &vertex in &moved_vertices {
            for &neighbor_hyperedge in hgraph.edges(vertex) {
                departures.entry(neighbor_hyperedge).or_default().push(state.solution[vertex]);
            }
        }
        let mut departures: Vec<(usize, Vec<usize>)> = departures.into_iter().collect();
        departures.sort_unstable_by_key(|(neighbor_hyperedge, _)| *neighbor_hyperedge);

        let mut gain = 0.0;
        for (neighbor_hyperedge, sources) in departures {
            let degrees = &state.net_degs[neighbor_hyperedge];
            let mut updated_degrees = degrees.clone();
            for source in sources {
                updated_degrees[source] -= 1;
                updated_degrees[destination] += 1;
            }

            gain -= self.evaluator.hyperedge_cost_delta(hgraph, neighbor_hyperedge, degrees, &updated_degrees);
        }

        let mut paths_cost = Vec::new();
        if hgraph.num_paths() > 0 {
            let mut affected_paths: Vec<usize> = moved_vertices
                .iter()
                .flat_map(|&vertex| hgraph.vertex_paths(vertex).iter().copied())
                .collect();
            affected_paths.sort_unstable();
            affected_paths.dedup();

            for path_id in affected_paths {
                let updated_cost = self.path_cost(hgraph, path_id, |vertex| {
                    if moved_vertices.binary_search(&vertex).is_ok() {
                        destination
                    } else {
                        state.solution[vertex]
                    }
                });
                gain += state.paths_cost[path_id] - updated_cost;
                paths_cost.push((path_id, updated_cost));
            }
        }

        HyperedgeGain {
            hyperedge,
            destination,
            gain,
            paths_cost,
        }
    }

    /// Whether `candidate` is a strictly better move than `incumbent`.
    ///
    /// Higher gain wins. On equal gain, the move of the hyperedge with the smaller vertex
    /// weight sum wins, which keeps balance headroom for heavier moves.
    pub fn prefers(&self, hgraph: &Hypergraph, candidate: &HyperedgeGain, incumbent: &HyperedgeGain) -> bool {
        if candidate.gain > incumbent.gain {
            return true;
        }

        candidate.gain == incumbent.gain
            && self.evaluator.hyperedge_vertex_weight_sum(hgraph, candidate.hyperedge)
                < self.evaluator.hyperedge_vertex_weight_sum(hgraph, incumbent.hyperedge)
    }

    /// Apply a move to the refinement state.
    ///
    /// Solution, block balance, net degrees and path costs are updated together, the moved
    /// vertices are marked as visited and the gain is added to `total_gain`. The candidate must
    /// have been computed against the current state.
    pub fn accept_move(&self,
                       candidate: &HyperedgeGain,
                       hgraph: &Hypergraph,
                       total_gain: &mut f64,
                       state: &mut RefineState,
                       visited_vertices: &mut [bool]) {
        let destination = candidate.destination;
        assert!(destination < self.num_parts, "destination block {destination} does not exist");

        for &vertex in hgraph.vertices(candidate.hyperedge) {
            let source = state.solution[vertex];
            if source == destination {
                continue;
            }

            for (dimension, weight) in hgraph.vertex_weights[vertex].iter().enumerate() {
                state.block_balance[source][dimension] -= weight;
                state.block_balance[destination][dimension] += weight;
            }
            for &hyperedge in hgraph.edges(vertex) {
                state.net_degs[hyperedge][source] -= 1;
                state.net_degs[hyperedge][destination] += 1;
            }
            state.solution[vertex] = destination;
            visited_vertices[vertex] = true;
        }

        for &(path_id, cost) in &candidate.paths_cost {
            state.paths_cost[path_id] = cost;
        }

        *total_gain += candidate.gain;
    }

    /// Panics if the arguments of a pass do not describe the same hypergraph and partition.
    pub(crate) fn check_pass_inputs(&self,
                                    hgraph: &Hypergraph,
                                    bounds: &BalanceBounds,
                                    state: &RefineState,
                                    visited_vertices: &[bool]) {
        assert_eq!(state.solution.len(), hgraph.num_vertices(), "solution length");
        assert_eq!(visited_vertices.len(), hgraph.num_vertices(), "visited flags length");
        assert_eq!(state.net_degs.len(), hgraph.num_hyperedges(), "net degree rows");
        assert_eq!(state.paths_cost.len(), hgraph.num_paths(), "path cost length");
        assert_eq!(state.block_balance.len(), self.num_parts, "block balance rows");
        assert_eq!(bounds.upper.len(), self.num_parts, "upper bound rows");
        assert_eq!(bounds.lower.len(), self.num_parts, "lower bound rows");
        assert!(
            state.solution.iter().all(|&block| block < self.num_parts),
            "solution assigns a vertex to a block that does not exist"
        );
        assert!(
            state.net_degs.iter().all(|degrees| degrees.len() == self.num_parts),
            "net degree rows must have one entry per block"
        );

        let dimensions = hgraph.vertex_dimensions();
        for (name, matrix) in [("upper bound", &bounds.upper), ("lower bound", &bounds.lower), ("block balance", &state.block_balance)] {
            assert!(
                matrix.iter().all(|row| row.len() == dimensions),
                "{name} rows must have {dimensions} weight dimensions"
            );
        }
    }

    /// Run `policy` on `part_ids` until a pass brings no gain or `refiner_iters` passes ran.
    ///
    /// A pass ending with a negative total gain is discarded and stops the run.
    pub fn refine<P: RefinePass>(&self,
                                 policy: &P,
                                 part_ids: &mut [usize],
                                 hgraph: &Hypergraph,
                                 bounds: &BalanceBounds) -> Result<RefineMetadata, Error> {
        for bound in [&bounds.upper, &bounds.lower] {
            if bound.len() != self.num_parts {
                return Err(Error::InputLenMismatch {
                    expected: self.num_parts,
                    actual: bound.len(),
                });
            }
            if let Some(block_bound) = bound.iter().find(|b| b.len() != hgraph.vertex_dimensions()) {
                return Err(Error::InputLenMismatch {
                    expected: hgraph.vertex_dimensions(),
                    actual: block_bound.len(),
                });
            }
        }

        let mut state = self.init_state(hgraph, part_ids.to_vec())?;
        let mut visited_vertices = vec![false; hgraph.num_vertices()];
        let mut metadata = RefineMetadata::default();

        while metadata.passes < self.refiner_iters {
            let solution_before_pass = state.solution.clone();
            visited_vertices.fill(false);

            let gain = policy.pass(hgraph, bounds, &mut state, &mut visited_vertices);
            metadata.passes += 1;

            if gain < 0.0 {
                info!("pass {} lost {:.3}, restoring the previous solution", metadata.passes, -gain);
                state = self.init_state(hgraph, solution_before_pass)?;
                break;
            }

            metadata.total_gain += gain;
            info!("pass {} gained {:.3}", metadata.passes, gain);

            if gain == 0.0 {
                break;
            }
        }

        part_ids.copy_from_slice(&state.solution);
        Ok(metadata)
    }
}
