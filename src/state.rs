use crate::algorithms::Error;
use crate::balance::compute_block_balance;
use crate::evaluator::spans_several_blocks;
use crate::hypergraph::Hypergraph;

/// Block assignment of a hypergraph together with the aggregates the refiners keep
/// up to date while moving vertices.
///
/// The state is owned by the caller. Refiners borrow it mutably for the duration of a
/// pass and only ever modify it through `Refiner::accept_move`.
#[derive(Debug, Clone, PartialEq)]
pub struct RefineState {
    /// Block of every vertex.
    pub solution: Vec<usize>,

    /// Weight of every block, indexed by `[block][dimension]`.
    pub block_balance: Vec<Vec<f64>>,

    /// Number of vertices of each hyperedge in each block, indexed by `[hyperedge][block]`.
    pub net_degs: Vec<Vec<usize>>,

    /// Weighted cost of every timing path.
    pub paths_cost: Vec<f64>,
}

impl RefineState {
    /// The number of blocks the state is defined for.
    pub fn num_parts(&self) -> usize {
        self.block_balance.len()
    }

    /// Whether the hyperedge has vertices in more than one block.
    pub fn is_cut(&self, hyperedge: usize) -> bool {
        spans_several_blocks(&self.net_degs[hyperedge])
    }

    /// Build the solution-derived aggregates except the path costs, which depend on
    /// the cost model and are filled in by the refiner.
    pub(crate) fn with_solution(hgraph: &Hypergraph, solution: Vec<usize>, num_parts: usize) -> Result<Self, Error> {
        check_solution(hgraph, &solution, num_parts)?;

        Ok(Self {
            block_balance: compute_block_balance(&hgraph.vertex_weights, &solution, num_parts),
            net_degs: init_net_degs(hgraph, &solution, num_parts),
            paths_cost: vec![0.0; hgraph.num_paths()],
            solution,
        })
    }
}

/// Check that the solution assigns every vertex of the hypergraph to an existing block.
pub fn check_solution(hgraph: &Hypergraph, solution: &[usize], num_parts: usize) -> Result<(), Error> {
    if solution.len() != hgraph.num_vertices() {
        return Err(Error::InputLenMismatch {
            expected: hgraph.num_vertices(),
            actual: solution.len(),
        });
    }

    match solution.iter().position(|&block| block >= num_parts) {
        Some(vertex) => Err(Error::BlockOutOfRange {
            vertex,
            block: solution[vertex],
            num_parts,
        }),
        None => Ok(()),
    }
}

/// Count, for every hyperedge, how many of its vertices sit in each block.
pub fn init_net_degs(hgraph: &Hypergraph, solution: &[usize], num_parts: usize) -> Vec<Vec<usize>> {
    (0..hgraph.num_hyperedges())
        .map(|hyperedge| {
            let mut degrees = vec![0; num_parts];
            for &vertex in hgraph.vertices(hyperedge) {
                degrees[solution[vertex]] += 1;
            }
            degrees
        })
        .collect()
}
