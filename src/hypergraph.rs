// This file has code from https://github.com/LIHPC-Computational-Geometry/coupe

use rayon::iter::{IntoParallelIterator, ParallelIterator as _};
use sprs::{CsMat, TriMat};
use crate::algorithms::Error;

/// Struct that represents a hypergraph with multi-dimensional vertex and hyperedge weights.
#[derive(Clone, Debug)]
pub struct Hypergraph {
    /// Hyperedge x vertex incidence matrix in CSR format: row `e` holds the vertices of hyperedge `e`.
    pub incidence: CsMat<f64>,

    /// Vertex x hyperedge incidence matrix in CSR format: row `v` holds the hyperedges of vertex `v`.
    pub vertex_incidence: CsMat<f64>,

    /// Weight vector of every vertex. All vectors share the same dimension.
    pub vertex_weights: Vec<Vec<f64>>,

    /// Weight vector of every hyperedge. All vectors share the same dimension.
    pub hyperedge_weights: Vec<Vec<f64>>,

    /// Timing paths, each an ordered sequence of vertices.
    pub paths: Vec<Vec<usize>>,

    /// Weight of every timing path.
    pub path_weights: Vec<f64>,

    // For each vertex, the timing paths that go through it.
    vertex_paths: Vec<Vec<usize>>,
}

fn check_weight_vectors(weights: &[Vec<f64>]) -> Result<(), Error> {
    let dimensions = weights.first().map_or(0, Vec::len);
    for weight in weights {
        if weight.len() != dimensions {
            return Err(Error::InputLenMismatch {
                expected: dimensions,
                actual: weight.len(),
            });
        }
        if weight.iter().any(|&w| w < 0.0) {
            return Err(Error::NegativeValues);
        }
    }
    Ok(())
}

impl Hypergraph {

    /// Create a new hypergraph.
    ///
    /// Vertex ids inside a hyperedge may appear in any order and duplicates are merged.
    /// Every hyperedge must connect at least two distinct vertices.
    pub fn new(vertex_weights: Vec<Vec<f64>>,
               hyperedges: &[Vec<usize>],
               hyperedge_weights: Vec<Vec<f64>>) -> Result<Self, Error> {

        if hyperedges.len() != hyperedge_weights.len() {
            return Err(Error::InputLenMismatch {
                expected: hyperedges.len(),
                actual: hyperedge_weights.len(),
            });
        }
        check_weight_vectors(&vertex_weights)?;
        check_weight_vectors(&hyperedge_weights)?;

        let num_vertices = vertex_weights.len();
        let num_hyperedges = hyperedges.len();
        let num_pins = hyperedges.iter().map(Vec::len).sum();

        let mut triplets = TriMat::with_capacity((num_hyperedges, num_vertices), num_pins);
        let mut transposed_triplets = TriMat::with_capacity((num_vertices, num_hyperedges), num_pins);

        for (hyperedge, pins) in hyperedges.iter().enumerate() {
            let mut pins = pins.clone();
            pins.sort_unstable();
            pins.dedup();

            if let Some(&vertex) = pins.iter().find(|&&vertex| vertex >= num_vertices) {
                return Err(Error::VertexOutOfRange { vertex, num_vertices });
            }
            if pins.len() < 2 {
                return Err(Error::DegenerateHyperedge { hyperedge });
            }

            for vertex in pins {
                triplets.add_triplet(hyperedge, vertex, 1.0);
                transposed_triplets.add_triplet(vertex, hyperedge, 1.0);
            }
        }

        Ok(Self {
            incidence: triplets.to_csr(),
            vertex_incidence: transposed_triplets.to_csr(),
            vertex_weights,
            hyperedge_weights,
            paths: Vec::new(),
            path_weights: Vec::new(),
            vertex_paths: vec![Vec::new(); num_vertices],
        })
    }

    /// Attach timing paths to the hypergraph, replacing any previous ones.
    pub fn with_timing_paths(mut self, paths: Vec<Vec<usize>>, path_weights: Vec<f64>) -> Result<Self, Error> {
        if paths.len() != path_weights.len() {
            return Err(Error::InputLenMismatch {
                expected: paths.len(),
                actual: path_weights.len(),
            });
        }
        if path_weights.iter().any(|&w| w < 0.0) {
            return Err(Error::NegativeValues);
        }

        let num_vertices = self.num_vertices();
        let mut vertex_paths = vec![Vec::new(); num_vertices];
        for (path_id, path) in paths.iter().enumerate() {
            for &vertex in path {
                if vertex >= num_vertices {
                    return Err(Error::VertexOutOfRange { vertex, num_vertices });
                }
                vertex_paths[vertex].push(path_id);
            }
        }
        // A path visiting a vertex twice pushes its id twice in a row.
        vertex_paths.iter_mut().for_each(Vec::dedup);

        self.paths = paths;
        self.path_weights = path_weights;
        self.vertex_paths = vertex_paths;
        Ok(self)
    }

    /// The number of vertices in the hypergraph.
    pub fn num_vertices(&self) -> usize {
        self.vertex_weights.len()
    }

    /// The number of hyperedges in the hypergraph.
    pub fn num_hyperedges(&self) -> usize {
        self.incidence.rows()
    }

    /// The number of timing paths.
    pub fn num_paths(&self) -> usize {
        self.paths.len()
    }

    /// Whether the hypergraph has no vertices.
    pub fn is_empty(&self) -> bool {
        self.num_vertices() == 0
    }

    /// Dimension of the vertex weight vectors.
    pub fn vertex_dimensions(&self) -> usize {
        self.vertex_weights.first().map_or(0, Vec::len)
    }

    /// Dimension of the hyperedge weight vectors.
    pub fn hyperedge_dimensions(&self) -> usize {
        self.hyperedge_weights.first().map_or(0, Vec::len)
    }

    /// The vertices of the given hyperedge, in ascending order.
    pub fn vertices(&self, hyperedge: usize) -> &[usize] {
        self.incidence
            .outer_view(hyperedge)
            .map_or(&[][..], |row| row.into_raw_storage().0)
    }

    /// The hyperedges incident to the given vertex, in ascending order.
    pub fn edges(&self, vertex: usize) -> &[usize] {
        self.vertex_incidence
            .outer_view(vertex)
            .map_or(&[][..], |row| row.into_raw_storage().0)
    }

    /// The vertices of the given timing path, in path order.
    pub fn path(&self, path_id: usize) -> &[usize] {
        &self.paths[path_id]
    }

    /// The timing paths going through the given vertex, in ascending order.
    pub fn vertex_paths(&self, vertex: usize) -> &[usize] {
        &self.vertex_paths[vertex]
    }

    /// Whether the vertices of the hyperedge span more than one block.
    pub fn is_cut(&self, hyperedge: usize, solution: &[usize]) -> bool {
        let vertices = self.vertices(hyperedge);
        match vertices.split_first() {
            Some((&first, rest)) => rest.iter().any(|&vertex| solution[vertex] != solution[first]),
            None => false,
        }
    }

    /// The hyperedges cut by the given solution, in ascending order.
    pub fn cut_hyperedges(&self, solution: &[usize]) -> Vec<usize> {
        debug_assert_eq!(self.num_vertices(), solution.len());

        (0..self.num_hyperedges())
            .into_par_iter()
            .filter(|&hyperedge| self.is_cut(hyperedge, solution))
            .collect()
    }
}
