// This file has code from https://github.com/LIHPC-Computational-Geometry/coupe
use std::fmt;

mod refiner;
mod greedy_refine;
mod fm_refine;

pub use refiner::{HyperedgeGain, RefineMetadata, RefinePass, Refiner};
pub use greedy_refine::GreedyRefine;
pub use fm_refine::FmRefine;


/// Common errors thrown by algorithms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Input sets don't have matching lengths.
    InputLenMismatch { expected: usize, actual: usize },

    /// A vertex is assigned to a block that does not exist.
    BlockOutOfRange { vertex: usize, block: usize, num_parts: usize },

    /// A hyperedge or a path references a vertex that does not exist.
    VertexOutOfRange { vertex: usize, num_vertices: usize },

    /// A hyperedge connects fewer than two distinct vertices.
    DegenerateHyperedge { hyperedge: usize },

    /// Input contains negative values and such values are not supported.
    NegativeValues,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InputLenMismatch { expected, actual } => write!(
                f,
                "input sets don't have the same length (expected {expected} items, got {actual})",
            ),
            Error::BlockOutOfRange { vertex, block, num_parts } => write!(
                f,
                "vertex {vertex} is assigned to block {block}, but there are only {num_parts} blocks",
            ),
            Error::VertexOutOfRange { vertex, num_vertices } => write!(
                f,
                "vertex {vertex} does not exist (the hypergraph has {num_vertices} vertices)",
            ),
            Error::DegenerateHyperedge { hyperedge } => write!(
                f,
                "hyperedge {hyperedge} connects fewer than two distinct vertices",
            ),
            Error::NegativeValues => write!(f, "input contains negative values"),
        }
    }
}

impl std::error::Error for Error {}
