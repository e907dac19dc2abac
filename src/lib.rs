// This file has code from https://github.com/LIHPC-Computational-Geometry/coupe
pub mod hypergraph;
pub mod evaluator;
pub mod state;
pub mod gen_weights;
pub mod balance;
pub mod io;
pub mod algorithms;

// The `Partition` trait allows for partitioning data.
// Refinement policies implement this trait to improve a given partition.
// The generic argument `M` defines the input of the algorithms (e.g. a
// hypergraph together with its balance bounds).
// The input partition must be of the correct size; refiners read it as the
// starting point and overwrite it with the refined result.
pub trait Partition<M> {
    // Diagnostic data returned for a specific run of the algorithm.
    type Metadata;

    // Error details, should the algorithm fail to run.
    type Error;

    // Refine the partition held in `part_ids` for the given data, leaving the
    // part ID of each element in `part_ids`.
    //
    // The number of parts is fixed by the algorithm's configuration; every ID
    // in `part_ids` must be lower than it. A part whose ID does not appear in
    // the array is empty.
    fn partition(&mut self, part_ids: &mut [usize], data: M)
                 -> Result<Self::Metadata, Self::Error>;
}
