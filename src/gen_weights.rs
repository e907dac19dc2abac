use rand::rngs::SmallRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use crate::algorithms::Error;
use crate::hypergraph::Hypergraph;

fn seeded_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    }
}

/// Generate the weight vectors where each vertex has the same weight in every dimension
pub fn gen_uniform_weights(no_of_vertices: usize, dimensions: usize) -> Vec<Vec<f64>> {
    vec![vec![1.0; dimensions]; no_of_vertices]
}

/// Generate the weight vectors where each vertex has a random weight in every dimension
pub fn gen_random_weights(no_of_vertices: usize, dimensions: usize, min_weight: f64, max_weight: f64) -> Vec<Vec<f64>> {
    assert!(max_weight > min_weight, "Max weight must be greater than min weight.");
    assert!(min_weight > 0.0, "Min weight must be positive.");

    let mut rng = rand::thread_rng();

    (0..no_of_vertices)
        .map(|_| (0..dimensions).map(|_| rng.gen_range(min_weight..max_weight)).collect())
        .collect()
}

/// Generate a partition assigning every vertex to a random block
pub fn gen_random_partition(no_of_vertices: usize, num_parts: usize, seed: Option<u64>) -> Vec<usize> {
    assert!(num_parts > 0, "The number of parts must be positive.");

    let mut rng = seeded_rng(seed);

    (0..no_of_vertices).map(|_| rng.gen_range(0..num_parts)).collect()
}

/// Generate a hypergraph with unit weights whose hyperedges connect between two and
/// `max_hyperedge_size` distinct random vertices
pub fn gen_random_hypergraph(no_of_vertices: usize,
                             no_of_hyperedges: usize,
                             max_hyperedge_size: usize,
                             seed: Option<u64>) -> Result<Hypergraph, Error> {
    let max_hyperedge_size = max_hyperedge_size.min(no_of_vertices);
    if max_hyperedge_size < 2 {
        return Err(Error::DegenerateHyperedge { hyperedge: 0 });
    }

    let mut rng = seeded_rng(seed);

    let hyperedges: Vec<Vec<usize>> = (0..no_of_hyperedges)
        .map(|_| {
            let size = rng.gen_range(2..=max_hyperedge_size);
            sample(&mut rng, no_of_vertices, size).into_vec()
        })
        .collect();

    Hypergraph::new(
        gen_uniform_weights(no_of_vertices, 1),
        &hyperedges,
        gen_uniform_weights(no_of_hyperedges, 1),
    )
}

/// Generate timing paths of two to `max_path_len` distinct random vertices, each with a
/// random weight in `[1, 2)`
pub fn gen_random_timing_paths(no_of_vertices: usize,
                               no_of_paths: usize,
                               max_path_len: usize,
                               seed: Option<u64>) -> (Vec<Vec<usize>>, Vec<f64>) {
    let max_path_len = max_path_len.min(no_of_vertices);
    assert!(max_path_len >= 2, "Paths need at least two vertices.");

    let mut rng = seeded_rng(seed);

    (0..no_of_paths)
        .map(|_| {
            let len = rng.gen_range(2..=max_path_len);
            let path = sample(&mut rng, no_of_vertices, len).into_vec();
            (path, rng.gen_range(1.0..2.0))
        })
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gen_random_weights_range() {
        // Arrange and Act
        let weights = gen_random_weights(50, 2, 1.0, 3.0);

        // Assert
        assert_eq!(weights.len(), 50);
        assert!(weights.iter().flatten().all(|&w| (1.0..3.0).contains(&w)));
        assert!(weights.iter().all(|w| w.len() == 2));
    }

    #[test]
    fn test_gen_random_partition_is_seeded() {
        // Arrange and Act
        let first = gen_random_partition(100, 4, Some(5));
        let second = gen_random_partition(100, 4, Some(5));

        // Assert
        assert_eq!(first, second);
        assert!(first.iter().all(|&block| block < 4));
    }

    #[test]
    fn test_gen_random_hypergraph() {
        // Arrange and Act
        let hgraph = gen_random_hypergraph(30, 40, 5, Some(7)).unwrap();

        // Assert
        assert_eq!(hgraph.num_vertices(), 30);
        assert_eq!(hgraph.num_hyperedges(), 40);
        assert!((0..40).all(|e| (2..=5).contains(&hgraph.vertices(e).len())));
    }

    #[test]
    fn test_gen_random_timing_paths() {
        // Arrange and Act
        let (paths, path_weights) = gen_random_timing_paths(30, 10, 6, Some(11));

        // Assert
        assert_eq!(paths.len(), 10);
        assert_eq!(path_weights.len(), 10);
        assert!(paths.iter().all(|path| (2..=6).contains(&path.len()) && path.iter().all(|&v| v < 30)));
        assert!(path_weights.iter().all(|&w| (1.0..2.0).contains(&w)));
    }
}
