use std::path::Path;
use std::time::Instant;
use HyperCut::algorithms::{FmRefine, GreedyRefine, Refiner};
use HyperCut::balance::{imbalance, BalanceBounds};
use HyperCut::evaluator::{Evaluator, WeightedEvaluator};
use HyperCut::gen_weights::gen_random_partition;
use HyperCut::io::{read_hmetis_as_hypergraph, read_partition_file, write_partition_data_to_file};
use HyperCut::Partition;
use clap::{Parser, ValueEnum};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Policy {
    /// Apply the best improving move of every cut hyperedge
    Greedy,

    /// Pick moves from a priority queue, tolerating bounded losses
    Fm,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path of the .hgr file
    hgr_filepath: String,

    /// Number of Partitions
    num_of_partitions: usize,

    /// Imbalance Ratio
    balance_factor: f64,

    /// Filename where the partition mapping can be stored
    partition_file: String,

    /// Partition to refine, one block per line. A random partition is used otherwise
    #[arg(long)]
    initial_partition: Option<String>,

    /// Seed of the random initial partition
    #[arg(long)]
    seed: Option<u64>,

    /// Number of Refinement Passes
    #[arg(short, long, default_value_t = 10)]
    iterations: u32,

    /// Maximum Number of Moves per Pass
    #[arg(short, long, default_value_t = usize::MAX)]
    max_move: usize,

    /// Timing Path Crossing Weight
    #[arg(long, default_value_t = 1.0)]
    path_wt_factor: f64,

    /// Timing Path Snaking Weight
    #[arg(long, default_value_t = 1.0)]
    snaking_wt_factor: f64,

    /// Refinement Policy
    #[arg(short, long, value_enum, default_value_t = Policy::Greedy)]
    policy: Policy,

    /// Largest Loss an FM Move may Have
    #[arg(long, default_value_t = 1.0)]
    max_negative_gain: f64,
}


fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let hgraph = read_hmetis_as_hypergraph(Path::new(&args.hgr_filepath))?;
    let mut partition = match &args.initial_partition {
        Some(file_path) => read_partition_file(Path::new(file_path))?,
        None => gen_random_partition(hgraph.num_vertices(), args.num_of_partitions, args.seed),
    };
    let bounds = BalanceBounds::from_balance_factor(&hgraph, args.num_of_partitions, args.balance_factor);
    let evaluator = WeightedEvaluator::uniform(&hgraph);
    let refiner = Refiner::new(args.num_of_partitions,
                               args.iterations,
                               args.path_wt_factor,
                               args.snaking_wt_factor,
                               args.max_move,
                               evaluator.clone());

    let cut_cost_before = evaluator.cut_cost(&hgraph, &partition);
    let start = Instant::now();
    let metadata = match args.policy {
        Policy::Greedy => GreedyRefine::new(refiner).partition(&mut partition, (&hgraph, &bounds))?,
        Policy::Fm => FmRefine::new(refiner, args.max_negative_gain).partition(&mut partition, (&hgraph, &bounds))?,
    };
    let elapsed_time = start.elapsed();
    let cut_cost = evaluator.cut_cost(&hgraph, &partition);
    let imbalance_of_partition = imbalance(args.num_of_partitions, &partition, &hgraph.vertex_weights);
    write_partition_data_to_file(&partition, &args.partition_file)?;
    println!("Passes {:?}", metadata.passes);
    println!("Gain {:?}", metadata.total_gain);
    println!("Cut cost {:?} (initial {:?})", cut_cost, cut_cost_before);
    println!("Imbalance {:?}", imbalance_of_partition);
    println!("Execution time {:?}", elapsed_time);
    Ok(())
}
