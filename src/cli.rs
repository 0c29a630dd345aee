//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{
    KMeansConfig, ModelStore, SegmentationConfig, DEFAULT_MODEL_DIR, DEFAULT_MODEL_FILE,
};

/// Customer segmentation with threshold rules or K-Means clustering
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Segment customers with fixed income and spending thresholds
    Rules(RulesArgs),
    /// Segment customers with K-Means clustering and project them onto two principal components
    Cluster(ClusterArgs),
}

/// Input and output options shared by both segmentation methods
#[derive(clap::Args, Debug)]
pub struct IoArgs {
    /// Path to the input CSV file
    #[arg(short, long, default_value = "data.csv")]
    pub input: PathBuf,

    /// Where to write the segmented records as CSV
    #[arg(short, long, default_value = "segmented_customers.csv")]
    pub output: PathBuf,

    /// Print a description of every segment
    #[arg(long)]
    pub explain: bool,
}

#[derive(clap::Args, Debug)]
pub struct RulesArgs {
    #[command(flatten)]
    pub io: IoArgs,
}

#[derive(clap::Args, Debug)]
pub struct ClusterArgs {
    #[command(flatten)]
    pub io: IoArgs,

    /// Number of clusters for K-Means
    #[arg(
        short = 'k',
        long,
        default_value = "3",
        value_parser = clap::value_parser!(u64).range(2..=6)
    )]
    pub clusters: u64,

    /// Directory holding the persisted model
    #[arg(long, env = "SEGMENTFORGE_MODEL_DIR", default_value = DEFAULT_MODEL_DIR)]
    pub model_dir: PathBuf,

    /// File name of the persisted model inside the model directory
    #[arg(long, env = "SEGMENTFORGE_MODEL_FILE", default_value = DEFAULT_MODEL_FILE)]
    pub model_file: String,

    /// Number of K-Means initializations; the best one is kept
    #[arg(long, default_value = "10")]
    pub n_init: usize,

    /// Maximum iterations for K-Means algorithm
    #[arg(long, default_value = "300")]
    pub max_iters: u64,

    /// Tolerance for K-Means convergence
    #[arg(long, default_value = "1e-4")]
    pub tolerance: f64,

    /// Seed for K-Means initialization
    #[arg(long, env = "SEGMENTFORGE_SEED", default_value = "42")]
    pub seed: u64,
}

impl ClusterArgs {
    pub fn cluster_count(&self) -> usize {
        self.clusters as usize
    }

    /// Build the pipeline configuration from the parsed flags.
    pub fn config(&self) -> SegmentationConfig {
        SegmentationConfig::default()
            .with_store(ModelStore::new(&self.model_dir).with_file_name(&self.model_file))
            .with_kmeans(
                KMeansConfig::default()
                    .with_n_init(self.n_init)
                    .with_max_iterations(self.max_iters)
                    .with_tolerance(self.tolerance)
                    .with_seed(self.seed),
            )
    }
}
