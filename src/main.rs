//! SegmentForge: customer segmentation from the command line
//!
//! This is the main entrypoint that loads a customer CSV, runs rule-based or
//! clustering-based segmentation, prints the segment summary and writes the
//! labeled records.

use std::collections::BTreeMap;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use segmentforge::cli::{Args, ClusterArgs, Command, RulesArgs};
use segmentforge::{
    generate_segment_explanations, RecordSet, SegmentSummary, Segmenter, ML_SEGMENT_COLUMN,
    RULE_SEGMENT_COLUMN,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();
    init_tracing(args.verbose);

    match &args.command {
        Command::Rules(rules) => run_rules(rules),
        Command::Cluster(cluster) => run_cluster(cluster),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Run rule-based segmentation
fn run_rules(args: &RulesArgs) -> Result<()> {
    let start_time = Instant::now();

    let result = Segmenter::default()
        .run_rule_based_segmentation(&args.io.input)
        .with_context(|| format!("rule-based segmentation of {}", args.io.input.display()))?;

    print_summary("Rule-Based Segments", &result.summary);
    if args.io.explain {
        print_explanations(&result.data, RULE_SEGMENT_COLUMN)?;
    }
    write_output(&result.data, &args.io.output)?;

    info!(elapsed_s = start_time.elapsed().as_secs_f64(), "done");
    Ok(())
}

/// Run clustering-based segmentation
fn run_cluster(args: &ClusterArgs) -> Result<()> {
    let start_time = Instant::now();

    let segmenter = Segmenter::new(args.config());
    let result = segmenter
        .run_ml_segmentation(&args.io.input, args.cluster_count())
        .with_context(|| format!("clustering segmentation of {}", args.io.input.display()))?;

    print_summary("Cluster Segments", &result.summary);
    let ratios = result.projection.explained_variance_ratio();
    println!(
        "PCA explained variance: PC1 {:.1}%, PC2 {:.1}%",
        ratios[0] * 100.0,
        ratios[1] * 100.0
    );
    println!("Model saved to: {}", result.model_path);

    if args.io.explain {
        print_explanations(&result.data, ML_SEGMENT_COLUMN)?;
    }
    write_output(&result.data, &args.io.output)?;

    info!(elapsed_s = start_time.elapsed().as_secs_f64(), "done");
    Ok(())
}

fn print_summary(title: &str, summary: &SegmentSummary) {
    println!("\n=== {} ===", title);
    print!("{}", summary);
    println!("Total: {} customers", summary.total());
}

fn print_explanations(data: &RecordSet, label_column: &str) -> Result<()> {
    let explanations: BTreeMap<String, String> = generate_segment_explanations(data, label_column)
        .context("explaining segments")?;

    println!("\n=== Segment Profiles ===");
    for (segment, text) in explanations {
        println!("\n[{}]\n{}", segment, text);
    }
    Ok(())
}

fn write_output(data: &RecordSet, path: &std::path::Path) -> Result<()> {
    data.save_csv(path)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("\nSegmented data saved to: {}", path.display());
    Ok(())
}
