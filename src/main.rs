//! RfmForge: Customer segmentation CLI using RFM quintile scoring
//!
//! This is the main entrypoint that wires the order provider, the scoring
//! engine and the CSV persister, and drives the synthetic data generator.

use anyhow::Result;
use clap::Parser;
use rfmforge::cli::{parse_day, parse_snapshot};
use rfmforge::{
    compute_rfm_frame, load_joined_orders, save_rfm, summarize, write_synthetic_dataset, Args,
    Command, GeneratorConfig,
};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();
    init_tracing(args.verbose);

    match &args.command {
        Command::Score {
            input,
            output,
            snapshot,
        } => run_scoring(input, output, snapshot.as_deref()),
        Command::Generate {
            raw_dir,
            customers,
            orders,
            seed,
            today,
        } => {
            let mut config = GeneratorConfig {
                customers: *customers,
                orders: *orders,
                seed: *seed,
                ..GeneratorConfig::default()
            };
            if let Some(today) = parse_day(today.as_deref())? {
                config.today = today;
            }
            run_generation(&config, raw_dir)
        }
    }
}

/// `RUST_LOG` wins; otherwise `--verbose` selects debug over info.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Run the scoring pipeline: load, score, summarize, save
fn run_scoring(input: &str, output: &str, snapshot: Option<&str>) -> Result<()> {
    println!("=== RFM Scoring Pipeline ===\n");

    let start_time = Instant::now();
    let snapshot = parse_snapshot(snapshot)?;

    // Step 1: Load joined orders
    tracing::debug!(input, "loading joined orders");
    let orders = load_joined_orders(input)?;
    println!("✓ Orders loaded: {} rows", orders.height());

    // Step 2: Compute RFM
    let table = compute_rfm_frame(&orders, snapshot)?;
    println!("✓ Scored {} customers", table.len());

    // Step 3: Print score distribution
    let summary = summarize(&table);
    println!("\n=== Score Distribution ===");
    for (score, count) in &summary.score_counts {
        let percentage = (*count as f64 / summary.customers as f64) * 100.0;
        println!("RFM score {:>2}: {} customers ({:.1}%)", score, count, percentage);
    }
    println!(
        "\nMean recency: {:.1} days, mean frequency: {:.2}, mean monetary: {:.2}",
        summary.mean_recency_days, summary.mean_frequency, summary.mean_monetary
    );
    println!("Distinct segments: {}", summary.segment_counts.len());

    // Step 4: Save output
    let path = save_rfm(&table, output)?;

    println!("\n=== Pipeline Complete ===");
    println!("Total processing time: {:.2}s", start_time.elapsed().as_secs_f64());
    println!("RFM scores saved to: {}", path.display());

    Ok(())
}

/// Generate synthetic customers and orders into `raw_dir`
fn run_generation(config: &GeneratorConfig, raw_dir: &str) -> Result<()> {
    println!("=== Synthetic Data Generation ===\n");
    tracing::debug!(?config, "generator settings");

    let start_time = Instant::now();
    let joined = write_synthetic_dataset(config, raw_dir)?;

    println!(
        "✓ Generated {} customers and {} orders",
        config.customers, config.orders
    );
    println!("  Processing time: {:.2}s", start_time.elapsed().as_secs_f64());
    println!("Joined orders saved to: {}", joined.display());

    Ok(())
}
