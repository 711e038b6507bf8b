//! Command-line interface definitions and argument parsing

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};

use crate::data::parse_order_date;

/// Customer segmentation CLI using RFM quintile scoring
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output (debug-level logs)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Score customers from a joined orders CSV
    Score {
        /// Path to the joined orders CSV file
        #[arg(short, long, default_value = "data/raw/joined_orders.csv")]
        input: String,

        /// Output path for the RFM scores CSV
        #[arg(short, long, default_value = "data/processed/rfm_scores.csv")]
        output: String,

        /// Snapshot date for recency, e.g. "2025-05-04"; defaults to the latest order + 1 day
        #[arg(short, long)]
        snapshot: Option<String>,
    },

    /// Generate synthetic customers and orders
    Generate {
        /// Directory receiving customers.csv, orders.csv and joined_orders.csv
        #[arg(long, default_value = "data/raw")]
        raw_dir: String,

        /// Number of customers to generate
        #[arg(long, default_value = "500")]
        customers: usize,

        /// Number of orders to generate
        #[arg(long, default_value = "5000")]
        orders: usize,

        /// RNG seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Latest possible date, e.g. "2025-06-01"; defaults to today
        #[arg(long)]
        today: Option<String>,
    },
}

/// Parse the snapshot argument using the same formats accepted for order dates.
pub fn parse_snapshot(raw: Option<&str>) -> crate::Result<Option<NaiveDateTime>> {
    raw.map(|value| {
        parse_order_date(value).ok_or_else(|| anyhow::anyhow!("Invalid snapshot date: {}", value))
    })
    .transpose()
}

/// Parse a plain `YYYY-MM-DD` calendar day.
pub fn parse_day(raw: Option<&str>) -> crate::Result<Option<NaiveDate>> {
    raw.map(|value| {
        NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
            .map_err(|_| anyhow::anyhow!("Invalid date: {}", value))
    })
    .transpose()
}
