//! RfmForge: customer segmentation by Recency, Frequency and Monetary scoring
//!
//! This library turns a table of orders into per-customer RFM metrics,
//! quintile scores (1-5), a three-digit segment code and a composite score,
//! plus the CSV plumbing and synthetic data generator around it.

pub mod cli;
pub mod data;
pub mod error;
pub mod persist;
pub mod rfm;
pub mod synthetic;

// Re-export public items for easier access
pub use cli::{Args, Command};
pub use data::{
    load_joined_orders, normalize_date_column, orders_from_frame, parse_order_date, Order,
};
pub use error::RfmError;
pub use persist::{rfm_to_frame, save_rfm, RFM_COLUMNS};
pub use rfm::{compute_rfm, compute_rfm_frame, summarize, CustomerRfm, RfmSummary};
pub use synthetic::{write_synthetic_dataset, GeneratorConfig};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
