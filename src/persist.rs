//! CSV persistence for scored customer tables

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::info;

use crate::rfm::CustomerRfm;

/// Output header, in the order downstream consumers rely on.
pub const RFM_COLUMNS: [&str; 9] = [
    "customer_id",
    "recency_days",
    "frequency",
    "monetary",
    "R",
    "F",
    "M",
    "rfm_segment",
    "rfm_score",
];

/// Create a directory (and its parents) if it doesn't exist.
pub fn ensure_dir(path: impl AsRef<Path>) -> crate::Result<()> {
    fs::create_dir_all(path.as_ref())?;
    Ok(())
}

/// Build a frame with [`RFM_COLUMNS`] from a scored table.
pub fn rfm_to_frame(table: &[CustomerRfm]) -> PolarsResult<DataFrame> {
    let customer_ids: Vec<&str> = table.iter().map(|row| row.customer_id.as_str()).collect();
    let recency: Vec<i64> = table.iter().map(|row| row.recency_days).collect();
    let frequency: Vec<i64> = table.iter().map(|row| i64::from(row.frequency)).collect();
    let monetary: Vec<f64> = table.iter().map(|row| row.monetary).collect();
    let r: Vec<i32> = table.iter().map(|row| i32::from(row.r)).collect();
    let f: Vec<i32> = table.iter().map(|row| i32::from(row.f)).collect();
    let m: Vec<i32> = table.iter().map(|row| i32::from(row.m)).collect();
    let segments: Vec<&str> = table.iter().map(|row| row.rfm_segment.as_str()).collect();
    let scores: Vec<i32> = table.iter().map(|row| i32::from(row.rfm_score)).collect();

    df![
        RFM_COLUMNS[0] => customer_ids,
        RFM_COLUMNS[1] => recency,
        RFM_COLUMNS[2] => frequency,
        RFM_COLUMNS[3] => monetary,
        RFM_COLUMNS[4] => r,
        RFM_COLUMNS[5] => f,
        RFM_COLUMNS[6] => m,
        RFM_COLUMNS[7] => segments,
        RFM_COLUMNS[8] => scores,
    ]
}

/// Write a frame to `path` as CSV with a header row.
pub fn write_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> crate::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }

    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}

/// Persist the scored table as CSV
///
/// # Arguments
/// * `table` - Output of [`crate::compute_rfm`]
/// * `path` - Destination file; parent directories are created
///
/// # Returns
/// * The path written to
pub fn save_rfm(table: &[CustomerRfm], path: impl AsRef<Path>) -> crate::Result<PathBuf> {
    let path = path.as_ref();
    let mut df = rfm_to_frame(table)?;
    write_csv(&mut df, path)?;

    info!(path = %path.display(), rows = table.len(), "saved RFM scores");
    Ok(path.to_path_buf())
}
