//! Order table loading and normalization using Polars
//!
//! The provider reads the joined `orders x customers` CSV and coerces the raw
//! columns into typed [`Order`] records the engine can aggregate.

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use tracing::debug;

use crate::error::RfmError;

pub const ORDER_ID: &str = "order_id";
pub const CUSTOMER_ID: &str = "customer_id";
pub const SIGNUP_DATE: &str = "signup_date";
pub const ORDER_DATE: &str = "order_date";
pub const ORDER_AMOUNT: &str = "order_amount";

/// Columns the engine cannot work without.
pub const REQUIRED_COLUMNS: [&str; 4] = [ORDER_ID, CUSTOMER_ID, ORDER_DATE, ORDER_AMOUNT];

/// Canonical dtype for normalized date columns.
const DATETIME_DTYPE: DataType = DataType::Datetime(TimeUnit::Milliseconds, None);

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// A single order joined with its customer identity
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub order_id: String,
    pub customer_id: String,
    pub order_date: NaiveDateTime,
    pub order_amount: f64,
}

impl Order {
    pub fn new(
        order_id: impl Into<String>,
        customer_id: impl Into<String>,
        order_date: NaiveDateTime,
        order_amount: f64,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            customer_id: customer_id.into(),
            order_date,
            order_amount,
        }
    }
}

/// Parse a textual order date.
///
/// Accepts plain dates (`2025-05-01`), naive date-times with a space or `T`
/// separator and optional fractional seconds, and RFC 3339 timestamps. Offsets
/// are folded into UTC and dropped.
pub fn parse_order_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Coerce a date column to `Datetime(ms)`.
///
/// Text is parsed with [`parse_order_date`] and `Date` columns are widened.
/// A column that already holds datetimes is returned untouched, so applying
/// this twice is the same as applying it once.
pub fn normalize_date_column(mut df: DataFrame, column: &str) -> Result<DataFrame, RfmError> {
    let series = require_column(&df, column)?.clone();

    let normalized = match series.dtype() {
        DataType::Datetime(_, _) => return Ok(df),
        DataType::Date => series
            .cast(&DATETIME_DTYPE)
            .map_err(|e| RfmError::invalid_column(column, e.to_string()))?,
        DataType::String => {
            let text = series
                .str()
                .map_err(|e| RfmError::invalid_column(column, e.to_string()))?;
            let mut millis = Vec::with_capacity(text.len());
            for value in text.into_iter() {
                let raw = value.ok_or_else(|| RfmError::invalid_column(column, "null date"))?;
                let parsed = parse_order_date(raw).ok_or_else(|| {
                    RfmError::invalid_column(column, format!("unparseable date {raw:?}"))
                })?;
                millis.push(parsed.and_utc().timestamp_millis());
            }
            Series::new(column, millis)
                .cast(&DATETIME_DTYPE)
                .map_err(|e| RfmError::invalid_column(column, e.to_string()))?
        }
        other => {
            return Err(RfmError::invalid_column(
                column,
                format!("cannot interpret {other} as a date"),
            ))
        }
    };

    df.with_column(normalized)
        .map_err(|e| RfmError::invalid_column(column, e.to_string()))?;
    Ok(df)
}

/// Convert a joined orders frame into typed order records
///
/// # Arguments
/// * `df` - Frame holding at least [`REQUIRED_COLUMNS`]; dates may be text
///
/// # Returns
/// * One [`Order`] per row, in row order
pub fn orders_from_frame(df: &DataFrame) -> Result<Vec<Order>, RfmError> {
    for column in REQUIRED_COLUMNS {
        require_column(df, column)?;
    }

    let frame = normalize_date_column(df.clone(), ORDER_DATE)?;

    let order_ids = text_values(require_column(&frame, ORDER_ID)?, ORDER_ID)?;
    let customer_ids = text_values(require_column(&frame, CUSTOMER_ID)?, CUSTOMER_ID)?;
    let order_dates = datetime_values(require_column(&frame, ORDER_DATE)?, ORDER_DATE)?;
    let amounts = amount_values(require_column(&frame, ORDER_AMOUNT)?, ORDER_AMOUNT)?;

    let orders: Vec<Order> = order_ids
        .into_iter()
        .zip(customer_ids)
        .zip(order_dates.into_iter().zip(amounts))
        .map(|((order_id, customer_id), (order_date, order_amount))| Order {
            order_id,
            customer_id,
            order_date,
            order_amount,
        })
        .collect();

    debug!(rows = orders.len(), "normalized order table");
    Ok(orders)
}

/// Load the joined orders CSV and normalize its date columns
///
/// # Arguments
/// * `file_path` - CSV with header `order_id,customer_id,signup_date,order_date,order_amount`
///
/// # Returns
/// * Frame with `order_date` (and `signup_date` when present) as datetimes
pub fn load_joined_orders(file_path: impl AsRef<Path>) -> crate::Result<DataFrame> {
    let path = file_path.as_ref();

    // Whole-file inference: a late `12.5` or `X1` must not break an early guess.
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let mut df = normalize_date_column(df, ORDER_DATE)?;
    if df.column(SIGNUP_DATE).is_ok() {
        df = normalize_date_column(df, SIGNUP_DATE)?;
    }

    debug!(path = %path.display(), rows = df.height(), "loaded joined orders");
    Ok(df)
}

fn require_column<'a>(df: &'a DataFrame, column: &str) -> Result<&'a Series, RfmError> {
    df.column(column)
        .map_err(|_| RfmError::invalid_column(column, "column is missing"))
}

fn text_values(series: &Series, column: &str) -> Result<Vec<String>, RfmError> {
    let text = series
        .cast(&DataType::String)
        .map_err(|e| RfmError::invalid_column(column, e.to_string()))?;
    let text = text
        .str()
        .map_err(|e| RfmError::invalid_column(column, e.to_string()))?;

    text.into_iter()
        .map(|value| {
            value
                .map(str::to_string)
                .ok_or_else(|| RfmError::invalid_column(column, "null identifier"))
        })
        .collect()
}

fn datetime_values(series: &Series, column: &str) -> Result<Vec<NaiveDateTime>, RfmError> {
    let millis = series
        .cast(&DATETIME_DTYPE)
        .and_then(|s| s.cast(&DataType::Int64))
        .map_err(|e| RfmError::invalid_column(column, e.to_string()))?;
    let millis = millis
        .i64()
        .map_err(|e| RfmError::invalid_column(column, e.to_string()))?;

    millis
        .into_iter()
        .map(|value| {
            value
                .and_then(DateTime::from_timestamp_millis)
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| RfmError::invalid_column(column, "null or out-of-range date"))
        })
        .collect()
}

fn amount_values(series: &Series, column: &str) -> Result<Vec<f64>, RfmError> {
    let dtype = series.dtype();

    if dtype.is_numeric() {
        let amounts = series
            .cast(&DataType::Float64)
            .map_err(|e| RfmError::invalid_column(column, e.to_string()))?;
        let amounts = amounts
            .f64()
            .map_err(|e| RfmError::invalid_column(column, e.to_string()))?;
        return amounts
            .into_iter()
            .map(|value| value.ok_or_else(|| RfmError::invalid_column(column, "null amount")))
            .collect();
    }

    if *dtype == DataType::String {
        let text = series
            .str()
            .map_err(|e| RfmError::invalid_column(column, e.to_string()))?;
        return text
            .into_iter()
            .map(|value| {
                let raw = value.ok_or_else(|| RfmError::invalid_column(column, "null amount"))?;
                raw.trim().parse::<f64>().map_err(|_| {
                    RfmError::invalid_column(column, format!("non-numeric amount {raw:?}"))
                })
            })
            .collect();
    }

    Err(RfmError::invalid_column(
        column,
        format!("expected a numeric column, found {dtype}"),
    ))
}
