//! Error types raised by the RFM engine and order normalization.

use thiserror::Error;

/// Minimum number of distinct customers needed for 5-way quintile binning.
pub const MIN_CUSTOMERS: usize = 5;

/// Errors produced while normalizing orders or scoring customers.
///
/// Upstream I/O failures are not represented here; the provider and
/// persister propagate them untouched through [`crate::Result`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RfmError {
    /// A required column is absent or its values cannot be coerced.
    #[error("invalid column `{column}`: {reason}")]
    InvalidColumn {
        /// Name of the offending column.
        column: String,
        /// Human-readable cause.
        reason: String,
    },

    /// Quintile binning needs at least [`MIN_CUSTOMERS`] distinct customers.
    #[error(
        "insufficient data: {customers} distinct customers, at least {} required",
        MIN_CUSTOMERS
    )]
    InsufficientData {
        /// Number of distinct customers found in the input.
        customers: usize,
    },
}

impl RfmError {
    pub(crate) fn invalid_column(column: &str, reason: impl Into<String>) -> Self {
        Self::InvalidColumn {
            column: column.to_string(),
            reason: reason.into(),
        }
    }
}
