//! RFM (Recency, Frequency, Monetary) scoring and segmentation
//!
//! Orders are folded into one accumulator per customer, then each metric is
//! binned into quintiles by rank. Ties are broken by `customer_id` so the
//! same input always yields the same labels, even when a metric has fewer
//! than five distinct values.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{NaiveDateTime, TimeDelta};
use polars::prelude::DataFrame;
use tracing::debug;

use crate::data::{orders_from_frame, Order};
use crate::error::{RfmError, MIN_CUSTOMERS};

/// Number of quantile buckets per metric.
pub const QUINTILES: usize = 5;

const MILLIS_PER_DAY: i64 = 86_400_000;

const RECENCY_LABELS: [u8; QUINTILES] = [5, 4, 3, 2, 1];
const ASCENDING_LABELS: [u8; QUINTILES] = [1, 2, 3, 4, 5];

/// Per-customer RFM metrics, quintile scores and derived labels
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRfm {
    pub customer_id: String,
    /// Whole days between the snapshot and the latest order (floored)
    pub recency_days: i64,
    pub frequency: u32,
    pub monetary: f64,
    pub r: u8,
    pub f: u8,
    pub m: u8,
    /// Concatenated `R`, `F`, `M` digits, e.g. `"532"`
    pub rfm_segment: String,
    /// `R + F + M`, in `3..=15`
    pub rfm_score: u8,
}

#[derive(Debug)]
struct Accumulator {
    last_order: NaiveDateTime,
    count: u32,
    total: f64,
}

impl Accumulator {
    fn new(order: &Order) -> Self {
        Self {
            last_order: order.order_date,
            count: 1,
            total: order.order_amount,
        }
    }

    fn push(&mut self, order: &Order) {
        self.last_order = self.last_order.max(order.order_date);
        self.count += 1;
        self.total += order.order_amount;
    }
}

/// Default snapshot: one day after the latest order in the table.
pub fn default_snapshot(orders: &[Order]) -> Option<NaiveDateTime> {
    orders
        .iter()
        .map(|order| order.order_date)
        .max()
        .map(|latest| latest + TimeDelta::days(1))
}

/// Compute RFM metrics, quintile scores and segments for every customer
///
/// # Arguments
/// * `orders` - Typed order rows, any number per customer
/// * `snapshot` - Reference instant for recency; defaults to the latest order + 1 day
///
/// # Returns
/// * One [`CustomerRfm`] per distinct customer, ordered by `customer_id`
///
/// Fails with [`RfmError::InsufficientData`] when fewer than five distinct
/// customers are present.
pub fn compute_rfm(
    orders: &[Order],
    snapshot: Option<NaiveDateTime>,
) -> Result<Vec<CustomerRfm>, RfmError> {
    let mut groups: BTreeMap<&str, Accumulator> = BTreeMap::new();
    for order in orders {
        groups
            .entry(order.customer_id.as_str())
            .and_modify(|acc| acc.push(order))
            .or_insert_with(|| Accumulator::new(order));
    }

    if groups.len() < MIN_CUSTOMERS {
        return Err(RfmError::InsufficientData {
            customers: groups.len(),
        });
    }

    let snapshot = match snapshot {
        Some(snapshot) => snapshot,
        None => default_snapshot(orders).ok_or(RfmError::InsufficientData { customers: 0 })?,
    };
    debug!(
        customers = groups.len(),
        orders = orders.len(),
        %snapshot,
        "aggregated orders per customer"
    );

    let mut customer_ids = Vec::with_capacity(groups.len());
    let mut recency = Vec::with_capacity(groups.len());
    let mut frequency = Vec::with_capacity(groups.len());
    let mut monetary = Vec::with_capacity(groups.len());
    for (customer_id, acc) in &groups {
        customer_ids.push(*customer_id);
        recency.push(days_between(acc.last_order, snapshot));
        frequency.push(acc.count);
        monetary.push(acc.total);
    }

    let r_scores = quintile_labels(&customer_ids, &recency, |a, b| a.cmp(b), RECENCY_LABELS);
    let f_scores = quintile_labels(&customer_ids, &frequency, |a, b| a.cmp(b), ASCENDING_LABELS);
    let m_scores = quintile_labels(
        &customer_ids,
        &monetary,
        |a, b| a.total_cmp(b),
        ASCENDING_LABELS,
    );

    let table = customer_ids
        .iter()
        .enumerate()
        .map(|(i, customer_id)| {
            let (r, f, m) = (r_scores[i], f_scores[i], m_scores[i]);
            CustomerRfm {
                customer_id: (*customer_id).to_string(),
                recency_days: recency[i],
                frequency: frequency[i],
                monetary: monetary[i],
                r,
                f,
                m,
                rfm_segment: format!("{r}{f}{m}"),
                rfm_score: r + f + m,
            }
        })
        .collect();

    Ok(table)
}

/// Normalize a joined orders frame and score it with [`compute_rfm`].
pub fn compute_rfm_frame(
    df: &DataFrame,
    snapshot: Option<NaiveDateTime>,
) -> Result<Vec<CustomerRfm>, RfmError> {
    let orders = orders_from_frame(df)?;
    compute_rfm(&orders, snapshot)
}

/// Floored day count, matching calendar subtraction for negative spans too.
fn days_between(from: NaiveDateTime, to: NaiveDateTime) -> i64 {
    (to - from).num_milliseconds().div_euclid(MILLIS_PER_DAY)
}

/// Rank-then-slice quintile binning.
///
/// Customers are sorted by `values` (ties by id) and the one at rank `i` of
/// `n` lands in bucket `i * 5 / n`, giving contiguous buckets of
/// `floor(n/5)` or `ceil(n/5)` customers. Returned labels follow the input
/// order.
fn quintile_labels<T>(
    customer_ids: &[&str],
    values: &[T],
    cmp: impl Fn(&T, &T) -> Ordering,
    labels: [u8; QUINTILES],
) -> Vec<u8> {
    let n = values.len();
    let mut ranked: Vec<usize> = (0..n).collect();
    ranked.sort_by(|&a, &b| {
        cmp(&values[a], &values[b]).then_with(|| customer_ids[a].cmp(customer_ids[b]))
    });

    let mut assigned = vec![0u8; n];
    for (rank, &index) in ranked.iter().enumerate() {
        assigned[index] = labels[rank * QUINTILES / n];
    }
    assigned
}

/// Aggregate view of a scored table
#[derive(Debug, Clone, PartialEq)]
pub struct RfmSummary {
    pub customers: usize,
    pub mean_recency_days: f64,
    pub mean_frequency: f64,
    pub mean_monetary: f64,
    /// Customer count per `rfm_score`
    pub score_counts: BTreeMap<u8, usize>,
    /// Customer count per `rfm_segment`
    pub segment_counts: BTreeMap<String, usize>,
}

/// Summarize a scored table for reporting.
pub fn summarize(table: &[CustomerRfm]) -> RfmSummary {
    let customers = table.len();
    let mean = |total: f64| {
        if customers == 0 {
            0.0
        } else {
            total / customers as f64
        }
    };

    let mut score_counts = BTreeMap::new();
    let mut segment_counts = BTreeMap::new();
    for row in table {
        *score_counts.entry(row.rfm_score).or_insert(0) += 1;
        *segment_counts.entry(row.rfm_segment.clone()).or_insert(0) += 1;
    }

    RfmSummary {
        customers,
        mean_recency_days: mean(table.iter().map(|row| row.recency_days as f64).sum()),
        mean_frequency: mean(table.iter().map(|row| row.frequency as f64).sum()),
        mean_monetary: mean(table.iter().map(|row| row.monetary).sum()),
        score_counts,
        segment_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::parse_order_date;

    fn at(date: &str) -> NaiveDateTime {
        parse_order_date(date).unwrap()
    }

    fn order(id: u32, customer: &str, date: &str, amount: f64) -> Order {
        Order::new(id.to_string(), customer, at(date), amount)
    }

    fn row<'a>(table: &'a [CustomerRfm], customer: &str) -> &'a CustomerRfm {
        table.iter().find(|r| r.customer_id == customer).unwrap()
    }

    /// Customers A and B from the worked example plus three fillers.
    fn sample_orders() -> Vec<Order> {
        vec![
            order(1, "A", "2025-05-01", 100.0),
            order(2, "A", "2025-05-03", 150.0),
            order(3, "B", "2025-05-02", 50.0),
            order(4, "C", "2025-04-20", 10.0),
            order(5, "D", "2025-03-15", 75.0),
            order(6, "D", "2025-04-01", 20.0),
            order(7, "D", "2025-04-02", 5.0),
            order(8, "E", "2025-01-01", 500.0),
        ]
    }

    #[test]
    fn test_aggregation() {
        let table = compute_rfm(&sample_orders(), Some(at("2025-05-04"))).unwrap();

        let a = row(&table, "A");
        assert_eq!((a.recency_days, a.frequency, a.monetary), (1, 2, 250.0));
        let b = row(&table, "B");
        assert_eq!((b.recency_days, b.frequency, b.monetary), (2, 1, 50.0));
        let d = row(&table, "D");
        assert_eq!((d.recency_days, d.frequency, d.monetary), (32, 3, 100.0));
    }

    #[test]
    fn test_one_row_per_customer_sorted() {
        let table = compute_rfm(&sample_orders(), None).unwrap();
        let ids: Vec<&str> = table.iter().map(|r| r.customer_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn test_default_snapshot_is_latest_plus_one_day() {
        let orders = sample_orders();
        assert_eq!(default_snapshot(&orders), Some(at("2025-05-04")));

        let table = compute_rfm(&orders, None).unwrap();
        assert_eq!(row(&table, "A").recency_days, 1);
        assert!(table.iter().all(|r| r.recency_days >= 1));
    }

    #[test]
    fn test_scores_for_distinct_values() {
        let table = compute_rfm(&sample_orders(), Some(at("2025-05-04"))).unwrap();

        // recency: A=1, B=2, C=14, D=32, E=123
        let r: Vec<u8> = table.iter().map(|r| r.r).collect();
        assert_eq!(r, vec![5, 4, 3, 2, 1]);

        // monetary: A=250, B=50, C=10, D=100, E=500
        let m: Vec<u8> = table.iter().map(|r| r.m).collect();
        assert_eq!(m, vec![4, 2, 1, 3, 5]);
    }

    #[test]
    fn test_ties_broken_by_customer_id() {
        // frequency: A=2, B=1, C=1, D=3, E=1 -> ranks B, C, E, A, D
        let table = compute_rfm(&sample_orders(), Some(at("2025-05-04"))).unwrap();
        let f: Vec<u8> = table.iter().map(|r| r.f).collect();
        assert_eq!(f, vec![4, 1, 2, 5, 3]);
    }

    #[test]
    fn test_identical_values_still_spread() {
        let orders: Vec<Order> = ["e", "d", "c", "b", "a"]
            .iter()
            .enumerate()
            .map(|(i, c)| order(i as u32, c, "2025-05-01", 42.0))
            .collect();

        let table = compute_rfm(&orders, None).unwrap();
        let m: Vec<u8> = table.iter().map(|r| r.m).collect();
        assert_eq!(m, vec![1, 2, 3, 4, 5]);
        let r: Vec<u8> = table.iter().map(|r| r.r).collect();
        assert_eq!(r, vec![5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_uneven_bucket_sizes() {
        let orders: Vec<Order> = (0..7)
            .map(|i| order(i, &format!("c{i}"), "2025-05-01", f64::from(i) * 10.0))
            .collect();

        let table = compute_rfm(&orders, None).unwrap();
        let m: Vec<u8> = table.iter().map(|r| r.m).collect();
        assert_eq!(m, vec![1, 1, 2, 3, 3, 4, 5]);
    }

    #[test]
    fn test_segment_and_score_consistency() {
        let table = compute_rfm(&sample_orders(), None).unwrap();
        for r in &table {
            assert!((1..=5).contains(&r.r));
            assert!((1..=5).contains(&r.f));
            assert!((1..=5).contains(&r.m));
            assert_eq!(r.rfm_segment, format!("{}{}{}", r.r, r.f, r.m));
            assert_eq!(r.rfm_segment.len(), 3);
            assert_eq!(r.rfm_score, r.r + r.f + r.m);
            assert!((3..=15).contains(&r.rfm_score));
        }
    }

    #[test]
    fn test_four_customers_is_insufficient() {
        let orders: Vec<Order> = sample_orders()
            .into_iter()
            .filter(|o| o.customer_id != "E")
            .collect();

        let err = compute_rfm(&orders, None).unwrap_err();
        assert_eq!(err, RfmError::InsufficientData { customers: 4 });
    }

    #[test]
    fn test_empty_table_is_insufficient() {
        let err = compute_rfm(&[], None).unwrap_err();
        assert_eq!(err, RfmError::InsufficientData { customers: 0 });
    }

    #[test]
    fn test_days_between_floors() {
        assert_eq!(days_between(at("2025-05-03 12:00:00"), at("2025-05-04")), 0);
        assert_eq!(days_between(at("2025-05-03"), at("2025-05-04")), 1);
        assert_eq!(days_between(at("2025-05-04 12:00:00"), at("2025-05-04")), -1);
        assert_eq!(days_between(at("2025-05-04 00:00:00.500"), at("2025-05-04")), -1);
    }

    #[test]
    fn test_summarize() {
        let table = compute_rfm(&sample_orders(), Some(at("2025-05-04"))).unwrap();
        let summary = summarize(&table);

        assert_eq!(summary.customers, 5);
        assert_eq!(summary.mean_frequency, 8.0 / 5.0);
        assert_eq!(summary.score_counts.values().sum::<usize>(), 5);
        assert_eq!(summary.segment_counts.values().sum::<usize>(), 5);
    }
}
