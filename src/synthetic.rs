//! Synthetic customers and orders for exercising the pipeline
//!
//! Generation is driven by a seeded RNG, so a given seed and reference day
//! always produce the same dataset.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, TimeDelta, Utc};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use uuid::Builder;

use crate::data::{CUSTOMER_ID, ORDER_AMOUNT, ORDER_DATE, ORDER_ID, SIGNUP_DATE};
use crate::persist::{ensure_dir, write_csv};

pub const DEFAULT_CUSTOMERS: usize = 500;
pub const DEFAULT_ORDERS: usize = 5000;

/// How far back signup dates may go.
const SIGNUP_WINDOW_DAYS: i64 = 730;
const MIN_AMOUNT: f64 = 5.0;
const MAX_AMOUNT: f64 = 500.0;

pub const CUSTOMERS_CSV: &str = "customers.csv";
pub const ORDERS_CSV: &str = "orders.csv";
pub const JOINED_CSV: &str = "joined_orders.csv";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Generator settings
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub customers: usize,
    pub orders: usize,
    pub seed: u64,
    /// Upper bound for every generated date
    pub today: NaiveDate,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            customers: DEFAULT_CUSTOMERS,
            orders: DEFAULT_ORDERS,
            seed: 42,
            today: Utc::now().date_naive(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub customer_id: String,
    pub signup_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticOrder {
    pub order_id: String,
    pub customer_id: String,
    pub order_date: NaiveDate,
    pub order_amount: f64,
}

/// Generated customers and the orders placed by them
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticDataset {
    pub customers: Vec<Customer>,
    pub orders: Vec<SyntheticOrder>,
}

fn random_id(rng: &mut impl Rng) -> String {
    Builder::from_random_bytes(rng.gen()).into_uuid().to_string()
}

/// Customers with signup dates spread over the two years before `today`.
pub fn generate_customers(n: usize, today: NaiveDate, rng: &mut impl Rng) -> Vec<Customer> {
    (0..n)
        .map(|_| {
            let back = rng.gen_range(0..=SIGNUP_WINDOW_DAYS);
            Customer {
                customer_id: random_id(rng),
                signup_date: today - TimeDelta::days(back),
            }
        })
        .collect()
}

/// Orders tied to random customers, dated between their signup and `today`.
pub fn generate_orders(
    customers: &[Customer],
    n: usize,
    today: NaiveDate,
    rng: &mut impl Rng,
) -> crate::Result<Vec<SyntheticOrder>> {
    if customers.is_empty() && n > 0 {
        anyhow::bail!("Cannot generate orders without customers");
    }

    let orders = (0..n)
        .map(|_| {
            let order_id = random_id(rng);
            let customer = &customers[rng.gen_range(0..customers.len())];
            let span = (today - customer.signup_date).num_days().max(0);
            let order_date = customer.signup_date + TimeDelta::days(rng.gen_range(0..=span));
            let amount: f64 = rng.gen_range(MIN_AMOUNT..=MAX_AMOUNT);

            SyntheticOrder {
                order_id,
                customer_id: customer.customer_id.clone(),
                order_date,
                order_amount: (amount * 100.0).round() / 100.0,
            }
        })
        .collect();

    Ok(orders)
}

/// Generate a full dataset from `config`.
pub fn generate(config: &GeneratorConfig) -> crate::Result<SyntheticDataset> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let customers = generate_customers(config.customers, config.today, &mut rng);
    let orders = generate_orders(&customers, config.orders, config.today, &mut rng)?;
    Ok(SyntheticDataset { customers, orders })
}

impl SyntheticDataset {
    pub fn customers_frame(&self) -> PolarsResult<DataFrame> {
        let ids: Vec<&str> = self.customers.iter().map(|c| c.customer_id.as_str()).collect();
        let signups: Vec<String> = self
            .customers
            .iter()
            .map(|c| c.signup_date.format(DATE_FORMAT).to_string())
            .collect();

        df![
            CUSTOMER_ID => ids,
            SIGNUP_DATE => signups,
        ]
    }

    pub fn orders_frame(&self) -> PolarsResult<DataFrame> {
        let ids: Vec<&str> = self.orders.iter().map(|o| o.order_id.as_str()).collect();
        let customers: Vec<&str> = self.orders.iter().map(|o| o.customer_id.as_str()).collect();
        let dates: Vec<String> = self
            .orders
            .iter()
            .map(|o| o.order_date.format(DATE_FORMAT).to_string())
            .collect();
        let amounts: Vec<f64> = self.orders.iter().map(|o| o.order_amount).collect();

        df![
            ORDER_ID => ids,
            CUSTOMER_ID => customers,
            ORDER_DATE => dates,
            ORDER_AMOUNT => amounts,
        ]
    }

    /// Inner join of orders and customers on `customer_id`, in order sequence.
    pub fn joined_frame(&self) -> PolarsResult<DataFrame> {
        let signups: HashMap<&str, NaiveDate> = self
            .customers
            .iter()
            .map(|c| (c.customer_id.as_str(), c.signup_date))
            .collect();

        let mut ids = Vec::with_capacity(self.orders.len());
        let mut customers = Vec::with_capacity(self.orders.len());
        let mut signup_dates = Vec::with_capacity(self.orders.len());
        let mut dates = Vec::with_capacity(self.orders.len());
        let mut amounts = Vec::with_capacity(self.orders.len());
        for order in &self.orders {
            let Some(signup) = signups.get(order.customer_id.as_str()) else {
                continue;
            };
            ids.push(order.order_id.as_str());
            customers.push(order.customer_id.as_str());
            signup_dates.push(signup.format(DATE_FORMAT).to_string());
            dates.push(order.order_date.format(DATE_FORMAT).to_string());
            amounts.push(order.order_amount);
        }

        df![
            ORDER_ID => ids,
            CUSTOMER_ID => customers,
            SIGNUP_DATE => signup_dates,
            ORDER_DATE => dates,
            ORDER_AMOUNT => amounts,
        ]
    }
}

/// Generate a dataset and write the raw CSV files into `raw_dir`
///
/// # Returns
/// * Path of the joined orders file, ready for [`crate::load_joined_orders`]
pub fn write_synthetic_dataset(
    config: &GeneratorConfig,
    raw_dir: impl AsRef<Path>,
) -> crate::Result<PathBuf> {
    let raw_dir = raw_dir.as_ref();
    ensure_dir(raw_dir)?;

    let dataset = generate(config)?;

    let outputs = [
        (CUSTOMERS_CSV, dataset.customers_frame()?),
        (ORDERS_CSV, dataset.orders_frame()?),
        (JOINED_CSV, dataset.joined_frame()?),
    ];
    for (name, mut df) in outputs {
        let path = raw_dir.join(name);
        write_csv(&mut df, &path)?;
        info!(path = %path.display(), rows = df.height(), "wrote synthetic data");
    }

    Ok(raw_dir.join(JOINED_CSV))
}
