//! Aggregations over filtered sales rows.
//!
//! Group sums use `BTreeMap`, so every chart comes out sorted by its key
//! and ties are broken alphabetically without extra work.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::MONEY_SCALE;
use crate::models::{SalesRecord, StoredSale};

/// Headline figures for the filtered rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub total_revenue: Decimal,
    /// One order per row.
    pub total_orders: usize,
    /// Rounded to cents; zero when there are no orders.
    pub average_order_value: Decimal,
    /// Category with the highest revenue. `None` when there are no rows.
    pub top_category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRevenue {
    pub category: String,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductRevenue {
    pub product: String,
    pub revenue: Decimal,
}

/// Sum revenue per key.
fn revenue_by<'a, K, I, F>(rows: I, key: F) -> BTreeMap<K, Decimal>
where
    K: Ord,
    I: IntoIterator<Item = &'a StoredSale>,
    F: Fn(&SalesRecord) -> K,
{
    let mut sums: BTreeMap<K, Decimal> = BTreeMap::new();
    for row in rows {
        *sums.entry(key(&row.sale)).or_default() += row.sale.revenue;
    }
    sums
}

pub fn compute_kpis(rows: &[StoredSale]) -> Kpis {
    let total_revenue: Decimal = rows.iter().map(|r| r.sale.revenue).sum();
    let total_orders = rows.len();

    let average_order_value = if total_orders == 0 {
        Decimal::ZERO
    } else {
        (total_revenue / Decimal::from(total_orders))
            .round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
    };

    // Ascending iteration plus a strict comparison keeps the first name on ties.
    let mut top: Option<(String, Decimal)> = None;
    for (category, revenue) in revenue_by(rows, |s| s.category.clone()) {
        if top.as_ref().map_or(true, |(_, best)| revenue > *best) {
            top = Some((category, revenue));
        }
    }

    Kpis {
        total_revenue,
        total_orders,
        average_order_value,
        top_category: top.map(|(category, _)| category),
    }
}

/// Revenue per day, oldest first.
pub fn daily_trend(rows: &[StoredSale]) -> Vec<DailyRevenue> {
    revenue_by(rows, |s| s.date)
        .into_iter()
        .map(|(date, revenue)| DailyRevenue { date, revenue })
        .collect()
}

/// Revenue per category, by name.
pub fn category_revenue(rows: &[StoredSale]) -> Vec<CategoryRevenue> {
    revenue_by(rows, |s| s.category.clone())
        .into_iter()
        .map(|(category, revenue)| CategoryRevenue { category, revenue })
        .collect()
}

/// The `limit` best-selling products by revenue, highest first.
pub fn top_products(rows: &[StoredSale], limit: usize) -> Vec<ProductRevenue> {
    let mut products: Vec<ProductRevenue> = revenue_by(rows, |s| s.product.clone())
        .into_iter()
        .map(|(product, revenue)| ProductRevenue { product, revenue })
        .collect();

    // Stable sort: equal revenue keeps the alphabetical order from the map.
    products.sort_by(|a, b| b.revenue.cmp(&a.revenue));
    products.truncate(limit);
    products
}
