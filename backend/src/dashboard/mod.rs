//! Read-only sales dashboard.
//!
//! Fetches every row of `sales_data`, narrows them with a date range and a
//! category selection, and derives KPIs and chart series from what is left.
//!
//! ```text
//! ┌────────────┐     ┌──────────────┐     ┌──────────────┐     ┌───────────────┐
//! │ sales_data │────▶│ FilterOptions│────▶│ AppliedFilter│────▶│ DashboardView │
//! │ (fetch)    │     │ (defaults)   │     │ (rows kept)  │     │ (KPIs/charts) │
//! └────────────┘     └──────────────┘     └──────────────┘     └───────────────┘
//! ```
//!
//! Nothing here writes to the database.

pub mod aggregate;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::api::logs::{log_info, Stage};
use crate::config::{DbConfig, MONEY_SCALE, TOP_PRODUCTS};
use crate::error::StoreResult;
use crate::models::StoredSale;
use crate::store;

pub use aggregate::{
    category_revenue, compute_kpis, daily_trend, top_products, CategoryRevenue, DailyRevenue, Kpis,
    ProductRevenue,
};

/// Read every persisted row. The connection is closed before returning.
pub async fn fetch_sales(config: &DbConfig) -> StoreResult<Vec<StoredSale>> {
    let mut handle = store::connect(config).await?;
    let rows = handle.fetch_all().await?;
    log_info(Stage::Dashboard, format!("Fetched {} rows from {}", rows.len(), config.describe()));
    Ok(rows)
}

/// Choices offered by the filter widgets, derived from the data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    /// Earliest persisted date.
    pub min_date: Option<NaiveDate>,
    /// Latest persisted date.
    pub max_date: Option<NaiveDate>,
    /// Distinct categories, sorted.
    pub categories: Vec<String>,
}

impl FilterOptions {
    pub fn from_rows(rows: &[StoredSale]) -> Self {
        let categories: BTreeSet<&str> = rows.iter().map(|r| r.sale.category.as_str()).collect();
        Self {
            min_date: rows.iter().map(|r| r.sale.date).min(),
            max_date: rows.iter().map(|r| r.sale.date).max(),
            categories: categories.into_iter().map(String::from).collect(),
        }
    }
}

/// A caller's filter selection. Unset fields fall back to [`FilterOptions`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardFilter {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// `None` selects every category; an empty list selects none.
    pub categories: Option<Vec<String>>,
}

impl DashboardFilter {
    /// Fill unset fields from the available options.
    pub fn resolve(&self, options: &FilterOptions) -> AppliedFilter {
        AppliedFilter {
            start: self.start.or(options.min_date),
            end: self.end.or(options.max_date),
            categories: self
                .categories
                .as_ref()
                .map(|c| c.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect())
                .unwrap_or_else(|| options.categories.clone()),
        }
    }
}

/// A fully specified filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedFilter {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub categories: Vec<String>,
}

impl AppliedFilter {
    /// Date bounds are inclusive.
    pub fn matches(&self, sale: &StoredSale) -> bool {
        let date = sale.sale.date;
        self.start.map_or(true, |start| date >= start)
            && self.end.map_or(true, |end| date <= end)
            && self.categories.iter().any(|c| *c == sale.sale.category)
    }
}

/// Rows passing `filter`, in their original order.
pub fn apply_filter(rows: &[StoredSale], filter: &AppliedFilter) -> Vec<StoredSale> {
    rows.iter().filter(|r| filter.matches(r)).cloned().collect()
}

/// Everything the dashboard displays.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub options: FilterOptions,
    pub filter: AppliedFilter,
    pub kpis: Kpis,
    pub daily_trend: Vec<DailyRevenue>,
    pub category_revenue: Vec<CategoryRevenue>,
    pub top_products: Vec<ProductRevenue>,
    /// The raw data table.
    pub rows: Vec<StoredSale>,
}

pub fn build_view(rows: &[StoredSale], filter: &DashboardFilter) -> DashboardView {
    let options = FilterOptions::from_rows(rows);
    let applied = filter.resolve(&options);
    let filtered = apply_filter(rows, &applied);

    DashboardView {
        kpis: compute_kpis(&filtered),
        daily_trend: daily_trend(&filtered),
        category_revenue: category_revenue(&filtered),
        top_products: top_products(&filtered, TOP_PRODUCTS),
        options,
        filter: applied,
        rows: filtered,
    }
}

/// `$1,234.50` style currency string.
pub fn format_money(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, cents)
}

/// Plain-text rendering of a view for the terminal.
pub fn render_text(view: &DashboardView) -> String {
    let mut out = String::new();
    let span = match (view.filter.start, view.filter.end) {
        (Some(start), Some(end)) => format!("{} to {}", start, end),
        _ => "no data".to_string(),
    };

    out.push_str(&format!("Sales dashboard ({})\n", span));
    out.push_str(&format!("Categories: {}\n\n", view.filter.categories.join(", ")));

    out.push_str(&format!("  Total revenue        {}\n", format_money(view.kpis.total_revenue)));
    out.push_str(&format!("  Total orders         {}\n", view.kpis.total_orders));
    out.push_str(&format!("  Average order value  {}\n", format_money(view.kpis.average_order_value)));
    out.push_str(&format!(
        "  Top category         {}\n",
        view.kpis.top_category.as_deref().unwrap_or("N/A")
    ));

    out.push_str("\nDaily revenue\n");
    for point in &view.daily_trend {
        out.push_str(&format!("  {}  {:>14}\n", point.date, format_money(point.revenue)));
    }

    out.push_str("\nRevenue by category\n");
    for point in &view.category_revenue {
        out.push_str(&format!("  {:<20} {:>14}\n", point.category, format_money(point.revenue)));
    }

    out.push_str(&format!("\nTop {} products\n", TOP_PRODUCTS));
    for (rank, point) in view.top_products.iter().enumerate() {
        out.push_str(&format!(
            "  {}. {:<17} {:>14}\n",
            rank + 1,
            point.product,
            format_money(point.revenue)
        ));
    }

    out
}
