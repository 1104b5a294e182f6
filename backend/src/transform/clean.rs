//! Transform stage: [`RawDataset`] into [`CleanedDataset`].
//!
//! Steps run in a fixed order:
//!
//! 1. coerce dates, drop rows whose date does not parse
//! 2. drop exact duplicate rows (compared after coercion, extra columns included)
//! 3. drop rows with quantity <= 0 or price <= 0, or non-numeric values
//! 4. default missing product / category to `"Unknown"`
//! 5. derive revenue = quantity × price
//!
//! Steps 1 and 3 delete rows; step 4 substitutes. No rounding is applied.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

use super::coerce::{coerce_date, coerce_decimal, coerce_quantity, coerce_text};
use crate::api::logs::{log_info, log_success, Stage};
use crate::config::UNKNOWN_TEXT;
use crate::models::{CleanedDataset, Coerced, RawDataset, SalesRecord};

/// Why a row was removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "detail")]
pub enum DropReason {
    InvalidDate(String),
    Duplicate { first_line: u64 },
    InvalidQuantity(String),
    InvalidPrice(String),
    RevenueOverflow,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropReason::InvalidDate(why) => write!(f, "invalid date {}", why),
            DropReason::Duplicate { first_line } => write!(f, "duplicate of line {}", first_line),
            DropReason::InvalidQuantity(why) => write!(f, "invalid quantity {}", why),
            DropReason::InvalidPrice(why) => write!(f, "invalid price {}", why),
            DropReason::RevenueOverflow => write!(f, "revenue overflows decimal range"),
        }
    }
}

/// A row removed during transformation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DroppedRow {
    pub line: u64,
    pub reason: DropReason,
}

/// Row accounting for one transform run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformReport {
    pub rows_in: usize,
    pub invalid_dates: usize,
    pub duplicates: usize,
    pub non_positive: usize,
    pub overflows: usize,
    pub product_defaulted: usize,
    pub category_defaulted: usize,
    pub rows_out: usize,
    pub dropped: Vec<DroppedRow>,
}

impl TransformReport {
    pub fn dropped_count(&self) -> usize {
        self.invalid_dates + self.duplicates + self.non_positive + self.overflows
    }

    pub fn summary(&self) -> String {
        format!(
            "{} rows in, {} out ({} invalid date, {} duplicate, {} non-positive quantity/price, {} revenue overflow)",
            self.rows_in,
            self.rows_out,
            self.invalid_dates,
            self.duplicates,
            self.non_positive,
            self.overflows
        )
    }
}

/// Cleaned rows together with the report.
#[derive(Debug, Clone)]
pub struct TransformOutcome {
    pub dataset: CleanedDataset,
    pub report: TransformReport,
}

/// A row after step 1. Equality over all fields drives step 2.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DatedRow {
    date: NaiveDate,
    product: Coerced<String>,
    category: Coerced<String>,
    quantity: Coerced<i64>,
    price: Coerced<Decimal>,
    extra: Vec<String>,
}

/// Clean a raw dataset, discarding the report.
pub fn transform_sales(raw: &RawDataset) -> CleanedDataset {
    clean_sales(raw).dataset
}

/// Clean a raw dataset and account for every removed row.
pub fn clean_sales(raw: &RawDataset) -> TransformOutcome {
    log_info(Stage::Transform, format!("Cleaning {} rows", raw.len()));
    let mut report = TransformReport {
        rows_in: raw.len(),
        ..Default::default()
    };

    // 1. dates
    let mut dated: Vec<(u64, DatedRow)> = Vec::with_capacity(raw.len());
    for record in &raw.records {
        match coerce_date(&record.date) {
            Coerced::Value(date) => dated.push((
                record.line,
                DatedRow {
                    date,
                    product: coerce_text(&record.product),
                    category: coerce_text(&record.category),
                    quantity: coerce_quantity(&record.quantity),
                    price: coerce_decimal(&record.price),
                    extra: record.extra.clone(),
                },
            )),
            failed => {
                report.invalid_dates += 1;
                report.dropped.push(DroppedRow {
                    line: record.line,
                    reason: DropReason::InvalidDate(failed.failure().unwrap_or_default()),
                });
            }
        }
    }

    // 2. exact duplicates, first occurrence wins
    let mut seen: HashMap<DatedRow, u64> = HashMap::new();
    let mut unique: Vec<(u64, DatedRow)> = Vec::with_capacity(dated.len());
    for (line, row) in dated {
        if let Some(first_line) = seen.get(&row) {
            report.duplicates += 1;
            report.dropped.push(DroppedRow {
                line,
                reason: DropReason::Duplicate { first_line: *first_line },
            });
            continue;
        }
        seen.insert(row.clone(), line);
        unique.push((line, row));
    }

    // 3. positive quantity and price
    let mut positive = Vec::with_capacity(unique.len());
    for (line, row) in unique {
        let reason = match (&row.quantity, &row.price) {
            (Coerced::Value(q), _) if *q <= 0 => Some(DropReason::InvalidQuantity(format!("{} <= 0", q))),
            (q, _) if !q.is_value() => Some(DropReason::InvalidQuantity(q.failure().unwrap_or_default())),
            (_, Coerced::Value(p)) if *p <= Decimal::ZERO => Some(DropReason::InvalidPrice(format!("{} <= 0", p))),
            (_, p) if !p.is_value() => Some(DropReason::InvalidPrice(p.failure().unwrap_or_default())),
            _ => None,
        };

        match reason {
            Some(reason) => {
                report.non_positive += 1;
                report.dropped.push(DroppedRow { line, reason });
            }
            None => positive.push((line, row)),
        }
    }

    // 4 + 5. defaults and revenue
    let mut records = Vec::with_capacity(positive.len());
    for (line, row) in positive {
        let (Some(quantity), Some(price)) = (row.quantity.into_value(), row.price.into_value()) else {
            continue;
        };

        let product = row.product.into_value().unwrap_or_else(|| {
            report.product_defaulted += 1;
            UNKNOWN_TEXT.to_string()
        });
        let category = row.category.into_value().unwrap_or_else(|| {
            report.category_defaulted += 1;
            UNKNOWN_TEXT.to_string()
        });

        match SalesRecord::priced(row.date, product, category, quantity, price) {
            Some(record) => records.push(record),
            None => {
                report.overflows += 1;
                report.dropped.push(DroppedRow {
                    line,
                    reason: DropReason::RevenueOverflow,
                });
            }
        }
    }

    report.rows_out = records.len();
    report.dropped.sort_by_key(|d| d.line);
    log_success(Stage::Transform, report.summary());

    let dataset = CleanedDataset::new(records);
    if let Some((start, end)) = date_span(&dataset) {
        log_info(
            Stage::Transform,
            format!("Sales from {} to {}, revenue {}", start, end, dataset.total_revenue()),
        );
    }

    TransformOutcome { dataset, report }
}

/// First and last sale date, if any.
pub fn date_span(dataset: &CleanedDataset) -> Option<(NaiveDate, NaiveDate)> {
    let start = dataset.iter().map(|r| r.date).min()?;
    let end = dataset.iter().map(|r| r.date).max()?;
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawRecord;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn raw(rows: &[(&str, &str, &str, &str, &str)]) -> RawDataset {
        RawDataset::new(
            rows.iter()
                .enumerate()
                .map(|(i, (d, p, c, q, pr))| RawRecord::new(i as u64 + 2, *d, *p, *c, *q, *pr))
                .collect(),
        )
    }

    #[test]
    fn test_missing_product_defaults_to_unknown() {
        let out = clean_sales(&raw(&[("2024-01-05", "", "Food", "3", "10.0")]));

        assert_eq!(out.dataset.len(), 1);
        let row = &out.dataset.records[0];
        assert_eq!(row.product, "Unknown");
        assert_eq!(row.category, "Food");
        assert_eq!(row.revenue, dec("30.0"));
        assert_eq!(out.report.product_defaulted, 1);
    }

    #[test]
    fn test_invalid_date_dropped() {
        let out = clean_sales(&raw(&[("not-a-date", "Pen", "Office", "2", "5.0")]));

        assert!(out.dataset.is_empty());
        assert_eq!(out.report.invalid_dates, 1);
        assert!(matches!(out.report.dropped[0].reason, DropReason::InvalidDate(_)));
    }

    #[test]
    fn test_negative_quantity_dropped() {
        let out = clean_sales(&raw(&[("2024-02-01", "Pen", "Office", "-1", "5.0")]));

        assert!(out.dataset.is_empty());
        assert_eq!(out.report.non_positive, 1);
        assert_eq!(
            out.report.dropped[0].reason,
            DropReason::InvalidQuantity("-1 <= 0".to_string())
        );
    }

    #[test]
    fn test_zero_or_non_numeric_price_dropped() {
        let out = clean_sales(&raw(&[
            ("2024-02-01", "Pen", "Office", "1", "0"),
            ("2024-02-02", "Pen", "Office", "1", "free"),
            ("2024-02-03", "Pen", "Office", "", "1.0"),
        ]));

        assert!(out.dataset.is_empty());
        assert_eq!(out.report.non_positive, 3);
    }

    #[test]
    fn test_identical_rows_collapse() {
        let out = clean_sales(&raw(&[
            ("2024-01-05", "Apple", "Food", "3", "10.0"),
            ("2024-01-05", "Apple", "Food", "3", "10.0"),
        ]));

        assert_eq!(out.dataset.len(), 1);
        assert_eq!(out.report.duplicates, 1);
        assert_eq!(
            out.report.dropped[0],
            DroppedRow {
                line: 3,
                reason: DropReason::Duplicate { first_line: 2 }
            }
        );
    }

    #[test]
    fn test_duplicates_compared_after_date_parsing() {
        let out = clean_sales(&raw(&[
            ("2024-01-05", "Apple", "Food", "3", "10.0"),
            ("2024/01/05", "Apple", "Food", "3", "10.00"),
        ]));
        assert_eq!(out.dataset.len(), 1);
    }

    #[test]
    fn test_rows_differing_in_extra_columns_are_kept() {
        let csv = "date,product,category,quantity,price,store\n\
                   2024-01-05,Apple,Food,3,10.0,S1\n\
                   2024-01-05,Apple,Food,3,10.0,S2\n\
                   2024-01-05,Apple,Food,3,10.0,S1\n";
        let raw = crate::extract::parse_sales_csv(csv, "utf-8".to_string()).unwrap();

        let out = clean_sales(&raw);
        assert_eq!(out.dataset.len(), 2);
        assert_eq!(out.report.duplicates, 1);
        assert_eq!(out.report.dropped[0].reason, DropReason::Duplicate { first_line: 2 });
    }

    #[test]
    fn test_missing_text_rows_are_not_duplicates_of_unknown() {
        // dedup runs before defaulting, so a literal "Unknown" row is distinct
        let out = clean_sales(&raw(&[
            ("2024-01-05", "", "Food", "3", "10.0"),
            ("2024-01-05", "Unknown", "Food", "3", "10.0"),
        ]));
        assert_eq!(out.dataset.len(), 2);
    }

    #[test]
    fn test_order_preserved_and_counts_add_up() {
        let out = clean_sales(&raw(&[
            ("2024-01-03", "C", "X", "1", "1.5"),
            ("bad", "A", "X", "1", "1"),
            ("2024-01-01", "A", "X", "2", "2.25"),
            ("2024-01-02", "B", "", "0", "3"),
            ("2024-01-01", "A", "X", "2", "2.25"),
        ]));

        let products: Vec<&str> = out.dataset.iter().map(|r| r.product.as_str()).collect();
        assert_eq!(products, vec!["C", "A"]);
        assert_eq!(out.report.rows_in, 5);
        assert_eq!(out.report.rows_out, 2);
        assert_eq!(out.report.dropped_count(), 3);
        assert_eq!(out.report.rows_in, out.report.rows_out + out.report.dropped_count());
        assert_eq!(out.dataset.records[1].revenue, dec("4.50"));
    }

    #[test]
    fn test_cleaned_rows_satisfy_invariants() {
        let out = clean_sales(&raw(&[
            ("2024-01-05", "", "", "3", "10.0"),
            ("2024-01-06", "Pen", "Office", "2", "0.333"),
            ("2024-01-07", "Pen", "Office", "-2", "1"),
            ("junk", "Pen", "Office", "2", "1"),
        ]));

        for row in &out.dataset {
            assert!(row.quantity > 0);
            assert!(row.price > Decimal::ZERO);
            assert_eq!(row.revenue, Decimal::from(row.quantity) * row.price);
            assert!(!row.product.is_empty());
            assert!(!row.category.is_empty());
        }
        assert_eq!(out.dataset.records[1].revenue, dec("0.666"));
    }

    #[test]
    fn test_transform_is_idempotent_on_clean_data() {
        let first = transform_sales(&raw(&[
            ("2024-01-05", "", "Food", "3", "10.0"),
            ("2024-01-06", "Pen", "Office", "2", "5.5"),
            ("2024-01-06", "Pen", "Office", "2", "5.5"),
        ]));
        let second = transform_sales(&RawDataset::from(&first));

        assert_eq!(first, second);
    }

    #[test]
    fn test_date_span() {
        let cleaned = transform_sales(&raw(&[
            ("2024-03-05", "A", "X", "1", "1"),
            ("2024-01-05", "B", "X", "1", "1"),
        ]));
        let (start, end) = date_span(&cleaned).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(cleaned.total_revenue(), dec("2"));
        assert!(date_span(&CleanedDataset::default()).is_none());
    }
}
