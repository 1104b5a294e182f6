//! Domain models for the Salesflow pipeline.
//!
//! - [`RawRecord`] / [`RawDataset`] - rows exactly as read from the input CSV
//! - [`Coerced`] - outcome of converting one raw cell into a typed value
//! - [`SalesRecord`] / [`CleanedDataset`] - validated rows with revenue
//! - [`StoredSale`] - a persisted row with its synthetic id

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// =============================================================================
// Raw input
// =============================================================================

/// One input row, unvalidated. Cells are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// 1-based line number in the source file (header is line 1).
    pub line: u64,
    pub date: String,
    pub product: String,
    pub category: String,
    pub quantity: String,
    pub price: String,
    /// Cells of the non-required columns, in header order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<String>,
}

impl RawRecord {
    pub fn new(
        line: u64,
        date: impl Into<String>,
        product: impl Into<String>,
        category: impl Into<String>,
        quantity: impl Into<String>,
        price: impl Into<String>,
    ) -> Self {
        Self {
            line,
            date: date.into(),
            product: product.into(),
            category: category.into(),
            quantity: quantity.into(),
            price: price.into(),
            extra: Vec::new(),
        }
    }

    pub fn with_extra(mut self, extra: Vec<String>) -> Self {
        self.extra = extra;
        self
    }
}

/// Metadata about the file a [`RawDataset`] was read from.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CsvInfo {
    pub source: Option<PathBuf>,
    pub encoding: String,
    pub headers: Vec<String>,
    pub row_count: usize,
}

/// Output of the extractor: every required column present, content unchecked.
#[derive(Debug, Clone, Default)]
pub struct RawDataset {
    pub records: Vec<RawRecord>,
    pub info: CsvInfo,
}

impl RawDataset {
    pub fn new(records: Vec<RawRecord>) -> Self {
        let info = CsvInfo {
            source: None,
            encoding: "utf-8".to_string(),
            headers: crate::config::REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            row_count: records.len(),
        };
        Self { records, info }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Re-feeds cleaned rows through the transformer, formatting typed values
/// the same way the staging file does.
impl From<&CleanedDataset> for RawDataset {
    fn from(cleaned: &CleanedDataset) -> Self {
        let records = cleaned
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| {
                RawRecord::new(
                    i as u64 + 2,
                    r.date.format("%Y-%m-%d").to_string(),
                    r.product.clone(),
                    r.category.clone(),
                    r.quantity.to_string(),
                    r.price.to_string(),
                )
            })
            .collect();
        RawDataset::new(records)
    }
}

// =============================================================================
// Coercion outcome
// =============================================================================

/// Result of coercing a raw cell.
///
/// Failures keep the offending text and a reason instead of collapsing
/// into a null.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Coerced<T> {
    /// The cell held a usable value.
    Value(T),
    /// The cell was empty or a null marker.
    Missing,
    /// The cell held text that is not a valid value.
    Invalid { raw: String, reason: String },
}

impl<T> Coerced<T> {
    pub fn invalid(raw: impl Into<String>, reason: impl Into<String>) -> Self {
        Coerced::Invalid {
            raw: raw.into(),
            reason: reason.into(),
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Coerced::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Coerced::Value(_))
    }

    /// Why the cell was rejected, if it was.
    pub fn failure(&self) -> Option<String> {
        match self {
            Coerced::Value(_) => None,
            Coerced::Missing => Some("missing value".to_string()),
            Coerced::Invalid { raw, reason } => Some(format!("'{}': {}", raw, reason)),
        }
    }
}

// =============================================================================
// Cleaned output
// =============================================================================

/// A validated sale. Field order matches the staging CSV columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SalesRecord {
    pub date: NaiveDate,
    pub product: String,
    pub category: String,
    pub quantity: i64,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub revenue: Decimal,
}

impl SalesRecord {
    /// Build a record, deriving revenue. `None` on decimal overflow.
    pub fn priced(
        date: NaiveDate,
        product: impl Into<String>,
        category: impl Into<String>,
        quantity: i64,
        price: Decimal,
    ) -> Option<Self> {
        let revenue = Decimal::from(quantity).checked_mul(price)?;
        Some(Self {
            date,
            product: product.into(),
            category: category.into(),
            quantity,
            price,
            revenue,
        })
    }
}

/// Output of the transformer.
///
/// Every row has quantity > 0, price > 0, a parsed date, non-empty
/// product and category, and revenue = quantity × price.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanedDataset {
    pub records: Vec<SalesRecord>,
}

impl CleanedDataset {
    pub fn new(records: Vec<SalesRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SalesRecord> {
        self.records.iter()
    }

    pub fn total_revenue(&self) -> Decimal {
        self.records.iter().map(|r| r.revenue).sum()
    }
}

impl<'a> IntoIterator for &'a CleanedDataset {
    type Item = &'a SalesRecord;
    type IntoIter = std::slice::Iter<'a, SalesRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// =============================================================================
// Persisted rows
// =============================================================================

/// A row of the `sales_data` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSale {
    pub id: i64,
    #[serde(flatten)]
    pub sale: SalesRecord,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_priced_derives_revenue() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let record = SalesRecord::priced(date, "Apple", "Food", 3, d("10.25")).unwrap();
        assert_eq!(record.revenue, d("30.75"));
    }

    #[test]
    fn test_priced_overflow() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert!(SalesRecord::priced(date, "X", "Y", i64::MAX, Decimal::MAX).is_none());
    }

    #[test]
    fn test_coerced_failure_reason() {
        let ok: Coerced<i64> = Coerced::Value(3);
        assert!(ok.failure().is_none());
        assert_eq!(Coerced::<i64>::Missing.failure().unwrap(), "missing value");

        let bad: Coerced<i64> = Coerced::invalid("abc", "not a number");
        assert_eq!(bad.failure().unwrap(), "'abc': not a number");
        assert!(bad.into_value().is_none());
    }

    #[test]
    fn test_raw_from_cleaned_formats_values() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let cleaned = CleanedDataset::new(vec![
            SalesRecord::priced(date, "Pen", "Office", 2, d("5.0")).unwrap(),
        ]);
        let raw = RawDataset::from(&cleaned);

        assert_eq!(raw.len(), 1);
        assert_eq!(raw.records[0].date, "2024-02-01");
        assert_eq!(raw.records[0].quantity, "2");
        assert_eq!(raw.records[0].price, "5.0");
        assert_eq!(raw.records[0].line, 2);
    }
}
