//! Invariant checks for cleaned sales data.
//!
//! Every row of a [`CleanedDataset`] must have:
//! - `quantity > 0` and `price > 0`
//! - `revenue == quantity × price`
//! - non-empty `product` and `category`
//!
//! The date invariant holds by construction (`NaiveDate`). The pipeline runs
//! these checks after transformation and the loader runs them again before
//! touching the database, since a staging file can be edited by hand.
//!
//! # Example
//!
//! ```rust,ignore
//! use salesflow::validation::validate_cleaned;
//!
//! match validate_cleaned(&dataset) {
//!     Ok(()) => println!("ready to load"),
//!     Err(errors) => errors.iter().for_each(|e| eprintln!("{}", e)),
//! }
//! ```

use rust_decimal::Decimal;

use crate::models::{CleanedDataset, SalesRecord};

/// Check one record. Returns every violated rule.
pub fn validate_record(record: &SalesRecord) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if record.quantity <= 0 {
        errors.push(format!("quantity must be > 0 (got {})", record.quantity));
    }
    if record.price <= Decimal::ZERO {
        errors.push(format!("price must be > 0 (got {})", record.price));
    }
    match Decimal::from(record.quantity).checked_mul(record.price) {
        Some(expected) if expected == record.revenue => {}
        Some(expected) => errors.push(format!(
            "revenue {} != quantity × price ({})",
            record.revenue, expected
        )),
        None => errors.push("quantity × price overflows".to_string()),
    }
    if record.product.trim().is_empty() {
        errors.push("product is empty".to_string());
    }
    if record.category.trim().is_empty() {
        errors.push("category is empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check a whole dataset. Errors are prefixed with the 1-based row number.
pub fn validate_cleaned(dataset: &CleanedDataset) -> Result<(), Vec<String>> {
    let errors: Vec<String> = dataset
        .iter()
        .enumerate()
        .filter_map(|(i, record)| validate_record(record).err().map(|errs| (i + 1, errs)))
        .flat_map(|(row, errs)| errs.into_iter().map(move |e| format!("row {}: {}", row, e)))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn record(quantity: i64, price: &str, revenue: &str) -> SalesRecord {
        SalesRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            product: "Apple".into(),
            category: "Food".into(),
            quantity,
            price: Decimal::from_str(price).unwrap(),
            revenue: Decimal::from_str(revenue).unwrap(),
        }
    }

    #[test]
    fn test_valid_record() {
        assert!(validate_record(&record(3, "10.0", "30")).is_ok());
    }

    #[test]
    fn test_each_rule_reported() {
        let mut bad = record(0, "-1", "5");
        bad.product = " ".into();
        bad.category = String::new();

        let errors = validate_record(&bad).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors[0].contains("quantity"));
        assert!(errors[1].contains("price"));
        assert!(errors[2].contains("revenue"));
    }

    #[test]
    fn test_dataset_errors_carry_row_numbers() {
        let dataset = CleanedDataset::new(vec![record(1, "2", "2"), record(2, "2", "5")]);
        let errors = validate_cleaned(&dataset).unwrap_err();

        assert_eq!(errors, vec!["row 2: revenue 5 != quantity × price (4)".to_string()]);
        assert!(validate_cleaned(&CleanedDataset::default()).is_ok());
    }
}
