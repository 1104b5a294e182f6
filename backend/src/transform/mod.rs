//! Transformation module.
//!
//! - Coerce: raw cell text to typed values
//! - Clean: the ordered cleaning rules and revenue derivation

pub mod clean;
pub mod coerce;

pub use clean::{clean_sales, date_span, transform_sales, DropReason, DroppedRow, TransformOutcome, TransformReport};
pub use coerce::{coerce_date, coerce_decimal, coerce_quantity, coerce_text, is_null_token};
