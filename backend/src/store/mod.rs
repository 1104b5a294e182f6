//! Relational storage for the `sales_data` table.
//!
//! [`SalesStore`] is the seam between the pipeline and the database. A
//! handle is opened per call with [`connect`] and released when dropped;
//! there is no process-wide engine or pool.
//!
//! | Backend    | Crate            | `DbConfig::database`  |
//! |------------|------------------|-----------------------|
//! | SQLite     | `rusqlite`       | database file path    |
//! | PostgreSQL | `tokio-postgres` | database name         |

use async_trait::async_trait;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::{Backend, DbConfig, MONEY_SCALE};
use crate::error::{StoreError, StoreResult};
use crate::models::{SalesRecord, StoredSale};

pub mod sqlite;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use sqlite::SqliteStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

/// Largest magnitude a `DECIMAL(10,2)` column holds.
fn money_limit() -> Decimal {
    Decimal::new(9_999_999_999, MONEY_SCALE)
}

/// Operations the loader and dashboard need from the sales table.
#[async_trait]
pub trait SalesStore: Send {
    /// Which engine this handle talks to.
    fn backend(&self) -> Backend;

    /// Create the table if absent. Idempotent.
    async fn ensure_schema(&mut self) -> StoreResult<()>;

    /// Write every record in one transaction. Returns the number inserted.
    ///
    /// With `replace`, existing rows are deleted inside that same
    /// transaction, so a failed batch leaves the table as it was.
    async fn insert_batch(&mut self, records: &[SalesRecord], replace: bool) -> StoreResult<usize>;

    /// Every row, ordered by id.
    async fn fetch_all(&mut self) -> StoreResult<Vec<StoredSale>>;

    /// Number of rows in the table.
    async fn count(&mut self) -> StoreResult<u64>;
}

/// Open a handle for the configured backend.
pub async fn connect(config: &DbConfig) -> StoreResult<Box<dyn SalesStore>> {
    match config.backend {
        Backend::Sqlite => Ok(Box::new(SqliteStore::open(&config.database)?)),
        #[cfg(feature = "postgres")]
        Backend::Postgres => Ok(Box::new(PostgresStore::connect(config).await?)),
        #[cfg(not(feature = "postgres"))]
        Backend::Postgres => Err(StoreError::Connection(
            "PostgreSQL support not compiled in (enable the `postgres` feature)".to_string(),
        )),
    }
}

/// A record converted to column values, checked against the column types.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ColumnValues {
    pub date: chrono::NaiveDate,
    pub product: String,
    pub category: String,
    pub quantity: i32,
    pub price: Decimal,
    pub revenue: Decimal,
}

impl ColumnValues {
    /// Round money to two places and range-check against `INT` / `DECIMAL(10,2)`.
    pub(crate) fn from_record(index: usize, record: &SalesRecord) -> StoreResult<Self> {
        let quantity = i32::try_from(record.quantity).map_err(|_| {
            StoreError::Integrity(format!(
                "row {}: quantity {} out of range for INT",
                index + 1,
                record.quantity
            ))
        })?;

        Ok(Self {
            date: record.date,
            product: record.product.clone(),
            category: record.category.clone(),
            quantity,
            price: money(index, "price", record.price)?,
            revenue: money(index, "revenue", record.revenue)?,
        })
    }
}

/// Round to the money scale, rejecting values the column cannot hold.
pub(crate) fn money(index: usize, column: &str, value: Decimal) -> StoreResult<Decimal> {
    let rounded = value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    if rounded.abs() > money_limit() {
        return Err(StoreError::Integrity(format!(
            "row {}: {} {} out of range for DECIMAL(10,2)",
            index + 1,
            column,
            value
        )));
    }
    Ok(rounded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn record(quantity: i64, price: &str) -> SalesRecord {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        SalesRecord::priced(date, "Apple", "Food", quantity, Decimal::from_str(price).unwrap()).unwrap()
    }

    #[test]
    fn test_money_rounds_half_away_from_zero() {
        assert_eq!(money(0, "price", Decimal::from_str("0.335").unwrap()).unwrap().to_string(), "0.34");
        assert_eq!(money(0, "price", Decimal::from_str("0.665").unwrap()).unwrap().to_string(), "0.67");
        assert_eq!(money(0, "price", Decimal::from_str("10").unwrap()).unwrap(), Decimal::from(10));
    }

    #[test]
    fn test_money_limit() {
        assert_eq!(money_limit().to_string(), "99999999.99");
        assert!(money(0, "price", Decimal::from_str("99999999.99").unwrap()).is_ok());
        let err = money(4, "revenue", Decimal::from_str("100000000").unwrap()).unwrap_err();
        assert!(matches!(err, StoreError::Integrity(_)));
        assert!(err.to_string().contains("row 5"));
    }

    #[test]
    fn test_column_values_quantity_range() {
        let values = ColumnValues::from_record(0, &record(3, "1.005")).unwrap();
        assert_eq!(values.quantity, 3);
        assert_eq!(values.price.to_string(), "1.01");
        assert_eq!(values.revenue.to_string(), "3.02");

        let err = ColumnValues::from_record(0, &record(i64::from(i32::MAX) + 1, "0.01")).unwrap_err();
        assert!(matches!(err, StoreError::Integrity(_)));
    }

    #[tokio::test]
    async fn test_connect_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::sqlite(dir.path().join("sales.db").to_string_lossy().to_string());
        let mut store = connect(&config).await.unwrap();

        assert_eq!(store.backend(), Backend::Sqlite);
        store.ensure_schema().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[cfg(not(feature = "postgres"))]
    #[tokio::test]
    async fn test_connect_postgres_without_feature() {
        let mut config = DbConfig::sqlite("unused");
        config.backend = Backend::Postgres;
        let err = connect(&config).await.err().unwrap();
        assert!(matches!(err, StoreError::Connection(_)));
    }
}
