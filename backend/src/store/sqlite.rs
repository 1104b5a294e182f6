//! SQLite backend.
//!
//! Money columns are declared `DECIMAL(10,2)` and bound as text; SQLite's
//! numeric affinity stores them as INTEGER or REAL, so reads accept all
//! three storage classes and round back to two places.

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, Row};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

use super::{ColumnValues, SalesStore};
use crate::config::{Backend, MONEY_SCALE};
use crate::error::{StoreError, StoreResult};
use crate::models::{SalesRecord, StoredSale};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sales_data (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    date     DATE NOT NULL,
    product  VARCHAR(255) NOT NULL,
    category VARCHAR(255) NOT NULL,
    quantity INT NOT NULL,
    price    DECIMAL(10,2) NOT NULL,
    revenue  DECIMAL(10,2) NOT NULL
);
"#;

const INSERT_SALE: &str = "INSERT INTO sales_data (date, product, category, quantity, price, revenue) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

const DELETE_SALES: &str = "DELETE FROM sales_data";

const SELECT_SALES: &str =
    "SELECT id, date, product, category, quantity, price, revenue FROM sales_data ORDER BY id";

/// Sales table in a SQLite file.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database file. The parent directory must exist.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            StoreError::Connection(format!("cannot open SQLite database '{}': {}", path.display(), e))
        })?;
        Ok(Self { conn })
    }

    /// Private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl SalesStore for SqliteStore {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    async fn ensure_schema(&mut self) -> StoreResult<()> {
        self.conn
            .execute_batch(CREATE_TABLE)
            .map_err(|e| StoreError::Query(format!("create table failed: {}", e)))
    }

    async fn insert_batch(&mut self, records: &[SalesRecord], replace: bool) -> StoreResult<usize> {
        let rows = records
            .iter()
            .enumerate()
            .map(|(i, r)| ColumnValues::from_record(i, r))
            .collect::<StoreResult<Vec<_>>>()?;

        // Dropping the transaction without commit rolls it back.
        let tx = self
            .conn
            .transaction()
            .map_err(|e| StoreError::Connection(format!("cannot begin transaction: {}", e)))?;
        if replace {
            tx.execute(DELETE_SALES, []).map_err(query)?;
        }
        {
            let mut stmt = tx.prepare(INSERT_SALE).map_err(integrity)?;
            for row in &rows {
                stmt.execute(params![
                    row.date,
                    row.product,
                    row.category,
                    row.quantity,
                    row.price.to_string(),
                    row.revenue.to_string(),
                ])
                .map_err(integrity)?;
            }
        }
        tx.commit().map_err(integrity)?;

        Ok(rows.len())
    }

    async fn fetch_all(&mut self) -> StoreResult<Vec<StoredSale>> {
        let mut stmt = self.conn.prepare(SELECT_SALES).map_err(query)?;
        let mut rows = stmt.query([]).map_err(query)?;

        let mut sales = Vec::new();
        while let Some(row) = rows.next().map_err(query)? {
            sales.push(decode_row(row)?);
        }
        Ok(sales)
    }

    async fn count(&mut self) -> StoreResult<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sales_data", [], |row| row.get(0))
            .map_err(query)?;
        Ok(n as u64)
    }
}

fn integrity(e: rusqlite::Error) -> StoreError {
    StoreError::Integrity(e.to_string())
}

fn query(e: rusqlite::Error) -> StoreError {
    StoreError::Query(e.to_string())
}

fn decode_row(row: &Row<'_>) -> StoreResult<StoredSale> {
    let get_err = |column: &str| {
        let column = column.to_string();
        move |e: rusqlite::Error| StoreError::Decode {
            column,
            message: e.to_string(),
        }
    };

    Ok(StoredSale {
        id: row.get(0).map_err(get_err("id"))?,
        sale: SalesRecord {
            date: row.get(1).map_err(get_err("date"))?,
            product: row.get(2).map_err(get_err("product"))?,
            category: row.get(3).map_err(get_err("category"))?,
            quantity: row.get(4).map_err(get_err("quantity"))?,
            price: decode_money(row, 5, "price")?,
            revenue: decode_money(row, 6, "revenue")?,
        },
    })
}

fn decode_money(row: &Row<'_>, idx: usize, column: &str) -> StoreResult<Decimal> {
    let decode_err = |message: String| StoreError::Decode {
        column: column.to_string(),
        message,
    };

    let value = row.get_ref(idx).map_err(|e| decode_err(e.to_string()))?;
    let decimal = match value {
        ValueRef::Integer(i) => Decimal::from(i),
        ValueRef::Real(f) => Decimal::from_f64(f)
            .ok_or_else(|| decode_err(format!("{} is not representable", f)))?
            .round_dp(MONEY_SCALE),
        ValueRef::Text(bytes) => {
            let text = std::str::from_utf8(bytes).map_err(|e| decode_err(e.to_string()))?;
            Decimal::from_str(text.trim()).map_err(|e| decode_err(e.to_string()))?
        }
        ValueRef::Null => return Err(decode_err("NULL".to_string())),
        ValueRef::Blob(_) => return Err(decode_err("unexpected BLOB".to_string())),
    };
    Ok(decimal)
}
