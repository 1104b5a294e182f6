//! PostgreSQL backend (feature `postgres`).

use async_trait::async_trait;
use tokio_postgres::{Client, NoTls, Row};

use super::{ColumnValues, SalesStore};
use crate::api::logs::{log_error, Stage};
use crate::config::{Backend, DbConfig};
use crate::error::{StoreError, StoreResult};
use crate::models::{SalesRecord, StoredSale};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sales_data (
    id       BIGSERIAL PRIMARY KEY,
    date     DATE NOT NULL,
    product  VARCHAR(255) NOT NULL,
    category VARCHAR(255) NOT NULL,
    quantity INTEGER NOT NULL,
    price    NUMERIC(10,2) NOT NULL,
    revenue  NUMERIC(10,2) NOT NULL
)
"#;

const INSERT_SALE: &str = "INSERT INTO sales_data (date, product, category, quantity, price, revenue) \
     VALUES ($1, $2, $3, $4, $5, $6)";

const SELECT_SALES: &str =
    "SELECT id, date, product, category, quantity, price, revenue FROM sales_data ORDER BY id";

/// Sales table on a PostgreSQL server.
///
/// The connection task ends when the client is dropped.
pub struct PostgresStore {
    client: Client,
}

impl PostgresStore {
    pub async fn connect(config: &DbConfig) -> StoreResult<Self> {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&config.host)
            .port(config.port)
            .user(&config.user)
            .dbname(&config.database);
        if !config.password.is_empty() {
            pg.password(&config.password);
        }

        let (client, connection) = pg
            .connect(NoTls)
            .await
            .map_err(|e| StoreError::Connection(format!("{}: {}", config.describe(), e)))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                log_error(Stage::Load, format!("PostgreSQL connection error: {}", e));
            }
        });

        Ok(Self { client })
    }
}

#[async_trait]
impl SalesStore for PostgresStore {
    fn backend(&self) -> Backend {
        Backend::Postgres
    }

    async fn ensure_schema(&mut self) -> StoreResult<()> {
        self.client
            .batch_execute(CREATE_TABLE)
            .await
            .map_err(|e| StoreError::Query(format!("create table failed: {}", e)))
    }

    async fn insert_batch(&mut self, records: &[SalesRecord], replace: bool) -> StoreResult<usize> {
        let rows = records
            .iter()
            .enumerate()
            .map(|(i, r)| ColumnValues::from_record(i, r))
            .collect::<StoreResult<Vec<_>>>()?;

        let tx = self
            .client
            .transaction()
            .await
            .map_err(|e| StoreError::Connection(format!("cannot begin transaction: {}", e)))?;
        if replace {
            tx.batch_execute("TRUNCATE TABLE sales_data").await.map_err(query)?;
        }
        let stmt = tx.prepare(INSERT_SALE).await.map_err(integrity)?;
        for row in &rows {
            tx.execute(
                &stmt,
                &[
                    &row.date,
                    &row.product,
                    &row.category,
                    &row.quantity,
                    &row.price,
                    &row.revenue,
                ],
            )
            .await
            .map_err(integrity)?;
        }
        tx.commit().await.map_err(integrity)?;

        Ok(rows.len())
    }

    async fn fetch_all(&mut self) -> StoreResult<Vec<StoredSale>> {
        let rows = self.client.query(SELECT_SALES, &[]).await.map_err(query)?;
        rows.iter().map(decode_row).collect()
    }

    async fn count(&mut self) -> StoreResult<u64> {
        let row = self
            .client
            .query_one("SELECT COUNT(*) FROM sales_data", &[])
            .await
            .map_err(query)?;
        let n: i64 = row.try_get(0).map_err(query)?;
        Ok(n as u64)
    }
}

fn integrity(e: tokio_postgres::Error) -> StoreError {
    StoreError::Integrity(e.to_string())
}

fn query(e: tokio_postgres::Error) -> StoreError {
    StoreError::Query(e.to_string())
}

fn decode_row(row: &Row) -> StoreResult<StoredSale> {
    let decode = |column: &'static str| {
        move |e: tokio_postgres::Error| StoreError::Decode {
            column: column.to_string(),
            message: e.to_string(),
        }
    };
    let quantity: i32 = row.try_get("quantity").map_err(decode("quantity"))?;

    Ok(StoredSale {
        id: row.try_get("id").map_err(decode("id"))?,
        sale: SalesRecord {
            date: row.try_get("date").map_err(decode("date"))?,
            product: row.try_get("product").map_err(decode("product"))?,
            category: row.try_get("category").map_err(decode("category"))?,
            quantity: i64::from(quantity),
            price: row.try_get("price").map_err(decode("price"))?,
            revenue: row.try_get("revenue").map_err(decode("revenue"))?,
        },
    })
}
