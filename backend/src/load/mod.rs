//! Load stage: append a [`CleanedDataset`] to the `sales_data` table.
//!
//! The dataset is validated before any connection is opened. The table is
//! created if absent and the rows are inserted in a single transaction.
//! Loading is append-only: running the same file twice doubles the row
//! count unless [`LoadOptions::truncate`] is set.

use serde::Serialize;

use crate::api::logs::{log_info, log_success, log_error, Stage};
use crate::config::{Backend, DbConfig, SALES_TABLE};
use crate::error::{LoadError, LoadResult};
use crate::models::CleanedDataset;
use crate::store::{self, SalesStore};
use crate::validation::validate_cleaned;

/// Options for one load.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Delete existing rows before inserting.
    pub truncate: bool,
}

/// Outcome of a successful load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSummary {
    pub backend: Backend,
    /// Rows written by this load.
    pub inserted: usize,
    /// Rows in the table afterwards.
    pub total_rows: u64,
    pub truncated: bool,
}

/// Load `dataset` into the database described by `config`.
///
/// The connection is opened here and released before returning, on success
/// and on failure alike.
pub async fn load_sales(
    dataset: &CleanedDataset,
    config: &DbConfig,
    options: LoadOptions,
) -> LoadResult<LoadSummary> {
    if let Err(errors) = validate_cleaned(dataset) {
        log_error(Stage::Load, format!("{} invariant violations, nothing loaded", errors.len()));
        return Err(LoadError::Invalid(errors));
    }

    log_info(Stage::Load, format!("Connecting to {}", config.describe()));
    let mut handle = store::connect(config).await.map_err(|e| {
        log_error(Stage::Load, e.to_string());
        LoadError::from(e)
    })?;

    let result = load_into(handle.as_mut(), dataset, options).await;
    drop(handle);
    log_info(Stage::Load, "Connection closed");

    match &result {
        Ok(summary) => log_success(
            Stage::Load,
            format!(
                "Inserted {} rows into {} ({} total)",
                summary.inserted, SALES_TABLE, summary.total_rows
            ),
        ),
        Err(e) => log_error(Stage::Load, e.to_string()),
    }
    result
}

/// Load into an already open store. Does not validate.
pub async fn load_into(
    store: &mut dyn SalesStore,
    dataset: &CleanedDataset,
    options: LoadOptions,
) -> LoadResult<LoadSummary> {
    store.ensure_schema().await?;

    if options.truncate {
        log_info(Stage::Load, format!("Replacing the contents of {}", SALES_TABLE));
    }

    let inserted = store.insert_batch(&dataset.records, options.truncate).await?;
    let total_rows = store.count().await?;

    Ok(LoadSummary {
        backend: store.backend(),
        inserted,
        total_rows,
        truncated: options.truncate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::models::SalesRecord;
    use crate::store::SqliteStore;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn dataset() -> CleanedDataset {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        CleanedDataset::new(vec![
            SalesRecord::priced(date, "Apple", "Food", 3, Decimal::new(100, 1)).unwrap(),
            SalesRecord::priced(date, "Pen", "Office", 2, Decimal::new(5, 0)).unwrap(),
        ])
    }

    fn sqlite_config(dir: &tempfile::TempDir) -> DbConfig {
        DbConfig::sqlite(dir.path().join("sales.db").to_string_lossy().to_string())
    }

    #[tokio::test]
    async fn test_load_creates_table_and_inserts() {
        let dir = tempfile::tempdir().unwrap();
        let config = sqlite_config(&dir);

        let summary = load_sales(&dataset(), &config, LoadOptions::default()).await.unwrap();
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.total_rows, 2);
        assert_eq!(summary.backend, Backend::Sqlite);
        assert!(!summary.truncated);

        let mut store = SqliteStore::open(&config.database).unwrap();
        let rows = store.fetch_all().await.unwrap();
        assert_eq!(rows[0].sale.product, "Apple");
        assert_eq!(rows[0].sale.revenue, Decimal::from(30));
    }

    #[tokio::test]
    async fn test_load_twice_doubles_rows() {
        let dir = tempfile::tempdir().unwrap();
        let config = sqlite_config(&dir);

        load_sales(&dataset(), &config, LoadOptions::default()).await.unwrap();
        let second = load_sales(&dataset(), &config, LoadOptions::default()).await.unwrap();
        assert_eq!(second.total_rows, 4);
    }

    #[tokio::test]
    async fn test_truncate_replaces_rows() {
        let dir = tempfile::tempdir().unwrap();
        let config = sqlite_config(&dir);

        load_sales(&dataset(), &config, LoadOptions::default()).await.unwrap();
        let summary = load_sales(&dataset(), &config, LoadOptions { truncate: true })
            .await
            .unwrap();
        assert_eq!(summary.total_rows, 2);
        assert!(summary.truncated);
    }

    #[tokio::test]
    async fn test_failed_truncate_load_keeps_table() {
        let dir = tempfile::tempdir().unwrap();
        let config = sqlite_config(&dir);
        load_sales(&dataset(), &config, LoadOptions::default()).await.unwrap();

        let date = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap();
        let too_big = CleanedDataset::new(vec![
            SalesRecord::priced(date, "Gold", "Metal", 1, Decimal::from(123_456_789)).unwrap(),
        ]);
        let err = load_sales(&too_big, &config, LoadOptions { truncate: true })
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Store(StoreError::Integrity(_))));

        let mut store = SqliteStore::open(&config.database).unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_empty_dataset_creates_table() {
        let dir = tempfile::tempdir().unwrap();
        let config = sqlite_config(&dir);

        let summary = load_sales(&CleanedDataset::default(), &config, LoadOptions::default())
            .await
            .unwrap();
        assert_eq!(summary.inserted, 0);
        assert_eq!(summary.total_rows, 0);
    }

    #[tokio::test]
    async fn test_invalid_dataset_never_connects() {
        let mut bad = dataset();
        bad.records[0].revenue = Decimal::ONE;
        // Unopenable path: reaching the connection would yield a store error instead.
        let config = DbConfig::sqlite("/no/such/dir/sales.db");

        let err = load_sales(&bad, &config, LoadOptions::default()).await.unwrap_err();
        assert!(matches!(err, LoadError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_unreachable_database() {
        let config = DbConfig::sqlite("/no/such/dir/sales.db");
        let err = load_sales(&dataset(), &config, LoadOptions::default()).await.unwrap_err();
        assert!(matches!(err, LoadError::Store(StoreError::Connection(_))));
    }

    #[tokio::test]
    async fn test_load_into_open_store() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let summary = load_into(&mut store, &dataset(), LoadOptions::default()).await.unwrap();
        assert_eq!(summary.total_rows, 2);
    }
}
