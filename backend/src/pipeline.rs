//! End-to-end ETL orchestration.
//!
//! Combines the stages into the runs the CLI and the server expose:
//! extract, transform, validate, stage to disk, then load.
//!
//! # Example
//!
//! ```rust,ignore
//! use salesflow::config::DbConfig;
//! use salesflow::pipeline::{run_etl, EtlOptions};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DbConfig::from_env()?;
//!     let summary = run_etl(Path::new("data/raw_sales.csv"), &config, EtlOptions::default()).await?;
//!     println!("Loaded {} rows", summary.load.inserted);
//!     Ok(())
//! }
//! ```

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::api::logs::{log_info, log_success, log_warning, log_warning_indent, Stage};
use crate::config::DbConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::extract::{extract_bytes, extract_sales_data};
use crate::load::{load_sales, LoadOptions, LoadSummary};
use crate::models::{CleanedDataset, CsvInfo, RawDataset};
use crate::staging::{read_cleaned_csv, write_cleaned_csv};
use crate::transform::{clean_sales, TransformReport};
use crate::validation::validate_cleaned;

/// Default location of the intermediate cleaned file.
pub const DEFAULT_STAGING_PATH: &str = "data/cleaned_sales.csv";

/// Number of dropped rows listed in the log.
const DROPPED_PREVIEW: usize = 10;

/// Options for a full ETL run
#[derive(Debug, Clone)]
pub struct EtlOptions {
    /// Where the cleaned CSV is written before loading.
    pub staging_path: PathBuf,
    /// Empty the table before loading.
    pub truncate: bool,
}

impl Default for EtlOptions {
    fn default() -> Self {
        Self {
            staging_path: PathBuf::from(DEFAULT_STAGING_PATH),
            truncate: false,
        }
    }
}

/// Extracted and cleaned data, not yet loaded.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub info: CsvInfo,
    pub dataset: CleanedDataset,
    pub report: TransformReport,
}

/// Result of a complete run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EtlSummary {
    pub csv_info: CsvInfo,
    pub report: TransformReport,
    pub load: LoadSummary,
    /// `None` when the run did not go through a staging file.
    pub staging_path: Option<PathBuf>,
}

/// Extract and transform a CSV file, then check the cleaned rows.
pub fn extract_and_transform(path: &Path) -> PipelineResult<PreparedData> {
    let raw = extract_sales_data(path)?;
    prepare(raw)
}

/// Same as [`extract_and_transform`] for an in-memory upload.
pub fn prepare_bytes(bytes: &[u8]) -> PipelineResult<PreparedData> {
    let raw = extract_bytes(bytes)?;
    prepare(raw)
}

fn prepare(raw: RawDataset) -> PipelineResult<PreparedData> {
    let outcome = clean_sales(&raw);
    log_report(&outcome.report);

    validate_cleaned(&outcome.dataset).map_err(PipelineError::Invalid)?;

    Ok(PreparedData {
        info: raw.info,
        dataset: outcome.dataset,
        report: outcome.report,
    })
}

/// Run extract → transform → staging file → load.
///
/// The loader reads the staging file back, so what is loaded is exactly
/// what was written.
pub async fn run_etl(
    input: &Path,
    config: &DbConfig,
    options: EtlOptions,
) -> PipelineResult<EtlSummary> {
    let prepared = extract_and_transform(input)?;

    write_cleaned_csv(&prepared.dataset, &options.staging_path)?;
    log_success(
        Stage::Transform,
        format!("Cleaned data written to {}", options.staging_path.display()),
    );

    let staged = read_cleaned_csv(&options.staging_path)?;
    let load = load_sales(&staged, config, LoadOptions { truncate: options.truncate }).await?;

    Ok(EtlSummary {
        csv_info: prepared.info,
        report: prepared.report,
        load,
        staging_path: Some(options.staging_path),
    })
}

/// Ingest an uploaded CSV straight into the database.
pub async fn ingest_bytes(
    bytes: &[u8],
    config: &DbConfig,
    options: LoadOptions,
) -> PipelineResult<EtlSummary> {
    let prepared = prepare_bytes(bytes)?;
    let load = load_sales(&prepared.dataset, config, options).await?;

    Ok(EtlSummary {
        csv_info: prepared.info,
        report: prepared.report,
        load,
        staging_path: None,
    })
}

/// Log per-filter counts and the first dropped rows.
fn log_report(report: &TransformReport) {
    if report.product_defaulted + report.category_defaulted > 0 {
        log_info(
            Stage::Transform,
            format!(
                "Defaulted {} product and {} category values to \"Unknown\"",
                report.product_defaulted, report.category_defaulted
            ),
        );
    }

    if report.dropped.is_empty() {
        return;
    }

    log_warning(Stage::Transform, format!("{} rows dropped", report.dropped_count()));
    for dropped in report.dropped.iter().take(DROPPED_PREVIEW) {
        log_warning_indent(
            Stage::Transform,
            format!("line {}: {}", dropped.line, dropped.reason),
            1,
        );
    }
    if report.dropped.len() > DROPPED_PREVIEW {
        log_warning_indent(
            Stage::Transform,
            format!("... and {} more", report.dropped.len() - DROPPED_PREVIEW),
            1,
        );
    }
}
