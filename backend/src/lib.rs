//! # Salesflow - retail sales ETL and analytics dashboard
//!
//! Salesflow reads a raw sales CSV, cleans it, loads it into a `sales_data`
//! table, and serves KPIs and charts computed over that table.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Raw CSV    │────▶│   Extract   │────▶│  Transform  │────▶│    Load     │
//! │  (ISO/UTF8) │     │  (schema)   │     │  (clean)    │     │ (sales_data)│
//! └─────────────┘     └─────────────┘     └──────┬──────┘     └──────┬──────┘
//!                                                │ staging CSV        │
//!                                                ▼                    ▼
//!                                          cleaned_sales.csv    ┌─────────────┐
//!                                                               │  Dashboard  │
//!                                                               │ (KPIs, HTTP)│
//!                                                               └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use salesflow::{run_etl, DbConfig, EtlOptions};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = DbConfig::sqlite("sales.db");
//!     let summary = run_etl(Path::new("raw_sales.csv"), &config, EtlOptions::default())
//!         .await
//!         .unwrap();
//!     println!("Loaded {} rows", summary.load.inserted);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per stage
//! - [`config`] - Database configuration and constants
//! - [`models`] - Raw, cleaned and persisted sales records
//! - [`extract`] - CSV reading with encoding detection
//! - [`transform`] - Coercion and cleaning rules
//! - [`staging`] - Intermediate cleaned CSV
//! - [`validation`] - Cleaned-dataset invariants
//! - [`store`] - SQLite / PostgreSQL sales table
//! - [`load`] - Loader
//! - [`dashboard`] - Filters, KPIs and charts
//! - [`cache`] - Dashboard fetch cache
//! - [`pipeline`] - End-to-end runs
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Stages
pub mod extract;
pub mod load;
pub mod staging;
pub mod transform;

// Validation
pub mod validation;

// Storage
pub mod store;

// Dashboard
pub mod cache;
pub mod dashboard;

// Orchestration
pub mod pipeline;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, ExtractError, LoadError, PipelineError, ServerError, StagingError, StoreError,
};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{Backend, DbConfig};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{CleanedDataset, Coerced, CsvInfo, RawDataset, RawRecord, SalesRecord, StoredSale};

// =============================================================================
// Re-exports - Stages
// =============================================================================

pub use extract::{extract_bytes, extract_sales_data};
pub use load::{load_sales, LoadOptions, LoadSummary};
pub use staging::{read_cleaned_csv, write_cleaned_csv};
pub use transform::{clean_sales, transform_sales, TransformOutcome, TransformReport};
pub use validation::validate_cleaned;

// =============================================================================
// Re-exports - Storage
// =============================================================================

pub use store::{SalesStore, SqliteStore};
#[cfg(feature = "postgres")]
pub use store::PostgresStore;

// =============================================================================
// Re-exports - Dashboard
// =============================================================================

pub use cache::SalesCache;
pub use dashboard::{build_view, fetch_sales, DashboardFilter, DashboardView, Kpis};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use pipeline::{extract_and_transform, ingest_bytes, run_etl, EtlOptions, EtlSummary};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
