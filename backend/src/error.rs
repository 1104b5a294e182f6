//! Error types for the Salesflow ETL pipeline.
//!
//! Each stage owns its error type:
//!
//! - [`ExtractError`] - missing input file, unreadable CSV, missing columns
//! - [`StagingError`] - intermediate (cleaned) CSV file errors
//! - [`StoreError`] - database connection, schema and insert errors
//! - [`LoadError`] - loader errors
//! - [`ConfigError`] - environment configuration errors
//! - [`PipelineError`] - top-level orchestration errors
//! - [`ServerError`] - dashboard HTTP server errors
//!
//! The transformer has no error type: it is a total function over a
//! [`crate::models::RawDataset`].
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across stage boundaries.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// Extraction Errors
// =============================================================================

/// Errors raised while reading the raw sales CSV.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The input path does not exist.
    #[error("File not found at: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The file exists but is not readable as tabular CSV.
    #[error("Error reading CSV: {0}")]
    Read(String),

    /// One or more required columns are absent from the header.
    #[error("Missing columns: {missing:?}")]
    Schema { missing: Vec<String> },
}

// =============================================================================
// Staging Errors
// =============================================================================

/// Errors reading or writing the intermediate cleaned CSV.
#[derive(Debug, Error)]
pub enum StagingError {
    /// Failed to create, open or flush the file.
    #[error("Staging file IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed row in the staging file.
    #[error("Staging file format error: {0}")]
    Format(#[from] csv::Error),

    /// The staging file does not exist.
    #[error("Staging file not found at: {}", .0.display())]
    NotFound(PathBuf),
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors from the relational sales table.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database unreachable, authentication failure, or unsupported backend.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Insert or commit rejected (type mismatch, out-of-range value, constraint).
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// DDL or read query failed.
    #[error("Query error: {0}")]
    Query(String),

    /// A stored value could not be converted back into a sales record.
    #[error("Decode error in column '{column}': {message}")]
    Decode { column: String, message: String },
}

// =============================================================================
// Load Errors
// =============================================================================

/// Errors raised by the loader.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The dataset breaks a cleaned-dataset invariant; nothing was written.
    #[error("Refusing to load invalid dataset: {}", .0.join("; "))]
    Invalid(Vec<String>),

    /// Database error.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors building the database configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("Missing environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable has an unusable value.
    #[error("Invalid value for {var}: {message}")]
    Invalid { var: &'static str, message: String },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the main error type returned by [`crate::pipeline::run_etl`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Extraction error.
    #[error("Extract error: {0}")]
    Extract(#[from] ExtractError),

    /// Staging file error.
    #[error("Staging error: {0}")]
    Staging(#[from] StagingError),

    /// Load error.
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// The transformed dataset failed validation.
    #[error("Cleaned dataset failed validation: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Database error while serving the dashboard.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for extraction.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Result type for staging file operations.
pub type StagingResult<T> = Result<T, StagingError>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for the loader.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
