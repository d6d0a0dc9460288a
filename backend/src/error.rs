//! Error types for the DataVision ingestion pipeline.
//!
//! - [`FormatError`] - the file cannot be decoded at all (upload rejected)
//! - [`ParseWarning`] - non-fatal decoder diagnostics, collected and logged
//! - [`PipelineError`] - top-level orchestration errors
//! - [`StoreError`] - persistence errors (remote function or local registry)
//! - [`ServerError`] - HTTP layer errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use serde::Serialize;
use thiserror::Error;

use crate::validation::SchemaIssue;

// =============================================================================
// Format Errors
// =============================================================================

/// Errors that make a file unusable. Processing aborts, no dataset is produced.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Extension is not one of `.csv`, `.json`, `.xlsx`, `.xls`.
    #[error("Unsupported file type: {0}. Please upload CSV, JSON, or Excel files only")]
    UnsupportedExtension(String),

    /// JSON root is not an array.
    #[error("JSON must contain an array of data")]
    NotAnArray,

    /// JSON could not be parsed.
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Workbook has no sheets.
    #[error("No sheets found in Excel file")]
    EmptyWorkbook,

    /// Workbook could not be opened or read.
    #[error("Failed to read Excel file: {0}")]
    Spreadsheet(String),

    /// Text could not be decoded.
    #[error("Failed to decode file content: {0}")]
    Encoding(String),

    /// File exceeds the client-side size limit.
    #[error("File too large ({size} bytes, limit {limit} bytes). Larger files require server-side processing, which is not available yet")]
    TooLarge { size: u64, limit: u64 },
}

// =============================================================================
// Parse Warnings
// =============================================================================

/// A non-fatal problem found while decoding. Parsing continues.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseWarning {
    /// 1-based line (record) number in the source.
    pub line: usize,
    pub message: String,
}

impl ParseWarning {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }

    pub fn ragged(line: usize, expected: usize, found: usize) -> Self {
        Self::new(
            line,
            format!("Expected {} fields but found {}", expected, found),
        )
    }
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Line {}: {}", self.line, self.message)
    }
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// The `Display` output is the single human-readable message shown for a
/// rejected upload.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// File could not be decoded.
    #[error("{0}")]
    Format(#[from] FormatError),

    /// File could not be read.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Decoded file holds no header row.
    #[error("No data found in file")]
    NoData,

    /// Schema edits do not line up with the dataset columns.
    #[error("Schema has {found} columns but dataset has {expected}")]
    SchemaMismatch { expected: usize, found: usize },

    /// Columns of a supplied dataset differ in length.
    #[error("Column '{column}' has {found} values but the dataset has {expected} rows")]
    RaggedColumns {
        column: String,
        expected: usize,
        found: usize,
    },

    /// Schema has empty or duplicate names; charting is blocked.
    #[error("Schema validation failed: {}", format_issues(.0))]
    InvalidSchema(Vec<SchemaIssue>),

    /// Chart configuration cannot produce series for this dataset.
    #[error("Invalid chart configuration: {0}")]
    InvalidChart(String),
}

fn format_issues(issues: &[SchemaIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// Store Errors
// =============================================================================

/// Errors while persisting a dataset summary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Required configuration is missing.
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// The save function answered with an error.
    #[error("Save rejected: {0}")]
    Rejected(String),

    /// Stored dataset not found.
    #[error("Dataset not found: {0}")]
    NotFound(String),

    /// IO error.
    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("Store JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    /// Persistence error.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for decoding.
pub type FormatResult<T> = Result<T, FormatError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
