//! # DataVision - data ingestion, type inference and chart preparation
//!
//! DataVision turns user-supplied CSV, JSON and Excel files into typed,
//! chart-ready datasets.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV / JSON │────▶│   Decoder   │────▶│    Type     │────▶│   Dataset   │
//! │  XLSX / XLS │     │  (RawTable) │     │  Inferencer │     │  Assembler  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                                                                    │
//!                       validation · chart · transform · export · store
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use datavision::{parse_bytes, ParseOptions};
//!
//! let outcome = parse_bytes(b"Month,Revenue\nJan,100\n", "sales.csv", &ParseOptions::default())?;
//! for column in &outcome.dataset.columns {
//!     println!("{}: {}", column.name, column.column_type);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per stage
//! - [`models`] - Cell values, columns and datasets
//! - [`parser`] - File decoding (CSV, JSON, spreadsheets)
//! - [`inference`] - Column type inference
//! - [`dataset`] - Dataset assembly
//! - [`validation`] - Schema validation and data-quality checks
//! - [`pipeline`] - The stages composed, with size/extension checks
//! - [`chart`] - Chart configs, recommendations and series
//! - [`transform`] - Filter, aggregate, sort and statistics
//! - [`export`] - CSV and JSON export
//! - [`samples`] - Built-in sample datasets
//! - [`store`] - Saving dataset summaries
//! - [`config`] - Environment configuration
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Ingestion stages
pub mod dataset;
pub mod inference;
pub mod parser;
pub mod pipeline;

// Validation
pub mod validation;

// Downstream consumers
pub mod chart;
pub mod export;
pub mod samples;
pub mod store;
pub mod transform;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    FormatError, FormatResult, ParseWarning, PipelineError, PipelineResult, ServerError,
    StoreError, StoreResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{CellValue, Column, ColumnSchema, ColumnType, Dataset, Row};

// =============================================================================
// Re-exports - Ingestion
// =============================================================================

pub use dataset::assemble;
pub use inference::{infer_column_type, InferenceThresholds};
pub use parser::{decode, DecodeOutput, FileFormat, RawTable};
pub use pipeline::{
    ensure_valid_schema, parse_bytes, parse_bytes_with_progress, parse_file, prepare_chart,
    ParseOptions, ParseOutcome,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{data_quality_issues, validate_schema, QualityIssue, SchemaIssue};

// =============================================================================
// Re-exports - Charts, transforms, export
// =============================================================================

pub use chart::{build_series, recommend_charts, ChartConfig, ChartSeries, ChartType};
pub use export::{to_csv, to_json};
pub use transform::{add_derived_column, column_stats, unique_values, ColumnStats};

// =============================================================================
// Re-exports - Persistence and configuration
// =============================================================================

pub use config::Config;
pub use store::{LocalStore, RemoteStore, SaveDatasetRequest, SaveDatasetResponse};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}
